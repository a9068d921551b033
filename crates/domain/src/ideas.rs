use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::identity::ActorIdentity;
use crate::ports::ideas::IdeaRepository;
use crate::users::normalize_skill;
use crate::util::now_ms;
use crate::DomainResult;

const MAX_TITLE_LENGTH: usize = 160;
const MAX_SUMMARY_LENGTH: usize = 2_000;
const MAX_REQUIRED_SKILLS: usize = 10;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdeaVisibility {
    Public,
    Private,
}

impl IdeaVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Idea {
    pub idea_id: String,
    pub author_id: String,
    pub author_username: String,
    pub title: String,
    pub summary: Option<String>,
    pub required_skills: Vec<String>,
    pub visibility: IdeaVisibility,
    pub published: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct IdeaCreate {
    pub title: String,
    pub summary: Option<String>,
    pub required_skills: Vec<String>,
    pub visibility: IdeaVisibility,
    pub published: bool,
}

#[derive(Clone)]
pub struct IdeaService {
    ideas: Arc<dyn IdeaRepository>,
}

impl IdeaService {
    pub fn new(ideas: Arc<dyn IdeaRepository>) -> Self {
        Self { ideas }
    }

    pub async fn create(&self, actor: ActorIdentity, input: IdeaCreate) -> DomainResult<Idea> {
        let input = validate_idea_create(input)?;
        let now = now_ms();
        let idea = Idea {
            idea_id: crate::util::uuid_v7_without_dashes(),
            author_id: actor.user_id,
            author_username: actor.username,
            title: input.title,
            summary: input.summary,
            required_skills: input.required_skills,
            visibility: input.visibility,
            published: input.published,
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.ideas.create(&idea).await
    }

    pub async fn get(&self, idea_id: &str) -> DomainResult<Idea> {
        self.ideas
            .get(idea_id)
            .await?
            .ok_or(DomainError::NotFound)
    }
}

fn validate_idea_create(input: IdeaCreate) -> DomainResult<IdeaCreate> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(DomainError::Validation("title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(DomainError::Validation(format!(
            "title exceeds max length of {MAX_TITLE_LENGTH}"
        )));
    }

    if let Some(summary) = input.summary.as_ref() {
        if summary.chars().count() > MAX_SUMMARY_LENGTH {
            return Err(DomainError::Validation(format!(
                "summary exceeds max length of {MAX_SUMMARY_LENGTH}"
            )));
        }
    }

    if input.required_skills.len() > MAX_REQUIRED_SKILLS {
        return Err(DomainError::Validation(format!(
            "required_skills exceeds max of {MAX_REQUIRED_SKILLS}"
        )));
    }

    Ok(IdeaCreate {
        title,
        summary: input.summary,
        required_skills: dedupe_skill_names(input.required_skills),
        visibility: input.visibility,
        published: input.published,
    })
}

fn dedupe_skill_names(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter_map(|raw| {
            let name = raw.trim().to_string();
            if name.is_empty() {
                return None;
            }
            seen.insert(normalize_skill(&name)).then_some(name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_title_is_rejected() {
        let result = validate_idea_create(IdeaCreate {
            title: "  ".to_string(),
            summary: None,
            required_skills: vec![],
            visibility: IdeaVisibility::Public,
            published: true,
        });
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn required_skills_are_deduped() {
        let input = validate_idea_create(IdeaCreate {
            title: "Community seed library".to_string(),
            summary: None,
            required_skills: vec![
                "React".to_string(),
                " react ".to_string(),
                "Design".to_string(),
            ],
            visibility: IdeaVisibility::Public,
            published: true,
        })
        .expect("valid input");
        assert_eq!(input.required_skills, vec!["React", "Design"]);
    }
}
