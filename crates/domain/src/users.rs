use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::identity::ActorIdentity;
use crate::ports::users::UserDirectory;
use crate::util::now_ms;
use crate::DomainResult;

const MAX_SKILLS: usize = 30;
const MAX_SKILL_NAME_LENGTH: usize = 60;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }
}

/// A skill a user claims. `level` is optional: users may list a skill without
/// stating a proficiency, and the matcher weights that case separately.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserSkill {
    pub skill: String,
    pub level: Option<SkillLevel>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub skills: Vec<UserSkill>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct ProfileUpdate {
    pub skills: Vec<UserSkill>,
}

/// Canonical form used for skill-name comparison everywhere: trimmed,
/// ASCII-lowercased. Display strings keep the user's original casing.
pub fn normalize_skill(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserDirectory>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    pub async fn upsert_profile(
        &self,
        actor: ActorIdentity,
        input: ProfileUpdate,
    ) -> DomainResult<User> {
        let skills = validate_skills(input.skills)?;
        let now = now_ms();
        let user = User {
            user_id: actor.user_id,
            username: actor.username,
            skills,
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.users.upsert(&user).await
    }

    pub async fn get(&self, user_id: &str) -> DomainResult<User> {
        self.users
            .get(user_id)
            .await?
            .ok_or(DomainError::NotFound)
    }
}

fn validate_skills(skills: Vec<UserSkill>) -> DomainResult<Vec<UserSkill>> {
    if skills.len() > MAX_SKILLS {
        return Err(DomainError::Validation(format!(
            "skills exceeds max of {MAX_SKILLS}"
        )));
    }

    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(skills.len());
    for entry in skills {
        let name = entry.skill.trim().to_string();
        if name.is_empty() {
            continue;
        }
        if name.chars().count() > MAX_SKILL_NAME_LENGTH {
            return Err(DomainError::Validation(format!(
                "skill name exceeds max length of {MAX_SKILL_NAME_LENGTH}"
            )));
        }
        if seen.insert(normalize_skill(&name)) {
            cleaned.push(UserSkill {
                skill: name,
                level: entry.level,
            });
        }
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(name: &str, level: Option<SkillLevel>) -> UserSkill {
        UserSkill {
            skill: name.to_string(),
            level,
        }
    }

    #[test]
    fn skills_are_trimmed_and_deduped_case_insensitively() {
        let cleaned = validate_skills(vec![
            skill(" React ", Some(SkillLevel::Expert)),
            skill("react", Some(SkillLevel::Beginner)),
            skill("", None),
            skill("Rust", None),
        ])
        .expect("valid skills");
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].skill, "React");
        assert_eq!(cleaned[0].level, Some(SkillLevel::Expert));
        assert_eq!(cleaned[1].skill, "Rust");
    }

    #[test]
    fn overlong_skill_name_is_rejected() {
        let result = validate_skills(vec![skill(&"x".repeat(61), None)]);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn skill_count_is_capped() {
        let skills = (0..31).map(|i| skill(&format!("s{i}"), None)).collect();
        assert!(validate_skills(skills).is_err());
    }
}
