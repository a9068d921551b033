use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ideas::{Idea, IdeaVisibility};
use crate::ports::collaboration::ContributionRequestRepository;
use crate::ports::ideas::IdeaRepository;
use crate::ports::users::UserDirectory;
use crate::users::{normalize_skill, SkillLevel, User};
use crate::DomainResult;

const COVERAGE_WEIGHT: f64 = 0.7;
const LEVEL_SCORE_WEIGHT: f64 = 0.2;
const BONUS_WEIGHT: f64 = 0.1;
const IDEA_COVERAGE_WEIGHT: f64 = 0.7;
const IDEA_COUNT_BONUS_WEIGHT: f64 = 0.3;
const BONUS_SATURATION: f64 = 5.0;
const UNRATED_LEVEL_WEIGHT: f64 = 0.2;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

pub fn level_weight(level: Option<SkillLevel>) -> f64 {
    match level {
        Some(SkillLevel::Expert) => 1.0,
        Some(SkillLevel::Advanced) => 0.8,
        Some(SkillLevel::Intermediate) => 0.6,
        Some(SkillLevel::Beginner) => 0.4,
        None => UNRATED_LEVEL_WEIGHT,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SkillMatch {
    pub user_id: String,
    pub username: String,
    pub matched_skills: Vec<String>,
    pub additional_skills: Vec<String>,
    pub coverage: f64,
    pub level_score: f64,
    pub score: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IdeaMatch {
    pub idea_id: String,
    pub title: String,
    pub matched_skills: Vec<String>,
    pub coverage: f64,
    pub score: f64,
}

/// Scores one candidate against a required-skill list. Pure; `required` is
/// assumed trimmed and deduped (see `normalize_required`).
pub fn score_candidate(user: &User, required: &[String]) -> SkillMatch {
    let required_set: HashSet<String> = required.iter().map(|s| normalize_skill(s)).collect();

    let mut matched_skills = Vec::new();
    let mut additional_skills = Vec::new();
    let mut matched_norm = HashSet::new();
    let mut level_total = 0.0;

    for entry in &user.skills {
        let norm = normalize_skill(&entry.skill);
        if required_set.contains(&norm) {
            matched_norm.insert(norm);
            level_total += level_weight(entry.level);
            matched_skills.push(entry.skill.clone());
        } else {
            additional_skills.push(entry.skill.clone());
        }
    }

    let coverage = if required_set.is_empty() {
        0.0
    } else {
        matched_norm.len() as f64 / required_set.len() as f64
    };
    let level_score = if matched_skills.is_empty() {
        0.0
    } else {
        level_total / matched_skills.len() as f64
    };
    let bonus = (additional_skills.len() as f64 / BONUS_SATURATION).min(1.0);
    let score =
        COVERAGE_WEIGHT * coverage + LEVEL_SCORE_WEIGHT * level_score + BONUS_WEIGHT * bonus;

    SkillMatch {
        user_id: user.user_id.clone(),
        username: user.username.clone(),
        matched_skills,
        additional_skills,
        coverage,
        level_score,
        score,
    }
}

/// Scores one idea against a user's skill names (normalized). Pure.
pub fn score_idea(user_skills: &HashSet<String>, idea: &Idea) -> IdeaMatch {
    let matched_skills: Vec<String> = idea
        .required_skills
        .iter()
        .filter(|skill| user_skills.contains(&normalize_skill(skill)))
        .cloned()
        .collect();

    let coverage = if idea.required_skills.is_empty() {
        0.0
    } else {
        matched_skills.len() as f64 / idea.required_skills.len() as f64
    };
    let count_bonus = (matched_skills.len() as f64 / BONUS_SATURATION).min(1.0);
    let score = IDEA_COVERAGE_WEIGHT * coverage + IDEA_COUNT_BONUS_WEIGHT * count_bonus;

    IdeaMatch {
        idea_id: idea.idea_id.clone(),
        title: idea.title.clone(),
        matched_skills,
        coverage,
        score,
    }
}

#[derive(Clone)]
pub struct MatchingService {
    users: Arc<dyn UserDirectory>,
    ideas: Arc<dyn IdeaRepository>,
    requests: Arc<dyn ContributionRequestRepository>,
}

impl MatchingService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        ideas: Arc<dyn IdeaRepository>,
        requests: Arc<dyn ContributionRequestRepository>,
    ) -> Self {
        Self {
            users,
            ideas,
            requests,
        }
    }

    /// Ranks users against the idea's required skills (or an explicit
    /// override). Read-only over a snapshot: the idea author and anyone with
    /// a pending or accepted request are excluded, ties keep directory order.
    pub async fn rank_candidates(
        &self,
        idea_id: &str,
        required_skills: Option<Vec<String>>,
        limit: Option<usize>,
    ) -> DomainResult<Vec<SkillMatch>> {
        let limit = normalize_limit(limit)?;
        let idea = self
            .ideas
            .get(idea_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let required =
            normalize_required(required_skills.unwrap_or_else(|| idea.required_skills.clone()));
        if required.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.users.list_with_any_skill(&required).await?;
        let mut matches = Vec::with_capacity(candidates.len());
        for user in candidates {
            if user.user_id == idea.author_id {
                continue;
            }
            if self
                .requests
                .find_active(idea_id, &user.user_id)
                .await?
                .is_some()
            {
                continue;
            }
            let skill_match = score_candidate(&user, &required);
            if skill_match.matched_skills.is_empty() {
                continue;
            }
            matches.push(skill_match);
        }

        matches.sort_by(|left, right| right.score.total_cmp(&left.score));
        matches.truncate(limit);
        Ok(matches)
    }

    /// Ranks published public ideas for a user's skills, excluding their own
    /// ideas and ideas they already have an open or accepted request for.
    pub async fn rank_ideas_for_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> DomainResult<Vec<IdeaMatch>> {
        let limit = normalize_limit(limit)?;
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let user_skills: HashSet<String> = user
            .skills
            .iter()
            .map(|entry| normalize_skill(&entry.skill))
            .collect();
        if user_skills.is_empty() {
            return Ok(Vec::new());
        }

        let ideas = self.ideas.list_published_public().await?;
        let mut matches = Vec::new();
        for idea in ideas {
            debug_assert!(idea.published && idea.visibility == IdeaVisibility::Public);
            if idea.author_id == user_id {
                continue;
            }
            if self
                .requests
                .find_active(&idea.idea_id, user_id)
                .await?
                .is_some()
            {
                continue;
            }
            let idea_match = score_idea(&user_skills, &idea);
            if idea_match.matched_skills.is_empty() {
                continue;
            }
            matches.push(idea_match);
        }

        matches.sort_by(|left, right| right.score.total_cmp(&left.score));
        matches.truncate(limit);
        Ok(matches)
    }
}

fn normalize_limit(limit: Option<usize>) -> DomainResult<usize> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        Err(DomainError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )))
    } else {
        Ok(limit)
    }
}

fn normalize_required(skills: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
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
    use crate::users::UserSkill;

    fn user(user_id: &str, skills: &[(&str, Option<SkillLevel>)]) -> User {
        User {
            user_id: user_id.to_string(),
            username: format!("{user_id}-name"),
            skills: skills
                .iter()
                .map(|(name, level)| UserSkill {
                    skill: name.to_string(),
                    level: *level,
                })
                .collect(),
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    fn required(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn full_coverage_expert_hits_the_reference_score() {
        let candidate = user(
            "u-1",
            &[
                ("React", Some(SkillLevel::Expert)),
                ("Design", Some(SkillLevel::Expert)),
            ],
        );
        let result = score_candidate(&candidate, &required(&["React", "Design"]));
        assert_approx(result.coverage, 1.0);
        assert_approx(result.level_score, 1.0);
        // 0.7 coverage + 0.2 level + 0.1 * 0 bonus
        assert_approx(result.score, 0.9);
    }

    #[test]
    fn full_expert_coverage_beats_half_intermediate_coverage() {
        let strong = user(
            "u-strong",
            &[
                ("React", Some(SkillLevel::Expert)),
                ("Design", Some(SkillLevel::Expert)),
            ],
        );
        let weak = user("u-weak", &[("React", Some(SkillLevel::Intermediate))]);
        let req = required(&["React", "Design"]);
        let strong_score = score_candidate(&strong, &req).score;
        let weak_score = score_candidate(&weak, &req).score;
        assert!(strong_score > weak_score);
        assert_approx(weak_score, 0.7 * 0.5 + 0.2 * 0.6);
    }

    #[test]
    fn empty_required_skills_scores_zero_coverage_without_panicking() {
        let candidate = user("u-1", &[("React", Some(SkillLevel::Expert))]);
        let result = score_candidate(&candidate, &[]);
        assert_approx(result.coverage, 0.0);
        assert_approx(result.level_score, 0.0);
    }

    #[test]
    fn additional_skills_bonus_saturates_at_five() {
        let candidate = user(
            "u-1",
            &[
                ("React", Some(SkillLevel::Expert)),
                ("a", None),
                ("b", None),
                ("c", None),
                ("d", None),
                ("e", None),
                ("f", None),
            ],
        );
        let result = score_candidate(&candidate, &required(&["React"]));
        assert_eq!(result.additional_skills.len(), 6);
        assert_approx(result.score, 0.7 + 0.2 + 0.1);
    }

    #[test]
    fn unrated_skills_carry_the_unknown_weight() {
        let candidate = user("u-1", &[("React", None)]);
        let result = score_candidate(&candidate, &required(&["React"]));
        assert_approx(result.level_score, 0.2);
    }

    #[test]
    fn skill_names_match_case_insensitively() {
        let candidate = user("u-1", &[("react", Some(SkillLevel::Advanced))]);
        let result = score_candidate(&candidate, &required(&["React"]));
        assert_eq!(result.matched_skills, vec!["react"]);
        assert_approx(result.coverage, 1.0);
    }

    #[test]
    fn idea_scoring_follows_the_coverage_and_count_formula() {
        let idea = Idea {
            idea_id: "idea-1".to_string(),
            author_id: "owner".to_string(),
            author_username: "owner-name".to_string(),
            title: "Repair cafe".to_string(),
            summary: None,
            required_skills: required(&["Welding", "Design"]),
            visibility: IdeaVisibility::Public,
            published: true,
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        let skills: HashSet<String> = ["welding".to_string()].into_iter().collect();
        let result = score_idea(&skills, &idea);
        assert_eq!(result.matched_skills, vec!["Welding"]);
        assert_approx(result.coverage, 0.5);
        assert_approx(result.score, 0.7 * 0.5 + 0.3 * (1.0 / 5.0));
    }

    #[test]
    fn idea_with_no_required_skills_scores_zero() {
        let idea = Idea {
            idea_id: "idea-2".to_string(),
            author_id: "owner".to_string(),
            author_username: "owner-name".to_string(),
            title: "Open ended".to_string(),
            summary: None,
            required_skills: vec![],
            visibility: IdeaVisibility::Public,
            published: true,
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        let skills: HashSet<String> = ["welding".to_string()].into_iter().collect();
        let result = score_idea(&skills, &idea);
        assert_approx(result.coverage, 0.0);
        assert_approx(result.score, 0.0);
    }

    #[test]
    fn limit_bounds_are_enforced() {
        assert_eq!(normalize_limit(None).unwrap(), 10);
        assert_eq!(normalize_limit(Some(50)).unwrap(), 50);
        assert!(normalize_limit(Some(0)).is_err());
        assert!(normalize_limit(Some(51)).is_err());
    }
}
