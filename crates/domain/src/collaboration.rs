use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::engagement::{
    ActivityDraft, EngagementService, NotificationDraft, ACTIVITY_CONTRIBUTION_ACCEPTED,
    ACTIVITY_CONTRIBUTION_INVITATION_CANCELLED, ACTIVITY_CONTRIBUTION_INVITED,
    ACTIVITY_CONTRIBUTION_REJECTED, ACTIVITY_CONTRIBUTION_REQUESTED,
    ACTIVITY_CONTRIBUTION_WITHDRAWN, NOTIF_TYPE_CONTRIBUTION_REQUEST,
    NOTIF_TYPE_CONTRIBUTION_RESPONSE, NOTIF_TYPE_INVITATION_CANCELLED,
};
use crate::error::DomainError;
use crate::identity::ActorIdentity;
use crate::ideas::Idea;
use crate::policy;
use crate::ports::collaboration::ContributionRequestRepository;
use crate::ports::ideas::IdeaRepository;
use crate::ports::users::UserDirectory;
use crate::users::normalize_skill;
use crate::util::now_ms;
use crate::DomainResult;

const MAX_MESSAGE_LENGTH: usize = 1_000;
const MAX_INVITE_SKILLS: usize = 10;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDecision {
    Accepted,
    Rejected,
}

impl ResponseDecision {
    pub fn as_status(self) -> RequestStatus {
        match self {
            Self::Accepted => RequestStatus::Accepted,
            Self::Rejected => RequestStatus::Rejected,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.as_status().as_str()
    }
}

/// A candidate's request to join an idea, or the owner's invitation to a
/// candidate (`initiated_by_owner`). `responded_at_ms` is set iff the request
/// reached a terminal status through an explicit response; withdrawal and
/// cancellation delete the row instead.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContributionRequest {
    pub request_id: String,
    pub idea_id: String,
    pub user_id: String,
    pub message: String,
    pub skills: Vec<String>,
    pub status: RequestStatus,
    pub initiated_by_owner: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub responded_at_ms: Option<i64>,
}

/// Requests bucketed by outcome. `withdrawn` stays in the shape for response
/// stability, but withdrawal deletes the row, so it is empty in practice.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContributionBuckets {
    pub pending: Vec<ContributionRequest>,
    pub accepted: Vec<ContributionRequest>,
    pub rejected: Vec<ContributionRequest>,
    pub withdrawn: Vec<ContributionRequest>,
}

/// Workflow-level policy knobs. The observed product behavior notifies the
/// owner on invite responses but not on incoming candidate requests;
/// `notify_owner_on_request` makes that asymmetry an explicit choice.
#[derive(Clone, Copy, Debug)]
pub struct CollaborationPolicy {
    pub notify_owner_on_request: bool,
}

impl Default for CollaborationPolicy {
    fn default() -> Self {
        Self {
            notify_owner_on_request: false,
        }
    }
}

#[derive(Clone)]
pub struct CollaborationService {
    requests: Arc<dyn ContributionRequestRepository>,
    ideas: Arc<dyn IdeaRepository>,
    users: Arc<dyn UserDirectory>,
    engagement: EngagementService,
    policy: CollaborationPolicy,
}

impl CollaborationService {
    pub fn new(
        requests: Arc<dyn ContributionRequestRepository>,
        ideas: Arc<dyn IdeaRepository>,
        users: Arc<dyn UserDirectory>,
        engagement: EngagementService,
        policy: CollaborationPolicy,
    ) -> Self {
        Self {
            requests,
            ideas,
            users,
            engagement,
            policy,
        }
    }

    pub async fn request_contribution(
        &self,
        actor: ActorIdentity,
        idea_id: &str,
        message: String,
    ) -> DomainResult<ContributionRequest> {
        let message = validate_message(&message)?;
        let idea = self.resolve_idea(idea_id).await?;
        policy::authorize_create_request(&actor.user_id, &idea)?;

        // advisory read; the insert constraint is the authoritative defense
        if self
            .requests
            .find_active(idea_id, &actor.user_id)
            .await?
            .is_some()
        {
            return Err(DomainError::DuplicateRequest);
        }

        let now = now_ms();
        let request = ContributionRequest {
            request_id: crate::util::uuid_v7_without_dashes(),
            idea_id: idea_id.to_string(),
            user_id: actor.user_id.clone(),
            message,
            skills: Vec::new(),
            status: RequestStatus::Pending,
            initiated_by_owner: false,
            created_at_ms: now,
            updated_at_ms: now,
            responded_at_ms: None,
        };
        let request = self.requests.create(&request).await?;

        self.engagement
            .record_activity(ActivityDraft {
                activity_type: ACTIVITY_CONTRIBUTION_REQUESTED.to_string(),
                description: format!(
                    "{} asked to contribute to \"{}\"",
                    actor.username, idea.title
                ),
                user_id: actor.user_id.clone(),
                idea_id: idea_id.to_string(),
                metadata: request_metadata(&request, &idea, &actor.user_id),
            })
            .await;

        if self.policy.notify_owner_on_request {
            self.engagement
                .notify(NotificationDraft {
                    user_id: idea.author_id.clone(),
                    notification_type: NOTIF_TYPE_CONTRIBUTION_REQUEST.to_string(),
                    title: "New contribution request".to_string(),
                    body: format!(
                        "{} asked to contribute to \"{}\"",
                        actor.username, idea.title
                    ),
                    metadata: request_metadata(&request, &idea, &actor.user_id),
                })
                .await;
        }

        Ok(request)
    }

    pub async fn invite_contribution(
        &self,
        actor: ActorIdentity,
        idea_id: &str,
        candidate_id: &str,
        message: String,
        required_skills: Vec<String>,
    ) -> DomainResult<ContributionRequest> {
        let message = validate_message(&message)?;
        let skills = validate_invite_skills(required_skills)?;
        let idea = self.resolve_idea(idea_id).await?;
        policy::authorize_create_invite(&actor.user_id, &idea, candidate_id)?;

        let candidate = self
            .users
            .get(candidate_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        if self
            .requests
            .find_active(idea_id, candidate_id)
            .await?
            .is_some()
        {
            return Err(DomainError::DuplicateRequest);
        }

        let now = now_ms();
        let request = ContributionRequest {
            request_id: crate::util::uuid_v7_without_dashes(),
            idea_id: idea_id.to_string(),
            user_id: candidate.user_id.clone(),
            message,
            skills,
            status: RequestStatus::Pending,
            initiated_by_owner: true,
            created_at_ms: now,
            updated_at_ms: now,
            responded_at_ms: None,
        };
        let request = self.requests.create(&request).await?;

        self.engagement
            .notify(NotificationDraft {
                user_id: candidate.user_id.clone(),
                notification_type: NOTIF_TYPE_CONTRIBUTION_REQUEST.to_string(),
                title: "Invitation to contribute".to_string(),
                body: format!(
                    "{} invited you to contribute to \"{}\"",
                    actor.username, idea.title
                ),
                metadata: request_metadata(&request, &idea, &actor.user_id),
            })
            .await;

        self.engagement
            .record_activity(ActivityDraft {
                activity_type: ACTIVITY_CONTRIBUTION_INVITED.to_string(),
                description: format!(
                    "{} invited {} to contribute to \"{}\"",
                    actor.username, candidate.username, idea.title
                ),
                user_id: actor.user_id.clone(),
                idea_id: idea_id.to_string(),
                metadata: request_metadata(&request, &idea, &actor.user_id),
            })
            .await;

        Ok(request)
    }

    pub async fn respond_to_invite(
        &self,
        actor: ActorIdentity,
        request_id: &str,
        decision: ResponseDecision,
    ) -> DomainResult<ContributionRequest> {
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        policy::authorize_respond(&actor.user_id, &request)?;
        let idea = self.resolve_idea(&request.idea_id).await?;

        // the pending precondition rides inside the store update; a losing
        // concurrent responder sees Conflict here
        let updated = self
            .requests
            .update_if_pending(request_id, decision.as_status(), now_ms())
            .await?;

        let activity_type = match decision {
            ResponseDecision::Accepted => ACTIVITY_CONTRIBUTION_ACCEPTED,
            ResponseDecision::Rejected => ACTIVITY_CONTRIBUTION_REJECTED,
        };
        self.engagement
            .record_activity(ActivityDraft {
                activity_type: activity_type.to_string(),
                description: format!(
                    "{} {} the invitation to contribute to \"{}\"",
                    actor.username,
                    decision.as_str(),
                    idea.title
                ),
                user_id: actor.user_id.clone(),
                idea_id: idea.idea_id.clone(),
                metadata: request_metadata(&updated, &idea, &actor.user_id),
            })
            .await;

        self.engagement
            .notify(NotificationDraft {
                user_id: idea.author_id.clone(),
                notification_type: NOTIF_TYPE_CONTRIBUTION_RESPONSE.to_string(),
                title: format!("Invitation {}", decision.as_str()),
                body: format!(
                    "{} {} your invitation to contribute to \"{}\"",
                    actor.username,
                    decision.as_str(),
                    idea.title
                ),
                metadata: request_metadata(&updated, &idea, &actor.user_id),
            })
            .await;

        Ok(updated)
    }

    /// Withdraws the actor's own pending request on the idea. Idea metadata
    /// is snapshotted before the delete so the activity text survives the
    /// row's removal.
    pub async fn withdraw_request(&self, actor: ActorIdentity, idea_id: &str) -> DomainResult<()> {
        let request = self
            .requests
            .find_pending(idea_id, &actor.user_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        policy::authorize_withdraw(&actor.user_id, &request)?;

        let idea = self.resolve_idea(idea_id).await?;
        let metadata = request_metadata(&request, &idea, &actor.user_id);
        let description = format!(
            "{} withdrew their request to contribute to \"{}\"",
            actor.username, idea.title
        );

        self.requests.delete_if_pending(&request.request_id).await?;

        self.engagement
            .record_activity(ActivityDraft {
                activity_type: ACTIVITY_CONTRIBUTION_WITHDRAWN.to_string(),
                description,
                user_id: actor.user_id.clone(),
                idea_id: idea_id.to_string(),
                metadata,
            })
            .await;

        Ok(())
    }

    pub async fn cancel_invite(&self, actor: ActorIdentity, request_id: &str) -> DomainResult<()> {
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let idea = self.resolve_idea(&request.idea_id).await?;
        policy::authorize_cancel_invite(&actor.user_id, &idea, &request)?;

        let metadata = request_metadata(&request, &idea, &actor.user_id);
        self.requests.delete_if_pending(request_id).await?;

        self.engagement
            .record_activity(ActivityDraft {
                activity_type: ACTIVITY_CONTRIBUTION_INVITATION_CANCELLED.to_string(),
                description: format!(
                    "{} cancelled an invitation to contribute to \"{}\"",
                    actor.username, idea.title
                ),
                user_id: actor.user_id.clone(),
                idea_id: idea.idea_id.clone(),
                metadata: metadata.clone(),
            })
            .await;

        self.engagement
            .notify(NotificationDraft {
                user_id: request.user_id.clone(),
                notification_type: NOTIF_TYPE_INVITATION_CANCELLED.to_string(),
                title: "Invitation cancelled".to_string(),
                body: format!(
                    "{} cancelled the invitation to contribute to \"{}\"",
                    actor.username, idea.title
                ),
                metadata,
            })
            .await;

        Ok(())
    }

    pub async fn list_contributions_for_user(
        &self,
        actor: &ActorIdentity,
    ) -> DomainResult<ContributionBuckets> {
        let requests = self.requests.list_by_user(&actor.user_id).await?;
        let mut buckets = ContributionBuckets::default();
        for request in requests {
            match request.status {
                RequestStatus::Pending => buckets.pending.push(request),
                RequestStatus::Accepted => buckets.accepted.push(request),
                RequestStatus::Rejected => buckets.rejected.push(request),
                RequestStatus::Withdrawn => buckets.withdrawn.push(request),
            }
        }
        Ok(buckets)
    }

    pub async fn list_invites_for_idea(
        &self,
        actor: &ActorIdentity,
        idea_id: &str,
    ) -> DomainResult<Vec<ContributionRequest>> {
        let idea = self.resolve_idea(idea_id).await?;
        policy::authorize_view_idea_requests(&actor.user_id, &idea)?;
        self.requests.list_by_idea(idea_id).await
    }

    /// The sole authorization predicate for contributor-only features.
    /// Recomputed from the store on every call; never cached.
    pub async fn is_contributor(&self, idea_id: &str, user_id: &str) -> DomainResult<bool> {
        let active = self.requests.find_active(idea_id, user_id).await?;
        Ok(active.is_some_and(|request| request.status == RequestStatus::Accepted))
    }

    async fn resolve_idea(&self, idea_id: &str) -> DomainResult<Idea> {
        self.ideas
            .get(idea_id)
            .await?
            .ok_or(DomainError::NotFound)
    }
}

fn request_metadata(request: &ContributionRequest, idea: &Idea, actor_id: &str) -> serde_json::Value {
    json!({
        "request_id": request.request_id,
        "idea_id": idea.idea_id,
        "idea_title": idea.title,
        "idea_author_id": idea.author_id,
        "candidate_id": request.user_id,
        "actor_id": actor_id,
        "initiated_by_owner": request.initiated_by_owner,
        "requested_at": crate::util::format_ms_rfc3339(request.created_at_ms),
    })
}

fn validate_message(message: &str) -> DomainResult<String> {
    let message = message.trim();
    if message.is_empty() {
        return Err(DomainError::Validation("message is required".into()));
    }
    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(DomainError::Validation(format!(
            "message exceeds max length of {MAX_MESSAGE_LENGTH}"
        )));
    }
    Ok(message.to_string())
}

fn validate_invite_skills(skills: Vec<String>) -> DomainResult<Vec<String>> {
    if skills.len() > MAX_INVITE_SKILLS {
        return Err(DomainError::Validation(format!(
            "required_skills exceeds max of {MAX_INVITE_SKILLS}"
        )));
    }
    let mut seen = std::collections::HashSet::new();
    let cleaned: Vec<String> = skills
        .into_iter()
        .filter_map(|raw| {
            let name = raw.trim().to_string();
            if name.is_empty() {
                return None;
            }
            seen.insert(normalize_skill(&name)).then_some(name)
        })
        .collect();
    if cleaned.is_empty() {
        return Err(DomainError::Validation(
            "required_skills must name at least one skill".into(),
        ));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_trimmed_and_bounded() {
        assert_eq!(validate_message("  hello  ").unwrap(), "hello");
        assert!(validate_message("   ").is_err());
        assert!(validate_message(&"x".repeat(1_001)).is_err());
    }

    #[test]
    fn invite_skills_must_be_non_empty_after_cleaning() {
        assert!(validate_invite_skills(vec![]).is_err());
        assert!(validate_invite_skills(vec!["  ".to_string()]).is_err());
        let cleaned =
            validate_invite_skills(vec!["React".to_string(), " react ".to_string()]).unwrap();
        assert_eq!(cleaned, vec!["React"]);
    }

    #[test]
    fn terminal_statuses_are_accepted_and_rejected() {
        assert!(RequestStatus::Accepted.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(!RequestStatus::Pending.is_terminal());
    }

    #[test]
    fn decision_maps_onto_status() {
        assert_eq!(
            ResponseDecision::Accepted.as_status(),
            RequestStatus::Accepted
        );
        assert_eq!(
            ResponseDecision::Rejected.as_status(),
            RequestStatus::Rejected
        );
    }
}
