//! Authorization checks for the contribution workflow. Identity and role
//! violations surface as `Forbidden`; state preconditions (still pending)
//! are enforced by the repository inside the write critical section and
//! surface as `Conflict`.

use crate::collaboration::ContributionRequest;
use crate::error::DomainError;
use crate::ideas::Idea;
use crate::DomainResult;

pub fn authorize_create_request(actor_id: &str, idea: &Idea) -> DomainResult<()> {
    if actor_id == idea.author_id {
        return Err(DomainError::Forbidden(
            "idea authors cannot request to contribute to their own idea".into(),
        ));
    }
    Ok(())
}

pub fn authorize_create_invite(
    actor_id: &str,
    idea: &Idea,
    candidate_id: &str,
) -> DomainResult<()> {
    if actor_id != idea.author_id {
        return Err(DomainError::Forbidden(
            "only the idea author can send invitations".into(),
        ));
    }
    if candidate_id == actor_id {
        return Err(DomainError::Forbidden(
            "idea authors cannot invite themselves".into(),
        ));
    }
    Ok(())
}

pub fn authorize_respond(actor_id: &str, request: &ContributionRequest) -> DomainResult<()> {
    if actor_id != request.user_id {
        return Err(DomainError::Forbidden(
            "only the invited user can respond to an invitation".into(),
        ));
    }
    if !request.initiated_by_owner {
        return Err(DomainError::Forbidden(
            "only owner invitations can be responded to".into(),
        ));
    }
    Ok(())
}

pub fn authorize_withdraw(actor_id: &str, request: &ContributionRequest) -> DomainResult<()> {
    if actor_id != request.user_id {
        return Err(DomainError::Forbidden(
            "only the requester can withdraw a contribution request".into(),
        ));
    }
    if request.initiated_by_owner {
        return Err(DomainError::Forbidden(
            "invitations are cancelled by the idea author, not withdrawn".into(),
        ));
    }
    Ok(())
}

pub fn authorize_cancel_invite(
    actor_id: &str,
    idea: &Idea,
    request: &ContributionRequest,
) -> DomainResult<()> {
    if actor_id != idea.author_id {
        return Err(DomainError::Forbidden(
            "only the idea author can cancel an invitation".into(),
        ));
    }
    if !request.initiated_by_owner {
        return Err(DomainError::Forbidden(
            "candidate-initiated requests can only be withdrawn by the requester".into(),
        ));
    }
    Ok(())
}

pub fn authorize_view_idea_requests(actor_id: &str, idea: &Idea) -> DomainResult<()> {
    if actor_id != idea.author_id {
        return Err(DomainError::Forbidden(
            "only the idea author can view its contribution requests".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaboration::RequestStatus;
    use crate::ideas::IdeaVisibility;

    fn idea(author_id: &str) -> Idea {
        Idea {
            idea_id: "idea-1".to_string(),
            author_id: author_id.to_string(),
            author_username: format!("{author_id}-name"),
            title: "Neighborhood tool library".to_string(),
            summary: None,
            required_skills: vec!["carpentry".to_string()],
            visibility: IdeaVisibility::Public,
            published: true,
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    fn request(user_id: &str, initiated_by_owner: bool) -> ContributionRequest {
        ContributionRequest {
            request_id: "req-1".to_string(),
            idea_id: "idea-1".to_string(),
            user_id: user_id.to_string(),
            message: "count me in".to_string(),
            skills: Vec::new(),
            status: RequestStatus::Pending,
            initiated_by_owner,
            created_at_ms: 0,
            updated_at_ms: 0,
            responded_at_ms: None,
        }
    }

    #[test]
    fn self_requests_are_forbidden() {
        let err = authorize_create_request("owner", &idea("owner")).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert!(authorize_create_request("candidate", &idea("owner")).is_ok());
    }

    #[test]
    fn only_the_author_invites() {
        assert!(authorize_create_invite("owner", &idea("owner"), "candidate").is_ok());
        assert!(matches!(
            authorize_create_invite("intruder", &idea("owner"), "candidate"),
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_create_invite("owner", &idea("owner"), "owner"),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn responding_requires_the_invited_candidate_and_an_invite() {
        assert!(authorize_respond("candidate", &request("candidate", true)).is_ok());
        assert!(matches!(
            authorize_respond("other", &request("candidate", true)),
            Err(DomainError::Forbidden(_))
        ));
        // a candidate-filed request is not an invitation to respond to
        assert!(matches!(
            authorize_respond("candidate", &request("candidate", false)),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn withdrawal_is_for_own_candidate_requests_only() {
        assert!(authorize_withdraw("candidate", &request("candidate", false)).is_ok());
        assert!(matches!(
            authorize_withdraw("other", &request("candidate", false)),
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_withdraw("candidate", &request("candidate", true)),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn cancelling_is_for_the_author_on_invites_only() {
        assert!(authorize_cancel_invite("owner", &idea("owner"), &request("candidate", true)).is_ok());
        assert!(matches!(
            authorize_cancel_invite("candidate", &idea("owner"), &request("candidate", true)),
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_cancel_invite("owner", &idea("owner"), &request("candidate", false)),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn request_listing_is_owner_only() {
        assert!(authorize_view_idea_requests("owner", &idea("owner")).is_ok());
        assert!(matches!(
            authorize_view_idea_requests("candidate", &idea("owner")),
            Err(DomainError::Forbidden(_))
        ));
    }
}
