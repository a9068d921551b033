use crate::collaboration::{ContributionRequest, RequestStatus};
use crate::ports::BoxFuture;
use crate::DomainResult;

pub trait ContributionRequestRepository: Send + Sync {
    /// Inserts a new request. Fails with `DomainError::DuplicateRequest` when
    /// a pending request already exists for the same `(idea_id, user_id)`
    /// pair; the existence check and the insert share one critical section so
    /// concurrent creations cannot both pass.
    fn create(
        &self,
        request: &ContributionRequest,
    ) -> BoxFuture<'_, DomainResult<ContributionRequest>>;

    fn get(&self, request_id: &str) -> BoxFuture<'_, DomainResult<Option<ContributionRequest>>>;

    /// Applies a terminal decision iff the request is still pending.
    /// `DomainError::Conflict` when the precondition fails.
    fn update_if_pending(
        &self,
        request_id: &str,
        status: RequestStatus,
        responded_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<ContributionRequest>>;

    /// Removes a request iff still pending and returns the removed row.
    /// `DomainError::Conflict` when the request has already been resolved.
    fn delete_if_pending(
        &self,
        request_id: &str,
    ) -> BoxFuture<'_, DomainResult<ContributionRequest>>;

    fn find_pending(
        &self,
        idea_id: &str,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<ContributionRequest>>>;

    /// The pending or accepted request for the pair, if one exists. These are
    /// the two states that block a new request or invite.
    fn find_active(
        &self,
        idea_id: &str,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<ContributionRequest>>>;

    fn list_by_user(
        &self,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<ContributionRequest>>>;

    fn list_by_idea(
        &self,
        idea_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<ContributionRequest>>>;
}
