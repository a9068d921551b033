use crate::engagement::{Activity, EngagementEvent, Notification, OutboxStatus};
use crate::ports::BoxFuture;
use crate::DomainResult;

pub trait NotificationRepository: Send + Sync {
    /// Append-only. Re-appending an existing `notification_id` is a no-op
    /// returning the stored row, so redelivery after a dispatcher crash is
    /// harmless.
    fn append(&self, notification: &Notification) -> BoxFuture<'_, DomainResult<Notification>>;

    fn list_for_user(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Notification>>>;
}

pub trait ActivityRepository: Send + Sync {
    /// Append-only, same redelivery semantics as notifications.
    fn append(&self, activity: &Activity) -> BoxFuture<'_, DomainResult<Activity>>;

    fn list_for_idea(&self, idea_id: &str) -> BoxFuture<'_, DomainResult<Vec<Activity>>>;

    fn list_for_user(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Activity>>>;
}

#[derive(Clone, Debug)]
pub struct OutboxUpdate {
    pub status: OutboxStatus,
    pub attempts: u32,
    pub next_attempt_at_ms: Option<i64>,
    pub last_error: Option<String>,
}

pub trait EngagementOutboxRepository: Send + Sync {
    fn enqueue(&self, event: &EngagementEvent) -> BoxFuture<'_, DomainResult<EngagementEvent>>;

    fn get(&self, event_id: &str) -> BoxFuture<'_, DomainResult<Option<EngagementEvent>>>;

    /// Pending or retrying events whose `next_attempt_at_ms` has passed,
    /// oldest first, capped at `limit`.
    fn list_due(
        &self,
        now_ms: i64,
        limit: usize,
    ) -> BoxFuture<'_, DomainResult<Vec<EngagementEvent>>>;

    fn mark(
        &self,
        event_id: &str,
        update: &OutboxUpdate,
    ) -> BoxFuture<'_, DomainResult<EngagementEvent>>;
}
