use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ports::engagement::{
    ActivityRepository, EngagementOutboxRepository, NotificationRepository, OutboxUpdate,
};
use crate::util::{now_ms, uuid_v7_without_dashes};
use crate::DomainResult;

pub const NOTIF_TYPE_CONTRIBUTION_REQUEST: &str = "contribution_request";
pub const NOTIF_TYPE_CONTRIBUTION_RESPONSE: &str = "contribution_response";
pub const NOTIF_TYPE_INVITATION_CANCELLED: &str = "contribution_invitation_cancelled";

pub const ACTIVITY_CONTRIBUTION_REQUESTED: &str = "contribution_requested";
pub const ACTIVITY_CONTRIBUTION_INVITED: &str = "contribution_invited";
pub const ACTIVITY_CONTRIBUTION_ACCEPTED: &str = "contribution_accepted";
pub const ACTIVITY_CONTRIBUTION_REJECTED: &str = "contribution_rejected";
pub const ACTIVITY_CONTRIBUTION_WITHDRAWN: &str = "contribution_withdrawn";
pub const ACTIVITY_CONTRIBUTION_INVITATION_CANCELLED: &str = "contribution_invitation_cancelled";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub notification_id: String,
    pub user_id: String,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub metadata: serde_json::Value,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    pub activity_id: String,
    pub activity_type: String,
    pub description: String,
    pub user_id: String,
    pub idea_id: String,
    pub metadata: serde_json::Value,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct NotificationDraft {
    pub user_id: String,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub metadata: serde_json::Value,
}

#[derive(Clone, Debug)]
pub struct ActivityDraft {
    pub activity_type: String,
    pub description: String,
    pub user_id: String,
    pub idea_id: String,
    pub metadata: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "record")]
pub enum EngagementPayload {
    Notification(Notification),
    Activity(Activity),
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    InFlight,
    Delivered,
    Retrying,
    DeadLetter,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Delivered => "delivered",
            Self::Retrying => "retrying",
            Self::DeadLetter => "dead_letter",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::DeadLetter)
    }
}

impl FromStr for OutboxStatus {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "in_flight" => Ok(Self::InFlight),
            "delivered" => Ok(Self::Delivered),
            "retrying" => Ok(Self::Retrying),
            "dead_letter" => Ok(Self::DeadLetter),
            _ => Err("unknown outbox status"),
        }
    }
}

/// A workflow side effect awaiting delivery. The row is written after the
/// core mutation commits; delivery happens out of band via `dispatch_due`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EngagementEvent {
    pub event_id: String,
    pub payload: EngagementPayload,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub next_attempt_at_ms: Option<i64>,
    pub last_error: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct OutboxConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base_ms: 1_000,
            backoff_max_ms: 60_000,
        }
    }
}

pub fn backoff_ms(base_ms: u64, attempt: u32, max_ms: u64) -> u64 {
    if attempt == 0 {
        return 0;
    }
    let pow = 2u64.saturating_pow(attempt.saturating_sub(1));
    let delay = base_ms.saturating_mul(pow);
    delay.min(max_ms)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub retried: usize,
    pub dead_lettered: usize,
}

impl DispatchOutcome {
    pub fn handled(&self) -> usize {
        self.delivered + self.retried + self.dead_lettered
    }
}

#[derive(Clone)]
pub struct EngagementService {
    outbox: Arc<dyn EngagementOutboxRepository>,
    notifications: Arc<dyn NotificationRepository>,
    activities: Arc<dyn ActivityRepository>,
    config: OutboxConfig,
}

impl EngagementService {
    pub fn new(
        outbox: Arc<dyn EngagementOutboxRepository>,
        notifications: Arc<dyn NotificationRepository>,
        activities: Arc<dyn ActivityRepository>,
        config: OutboxConfig,
    ) -> Self {
        Self {
            outbox,
            notifications,
            activities,
            config,
        }
    }

    /// Enqueues one notification. Callers invoke this exactly once per
    /// intended message; there is no dedupe key. A failed enqueue is logged
    /// and swallowed: the workflow transition has already committed and is
    /// never rolled back for a side-effect failure.
    pub async fn notify(&self, draft: NotificationDraft) {
        let notification = Notification {
            notification_id: uuid_v7_without_dashes(),
            user_id: draft.user_id,
            notification_type: draft.notification_type,
            title: draft.title,
            body: draft.body,
            metadata: draft.metadata,
            created_at_ms: now_ms(),
        };
        self.enqueue(EngagementPayload::Notification(notification))
            .await;
    }

    /// Enqueues one activity record. Same once-per-transition contract and
    /// best-effort posture as `notify`.
    pub async fn record_activity(&self, draft: ActivityDraft) {
        let activity = Activity {
            activity_id: uuid_v7_without_dashes(),
            activity_type: draft.activity_type,
            description: draft.description,
            user_id: draft.user_id,
            idea_id: draft.idea_id,
            metadata: draft.metadata,
            created_at_ms: now_ms(),
        };
        self.enqueue(EngagementPayload::Activity(activity)).await;
    }

    async fn enqueue(&self, payload: EngagementPayload) {
        let now = now_ms();
        let event = EngagementEvent {
            event_id: uuid_v7_without_dashes(),
            payload,
            status: OutboxStatus::Pending,
            attempts: 0,
            max_attempts: self.config.max_attempts,
            next_attempt_at_ms: Some(now),
            last_error: None,
            created_at_ms: now,
            updated_at_ms: now,
        };
        if let Err(err) = self.outbox.enqueue(&event).await {
            tracing::error!(
                error = %err,
                event_id = %event.event_id,
                "engagement enqueue failed; event dropped"
            );
        }
    }

    /// Delivers due outbox events to the notification/activity stores.
    /// Failures schedule a retry with exponential backoff until
    /// `max_attempts`, then park the event as dead-lettered.
    pub async fn dispatch_due(&self, now_ms: i64, batch: usize) -> DomainResult<DispatchOutcome> {
        let due = self.outbox.list_due(now_ms, batch).await?;
        let mut outcome = DispatchOutcome::default();

        for event in due {
            let attempts = event.attempts + 1;
            self.outbox
                .mark(
                    &event.event_id,
                    &OutboxUpdate {
                        status: OutboxStatus::InFlight,
                        attempts,
                        next_attempt_at_ms: None,
                        last_error: None,
                    },
                )
                .await?;

            let delivery = match &event.payload {
                EngagementPayload::Notification(notification) => self
                    .notifications
                    .append(notification)
                    .await
                    .map(|_| ()),
                EngagementPayload::Activity(activity) => {
                    self.activities.append(activity).await.map(|_| ())
                }
            };

            match delivery {
                Ok(()) => {
                    self.outbox
                        .mark(
                            &event.event_id,
                            &OutboxUpdate {
                                status: OutboxStatus::Delivered,
                                attempts,
                                next_attempt_at_ms: None,
                                last_error: None,
                            },
                        )
                        .await?;
                    outcome.delivered += 1;
                }
                Err(err) if attempts >= event.max_attempts => {
                    tracing::error!(
                        error = %err,
                        event_id = %event.event_id,
                        attempts,
                        "engagement delivery exhausted; dead-lettering"
                    );
                    self.outbox
                        .mark(
                            &event.event_id,
                            &OutboxUpdate {
                                status: OutboxStatus::DeadLetter,
                                attempts,
                                next_attempt_at_ms: None,
                                last_error: Some(err.to_string()),
                            },
                        )
                        .await?;
                    outcome.dead_lettered += 1;
                }
                Err(err) => {
                    let delay =
                        backoff_ms(self.config.backoff_base_ms, attempts, self.config.backoff_max_ms);
                    tracing::warn!(
                        error = %err,
                        event_id = %event.event_id,
                        attempts,
                        retry_in_ms = delay,
                        "engagement delivery failed; scheduling retry"
                    );
                    self.outbox
                        .mark(
                            &event.event_id,
                            &OutboxUpdate {
                                status: OutboxStatus::Retrying,
                                attempts,
                                next_attempt_at_ms: Some(now_ms + delay as i64),
                                last_error: Some(err.to_string()),
                            },
                        )
                        .await?;
                    outcome.retried += 1;
                }
            }
        }

        Ok(outcome)
    }

    pub async fn list_notifications_for_user(
        &self,
        user_id: &str,
    ) -> DomainResult<Vec<Notification>> {
        self.notifications.list_for_user(user_id).await
    }

    pub async fn list_activities_for_idea(&self, idea_id: &str) -> DomainResult<Vec<Activity>> {
        self.activities.list_for_idea(idea_id).await
    }

    pub async fn list_activities_for_user(&self, user_id: &str) -> DomainResult<Vec<Activity>> {
        self.activities.list_for_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::sync::RwLock;

    use super::*;
    use crate::error::DomainError;
    use crate::ports::BoxFuture;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_ms(1_000, 0, 60_000), 0);
        assert_eq!(backoff_ms(1_000, 1, 60_000), 1_000);
        assert_eq!(backoff_ms(1_000, 2, 60_000), 2_000);
        assert_eq!(backoff_ms(1_000, 4, 60_000), 8_000);
        assert_eq!(backoff_ms(1_000, 10, 60_000), 60_000);
    }

    #[test]
    fn outbox_status_roundtrips() {
        for status in [
            OutboxStatus::Pending,
            OutboxStatus::InFlight,
            OutboxStatus::Delivered,
            OutboxStatus::Retrying,
            OutboxStatus::DeadLetter,
        ] {
            assert_eq!(status.as_str().parse::<OutboxStatus>(), Ok(status));
        }
        assert!("gone".parse::<OutboxStatus>().is_err());
    }

    #[derive(Default)]
    struct MockOutbox {
        events: RwLock<HashMap<String, EngagementEvent>>,
    }

    impl EngagementOutboxRepository for MockOutbox {
        fn enqueue(
            &self,
            event: &EngagementEvent,
        ) -> BoxFuture<'_, DomainResult<EngagementEvent>> {
            let event = event.clone();
            Box::pin(async move {
                self.events
                    .write()
                    .await
                    .insert(event.event_id.clone(), event.clone());
                Ok(event)
            })
        }

        fn get(&self, event_id: &str) -> BoxFuture<'_, DomainResult<Option<EngagementEvent>>> {
            let event_id = event_id.to_string();
            Box::pin(async move { Ok(self.events.read().await.get(&event_id).cloned()) })
        }

        fn list_due(
            &self,
            now_ms: i64,
            limit: usize,
        ) -> BoxFuture<'_, DomainResult<Vec<EngagementEvent>>> {
            Box::pin(async move {
                let events = self.events.read().await;
                let mut due: Vec<_> = events
                    .values()
                    .filter(|event| {
                        matches!(event.status, OutboxStatus::Pending | OutboxStatus::Retrying)
                            && event.next_attempt_at_ms.is_some_and(|at| at <= now_ms)
                    })
                    .cloned()
                    .collect();
                due.sort_by(|left, right| {
                    left.next_attempt_at_ms
                        .cmp(&right.next_attempt_at_ms)
                        .then_with(|| left.event_id.cmp(&right.event_id))
                });
                due.truncate(limit);
                Ok(due)
            })
        }

        fn mark(
            &self,
            event_id: &str,
            update: &OutboxUpdate,
        ) -> BoxFuture<'_, DomainResult<EngagementEvent>> {
            let event_id = event_id.to_string();
            let update = update.clone();
            Box::pin(async move {
                let mut events = self.events.write().await;
                let event = events.get_mut(&event_id).ok_or(DomainError::NotFound)?;
                event.status = update.status;
                event.attempts = update.attempts;
                event.next_attempt_at_ms = update.next_attempt_at_ms;
                event.last_error = update.last_error;
                Ok(event.clone())
            })
        }
    }

    /// Notification sink that fails the first `failures` appends.
    #[derive(Default)]
    struct FlakyNotificationSink {
        delivered: RwLock<Vec<Notification>>,
        failures: AtomicU32,
    }

    impl NotificationRepository for FlakyNotificationSink {
        fn append(
            &self,
            notification: &Notification,
        ) -> BoxFuture<'_, DomainResult<Notification>> {
            let notification = notification.clone();
            Box::pin(async move {
                if self.failures.load(Ordering::SeqCst) > 0 {
                    self.failures.fetch_sub(1, Ordering::SeqCst);
                    return Err(DomainError::Dependency("sink unavailable".into()));
                }
                self.delivered.write().await.push(notification.clone());
                Ok(notification)
            })
        }

        fn list_for_user(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Notification>>> {
            let user_id = user_id.to_string();
            Box::pin(async move {
                Ok(self
                    .delivered
                    .read()
                    .await
                    .iter()
                    .filter(|n| n.user_id == user_id)
                    .cloned()
                    .collect())
            })
        }
    }

    #[derive(Default)]
    struct NullActivitySink;

    impl ActivityRepository for NullActivitySink {
        fn append(&self, activity: &Activity) -> BoxFuture<'_, DomainResult<Activity>> {
            let activity = activity.clone();
            Box::pin(async move { Ok(activity) })
        }

        fn list_for_idea(&self, _idea_id: &str) -> BoxFuture<'_, DomainResult<Vec<Activity>>> {
            Box::pin(async move { Ok(Vec::new()) })
        }

        fn list_for_user(&self, _user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Activity>>> {
            Box::pin(async move { Ok(Vec::new()) })
        }
    }

    fn service_with(
        failures: u32,
        max_attempts: u32,
    ) -> (EngagementService, Arc<MockOutbox>, Arc<FlakyNotificationSink>) {
        let outbox = Arc::new(MockOutbox::default());
        let sink = Arc::new(FlakyNotificationSink::default());
        sink.failures.store(failures, Ordering::SeqCst);
        let service = EngagementService::new(
            outbox.clone(),
            sink.clone(),
            Arc::new(NullActivitySink),
            OutboxConfig {
                max_attempts,
                backoff_base_ms: 100,
                backoff_max_ms: 1_000,
            },
        );
        (service, outbox, sink)
    }

    fn draft_for(user_id: &str) -> NotificationDraft {
        NotificationDraft {
            user_id: user_id.to_string(),
            notification_type: NOTIF_TYPE_CONTRIBUTION_REQUEST.to_string(),
            title: "Invitation to contribute".to_string(),
            body: "you have been invited".to_string(),
            metadata: serde_json::json!({"idea_id": "idea-1"}),
        }
    }

    #[tokio::test]
    async fn delivery_retries_then_succeeds() {
        let (service, outbox, sink) = service_with(1, 5);
        service.notify(draft_for("user-1")).await;

        let first = service.dispatch_due(now_ms(), 10).await.expect("dispatch");
        assert_eq!(first.retried, 1);
        assert_eq!(first.delivered, 0);

        // past the backoff window
        let later = now_ms() + 10_000;
        let second = service.dispatch_due(later, 10).await.expect("dispatch");
        assert_eq!(second.delivered, 1);

        let delivered = sink.list_for_user("user-1").await.expect("list");
        assert_eq!(delivered.len(), 1);

        let events = outbox.events.read().await;
        assert!(events
            .values()
            .all(|event| event.status == OutboxStatus::Delivered));
    }

    #[tokio::test]
    async fn delivery_dead_letters_after_max_attempts() {
        let (service, outbox, _sink) = service_with(10, 2);
        service.notify(draft_for("user-2")).await;

        let mut at = now_ms();
        for _ in 0..2 {
            service.dispatch_due(at, 10).await.expect("dispatch");
            at += 60_000;
        }

        let events = outbox.events.read().await;
        let event = events.values().next().expect("event");
        assert_eq!(event.status, OutboxStatus::DeadLetter);
        assert_eq!(event.attempts, 2);
        assert!(event.last_error.is_some());
    }

    #[tokio::test]
    async fn dispatch_is_a_no_op_when_nothing_is_due() {
        let (service, _outbox, _sink) = service_with(0, 5);
        let outcome = service.dispatch_due(now_ms(), 10).await.expect("dispatch");
        assert_eq!(outcome.handled(), 0);
    }
}
