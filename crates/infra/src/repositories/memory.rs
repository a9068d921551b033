//! In-memory record store adapter. The uniqueness and status preconditions
//! the workflow relies on are enforced inside each write lock, so concurrent
//! callers serialize through the same critical section a database constraint
//! would provide.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use urun_domain::collaboration::{ContributionRequest, RequestStatus};
use urun_domain::engagement::{Activity, EngagementEvent, Notification, OutboxStatus};
use urun_domain::error::DomainError;
use urun_domain::ideas::{Idea, IdeaVisibility};
use urun_domain::ports::collaboration::ContributionRequestRepository;
use urun_domain::ports::engagement::{
    ActivityRepository, EngagementOutboxRepository, NotificationRepository, OutboxUpdate,
};
use urun_domain::ports::ideas::IdeaRepository;
use urun_domain::ports::users::UserDirectory;
use urun_domain::ports::BoxFuture;
use urun_domain::users::{normalize_skill, User};
use urun_domain::DomainResult;

#[derive(Clone, Default)]
pub struct InMemoryContributionRequestRepository {
    store: Arc<RwLock<HashMap<String, ContributionRequest>>>,
}

impl ContributionRequestRepository for InMemoryContributionRequestRepository {
    fn create(
        &self,
        request: &ContributionRequest,
    ) -> BoxFuture<'_, DomainResult<ContributionRequest>> {
        let request = request.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            if store.contains_key(&request.request_id) {
                return Err(DomainError::Conflict);
            }
            // pending uniqueness for (idea_id, user_id): the check and the
            // insert share this write guard
            let duplicate = store.values().any(|existing| {
                existing.idea_id == request.idea_id
                    && existing.user_id == request.user_id
                    && existing.status == RequestStatus::Pending
            });
            if duplicate {
                return Err(DomainError::DuplicateRequest);
            }
            store.insert(request.request_id.clone(), request.clone());
            Ok(request)
        })
    }

    fn get(&self, request_id: &str) -> BoxFuture<'_, DomainResult<Option<ContributionRequest>>> {
        let request_id = request_id.to_string();
        let store = self.store.clone();
        Box::pin(async move { Ok(store.read().await.get(&request_id).cloned()) })
    }

    fn update_if_pending(
        &self,
        request_id: &str,
        status: RequestStatus,
        responded_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<ContributionRequest>> {
        let request_id = request_id.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            let request = store.get_mut(&request_id).ok_or(DomainError::NotFound)?;
            if request.status != RequestStatus::Pending {
                return Err(DomainError::Conflict);
            }
            request.status = status;
            request.responded_at_ms = Some(responded_at_ms);
            request.updated_at_ms = responded_at_ms;
            Ok(request.clone())
        })
    }

    fn delete_if_pending(
        &self,
        request_id: &str,
    ) -> BoxFuture<'_, DomainResult<ContributionRequest>> {
        let request_id = request_id.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            let request = store.remove(&request_id).ok_or(DomainError::NotFound)?;
            if request.status != RequestStatus::Pending {
                store.insert(request_id, request);
                return Err(DomainError::Conflict);
            }
            Ok(request)
        })
    }

    fn find_pending(
        &self,
        idea_id: &str,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<ContributionRequest>>> {
        self.find_with(idea_id, user_id, &[RequestStatus::Pending])
    }

    fn find_active(
        &self,
        idea_id: &str,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<ContributionRequest>>> {
        self.find_with(
            idea_id,
            user_id,
            &[RequestStatus::Pending, RequestStatus::Accepted],
        )
    }

    fn list_by_user(
        &self,
        user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<ContributionRequest>>> {
        let user_id = user_id.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            let store = store.read().await;
            let mut requests: Vec<_> = store
                .values()
                .filter(|request| request.user_id == user_id)
                .cloned()
                .collect();
            sort_requests(&mut requests);
            Ok(requests)
        })
    }

    fn list_by_idea(
        &self,
        idea_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<ContributionRequest>>> {
        let idea_id = idea_id.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            let store = store.read().await;
            let mut requests: Vec<_> = store
                .values()
                .filter(|request| request.idea_id == idea_id)
                .cloned()
                .collect();
            sort_requests(&mut requests);
            Ok(requests)
        })
    }
}

impl InMemoryContributionRequestRepository {
    fn find_with(
        &self,
        idea_id: &str,
        user_id: &str,
        statuses: &[RequestStatus],
    ) -> BoxFuture<'_, DomainResult<Option<ContributionRequest>>> {
        let idea_id = idea_id.to_string();
        let user_id = user_id.to_string();
        let statuses = statuses.to_vec();
        let store = self.store.clone();
        Box::pin(async move {
            Ok(store
                .read()
                .await
                .values()
                .find(|request| {
                    request.idea_id == idea_id
                        && request.user_id == user_id
                        && statuses.contains(&request.status)
                })
                .cloned())
        })
    }
}

fn sort_requests(requests: &mut [ContributionRequest]) {
    requests.sort_by(|left, right| {
        left.created_at_ms
            .cmp(&right.created_at_ms)
            .then_with(|| left.request_id.cmp(&right.request_id))
    });
}

#[derive(Clone, Default)]
pub struct InMemoryIdeaRepository {
    store: Arc<RwLock<HashMap<String, Idea>>>,
}

impl IdeaRepository for InMemoryIdeaRepository {
    fn create(&self, idea: &Idea) -> BoxFuture<'_, DomainResult<Idea>> {
        let idea = idea.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            if store.contains_key(&idea.idea_id) {
                return Err(DomainError::Conflict);
            }
            store.insert(idea.idea_id.clone(), idea.clone());
            Ok(idea)
        })
    }

    fn get(&self, idea_id: &str) -> BoxFuture<'_, DomainResult<Option<Idea>>> {
        let idea_id = idea_id.to_string();
        let store = self.store.clone();
        Box::pin(async move { Ok(store.read().await.get(&idea_id).cloned()) })
    }

    fn list_published_public(&self) -> BoxFuture<'_, DomainResult<Vec<Idea>>> {
        let store = self.store.clone();
        Box::pin(async move {
            let store = store.read().await;
            let mut ideas: Vec<_> = store
                .values()
                .filter(|idea| idea.published && idea.visibility == IdeaVisibility::Public)
                .cloned()
                .collect();
            ideas.sort_by(|left, right| {
                left.created_at_ms
                    .cmp(&right.created_at_ms)
                    .then_with(|| left.idea_id.cmp(&right.idea_id))
            });
            Ok(ideas)
        })
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    store: Arc<RwLock<HashMap<String, User>>>,
}

impl UserDirectory for InMemoryUserDirectory {
    fn upsert(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            let mut stored = user.clone();
            if let Some(existing) = store.get(&user.user_id) {
                stored.created_at_ms = existing.created_at_ms;
            }
            store.insert(stored.user_id.clone(), stored.clone());
            Ok(stored)
        })
    }

    fn get(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let user_id = user_id.to_string();
        let store = self.store.clone();
        Box::pin(async move { Ok(store.read().await.get(&user_id).cloned()) })
    }

    fn list_with_any_skill(&self, skills: &[String]) -> BoxFuture<'_, DomainResult<Vec<User>>> {
        let wanted: Vec<String> = skills.iter().map(|s| normalize_skill(s)).collect();
        let store = self.store.clone();
        Box::pin(async move {
            let store = store.read().await;
            let mut users: Vec<_> = store
                .values()
                .filter(|user| {
                    user.skills
                        .iter()
                        .any(|entry| wanted.contains(&normalize_skill(&entry.skill)))
                })
                .cloned()
                .collect();
            users.sort_by(|left, right| {
                left.created_at_ms
                    .cmp(&right.created_at_ms)
                    .then_with(|| left.user_id.cmp(&right.user_id))
            });
            Ok(users)
        })
    }
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationRepository {
    store: Arc<RwLock<Vec<Notification>>>,
}

impl NotificationRepository for InMemoryNotificationRepository {
    fn append(&self, notification: &Notification) -> BoxFuture<'_, DomainResult<Notification>> {
        let notification = notification.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            if !store
                .iter()
                .any(|existing| existing.notification_id == notification.notification_id)
            {
                store.push(notification.clone());
            }
            Ok(notification)
        })
    }

    fn list_for_user(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Notification>>> {
        let user_id = user_id.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            Ok(store
                .read()
                .await
                .iter()
                .filter(|notification| notification.user_id == user_id)
                .cloned()
                .collect())
        })
    }
}

#[derive(Clone, Default)]
pub struct InMemoryActivityRepository {
    store: Arc<RwLock<Vec<Activity>>>,
}

impl ActivityRepository for InMemoryActivityRepository {
    fn append(&self, activity: &Activity) -> BoxFuture<'_, DomainResult<Activity>> {
        let activity = activity.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            if !store
                .iter()
                .any(|existing| existing.activity_id == activity.activity_id)
            {
                store.push(activity.clone());
            }
            Ok(activity)
        })
    }

    fn list_for_idea(&self, idea_id: &str) -> BoxFuture<'_, DomainResult<Vec<Activity>>> {
        let idea_id = idea_id.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            Ok(store
                .read()
                .await
                .iter()
                .filter(|activity| activity.idea_id == idea_id)
                .cloned()
                .collect())
        })
    }

    fn list_for_user(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Activity>>> {
        let user_id = user_id.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            Ok(store
                .read()
                .await
                .iter()
                .filter(|activity| activity.user_id == user_id)
                .cloned()
                .collect())
        })
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEngagementOutboxRepository {
    store: Arc<RwLock<HashMap<String, EngagementEvent>>>,
}

impl EngagementOutboxRepository for InMemoryEngagementOutboxRepository {
    fn enqueue(&self, event: &EngagementEvent) -> BoxFuture<'_, DomainResult<EngagementEvent>> {
        let event = event.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            if store.contains_key(&event.event_id) {
                return Err(DomainError::Conflict);
            }
            store.insert(event.event_id.clone(), event.clone());
            Ok(event)
        })
    }

    fn get(&self, event_id: &str) -> BoxFuture<'_, DomainResult<Option<EngagementEvent>>> {
        let event_id = event_id.to_string();
        let store = self.store.clone();
        Box::pin(async move { Ok(store.read().await.get(&event_id).cloned()) })
    }

    fn list_due(
        &self,
        now_ms: i64,
        limit: usize,
    ) -> BoxFuture<'_, DomainResult<Vec<EngagementEvent>>> {
        let store = self.store.clone();
        Box::pin(async move {
            let store = store.read().await;
            let mut due: Vec<_> = store
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
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            let event = store.get_mut(&event_id).ok_or(DomainError::NotFound)?;
            event.status = update.status;
            event.attempts = update.attempts;
            event.next_attempt_at_ms = update.next_attempt_at_ms;
            event.last_error = update.last_error;
            event.updated_at_ms = urun_domain::util::now_ms();
            Ok(event.clone())
        })
    }
}
