use std::sync::Arc;

use urun_domain::collaboration::{CollaborationPolicy, CollaborationService};
use urun_domain::engagement::{EngagementService, OutboxConfig};
use urun_domain::ideas::IdeaService;
use urun_domain::matching::MatchingService;
use urun_domain::users::ProfileService;
use urun_infra::config::AppConfig;
use urun_infra::repositories::{
    InMemoryActivityRepository, InMemoryContributionRequestRepository,
    InMemoryEngagementOutboxRepository, InMemoryIdeaRepository, InMemoryNotificationRepository,
    InMemoryUserDirectory,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub ideas: IdeaService,
    pub profiles: ProfileService,
    pub collaboration: CollaborationService,
    pub matching: MatchingService,
    pub engagement: EngagementService,
}

impl AppState {
    /// Wires every service over the in-memory record store. The storage
    /// engine itself is an external collaborator; `data_backend` in config is
    /// the seam where a persistent adapter would plug in.
    pub fn new(config: AppConfig) -> Self {
        let requests = Arc::new(InMemoryContributionRequestRepository::default());
        let ideas = Arc::new(InMemoryIdeaRepository::default());
        let users = Arc::new(InMemoryUserDirectory::default());
        let notifications = Arc::new(InMemoryNotificationRepository::default());
        let activities = Arc::new(InMemoryActivityRepository::default());
        let outbox = Arc::new(InMemoryEngagementOutboxRepository::default());

        let engagement = EngagementService::new(
            outbox,
            notifications,
            activities,
            OutboxConfig {
                max_attempts: config.outbox_max_attempts,
                backoff_base_ms: config.outbox_backoff_base_ms,
                backoff_max_ms: config.outbox_backoff_max_ms,
            },
        );
        let collaboration = CollaborationService::new(
            requests.clone(),
            ideas.clone(),
            users.clone(),
            engagement.clone(),
            CollaborationPolicy {
                notify_owner_on_request: config.notify_owner_on_request,
            },
        );
        let matching = MatchingService::new(users.clone(), ideas.clone(), requests);

        Self {
            config,
            ideas: IdeaService::new(ideas),
            profiles: ProfileService::new(users),
            collaboration,
            matching,
            engagement,
        }
    }
}
