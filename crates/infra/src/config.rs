use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub port: u16,
    pub log_level: String,
    pub data_backend: String,
    pub jwt_secret: String,
    /// The observed product sends the idea owner no notification when a
    /// candidate files a request (activity only). Flip this to change that
    /// policy without touching the workflow engine.
    pub notify_owner_on_request: bool,
    pub outbox_max_attempts: u32,
    pub outbox_backoff_base_ms: u64,
    pub outbox_backoff_max_ms: u64,
    pub outbox_poll_interval_ms: u64,
    pub outbox_dispatch_batch: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("port", 3000)?
            .set_default("log_level", "info")?
            .set_default("data_backend", "memory")?
            .set_default("jwt_secret", "dev-secret")?
            .set_default("notify_owner_on_request", false)?
            .set_default("outbox_max_attempts", 5)?
            .set_default("outbox_backoff_base_ms", 1000)?
            .set_default("outbox_backoff_max_ms", 60000)?
            .set_default("outbox_poll_interval_ms", 1000)?
            .set_default("outbox_dispatch_batch", 50)?
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}
