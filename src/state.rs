use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    analysis::TranscriptAnalyzer,
    auth::jwt::JwtService,
    config::AppConfig,
    db::PgPool,
    dialer::Dialer,
    error::{AppError, AppResult},
    notify::Notifier,
    prompts::PromptStore,
    queue::CampaignQueue,
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub queue: Arc<CampaignQueue>,
    pub dialer: Arc<dyn Dialer>,
    pub prompts: Arc<dyn PromptStore>,
    pub analyzer: Arc<TranscriptAnalyzer>,
    pub notifier: Arc<dyn Notifier>,
    pub jwt: JwtService,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        queue: Arc<CampaignQueue>,
        dialer: Arc<dyn Dialer>,
        prompts: Arc<dyn PromptStore>,
        analyzer: Arc<TranscriptAnalyzer>,
        notifier: Arc<dyn Notifier>,
        jwt: JwtService,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            queue,
            dialer,
            prompts,
            analyzer,
            notifier,
            jwt,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}
