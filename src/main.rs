use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use outdial::{
    analysis::TranscriptAnalyzer,
    auth::jwt::JwtService,
    config::AppConfig,
    db,
    dialer::BlandDialer,
    notify::LogNotifier,
    prompts::FilePromptStore,
    queue::CampaignQueue,
    routes,
    state::AppState,
    workers::{self, DialerPool},
};

const ANALYSIS_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        dial_concurrency = config.dial_concurrency,
        llm_enabled = config.llm_api_url.is_some(),
        "loaded configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    {
        let mut conn = pool.get()?;
        db::run_migrations(&mut conn)?;
    }

    let queue = Arc::new(CampaignQueue::new());
    let dialer = Arc::new(BlandDialer::from_config(&config)?);
    let prompts = Arc::new(FilePromptStore::new(config.prompt_dir.clone()));
    let analyzer = Arc::new(TranscriptAnalyzer::from_config(&config)?);
    let jwt = JwtService::from_config(&config)?;

    let state = AppState::new(
        pool,
        config,
        queue,
        dialer,
        prompts,
        analyzer,
        Arc::new(LogNotifier),
        jwt,
    );

    let shared = Arc::new(state.clone());
    let pool_workers = DialerPool::spawn(shared.clone(), state.config.dial_concurrency);
    let sweeper = tokio::spawn(workers::analysis::run_periodic(
        shared,
        ANALYSIS_SWEEP_INTERVAL,
    ));

    let addr = format!("{}:{}", state.config.server_host, state.config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    let router = routes::create_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    sweeper.abort();
    pool_workers.shutdown().await;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
