use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use diesel::prelude::*;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use outdial::{
    analysis::TranscriptAnalyzer,
    auth::{jwt::JwtService, password},
    config::AppConfig,
    db,
    dialer::BlandDialer,
    models::NewUser,
    notify::LogNotifier,
    prompts::FilePromptStore,
    queue::CampaignQueue,
    schema::users,
    state::AppState,
    workers,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("analyze-backlog") => analyze_backlog().await?,
        Some("create-user") => {
            let username = args.next().context("usage: maintenance create-user <username> <password> [role]")?;
            let pass = args.next().context("usage: maintenance create-user <username> <password> [role]")?;
            let role = args.next().unwrap_or_else(|| "agent".to_string());
            create_user(&username, &pass, &role)?;
        }
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\nUsage: maintenance analyze-backlog | create-user");
            std::process::exit(1);
        }
        None => {
            eprintln!("Usage: maintenance analyze-backlog | create-user <username> <password> [role]");
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn analyze_backlog() -> Result<()> {
    let config = AppConfig::from_env()?;
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let jwt = JwtService::from_config(&config)?;
    let dialer = Arc::new(BlandDialer::from_config(&config)?);
    let analyzer = Arc::new(TranscriptAnalyzer::from_config(&config)?);
    let prompts = Arc::new(FilePromptStore::new(config.prompt_dir.clone()));

    let state = Arc::new(AppState::new(
        pool,
        config,
        Arc::new(CampaignQueue::new()),
        dialer,
        prompts,
        analyzer,
        Arc::new(LogNotifier),
        jwt,
    ));

    let analyzed = workers::analysis::run_backlog_sweep(&state).await?;
    println!("Analyzed {analyzed} call records.");
    Ok(())
}

fn create_user(username: &str, pass: &str, role: &str) -> Result<()> {
    let config = AppConfig::from_env()?;
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let user = NewUser {
        id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: password::hash_password(pass)?,
        role: role.to_string(),
    };
    diesel::insert_into(users::table)
        .values(&user)
        .execute(&mut conn)
        .context("failed to insert user")?;

    println!("Created user {username} ({})", user.id);
    Ok(())
}
