use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use churchflow_api::config::{config, Environment};
use churchflow_api::database::{MemoryStore, PgStore, Store};
use churchflow_api::services::mailer::LogMailer;
use churchflow_api::services::AccountService;
use churchflow_api::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("churchflow_api=info,tower_http=info")),
        )
        .init();

    let config = config().clone();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting ChurchFlow API in {:?} mode", config.environment);

    let store: Arc<dyn Store> = match &config.database.url {
        Some(_) => {
            let pg = PgStore::connect(&config.database)
                .await
                .context("failed to connect to Postgres")?;
            pg.migrate().await.context("failed to prepare schema")?;
            tracing::info!("Using Postgres store");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    if std::env::var("SENDGRID_API_KEY").is_ok() {
        tracing::warn!("SENDGRID_API_KEY is set but outbound delivery is not performed; emails are logged only");
    }
    let mailer = Arc::new(LogMailer::new(config.environment == Environment::Development));

    let port = config.server.port;
    let bootstrap = config.bootstrap.clone();
    let state = AppState::new(config, store, mailer);

    if let Some(admin) = bootstrap {
        match AccountService::new(&state).bootstrap_admin(&admin).await {
            Ok(true) => tracing::info!("Bootstrap super admin {} created", admin.email),
            Ok(false) => {}
            Err(e) => tracing::error!("Failed to bootstrap super admin {}: {}", admin.email, e),
        }
    }

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("ChurchFlow API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
