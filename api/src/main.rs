use std::sync::Arc;

use antisoup_api::{config::Config, db, generate::GeminiGenerator, router, AppState};
use antisoup_shared::EmailProvider;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "antisoup_api=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    let config = Config::from_env();

    let manager = r2d2_sqlite::SqliteConnectionManager::file(&config.database_url);
    let pool = r2d2::Pool::new(manager)?;
    db::run_migrations(&pool, &config.super_admin_email)?;
    info!(database = %config.database_url, "database ready");

    let stored = db::load_config(&*pool.get()?)?;
    if stored.email_provider == EmailProvider::None {
        warn!("no mail provider configured: login links are returned in responses and staff accounts cannot sign in");
    }

    let http = reqwest::Client::builder()
        .user_agent("antisoup-api")
        .build()?;
    let generator = Arc::new(GeminiGenerator::new(http.clone(), config.gemini.clone()));

    let addr = config.bind_addr.clone();
    let state = AppState::new(pool, config, http, generator);
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
