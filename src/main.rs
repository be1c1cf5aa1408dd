use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use surveyor::config::{Config, StoreKind};
use surveyor::store::{postgres, MemoryStore, PgStore, SubmissionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!("Starting survey service");

    let store: Arc<dyn SubmissionStore> = match config.store {
        StoreKind::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL is validated by Config");
            let pool = postgres::connect(database_url, config.pg_ssl, config.db_max_connections)
                .await
                .expect("Failed to connect to database");

            postgres::migrate(&pool)
                .await
                .expect("Failed to run migrations");
            tracing::info!("Migrations applied");

            Arc::new(PgStore::new(pool))
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store, submissions are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let addr = SocketAddr::new(config.host, config.port);
    let (app, state) = surveyor::build_app(store, config);
    surveyor::spawn_limiter_cleanup(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
