use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use session_service::config::Config;
use session_service::domain::session::ports::SessionServicePort;
use session_service::domain::session::service::SessionService;
use session_service::inbound::http::router::create_router;
use session_service::inbound::http::router::AppState;
use session_service::rate_limit::RateLimiter;
use session_service::repositories::postgres;
use session_service::repositories::InMemoryRefreshTokenRepository;
use session_service::repositories::InMemoryUserRepository;
use session_service::repositories::PostgresRefreshTokenRepository;
use session_service::repositories::PostgresUserRepository;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::load()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        service = "session-service",
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.server.environment,
        "Service starting"
    );

    tracing::info!(
        http_port = config.server.http_port,
        database = config.database.url.is_some(),
        admin_emails = config.auth.admin_emails.len(),
        access_token_ttl_secs = config.jwt.access_token_ttl_secs,
        refresh_token_ttl_secs = config.jwt.refresh_token_ttl_secs,
        "Configuration loaded"
    );

    let token_codec = Arc::new(config.jwt.token_codec());
    let admin_emails = config.auth.admin_emails.clone();

    let (session_service, store): (Arc<dyn SessionServicePort>, &'static str) =
        match &config.database.url {
            Some(url) => {
                let pool = postgres::connect(url, config.database.max_connections).await?;
                tracing::info!(
                    max_connections = config.database.max_connections,
                    database = "postgresql",
                    "Database connection pool created and migrated"
                );

                let service = SessionService::new(
                    Arc::new(PostgresUserRepository::new(pool.clone())),
                    Arc::new(PostgresRefreshTokenRepository::new(pool)),
                    Arc::clone(&token_codec),
                    admin_emails,
                );
                (Arc::new(service), "postgresql")
            }
            None => {
                tracing::warn!("No database configured, users and sessions are kept in memory");

                let service = SessionService::new(
                    Arc::new(InMemoryUserRepository::new()),
                    Arc::new(InMemoryRefreshTokenRepository::new()),
                    Arc::clone(&token_codec),
                    admin_emails,
                );
                (Arc::new(service), "memory")
            }
        };

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.policies()));
    let sweeper = Arc::clone(&rate_limiter);
    let sweep_interval = Duration::from_secs(config.rate_limit.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let evicted = sweeper.sweep();
            if evicted > 0 {
                tracing::debug!(evicted, "Evicted idle rate-limit buckets");
            }
        }
    });

    let state = AppState::new(
        session_service,
        token_codec,
        rate_limiter,
        config.server.environment,
        store,
    );

    let http_address = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        store,
        "Http server listening"
    );

    axum::serve(
        http_listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server exited successfully");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
