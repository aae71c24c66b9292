use checkin_service::{
    build_router,
    config::CheckinConfig,
    services::{Clock, ScanRegistry, SystemClock, TokenService},
    AppState,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = CheckinConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting check-in service"
    );

    if config.token.uses_default_secret() {
        tracing::warn!(
            "CHECKIN_TOKEN_SECRET is not set; using the insecure default secret. \
             Tokens issued with it offer no tamper protection against anyone \
             who has read the source."
        );
    }

    let tokens = TokenService::new(&config.token);
    let scans = ScanRegistry::new();

    let issue_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.issue_attempts,
        config.rate_limit.issue_window_seconds,
    );
    let scan_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.scan_attempts,
        config.rate_limit.scan_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Issue, Scan, and Global IP");

    // Scanned-token bookkeeping only matters inside the validity window;
    // sweep out entries for tokens that can no longer verify.
    let purge_registry = scans.clone();
    let validity_window_ms = config.token.validity_window_ms;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            purge_registry.purge_expired(SystemClock.now_millis(), validity_window_ms);
        }
    });

    let state = AppState {
        config: config.clone(),
        tokens,
        scans,
        issue_rate_limiter,
        scan_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
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
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
