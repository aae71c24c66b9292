pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    http::{HeaderValue, Method, Request},
    middleware::from_fn,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::ip_rate_limit_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::CheckinConfig;
use crate::services::{ScanRegistry, TokenService};

#[derive(Clone)]
pub struct AppState {
    pub config: CheckinConfig,
    pub tokens: TokenService,
    pub scans: ScanRegistry,
    pub issue_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub scan_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub ip_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    // Token issuance, rate limited per IP
    let issue_limiter = state.issue_rate_limiter.clone();
    let issue_route = Router::new()
        .route("/checkin/tokens", post(handlers::token::issue_token))
        .layer(from_fn_with_state(issue_limiter, ip_rate_limit_middleware));

    // Scan verification, rate limited per IP
    let scan_limiter = state.scan_rate_limiter.clone();
    let scan_route = Router::new()
        .route("/checkin/scans", post(handlers::scan::scan_token))
        .layer(from_fn_with_state(scan_limiter, ip_rate_limit_middleware));

    let ip_limiter = state.ip_rate_limiter.clone();

    let allowed_origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>().unwrap_or_else(|e| {
                tracing::error!("Invalid CORS origin '{}': {}. Using fallback.", o, e);
                HeaderValue::from_static("*")
            })
        })
        .collect::<Vec<HeaderValue>>();

    Router::new()
        .route("/health", get(health_check))
        .merge(issue_route)
        .merge(scan_route)
        .with_state(state)
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
}

/// Service health check
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
    })))
}
