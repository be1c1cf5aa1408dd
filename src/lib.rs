pub mod config;
pub mod error;
pub mod state;
pub mod models;
pub mod store;
pub mod submission;
pub mod export;
pub mod routes;
pub mod views;
pub mod client_ip;
pub mod rate_limit;

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::rate_limit::{SubmissionRateLimiter, TokenRateLimiter};
use crate::state::{AppState, SharedState};
use crate::store::SubmissionStore;

pub fn build_app(store: Arc<dyn SubmissionStore>, config: Config) -> (Router, SharedState) {
    let cors = build_cors_layer(&config);
    let body_limit = RequestBodyLimitLayer::new(config.max_body_size);
    let static_dir = ServeDir::new(&config.static_dir);

    let state: SharedState = Arc::new(AppState {
        store,
        config,
        submission_limiter: SubmissionRateLimiter::new(),
        token_limiter: TokenRateLimiter::new(),
    });

    let app = Router::new()
        .merge(routes::api_routes())
        .merge(views::view_routes())
        .nest_service("/static", static_dir)
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(body_limit)
                .layer(cors),
        )
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state.clone());

    (app, state)
}

/// Cross-origin access for forms hosted on another origin.
pub fn build_cors_layer(config: &Config) -> CorsLayer {
    let origins = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(config.allowed_origins.iter().cloned())
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400))
}

/// Periodically drop rate-limit windows nobody has touched for a while.
pub fn spawn_limiter_cleanup(state: SharedState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            let max_age = Duration::from_secs(state.config.rate_limit_window_secs.max(15 * 60));
            state.submission_limiter.cleanup(max_age);
            state.token_limiter.cleanup(max_age);
            tracing::debug!("Rate limiter entries pruned");
        }
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}
