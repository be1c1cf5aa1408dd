use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client_ip;
use crate::error::AppError;
use crate::state::SharedState;
use crate::submission::{parser, validate};

#[derive(Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
    pub id: i64,
    pub timestamp: DateTime<Utc>,
}

/// POST /api/submit-survey
///
/// One insert per accepted request and no retries; a client that loses the
/// response cannot tell whether the row was written.
pub async fn submit(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SubmitResponse>, AppError> {
    let config = &state.config;
    let ip = client_ip::resolve(&headers, addr.ip(), &config.trusted_proxies);

    // Unreadable bodies are rejected before they count against the quota.
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let raw = parser::parse_body(content_type, &body).map_err(AppError::BadRequest)?;

    if let Err(retry_after) =
        state
            .submission_limiter
            .check(ip, config.rate_limit, config.rate_limit_window_secs)
    {
        return Err(AppError::RateLimited(format!(
            "Too many submissions. Retry after {retry_after}s"
        )));
    }

    let submission = validate(&raw, &config.required_ratings).map_err(|missing| {
        tracing::debug!("Rejected submission from {ip}, missing {missing:?}");
        AppError::Validation(missing)
    })?;

    let stored = state.store.insert(&submission).await?;
    tracing::info!(id = stored.id, "Survey submission stored");

    Ok(Json(SubmitResponse {
        ok: true,
        id: stored.id,
        timestamp: stored.created_at,
    }))
}
