use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::client_ip;
use crate::export;
use crate::store::StoreError;
use crate::state::SharedState;

const FILENAME: &str = "survey_responses.csv";

#[derive(Deserialize)]
pub struct ExportParams {
    pub token: Option<String>,
}

/// Export failures answer in plain text, the download opens in a browser tab.
#[derive(Debug)]
pub enum ExportError {
    Forbidden,
    RateLimited(u64),
    Store(StoreError),
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        match self {
            ExportError::Forbidden => {
                (StatusCode::FORBIDDEN, "Forbidden: invalid token").into_response()
            }
            ExportError::RateLimited(retry_after) => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("Too many attempts. Retry after {retry_after}s"),
            )
                .into_response(),
            ExportError::Store(err) => {
                tracing::error!("CSV export error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Could not generate CSV").into_response()
            }
        }
    }
}

/// GET /api/download-survey?token=...
pub async fn download(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    params: Result<Query<ExportParams>, QueryRejection>,
) -> Result<Response, ExportError> {
    let ip = client_ip::resolve(&headers, addr.ip(), &state.config.trusted_proxies);

    state
        .token_limiter
        .check(ip)
        .map_err(ExportError::RateLimited)?;

    // A query string that does not deserialize (e.g. a repeated `token`)
    // carries no usable token.
    let token = params.ok().and_then(|Query(params)| params.token);
    let authorized = token
        .as_deref()
        .is_some_and(|token| token_matches(token, &state.config.secret_key));
    if !authorized {
        state.token_limiter.record_failure(ip);
        tracing::warn!("Rejected export token from {ip}");
        return Err(ExportError::Forbidden);
    }

    let mut rows = state.store.stream_newest_first();

    // Nothing is written until the first row (or the end) arrives, so an
    // immediate store failure can still become a 500.
    let first = rows.next().await.transpose().map_err(ExportError::Store)?;

    tracing::info!("CSV export started for {ip}");

    let body = Body::from_stream(export::csv_body(first, rows));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{FILENAME}\""),
            ),
        ],
        body,
    )
        .into_response())
}

fn token_matches(supplied: &str, secret: &str) -> bool {
    supplied.as_bytes().ct_eq(secret.as_bytes()).into()
}
