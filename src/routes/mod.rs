pub mod export;
pub mod submit;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/submit-survey", post(submit::submit))
        .route("/api/download-survey", get(export::download))
}
