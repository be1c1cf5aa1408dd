use std::sync::Arc;

use crate::config::Config;
use crate::rate_limit::{SubmissionRateLimiter, TokenRateLimiter};
use crate::store::SubmissionStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: Arc<dyn SubmissionStore>,
    pub config: Config,
    pub submission_limiter: SubmissionRateLimiter,
    pub token_limiter: TokenRateLimiter,
}
