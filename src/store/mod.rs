//! Durable storage for survey submissions.
//!
//! Endpoints only see [`SubmissionStore`]; the backing technology is picked
//! once at startup from [`crate::config::StoreKind`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::models::{NewSubmission, Submission};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Rows in creation order, newest first. Rows are produced as the store
/// reads them; dropping the stream releases the underlying query.
pub type SubmissionStream = BoxStream<'static, Result<Submission, StoreError>>;

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert one submission, returning it with its assigned id and timestamp.
    async fn insert(&self, submission: &NewSubmission) -> Result<Submission, StoreError>;

    /// Start reading every submission ordered by `created_at` descending.
    fn stream_newest_first(&self) -> SubmissionStream;
}

#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(err) => write!(f, "Database error: {err}"),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(err) => Some(err),
            StoreError::Unavailable(_) => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}
