use std::str::FromStr;

use async_trait::async_trait;
use futures_util::StreamExt;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{StoreError, SubmissionStore, SubmissionStream};
use crate::models::{NewSubmission, Submission};

/// Rows buffered between the database cursor and the HTTP body.
const EXPORT_CHANNEL_CAPACITY: usize = 64;

const INSERT_SQL: &str = "INSERT INTO survey_responses
     (name, role, support, response, clarity, reports, overall, comments)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
     RETURNING *";

const SELECT_NEWEST_FIRST_SQL: &str = "SELECT * FROM survey_responses
     ORDER BY created_at DESC, id DESC";

/// Build the process-wide pool. `require_ssl` mirrors hosted Postgres
/// providers that insist on TLS without a verifiable certificate chain.
pub async fn connect(
    database_url: &str,
    require_ssl: bool,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    let mut options = PgConnectOptions::from_str(database_url)?;
    if require_ssl {
        options = options.ssl_mode(PgSslMode::Require);
    }

    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn insert(&self, submission: &NewSubmission) -> Result<Submission, StoreError> {
        let row = sqlx::query_as::<_, Submission>(INSERT_SQL)
            .bind(&submission.name)
            .bind(&submission.role)
            .bind(submission.support)
            .bind(submission.response)
            .bind(submission.clarity)
            .bind(submission.reports.as_deref())
            .bind(submission.overall)
            .bind(submission.comments.as_deref())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    fn stream_newest_first(&self) -> SubmissionStream {
        let pool = self.pool.clone();
        let (tx, rx) = mpsc::channel(EXPORT_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut rows = sqlx::query_as::<_, Submission>(SELECT_NEWEST_FIRST_SQL).fetch(&pool);

            loop {
                let next = tokio::select! {
                    _ = tx.closed() => {
                        tracing::debug!("Export reader went away, closing cursor");
                        return;
                    }
                    next = rows.next() => next,
                };

                let Some(row) = next else {
                    return;
                };

                let failed = row.is_err();
                if tx.send(row.map_err(StoreError::from)).await.is_err() || failed {
                    return;
                }
            }
        });

        ReceiverStream::new(rx).boxed()
    }
}
