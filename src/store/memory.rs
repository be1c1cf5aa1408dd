use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};

use super::{StoreError, SubmissionStore, SubmissionStream};
use crate::models::{NewSubmission, Submission};

/// In-process store for local runs and the integration tests.
///
/// Besides storing rows it counts inserts and queries, and can be switched
/// into a failing mode so callers can observe how store errors surface.
pub struct MemoryStore {
    rows: Mutex<Vec<Submission>>,
    next_id: AtomicI64,
    inserts: AtomicUsize,
    queries: AtomicUsize,
    failing: AtomicBool,
    fail_export_after: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            inserts: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            fail_export_after: AtomicUsize::new(usize::MAX),
        }
    }

    /// Number of successful inserts so far.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of export queries started so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Make every following insert and query fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make the next export streams fail after yielding `rows` rows.
    pub fn fail_export_after(&self, rows: usize) {
        self.fail_export_after.store(rows, Ordering::SeqCst);
    }

    /// Stored rows in insertion order.
    pub fn snapshot(&self) -> Vec<Submission> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert(&self, submission: &NewSubmission) -> Result<Submission, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is failing".to_string()));
        }

        let row = Submission {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            created_at: Utc::now(),
            name: submission.name.clone(),
            role: submission.role.clone(),
            support: submission.support,
            response: submission.response,
            clarity: submission.clarity,
            reports: submission.reports.clone(),
            overall: submission.overall,
            comments: submission.comments.clone(),
        };

        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(row.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(row)
    }

    fn stream_newest_first(&self) -> SubmissionStream {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            let err = StoreError::Unavailable("memory store is failing".to_string());
            return stream::once(async move { Err(err) }).boxed();
        }

        let mut rows = self.snapshot();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let fail_after = self.fail_export_after.load(Ordering::SeqCst);
        if fail_after >= rows.len() {
            return stream::iter(rows.into_iter().map(Ok)).boxed();
        }

        // Give the reader a chance to flush what it already has, the way a
        // cursor that dies mid-read would.
        let interrupted = stream::once(async {
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Err(StoreError::Unavailable("export interrupted".to_string()))
        });

        stream::iter(rows.into_iter().take(fail_after).map(Ok))
            .chain(interrupted)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str) -> NewSubmission {
        NewSubmission {
            name: name.to_string(),
            role: "Engineer".to_string(),
            ..Default::default()
        }
    }

    async fn collect(store: &MemoryStore) -> Vec<Result<Submission, StoreError>> {
        store.stream_newest_first().collect().await
    }

    #[tokio::test]
    async fn assigns_distinct_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.insert(&sample("a")).await.unwrap();
        let b = store.insert(&sample("b")).await.unwrap();
        assert!(b.id > a.id);
        assert!(b.created_at >= a.created_at);
        assert_eq!(store.insert_count(), 2);
    }

    #[tokio::test]
    async fn streams_newest_first() {
        let store = MemoryStore::new();
        for name in ["first", "second", "third"] {
            store.insert(&sample(name)).await.unwrap();
        }

        let names: Vec<String> = collect(&store)
            .await
            .into_iter()
            .map(|row| row.unwrap().name)
            .collect();
        assert_eq!(names, ["third", "second", "first"]);
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn failing_store_rejects_inserts_and_queries() {
        let store = MemoryStore::new();
        store.set_failing(true);

        assert!(store.insert(&sample("x")).await.is_err());
        assert_eq!(store.insert_count(), 0);

        let rows = collect(&store).await;
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_err());
    }

    #[tokio::test]
    async fn export_can_fail_midway() {
        let store = MemoryStore::new();
        for name in ["a", "b", "c"] {
            store.insert(&sample(name)).await.unwrap();
        }
        store.fail_export_after(1);

        let rows = collect(&store).await;
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_ok());
        assert!(rows[1].is_err());
    }
}
