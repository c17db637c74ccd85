//! Ephemeral job progress, polled by clients while a scrape or enhancement
//! runs in the background. Each job's record is written only by the job's own
//! task and expires after a retention window.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// How long a finished (or abandoned) job stays pollable.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    InProgress,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepProgress {
    pub name: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    Saved,
    Updated,
    Error,
}

/// Per-article result inside a scrape batch.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleOutcome {
    pub title: String,
    pub source_url: String,
    pub status: OutcomeStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    pub status: JobStatus,
    pub total: usize,
    pub completed: usize,
    pub steps: Vec<StepProgress>,
    pub current: String,
    pub articles: Vec<ArticleOutcome>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobProgress {
    /// Counter-style progress for a scrape batch.
    pub fn batch() -> Self {
        let now = Utc::now();
        Self {
            status: JobStatus::InProgress,
            total: 0,
            completed: 0,
            steps: Vec::new(),
            current: String::new(),
            articles: Vec::new(),
            error: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Named-step progress for an enhancement run.
    pub fn stepped(names: &[&str]) -> Self {
        let mut progress = Self::batch();
        progress.steps = names
            .iter()
            .map(|name| StepProgress {
                name: name.to_string(),
                status: StepStatus::Pending,
            })
            .collect();
        progress
    }
}

struct JobEntry {
    progress: JobProgress,
    expiry: Option<JoinHandle<()>>,
}

/// Keyed map of job progress with per-job one-shot expiry. Reads and writes
/// for different keys are safe concurrently; a single job only ever has one
/// writer (its own task).
#[derive(Clone)]
pub struct ProgressTracker {
    jobs: Arc<RwLock<HashMap<String, JobEntry>>>,
    retention: Duration,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Register a new job and schedule its expiry. Returns the job id.
    pub async fn create(&self, progress: JobProgress) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.jobs.write().await.insert(
            id.clone(),
            JobEntry {
                progress,
                expiry: None,
            },
        );

        let jobs = Arc::clone(&self.jobs);
        let retention = self.retention;
        let expiry_id = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            if jobs.write().await.remove(&expiry_id).is_some() {
                tracing::debug!("expired progress record for job {}", expiry_id);
            }
        });

        if let Some(entry) = self.jobs.write().await.get_mut(&id) {
            entry.expiry = Some(handle);
        }
        id
    }

    /// Apply a mutation to a job's progress. Unknown ids are ignored; the
    /// job may have expired while its poller was away.
    pub async fn update<F>(&self, id: &str, patch: F)
    where
        F: FnOnce(&mut JobProgress),
    {
        if let Some(entry) = self.jobs.write().await.get_mut(id) {
            patch(&mut entry.progress);
            entry.progress.updated_at = Utc::now();
        }
    }

    pub async fn get(&self, id: &str) -> Option<JobProgress> {
        self.jobs.read().await.get(id).map(|e| e.progress.clone())
    }

    /// Drop a job early, cancelling its pending expiry task.
    pub async fn remove(&self, id: &str) -> bool {
        match self.jobs.write().await.remove(id) {
            Some(entry) => {
                if let Some(handle) = entry.expiry {
                    handle.abort();
                }
                true
            }
            None => false,
        }
    }
}

/// Step-by-step observer the orchestrators report into as they run. The web
/// layer backs this with a `ProgressTracker`; the CLI just logs.
#[async_trait::async_trait]
pub trait ProgressSink: Send + Sync {
    async fn begin(&self, _total: usize) {}

    async fn message(&self, _msg: &str) {}

    /// One article of a scrape batch finished (saved, updated, or errored).
    async fn article(&self, _outcome: ArticleOutcome) {}

    async fn item_done(&self) {}

    /// A named step of a stepped job changed status.
    async fn step(&self, _index: usize, _status: StepStatus) {}

    async fn finish(&self) {}

    async fn fail(&self, _error: &str) {}
}

/// Sink that discards everything. Handy for tests and one-shot CLI runs.
pub struct NoopSink;

#[async_trait::async_trait]
impl ProgressSink for NoopSink {}

/// Sink writing into a `ProgressTracker` entry.
pub struct TrackerSink {
    tracker: ProgressTracker,
    job_id: String,
}

impl TrackerSink {
    pub fn new(tracker: ProgressTracker, job_id: String) -> Self {
        Self { tracker, job_id }
    }
}

#[async_trait::async_trait]
impl ProgressSink for TrackerSink {
    async fn begin(&self, total: usize) {
        self.tracker
            .update(&self.job_id, |p| p.total = total)
            .await;
    }

    async fn message(&self, msg: &str) {
        let msg = msg.to_string();
        self.tracker
            .update(&self.job_id, move |p| p.current = msg)
            .await;
    }

    async fn article(&self, outcome: ArticleOutcome) {
        self.tracker
            .update(&self.job_id, move |p| p.articles.push(outcome))
            .await;
    }

    async fn item_done(&self) {
        self.tracker
            .update(&self.job_id, |p| p.completed += 1)
            .await;
    }

    async fn step(&self, index: usize, status: StepStatus) {
        self.tracker
            .update(&self.job_id, move |p| {
                if let Some(step) = p.steps.get_mut(index) {
                    step.status = status;
                }
            })
            .await;
    }

    async fn finish(&self) {
        self.tracker
            .update(&self.job_id, |p| p.status = JobStatus::Completed)
            .await;
    }

    async fn fail(&self, error: &str) {
        let error = error.to_string();
        self.tracker
            .update(&self.job_id, move |p| {
                p.status = JobStatus::Error;
                p.error = Some(error);
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_update_get() {
        let tracker = ProgressTracker::new();
        let id = tracker.create(JobProgress::batch()).await;

        tracker
            .update(&id, |p| {
                p.total = 5;
                p.completed = 2;
                p.current = "working".to_string();
            })
            .await;

        let progress = tracker.get(&id).await.unwrap();
        assert_eq!(progress.total, 5);
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.status, JobStatus::InProgress);
    }

    #[tokio::test]
    async fn test_unknown_job_is_none() {
        let tracker = ProgressTracker::new();
        assert!(tracker.get("no-such-job").await.is_none());
    }

    #[tokio::test]
    async fn test_expiry_removes_record() {
        let tracker = ProgressTracker::with_retention(Duration::from_millis(50));
        let id = tracker.create(JobProgress::batch()).await;
        assert!(tracker.get(&id).await.is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(tracker.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_early_remove_cancels_expiry() {
        let tracker = ProgressTracker::with_retention(Duration::from_secs(3600));
        let id = tracker.create(JobProgress::batch()).await;
        assert!(tracker.remove(&id).await);
        assert!(!tracker.remove(&id).await);
        assert!(tracker.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_tracker_sink_stepped_job() {
        let tracker = ProgressTracker::new();
        let id = tracker
            .create(JobProgress::stepped(&["fetch", "search"]))
            .await;
        let sink = TrackerSink::new(tracker.clone(), id.clone());

        sink.step(0, StepStatus::InProgress).await;
        sink.step(0, StepStatus::Completed).await;
        sink.step(1, StepStatus::Error).await;
        sink.fail("search failed").await;

        let progress = tracker.get(&id).await.unwrap();
        assert_eq!(progress.steps[0].status, StepStatus::Completed);
        assert_eq!(progress.steps[1].status, StepStatus::Error);
        assert_eq!(progress.status, JobStatus::Error);
        assert_eq!(progress.error.as_deref(), Some("search failed"));
    }
}
