use chrono::{DateTime, Utc};
use octocrab::models::{JobId, RunId};

pub mod client;
pub mod config;
pub mod duration;
pub mod error;
pub mod metrics;
pub mod pagination;
pub mod server;
pub mod usage;
pub mod webhook;

pub use error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RepositoryId {
    pub owner: String,
    pub name: String,
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkflowRun {
    pub id: RunId,
    pub repository: RepositoryId,
    pub run_started_at: Option<DateTime<Utc>>,
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkflowJob {
    pub id: JobId,
    pub workflow_name: String,
    pub name: String,
    pub conclusion: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DurationSample {
    pub job_id: JobId,
    pub workflow_name: String,
    pub job_name: String,
    pub conclusion: String,
    pub duration: std::time::Duration,
}

impl DurationSample {
    /// Returns `None` when the job has no completed-after-started interval.
    pub fn from_job(job: &WorkflowJob) -> Option<Self> {
        let duration = duration::measure(job.started_at, job.completed_at)?;
        Some(Self {
            job_id: job.id,
            workflow_name: job.workflow_name.clone(),
            job_name: job.name.clone(),
            conclusion: job.conclusion.clone().unwrap_or_default(),
            duration,
        })
    }
}

/// One page of a paginated listing. `next` is the 1-based page to fetch
/// afterwards, or `None` when the listing is exhausted.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<u32>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}
