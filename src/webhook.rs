use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use octocrab::models::JobId;
use sha2::Sha256;

use crate::metrics::{MetricSink, SeriesKey};
use crate::{DurationSample, Error, Result, WorkflowJob};

pub const WORKFLOW_JOB_EVENT: &str = "workflow_job";

#[derive(serde::Deserialize, Debug)]
struct WorkflowJobEvent {
    action: String,
    workflow_job: JobPayload,
}

// Only the fields the gauge needs. Queued deliveries carry no `started_at`.
#[derive(serde::Deserialize, Debug)]
struct JobPayload {
    id: JobId,
    #[serde(default)]
    workflow_name: Option<String>,
    name: String,
    conclusion: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<JobPayload> for WorkflowJob {
    fn from(job: JobPayload) -> Self {
        Self {
            id: job.id,
            workflow_name: job.workflow_name.unwrap_or_default(),
            name: job.name,
            conclusion: job.conclusion,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ignored,
    Recorded(DurationSample),
}

pub struct JobCompletionHandler<M> {
    metrics: Arc<M>,
}

impl<M: MetricSink> JobCompletionHandler<M> {
    pub fn new(metrics: Arc<M>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &Arc<M> {
        &self.metrics
    }

    pub fn handles(&self) -> &'static [&'static str] {
        &[WORKFLOW_JOB_EVENT]
    }

    pub fn handle(&self, event_type: &str, payload: &[u8]) -> Result<Outcome> {
        log::debug!("Got event {event_type}");
        if event_type != WORKFLOW_JOB_EVENT {
            return Ok(Outcome::Ignored);
        }

        let event: WorkflowJobEvent = serde_json::from_slice(payload)?;
        log::debug!("Event action is {}", event.action);
        if event.action != "completed" {
            return Ok(Outcome::Ignored);
        }

        let job = WorkflowJob::from(event.workflow_job);
        let Some(sample) = DurationSample::from_job(&job) else {
            log::debug!("Job {} ({}) has no measurable duration", job.id, job.name);
            return Ok(Outcome::Ignored);
        };

        let seconds = sample.duration.as_secs_f64();
        log::info!(
            "Job {} {}/{} finished with {:?} after {seconds}s",
            sample.job_id,
            sample.workflow_name,
            sample.job_name,
            sample.conclusion
        );
        self.metrics.set(SeriesKey::from(&sample), seconds);
        Ok(Outcome::Recorded(sample))
    }
}

/// Checks an `X-Hub-Signature-256` header value against the delivery body.
pub fn verify_signature(secret: &str, signature: &str, body: &[u8]) -> Result<()> {
    let signature = signature
        .strip_prefix("sha256=")
        .ok_or(Error::InvalidSignature)?;
    let signature = hex::decode(signature).map_err(|_| Error::InvalidSignature)?;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| Error::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&signature)
        .map_err(|_| Error::InvalidSignature)
}
