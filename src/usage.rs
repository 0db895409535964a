use std::fmt::{Display, Formatter};
use std::io::Write;
use std::iter::Sum;
use std::ops::Add;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::client::{ActionsApi, RunFilter};
use crate::pagination::paginate;
use crate::{duration, DurationSample, Error, Result};

pub const DEFAULT_SINCE_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageDuration(pub Duration);

impl UsageDuration {
    /// Whole minutes, truncated.
    pub fn minutes(&self) -> u64 {
        self.0.as_secs() / 60
    }
}

impl Add for UsageDuration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for UsageDuration {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|v| v.0).sum::<Duration>())
    }
}

impl Display for UsageDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&duration::format(self.0))
    }
}

#[derive(Debug, Clone)]
pub struct UsageQuery {
    pub user: String,
    pub repository: String,
    pub since_days: u32,
}

impl UsageQuery {
    pub fn new(user: &str, repository: &str, since_days: u32) -> Result<Self> {
        for (name, value) in [("user", user), ("repository", repository)] {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("{name} must not be empty")));
            }
        }
        Ok(Self {
            user: user.trim().to_string(),
            repository: repository.trim().to_string(),
            since_days,
        })
    }

    pub fn filter(&self, now: DateTime<Utc>) -> Result<RunFilter> {
        let since = now
            .checked_sub_signed(chrono::Duration::days(i64::from(self.since_days)))
            .ok_or_else(|| Error::Configuration("since is out of range".to_string()))?;
        Ok(RunFilter {
            created_since: since.date_naive(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageReport {
    pub total_runs: usize,
    pub total_jobs: usize,
    pub total_usage: UsageDuration,
}

impl Display for UsageReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "total runs: {}", self.total_runs)?;
        writeln!(f, "total jobs: {}", self.total_jobs)?;
        writeln!(f, "total usage: {}", self.total_usage)?;
        write!(f, "total usage minutes: {}", self.total_usage.minutes())
    }
}

/// Sums the measurable run time of every job of every run in the window.
pub async fn aggregate<A, W>(
    api: &A,
    query: &UsageQuery,
    now: DateTime<Utc>,
    progress: &mut W,
) -> Result<UsageReport>
where
    A: ActionsApi + ?Sized,
    W: Write,
{
    let filter = query.filter(now)?;
    let filter = &filter;

    let repository = api.repository(&query.user, &query.repository).await?;
    if repository.owner != query.user {
        log::info!(
            "{} is not the owner of {}, using {}",
            query.user,
            query.repository,
            repository.owner
        );
    }
    let repository = &repository;

    let runs = paginate(move |page| api.list_runs(repository, filter, page)).await?;
    writeln!(
        progress,
        "fetched {} workflow runs since {}",
        runs.len(),
        filter.created_since
    )?;

    let mut report = UsageReport {
        total_runs: runs.len(),
        ..Default::default()
    };
    for run in &runs {
        let run_id = run.id;
        let jobs = paginate(move |page| api.list_jobs(repository, run_id, page)).await?;
        writeln!(progress, "run {run_id}: fetched {} jobs", jobs.len())?;

        let samples: Vec<_> = jobs.iter().filter_map(DurationSample::from_job).collect();
        report.total_jobs += samples.len();
        report.total_usage = report.total_usage
            + samples
                .into_iter()
                .map(|sample| UsageDuration(sample.duration))
                .sum::<UsageDuration>();
    }

    Ok(report)
}
