use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use octocrab::models::workflows::{Conclusion, Job};
use octocrab::models::RunId;
use octocrab::params::workflows::Filter;
use octocrab::Octocrab;

use crate::{Error, Page, RepositoryId, Result, WorkflowJob, WorkflowRun};

const PER_PAGE: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFilter {
    pub created_since: NaiveDate,
}

impl RunFilter {
    /// GitHub search qualifier for runs created on or after `created_since`.
    pub fn created(&self) -> String {
        format!(">={}", self.created_since.format("%Y-%m-%d"))
    }
}

#[async_trait]
pub trait ActionsApi: Send + Sync {
    /// Looks up a repository, returning it under its actual owner.
    async fn repository(&self, owner: &str, name: &str) -> Result<RepositoryId>;

    async fn list_runs(
        &self,
        repository: &RepositoryId,
        filter: &RunFilter,
        page: u32,
    ) -> Result<Page<WorkflowRun>>;

    async fn list_jobs(
        &self,
        repository: &RepositoryId,
        run_id: RunId,
        page: u32,
    ) -> Result<Page<WorkflowJob>>;
}

pub struct GitHubApi {
    pub client: Octocrab,
}

impl GitHubApi {
    pub fn new(token: &str, base_uri: Option<&str>) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::Configuration("token must not be empty".to_string()));
        }
        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(base_uri) = base_uri {
            builder = builder.base_uri(base_uri).map_err(|error| {
                Error::Configuration(format!("invalid GitHub API URL {base_uri}: {error}"))
            })?;
        }
        let client = builder
            .build()
            .map_err(|error| Error::Configuration(format!("cannot build GitHub client: {error}")))?;
        Ok(Self { client })
    }
}

fn next_page<T>(page: u32, items: &[T]) -> Option<u32> {
    (items.len() >= usize::from(PER_PAGE)).then_some(page + 1)
}

fn conclusion_name(conclusion: &Conclusion) -> Option<String> {
    serde_json::to_value(conclusion)
        .ok()?
        .as_str()
        .map(str::to_string)
}

impl From<Job> for WorkflowJob {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            workflow_name: job.workflow_name,
            name: job.name,
            conclusion: job.conclusion.as_ref().and_then(conclusion_name),
            started_at: Some(job.started_at),
            completed_at: job.completed_at,
        }
    }
}

#[async_trait]
impl ActionsApi for GitHubApi {
    async fn repository(&self, owner: &str, name: &str) -> Result<RepositoryId> {
        let repository = self
            .client
            .repos(owner, name)
            .get()
            .await
            .map_err(|error| Error::fetch(format!("repository {owner}/{name}"), error))?;
        let owner = repository
            .owner
            .map(|o| o.login)
            .unwrap_or_else(|| owner.to_string());
        Ok(RepositoryId {
            owner,
            name: repository.name,
        })
    }

    // The runs builder has no `created` qualifier, so this one goes through a
    // raw GET.
    async fn list_runs(
        &self,
        repository: &RepositoryId,
        filter: &RunFilter,
        page: u32,
    ) -> Result<Page<WorkflowRun>> {
        let params = ListRunsParams {
            created: filter.created(),
            per_page: PER_PAGE,
            page,
        };
        let response: RunsResponse = self
            .client
            .get(
                format!(
                    "/repos/{}/{}/actions/runs",
                    repository.owner, repository.name
                ),
                Some(&params),
            )
            .await
            .map_err(|error| Error::fetch(format!("workflow runs of {repository}"), error))?;

        let next = next_page(page, &response.workflow_runs);
        let items = response
            .workflow_runs
            .into_iter()
            .map(|run| WorkflowRun {
                id: run.id,
                repository: repository.clone(),
                run_started_at: run.run_started_at,
                conclusion: run.conclusion,
            })
            .collect();
        Ok(Page { items, next })
    }

    async fn list_jobs(
        &self,
        repository: &RepositoryId,
        run_id: RunId,
        page: u32,
    ) -> Result<Page<WorkflowJob>> {
        let mut response = self
            .client
            .workflows(&repository.owner, &repository.name)
            .list_jobs(run_id)
            .filter(Filter::All)
            .per_page(PER_PAGE)
            .page(page)
            .send()
            .await
            .map_err(|error| Error::fetch(format!("jobs of run {run_id}"), error))?;

        let jobs = response.take_items();
        let next = next_page(page, &jobs);
        let items = jobs.into_iter().map(WorkflowJob::from).collect();
        Ok(Page { items, next })
    }
}

#[derive(serde::Serialize, Debug)]
struct ListRunsParams {
    created: String,
    per_page: u8,
    page: u32,
}

#[derive(serde::Deserialize, Debug)]
struct ApiRun {
    id: RunId,
    run_started_at: Option<DateTime<Utc>>,
    conclusion: Option<String>,
}

#[derive(serde::Deserialize, Debug)]
struct RunsResponse {
    workflow_runs: Vec<ApiRun>,
}
