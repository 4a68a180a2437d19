use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use url::Url;

use super::types::{Branch, DispatchRequest, Tag, WorkflowRunList};
use crate::config::GithubConfig;
use crate::provider::{
    ProviderError, ProviderResult, RunHandle, SourceProvider, TagRef, WorkflowProvider, WorkflowRun,
};

const USER_AGENT: &str = concat!("imageflow/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for one repository and one workflow file.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: Client,
    base_url: Url,
    org: String,
    repo: String,
    workflow_file: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        if let Some(ref token) = config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ProviderError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            org: config.org.clone(),
            repo: config.repo.clone(),
            workflow_file: config.workflow_file.clone(),
        })
    }

    /// `{base}/repos/{org}/{repo}/{path}`
    pub fn repo_url(&self, path: &str) -> ProviderResult<Url> {
        Ok(self
            .base_url
            .join(&format!("repos/{}/{}/{path}", self.org, self.repo))?)
    }

    fn workflow_url(&self, path: &str) -> ProviderResult<Url> {
        self.repo_url(&format!("actions/workflows/{}/{path}", self.workflow_file))
    }

    async fn get(&self, url: Url) -> ProviderResult<Response> {
        tracing::debug!(%url, "GET");
        Ok(self.http.get(url).send().await?)
    }

    async fn get_branch(&self, branch: &str) -> ProviderResult<Option<Branch>> {
        let url = self.repo_url(&format!("branches/{branch}"))?;
        let response = self.get(url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success("GET", response).await?;
        Ok(Some(response.json().await?))
    }
}

async fn ensure_success(method: &'static str, response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        method,
        url,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl WorkflowProvider for GithubClient {
    async fn branch_exists(&self, branch: &str) -> ProviderResult<bool> {
        Ok(self.get_branch(branch).await?.is_some())
    }

    async fn dispatch_workflow(&self, git_ref: &str, revision: &str) -> ProviderResult<Option<RunHandle>> {
        let url = self.workflow_url("dispatches")?;
        tracing::debug!(%url, git_ref, revision, "POST");

        let response = self
            .http
            .post(url)
            .json(&DispatchRequest::new(git_ref, revision))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::DispatchRejected {
                status: status.as_u16(),
                body,
            });
        }
        // The dispatch endpoint does not report the run it creates.
        Ok(None)
    }

    async fn latest_queued_run(&self) -> ProviderResult<Option<WorkflowRun>> {
        let mut url = self.workflow_url("runs")?;
        url.query_pairs_mut()
            .append_pair("status", "queued")
            .append_pair("per_page", "1");

        let response = ensure_success("GET", self.get(url).await?).await?;
        let list: WorkflowRunList = response.json().await?;
        Ok(list.workflow_runs.into_iter().next())
    }

    async fn get_run(&self, run_id: u64) -> ProviderResult<WorkflowRun> {
        let url = self.repo_url(&format!("actions/runs/{run_id}"))?;
        let response = ensure_success("GET", self.get(url).await?).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SourceProvider for GithubClient {
    async fn branch_head(&self, branch: &str) -> ProviderResult<String> {
        self.get_branch(branch)
            .await?
            .map(|b| b.commit.sha)
            .ok_or_else(|| ProviderError::NotFound(format!("branch {branch}")))
    }

    async fn list_tags(&self) -> ProviderResult<Vec<TagRef>> {
        let url = self.repo_url("tags")?;
        let response = ensure_success("GET", self.get(url).await?).await?;
        let tags: Vec<Tag> = response.json().await?;
        Ok(tags.into_iter().map(TagRef::from).collect())
    }
}
