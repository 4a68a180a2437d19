use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },
    #[error("Workflow dispatch rejected with status {status}: {body}")]
    DispatchRejected { status: u16, body: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Credential token is not a valid header value")]
    InvalidToken,
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Identifies the workflow run a dispatch produced. Only valid for the
/// dispatch-and-wait call that obtained it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunHandle {
    pub id: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WorkflowRun {
    #[must_use]
    pub fn conclusion(&self) -> RunConclusion {
        RunConclusion::from_api(self.conclusion.as_deref())
    }

    #[must_use]
    pub const fn handle(&self) -> RunHandle {
        RunHandle {
            id: self.id,
            created_at: self.created_at,
        }
    }
}

/// Terminal reading of a run's conclusion.
///
/// Only `success` and `failure` end a wait; every other value, including an
/// empty conclusion, counts as still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunConclusion {
    Success,
    Failure,
    Pending(Option<String>),
}

impl RunConclusion {
    #[must_use]
    pub fn from_api(raw: Option<&str>) -> Self {
        match raw {
            Some("success") => Self::Success,
            Some("failure") => Self::Failure,
            Some("") | None => Self::Pending(None),
            Some(other) => Self::Pending(Some(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub sha: String,
}

/// CI provider operations used to dispatch a build and follow its run.
#[async_trait]
pub trait WorkflowProvider: Send + Sync {
    async fn branch_exists(&self, branch: &str) -> ProviderResult<bool>;

    /// Trigger the configured workflow on `git_ref` with `revision` as input.
    ///
    /// Providers that learn the run id from the trigger call return it;
    /// otherwise `None` and the caller has to correlate.
    async fn dispatch_workflow(&self, git_ref: &str, revision: &str) -> ProviderResult<Option<RunHandle>>;

    /// Most recently created queued run of the configured workflow.
    async fn latest_queued_run(&self) -> ProviderResult<Option<WorkflowRun>>;

    async fn get_run(&self, run_id: u64) -> ProviderResult<WorkflowRun>;
}

/// Source-control lookups used for revision detection.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn branch_head(&self, branch: &str) -> ProviderResult<String>;

    /// Repository tags, newest first.
    async fn list_tags(&self) -> ProviderResult<Vec<TagRef>>;
}

#[async_trait]
impl<T: WorkflowProvider + ?Sized> WorkflowProvider for Arc<T> {
    async fn branch_exists(&self, branch: &str) -> ProviderResult<bool> {
        (**self).branch_exists(branch).await
    }

    async fn dispatch_workflow(&self, git_ref: &str, revision: &str) -> ProviderResult<Option<RunHandle>> {
        (**self).dispatch_workflow(git_ref, revision).await
    }

    async fn latest_queued_run(&self) -> ProviderResult<Option<WorkflowRun>> {
        (**self).latest_queued_run().await
    }

    async fn get_run(&self, run_id: u64) -> ProviderResult<WorkflowRun> {
        (**self).get_run(run_id).await
    }
}
