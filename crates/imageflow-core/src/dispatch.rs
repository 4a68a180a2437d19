use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::ConfigError;
use crate::provider::{RunConclusion, RunHandle, WorkflowProvider};
use crate::Result;

/// Branch names tried, in order, when resolving the dispatch ref.
pub const DEFAULT_BRANCH_CANDIDATES: [&str; 2] = ["master", "main"];

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Workflow run {run_id} concluded with failure")]
    WorkflowFailed { run_id: u64 },
    #[error("Workflow run did not finish within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Pause before each look at the queued-runs list
    pub correlation_interval: Duration,
    /// Maximum age of a queued run for it to count as ours
    pub correlation_window: Duration,
    /// Pause before each look at the correlated run
    pub poll_interval: Duration,
    /// Overall bound on correlation plus polling; `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            correlation_interval: Duration::from_secs(2),
            correlation_window: Duration::from_secs(10),
            poll_interval: Duration::from_secs(3),
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The workflow was triggered and the caller did not ask to wait.
    Dispatched { git_ref: &'static str },
    /// The correlated run concluded with success.
    Succeeded { git_ref: &'static str, run: RunHandle },
}

/// Triggers the build workflow for a revision and optionally follows the
/// resulting run to a terminal conclusion.
pub struct Dispatcher<P> {
    provider: P,
    wait: WaitOptions,
}

impl<P: WorkflowProvider> Dispatcher<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            wait: WaitOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// First of `master`, `main` that exists in the repository.
    pub async fn default_branch(&self) -> Result<&'static str> {
        for candidate in DEFAULT_BRANCH_CANDIDATES {
            if self.provider.branch_exists(candidate).await? {
                tracing::debug!(branch = candidate, "resolved default branch");
                return Ok(candidate);
            }
        }
        Err(ConfigError::NoDefaultBranch.into())
    }

    pub async fn dispatch(&self, revision: &str, wait: bool) -> Result<DispatchOutcome> {
        let git_ref = self.default_branch().await?;

        let direct = self.provider.dispatch_workflow(git_ref, revision).await?;
        tracing::info!(git_ref, revision, "workflow dispatched");

        if !wait {
            return Ok(DispatchOutcome::Dispatched { git_ref });
        }

        let follow = async {
            let run = match direct {
                Some(handle) => handle,
                None => self.correlate_run().await?,
            };
            self.poll_until_terminal(run).await?;
            Ok::<_, crate::Error>(run)
        };

        let run = match self.wait.timeout {
            Some(limit) => tokio::time::timeout(limit, follow)
                .await
                .map_err(|_| DispatchError::Timeout(limit))??,
            None => follow.await?,
        };

        Ok(DispatchOutcome::Succeeded { git_ref, run })
    }

    /// Find the run our dispatch created: the newest queued run, provided it
    /// was created within the correlation window.
    ///
    /// Overlapping dispatches of the same workflow inside the window can be
    /// mistaken for each other.
    pub async fn correlate_run(&self) -> Result<RunHandle> {
        loop {
            tokio::time::sleep(self.wait.correlation_interval).await;

            let Some(run) = self.provider.latest_queued_run().await? else {
                tracing::debug!("no queued run yet");
                continue;
            };

            let now = Utc::now();
            if !is_recent_run(run.created_at, now, self.wait.correlation_window) {
                tracing::debug!(
                    run_id = run.id,
                    age_secs = (now - run.created_at).num_seconds(),
                    "latest queued run is too old"
                );
                continue;
            }

            tracing::info!(run_id = run.id, "correlated workflow run");
            return Ok(run.handle());
        }
    }

    pub async fn poll_until_terminal(&self, run: RunHandle) -> Result<()> {
        loop {
            tokio::time::sleep(self.wait.poll_interval).await;

            let current = self.provider.get_run(run.id).await?;
            match current.conclusion() {
                RunConclusion::Success => {
                    tracing::info!(run_id = run.id, "workflow run succeeded");
                    return Ok(());
                }
                RunConclusion::Failure => {
                    tracing::warn!(run_id = run.id, "workflow run failed");
                    return Err(DispatchError::WorkflowFailed { run_id: run.id }.into());
                }
                RunConclusion::Pending(conclusion) => {
                    tracing::debug!(
                        run_id = run.id,
                        status = current.status.as_deref().unwrap_or(""),
                        conclusion = conclusion.as_deref().unwrap_or(""),
                        "workflow run still going"
                    );
                }
            }
        }
    }
}

/// Whether a run created at `created_at` is young enough, at `now`, to be
/// attributed to a dispatch that just happened. Clock skew that puts the run
/// in the future counts as recent.
#[must_use]
pub fn is_recent_run(created_at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    let age = now.signed_duration_since(created_at);
    age.to_std().map_or(true, |age| age <= window)
}
