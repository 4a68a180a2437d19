use serde::{Deserialize, Serialize};

use crate::provider::{TagRef, WorkflowRun};

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    pub name: String,
    pub commit: CommitRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
    pub commit: CommitRef,
}

impl From<Tag> for TagRef {
    fn from(tag: Tag) -> Self {
        Self {
            name: tag.name,
            sha: tag.commit.sha,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunList {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchInputs {
    pub revision: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchRequest {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub inputs: DispatchInputs,
}

impl DispatchRequest {
    pub fn new(git_ref: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            git_ref: git_ref.into(),
            inputs: DispatchInputs {
                revision: revision.into(),
            },
        }
    }
}
