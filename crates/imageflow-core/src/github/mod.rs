mod client;
mod types;

pub use client::GithubClient;
pub use types::{Branch, CommitRef, DispatchInputs, DispatchRequest, Tag, WorkflowRunList};
