use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::protocol::{CheckRequest, CheckResponse};
use super::{ProtocolError, ProtocolResult};

/// File name the request is exported to inside the work directory
pub const INPUT_FILE: &str = "input";
/// File name the actor writes its response to
pub const OUTPUT_FILE: &str = "output";

/// Request/response exchange with an independently running checker actor.
///
/// Only one request is ever outstanding: exporting again replaces whatever
/// the actor has not consumed yet. Neither side waits; the caller decides
/// when to retry. The actor must replace the response for every request it
/// consumes; a stale response is imported as if it answered the current one.
#[async_trait]
pub trait ActorChannel: Send + Sync {
    async fn export(&self, request: &CheckRequest) -> ProtocolResult<()>;
    async fn import(&self) -> ProtocolResult<CheckResponse>;
}

#[async_trait]
impl<T: ActorChannel + ?Sized> ActorChannel for Arc<T> {
    async fn export(&self, request: &CheckRequest) -> ProtocolResult<()> {
        (**self).export(request).await
    }

    async fn import(&self) -> ProtocolResult<CheckResponse> {
        (**self).import().await
    }
}

/// Channel backed by two JSON files in a shared work directory.
#[derive(Debug, Clone)]
pub struct FileChannel {
    work_dir: PathBuf,
}

impl FileChannel {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    #[must_use]
    pub fn input_path(&self) -> PathBuf {
        self.work_dir.join(INPUT_FILE)
    }

    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.work_dir.join(OUTPUT_FILE)
    }
}

#[async_trait]
impl ActorChannel for FileChannel {
    async fn export(&self, request: &CheckRequest) -> ProtocolResult<()> {
        let path = self.input_path();
        let body = serde_json::to_vec(request)?;

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|source| ProtocolError::Export {
                path: self.work_dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| ProtocolError::Export {
                path: path.clone(),
                source,
            })?;

        tracing::info!(
            path = %path.display(),
            revisions = request.revisions.len(),
            "exported check request"
        );
        tracing::debug!(?request, "check request");
        Ok(())
    }

    async fn import(&self) -> ProtocolResult<CheckResponse> {
        let path = self.output_path();
        let body = tokio::fs::read(&path)
            .await
            .map_err(|source| ProtocolError::Import {
                path: path.clone(),
                source,
            })?;

        let response: CheckResponse =
            serde_json::from_slice(&body).map_err(|source| ProtocolError::Malformed {
                path: path.clone(),
                source,
            })?;

        tracing::info!(
            path = %path.display(),
            revisions = response.revisions.len(),
            "imported check response"
        );
        tracing::debug!(?response, "check response");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::CheckRevision;
    use crate::condition::ConditionStatus;
    use tempfile::TempDir;

    fn request() -> CheckRequest {
        CheckRequest {
            revisions: vec![CheckRevision {
                registry: "r".into(),
                resolved_revision: String::new(),
                revision: "v1".into(),
                exist: None,
            }],
        }
    }

    #[tokio::test]
    async fn export_creates_work_dir_and_input() {
        let tmp = TempDir::new().unwrap();
        let channel = FileChannel::new(tmp.path().join("nested").join("work"));

        channel.export(&request()).await.unwrap();

        let written = std::fs::read_to_string(channel.input_path()).unwrap();
        assert_eq!(
            written,
            r#"{"revisions":[{"registry":"r","resolved_revision":"","revision":"v1","exist":""}]}"#
        );
    }

    #[tokio::test]
    async fn export_overwrites_previous_request() {
        let tmp = TempDir::new().unwrap();
        let channel = FileChannel::new(tmp.path());

        channel.export(&request()).await.unwrap();
        channel.export(&CheckRequest::default()).await.unwrap();

        let written = std::fs::read_to_string(channel.input_path()).unwrap();
        assert_eq!(written, r#"{"revisions":[]}"#);
    }

    #[tokio::test]
    async fn import_missing_output_fails() {
        let tmp = TempDir::new().unwrap();
        let channel = FileChannel::new(tmp.path());

        let result = channel.import().await;
        assert!(matches!(result, Err(ProtocolError::Import { .. })));
    }

    #[tokio::test]
    async fn import_malformed_output_fails() {
        let tmp = TempDir::new().unwrap();
        let channel = FileChannel::new(tmp.path());
        std::fs::write(channel.output_path(), "{not json").unwrap();

        let result = channel.import().await;
        assert!(matches!(result, Err(ProtocolError::Malformed { .. })));
    }

    #[tokio::test]
    async fn import_reads_actor_output() {
        let tmp = TempDir::new().unwrap();
        let channel = FileChannel::new(tmp.path());
        std::fs::write(
            channel.output_path(),
            r#"{"revisions":[{"registry":"r","resolved_revision":"sha123","revision":"v1","exist":"True"}]}"#,
        )
        .unwrap();

        let response = channel.import().await.unwrap();
        assert_eq!(response.revisions.len(), 1);
        assert_eq!(response.revisions[0].resolved_revision, "sha123");
        assert_eq!(response.revisions[0].exist, Some(ConditionStatus::True));
    }
}
