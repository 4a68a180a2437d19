mod channel;
mod protocol;

use std::path::PathBuf;

pub use channel::{ActorChannel, FileChannel, INPUT_FILE, OUTPUT_FILE};
pub use protocol::{CheckRequest, CheckResponse, CheckRevision};

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Failed to write check request to {}: {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Check response not available at {}: {source}", .path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed check response at {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
