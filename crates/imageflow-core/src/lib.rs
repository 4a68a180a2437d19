pub mod actor;
pub mod condition;
pub mod config;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod github;
pub mod image;
pub mod provider;
pub mod reconcile;
pub mod store;

pub use actor::{ActorChannel, CheckRequest, CheckResponse, CheckRevision, FileChannel, ProtocolError};
pub use condition::{ConditionStatus, ConditionType, ImageCondition};
pub use config::{CheckConfig, ConfigError, GithubConfig};
pub use detect::{DetectionSnapshot, Detector};
pub use dispatch::{DispatchError, DispatchOutcome, Dispatcher, WaitOptions};
pub use error::{Error, Result};
pub use github::GithubClient;
pub use image::{Image, ImageSpec, ImageStatus};
pub use provider::{
    ProviderError, RunConclusion, RunHandle, SourceProvider, TagRef, WorkflowProvider, WorkflowRun,
};
pub use reconcile::{CheckOptions, CheckOutcome, Checker, StopHandle};
pub use store::{ImageStore, MemoryImageStore, SqliteImageStore, StoreError};
