use thiserror::Error;

use crate::actor::ProtocolError;
use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use crate::provider::ProviderError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Checker protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Invalid condition type: {0}")]
    InvalidConditionType(String),

    #[error("Invalid condition status: {0}")]
    InvalidConditionStatus(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether a retry of the surrounding cycle can reasonably succeed.
    ///
    /// Configuration problems and terminal workflow outcomes are final; store,
    /// protocol, provider and I/O failures are retried by the check loop.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(
            self,
            Self::Config(_)
                | Self::Dispatch(_)
                | Self::InvalidConditionType(_)
                | Self::InvalidConditionStatus(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
