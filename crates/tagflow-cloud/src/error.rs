//! Reconciliation error types

use std::time::Duration;
use thiserror::Error;

/// Errors raised while reconciling a desired-state document
#[derive(Error, Debug)]
pub enum CloudError {
    /// Declared configuration is unusable (unknown AZ letter, missing field).
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The provider does not see a resource that was just created.
    #[error("Resource not yet visible: {0}")]
    NotVisible(String),

    /// The eventual-consistency window did not close in time.
    #[error("Gave up waiting for {resource} after {attempts} attempts ({elapsed:?})")]
    TransientVisibility {
        resource: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// Any other provider failure, carrying the raw provider message.
    #[error("{operation} failed: {message}")]
    Provider {
        operation: String,
        code: Option<String>,
        message: String,
    },

    /// The operator declined an interactive confirmation.
    #[error("Aborted by operator: {0}")]
    OperatorAbort(String),

    #[error("User-data error: {0}")]
    UserData(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CloudError {
    /// Build a provider rejection for the named operation
    pub fn provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            operation: operation.into(),
            code: None,
            message: message.into(),
        }
    }

    /// Whether the error belongs to the eventual-consistency window
    pub fn is_not_visible(&self) -> bool {
        matches!(self, CloudError::NotVisible(_))
    }

    /// Whether the error was caused by an operator declining a prompt
    pub fn is_operator_abort(&self) -> bool {
        matches!(self, CloudError::OperatorAbort(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
