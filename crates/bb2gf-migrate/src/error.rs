//! Error types for migration operations.

use std::time::Duration;
use thiserror::Error;

/// Migration-specific errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// HTTP-level failure talking to the source or destination host.
    ///
    /// `status` is `None` when no response was received at all.
    #[error("Transport error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Transport {
        /// HTTP status, if a response arrived.
        status: Option<u16>,
        /// Masked diagnostic text.
        message: String,
    },

    /// External command exited with a non-zero status.
    #[error("Command failed: {command}\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}")]
    Execution {
        /// Masked command line.
        command: String,
        /// Masked standard output.
        stdout: String,
        /// Masked standard error.
        stderr: String,
    },

    /// External command did not finish in time and was killed.
    #[error("Command timed out after {}s: {command}", .timeout.as_secs())]
    ExecutionTimeout {
        /// Masked command line.
        command: String,
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// Missing or invalid configuration.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A repository or a destination response is unusable.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MigrationError {
    /// Build a transport error from a status code and a message.
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: crate::command::mask_credentials(&message.into()),
        }
    }

    /// Whether retrying the failed call may succeed.
    ///
    /// Connection failures, timeouts, 429 and 5xx responses are transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(code), ..
            } => is_transient_status(*code),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for MigrationError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest embeds the request URL in its Display output
        Self::transport(e.status().map(|s| s.as_u16()), e.to_string())
    }
}

/// Whether an HTTP status is worth retrying (429 and 5xx).
pub fn is_transient_status(code: u16) -> bool {
    code == 429 || (500..600).contains(&code)
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;
