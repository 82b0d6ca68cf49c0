//! Project service errors

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::infra::EngineError;

/// One container that failed a start/stop attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerFailure {
    /// Short container id
    pub container: String,
    pub cause: String,
}

impl fmt::Display for ContainerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container {}: {}", self.container, self.cause)
    }
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("failed to parse compose file of project '{project}': {message}")]
    Parse { project: String, message: String },

    #[error("container engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("container engine error: {0}")]
    Engine(String),

    #[error("failed to {action} {} of {total} container(s)", .failures.len())]
    PartialFailure {
        action: &'static str,
        total: usize,
        failures: Vec<ContainerFailure>,
    },

    #[error("docker compose exited with {}", exit_label(.code))]
    ExternalTool { code: Option<i32>, output: String },

    #[error("docker compose timed out after {0:?}")]
    ToolTimeout(Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map(|c| format!("status {}", c))
        .unwrap_or_else(|| "signal".to_string())
}

impl ProjectError {
    /// Per-container failures, newline separated
    pub fn failure_details(failures: &[ContainerFailure]) -> String {
        failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<EngineError> for ProjectError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable(msg) => Self::EngineUnavailable(msg),
            EngineError::NotFound(msg) => Self::NotFound(msg),
            other => Self::Engine(other.to_string()),
        }
    }
}
