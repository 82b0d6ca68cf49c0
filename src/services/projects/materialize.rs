//! Compose fallback for services that have no containers yet
//!
//! `Materializer` is the only path that hands control to an external process.
//! `ComposeCli` runs `docker compose -f <file> -p <project> up -d <service>`
//! inside the project directory with an explicit timeout. The child is killed
//! on timeout, on agent shutdown, and when the calling request is dropped.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::infra::command::{CommandError, CommandRunner};

use super::error::ProjectError;

/// Everything needed to create one service's containers
#[derive(Debug, Clone, Copy)]
pub struct MaterializeRequest<'a> {
    pub project: &'a str,
    pub service: &'a str,
    pub project_dir: &'a Path,
    /// Compose file name relative to `project_dir`
    pub descriptor_file: &'a str,
}

/// Result of a successful materialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeOutcome {
    /// Combined stdout/stderr of the tool
    pub output: String,
}

#[async_trait]
pub trait Materializer: Send + Sync {
    async fn materialize(
        &self,
        request: MaterializeRequest<'_>,
    ) -> Result<MaterializeOutcome, ProjectError>;
}

/// `docker compose up -d <service>`
#[derive(Debug, Clone)]
pub struct ComposeCli {
    docker_bin: String,
    timeout: Duration,
    shutdown: CancellationToken,
}

impl ComposeCli {
    pub fn new(docker_bin: impl Into<String>, timeout: Duration, shutdown: CancellationToken) -> Self {
        Self {
            docker_bin: docker_bin.into(),
            timeout,
            shutdown,
        }
    }

    fn args<'a>(request: &MaterializeRequest<'a>) -> [&'a str; 8] {
        [
            "compose",
            "-f",
            request.descriptor_file,
            "-p",
            request.project,
            "up",
            "-d",
            request.service,
        ]
    }
}

#[async_trait]
impl Materializer for ComposeCli {
    async fn materialize(
        &self,
        request: MaterializeRequest<'_>,
    ) -> Result<MaterializeOutcome, ProjectError> {
        let args = Self::args(&request);
        info!(
            project = %request.project,
            service = %request.service,
            timeout_secs = self.timeout.as_secs(),
            ">>> {} {}",
            self.docker_bin,
            args.join(" ")
        );

        let result = CommandRunner::run_combined(
            &self.docker_bin,
            &args,
            request.project_dir,
            &self.shutdown,
            self.timeout,
        )
        .await
        .map_err(|e| match e {
            CommandError::SpawnFailed(err) => ProjectError::EngineUnavailable(format!(
                "failed to run {}: {}",
                self.docker_bin, err
            )),
            CommandError::Timeout(d) => ProjectError::ToolTimeout(d),
            CommandError::Cancelled => ProjectError::Cancelled,
            CommandError::WaitFailed(err) => ProjectError::Io(err),
        })?;

        if !result.status.success() {
            warn!(
                project = %request.project,
                service = %request.service,
                code = ?result.status.code(),
                "docker compose up failed"
            );
            return Err(ProjectError::ExternalTool {
                code: result.status.code(),
                output: result.output,
            });
        }

        Ok(MaterializeOutcome {
            output: result.output,
        })
    }
}
