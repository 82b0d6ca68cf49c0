//! Service start/stop
//!
//! Both directions act on every container labeled with the (project, service)
//! pair, attempt all of them, and report failures together afterwards.
//! Containers that were handled successfully are left as they are.

use std::path::Path;
use tracing::{info, warn};

use crate::domain::container::LiveContainer;
use crate::infra::{ContainerEngine, LabelFilter};

use super::error::{ContainerFailure, ProjectError};
use super::locator;
use super::materialize::{MaterializeRequest, Materializer};

/// What a start request ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Existing containers were started
    Started { started: usize, already_running: usize },
    /// No container existed; compose created them
    Materialized { output: String },
}

/// What a stop request ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    pub stopped: usize,
    pub already_stopped: usize,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Start,
    Stop,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Stop => "stop",
        }
    }

    /// Containers already in the target state are skipped
    fn needed(self, container: &LiveContainer) -> bool {
        match self {
            Action::Start => !container.state.is_running(),
            Action::Stop => container.state.is_running(),
        }
    }
}

/// Start a service, creating its containers through compose when none exist
pub async fn start_service(
    engine: &dyn ContainerEngine,
    materializer: &dyn Materializer,
    root: &Path,
    project: &str,
    service: &str,
) -> Result<StartOutcome, ProjectError> {
    locator::validate_name("service", service)?;

    let containers = engine
        .list_containers(&LabelFilter::service(project, service), true)
        .await?;

    if containers.is_empty() {
        let location = locator::resolve(root, project).await?;
        info!(
            project = %project,
            service = %service,
            "No containers for service, creating with docker compose"
        );
        let outcome = materializer
            .materialize(MaterializeRequest {
                project,
                service,
                project_dir: &location.dir,
                descriptor_file: location.descriptor_file_name(),
            })
            .await?;
        return Ok(StartOutcome::Materialized {
            output: outcome.output,
        });
    }

    let attempted = apply_all(engine, Action::Start, project, service, &containers).await?;
    Ok(StartOutcome::Started {
        started: attempted,
        already_running: containers.len() - attempted,
    })
}

/// Stop every running container of a service
///
/// Never falls back to compose: with no containers there is nothing to stop.
pub async fn stop_service(
    engine: &dyn ContainerEngine,
    project: &str,
    service: &str,
) -> Result<StopOutcome, ProjectError> {
    locator::validate_name("service", service)?;

    let containers = engine
        .list_containers(&LabelFilter::service(project, service), true)
        .await?;

    if containers.is_empty() {
        return Err(ProjectError::NotFound(format!(
            "Containers for service '{}' in project '{}'",
            service, project
        )));
    }

    let attempted = apply_all(engine, Action::Stop, project, service, &containers).await?;
    Ok(StopOutcome {
        stopped: attempted,
        already_stopped: containers.len() - attempted,
    })
}

/// Apply `action` to every container that needs it; returns how many were attempted
async fn apply_all(
    engine: &dyn ContainerEngine,
    action: Action,
    project: &str,
    service: &str,
    containers: &[LiveContainer],
) -> Result<usize, ProjectError> {
    let targets: Vec<&LiveContainer> = containers.iter().filter(|c| action.needed(c)).collect();
    let mut failures = Vec::new();

    for container in &targets {
        let result = match action {
            Action::Start => engine.start_container(&container.id).await,
            Action::Stop => engine.stop_container(&container.id).await,
        };

        if let Err(e) = result {
            warn!(
                project = %project,
                service = %service,
                container = %container.short_id(),
                error = %e,
                "Failed to {} container",
                action.verb()
            );
            failures.push(ContainerFailure {
                container: container.short_id().to_string(),
                cause: e.to_string(),
            });
        }
    }

    if !failures.is_empty() {
        return Err(ProjectError::PartialFailure {
            action: action.verb(),
            total: targets.len(),
            failures,
        });
    }

    info!(
        project = %project,
        service = %service,
        count = targets.len(),
        "Service {} completed",
        action.verb()
    );
    Ok(targets.len())
}
