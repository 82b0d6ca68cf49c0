//! In-memory engine and materializer used by unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::domain::container::{
    ContainerDetails, ContainerState, ContainerStateDetails, ImageInfo, LiveContainer,
    PROJECT_LABEL, SERVICE_LABEL,
};
use crate::infra::{ContainerEngine, EngineError, LabelFilter};

use super::error::ProjectError;
use super::materialize::{MaterializeOutcome, MaterializeRequest, Materializer};

pub fn container(id: &str, project: &str, service: &str, state: ContainerState) -> LiveContainer {
    LiveContainer {
        id: id.to_string(),
        name: format!("/{}-{}-1", project, service),
        image: format!("{}:latest", service),
        state,
        status: String::new(),
        ports: vec![],
        labels: HashMap::from([
            (PROJECT_LABEL.to_string(), project.to_string()),
            (SERVICE_LABEL.to_string(), service.to_string()),
        ]),
    }
}

#[derive(Default)]
pub struct FakeEngine {
    containers: Mutex<Vec<LiveContainer>>,
    unavailable: bool,
    failures: Mutex<HashMap<String, String>>,
    started: Mutex<Vec<String>>,
    stopped: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn with(containers: Vec<LiveContainer>) -> Self {
        Self {
            containers: Mutex::new(containers),
            ..Default::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    /// Start/stop of `id` fails with `cause`
    pub fn fail_on(&self, id: &str, cause: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(id.to_string(), cause.to_string());
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }

    pub fn state_of(&self, id: &str) -> Option<ContainerState> {
        self.containers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.state.clone())
    }

    fn check_available(&self) -> Result<(), EngineError> {
        if self.unavailable {
            return Err(EngineError::Unavailable(
                "Cannot connect to the Docker daemon".to_string(),
            ));
        }
        Ok(())
    }

    fn transition(&self, id: &str, state: ContainerState) -> Result<(), EngineError> {
        if let Some(cause) = self.failures.lock().unwrap().get(id) {
            return Err(EngineError::Command(cause.clone()));
        }
        let mut containers = self.containers.lock().unwrap();
        let container = containers
            .iter_mut()
            .find(|c| c.id == id || c.short_id() == id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        container.state = state;
        Ok(())
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn list_containers(
        &self,
        filter: &LabelFilter,
        all: bool,
    ) -> Result<Vec<LiveContainer>, EngineError> {
        self.check_available()?;
        Ok(self
            .containers
            .lock()
            .unwrap()
            .iter()
            .filter(|c| filter.matches(&c.labels))
            .filter(|c| all || c.state.is_running())
            .cloned()
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, EngineError> {
        self.check_available()?;
        let containers = self.containers.lock().unwrap();
        let container = containers
            .iter()
            .find(|c| c.id == id || c.short_id() == id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        Ok(ContainerDetails {
            id: container.id.clone(),
            name: container.name.clone(),
            image: container.image.clone(),
            state: ContainerStateDetails {
                status: container.state.to_string(),
                running: container.state.is_running(),
                ..Default::default()
            },
            labels: container.labels.clone(),
            restart_policy: "no".to_string(),
            ..Default::default()
        })
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.check_available()?;
        self.started.lock().unwrap().push(id.to_string());
        self.transition(id, ContainerState::Running)
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        self.check_available()?;
        self.stopped.lock().unwrap().push(id.to_string());
        self.transition(id, ContainerState::Exited)
    }

    async fn list_images(&self) -> Result<Vec<ImageInfo>, EngineError> {
        self.check_available()?;
        Ok(vec![ImageInfo {
            id: "0123456789ab".to_string(),
            repository: "nginx".to_string(),
            tag: "alpine".to_string(),
            size: "43MB".to_string(),
            created: "2 weeks ago".to_string(),
        }])
    }
}

/// Owned copy of a `MaterializeRequest`
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub project: String,
    pub service: String,
    pub project_dir: PathBuf,
    pub descriptor_file: String,
}

#[derive(Default)]
pub struct FakeMaterializer {
    calls: Mutex<Vec<RecordedRequest>>,
    failure: Mutex<Option<(i32, String)>>,
}

impl FakeMaterializer {
    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Later calls exit with `code` and `output`
    pub fn fail_with(&self, code: i32, output: &str) {
        *self.failure.lock().unwrap() = Some((code, output.to_string()));
    }
}

#[async_trait]
impl Materializer for FakeMaterializer {
    async fn materialize(
        &self,
        request: MaterializeRequest<'_>,
    ) -> Result<MaterializeOutcome, ProjectError> {
        self.calls.lock().unwrap().push(RecordedRequest {
            project: request.project.to_string(),
            service: request.service.to_string(),
            project_dir: request.project_dir.to_path_buf(),
            descriptor_file: request.descriptor_file.to_string(),
        });

        if let Some((code, output)) = self.failure.lock().unwrap().clone() {
            return Err(ProjectError::ExternalTool {
                code: Some(code),
                output,
            });
        }

        Ok(MaterializeOutcome {
            output: format!("Container {}-{}-1  Started", request.project, request.service),
        })
    }
}
