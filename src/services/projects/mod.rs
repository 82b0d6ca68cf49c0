//! Compose 项目服务
//!
//! 把项目目录中的 compose 声明与引擎上报的容器对照，推导每个服务的状态，
//! 并负责服务启停（没有容器时交给 docker compose 创建）。
//!
//! 每次调用都重新读取 compose 文件、重新查询引擎，不做缓存。

pub mod error;
pub mod lifecycle;
pub mod locator;
pub mod materialize;
pub mod parser;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::domain::container::LiveContainer;
use crate::domain::project::{
    ProjectContainer, ProjectEnvironment, ProjectInfo, ProjectNetwork, ProjectVolume, ServiceView,
};
use crate::infra::{ContainerEngine, LabelFilter};

pub use error::{ContainerFailure, ProjectError};
pub use lifecycle::{StartOutcome, StopOutcome};
pub use locator::ProjectLocation;
pub use materialize::{ComposeCli, MaterializeOutcome, MaterializeRequest, Materializer};
pub use parser::ProjectDescriptor;

/// 项目服务
pub struct ProjectService {
    root: PathBuf,
    engine: Arc<dyn ContainerEngine>,
    materializer: Arc<dyn Materializer>,
}

impl ProjectService {
    pub fn new(
        root: impl Into<PathBuf>,
        engine: Arc<dyn ContainerEngine>,
        materializer: Arc<dyn Materializer>,
    ) -> Self {
        Self {
            root: root.into(),
            engine,
            materializer,
        }
    }

    /// 项目根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 列出所有项目
    pub async fn list_projects(&self) -> Result<Vec<ProjectInfo>, ProjectError> {
        let locations = locator::scan(&self.root).await?;
        let mut projects = Vec::with_capacity(locations.len());
        for location in locations {
            projects.push(self.summarize(&location).await);
        }
        Ok(projects)
    }

    /// 获取单个项目概要
    pub async fn get_project(&self, name: &str) -> Result<ProjectInfo, ProjectError> {
        let location = locator::resolve(&self.root, name).await?;
        Ok(self.summarize(&location).await)
    }

    /// compose 文件原文
    pub async fn get_compose(&self, name: &str) -> Result<String, ProjectError> {
        let location = locator::resolve(&self.root, name).await?;
        let content = tokio::fs::read(&location.descriptor).await?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }

    /// 项目下的容器（按项目标签过滤）
    pub async fn get_containers(&self, name: &str) -> Result<Vec<ProjectContainer>, ProjectError> {
        let containers = self
            .engine
            .list_containers(&LabelFilter::project(name), true)
            .await?;
        Ok(containers.iter().map(ProjectContainer::from).collect())
    }

    /// 声明的卷
    pub async fn get_volumes(&self, name: &str) -> Result<Vec<ProjectVolume>, ProjectError> {
        let descriptor = self.load(name).await?;
        Ok(descriptor
            .services
            .iter()
            .flat_map(|(service, def)| {
                def.volumes.iter().map(move |volume| ProjectVolume {
                    service: service.clone(),
                    volume: volume.clone(),
                })
            })
            .collect())
    }

    /// 声明的环境变量（无环境变量的服务不返回）
    pub async fn get_environment(
        &self,
        name: &str,
    ) -> Result<Vec<ProjectEnvironment>, ProjectError> {
        let descriptor = self.load(name).await?;
        Ok(descriptor
            .services
            .into_iter()
            .filter(|(_, def)| !def.environment.is_empty())
            .map(|(service, def)| ProjectEnvironment {
                service,
                env: def.environment,
            })
            .collect())
    }

    /// 顶层声明的网络
    pub async fn get_networks(&self, name: &str) -> Result<Vec<ProjectNetwork>, ProjectError> {
        Ok(self.load(name).await?.networks)
    }

    /// 服务声明 + 推导状态
    pub async fn get_services(&self, name: &str) -> Result<Vec<ServiceView>, ProjectError> {
        let descriptor = self.load(name).await?;
        let live = self.snapshot(name).await;
        let statuses =
            reconcile::derive_statuses(descriptor.services.keys().map(String::as_str), &live);

        Ok(descriptor
            .services
            .into_iter()
            .map(|(service, definition)| {
                let status = statuses[&service];
                ServiceView {
                    name: service,
                    definition,
                    status,
                }
            })
            .collect())
    }

    /// 启动服务
    pub async fn start_service(
        &self,
        project: &str,
        service: &str,
    ) -> Result<StartOutcome, ProjectError> {
        lifecycle::start_service(
            self.engine.as_ref(),
            self.materializer.as_ref(),
            &self.root,
            project,
            service,
        )
        .await
    }

    /// 停止服务
    pub async fn stop_service(
        &self,
        project: &str,
        service: &str,
    ) -> Result<StopOutcome, ProjectError> {
        lifecycle::stop_service(self.engine.as_ref(), project, service).await
    }

    /// 读取并解析 compose 文件
    async fn load(&self, name: &str) -> Result<ProjectDescriptor, ProjectError> {
        let location = locator::resolve(&self.root, name).await?;
        let content = tokio::fs::read(&location.descriptor).await?;
        parser::parse(&location.name, location.dir, &content)
    }

    /// 项目下的容器快照；引擎不可用时视为空
    async fn snapshot(&self, name: &str) -> Vec<LiveContainer> {
        match self
            .engine
            .list_containers(&LabelFilter::project(name), true)
            .await
        {
            Ok(containers) => containers,
            Err(e) => {
                warn!(project = %name, error = %e, "Failed to query containers, assuming none");
                Vec::new()
            }
        }
    }

    /// 项目概要；compose 文件无法解析时服务数记为 0
    async fn summarize(&self, location: &ProjectLocation) -> ProjectInfo {
        let service_count = match tokio::fs::read(&location.descriptor).await {
            Ok(content) => {
                match parser::parse(&location.name, location.dir.clone(), &content) {
                    Ok(descriptor) => descriptor.services.len(),
                    Err(e) => {
                        warn!(project = %location.name, error = %e, "Unparseable compose file");
                        0
                    }
                }
            }
            Err(e) => {
                warn!(project = %location.name, error = %e, "Failed to read compose file");
                0
            }
        };

        let live = self.snapshot(&location.name).await;
        let (containers_running, containers_stopped) = reconcile::count_containers(&live);

        ProjectInfo {
            name: location.name.clone(),
            path: location.dir.to_string_lossy().into_owned(),
            service_count,
            containers_running,
            containers_stopped,
        }
    }
}
