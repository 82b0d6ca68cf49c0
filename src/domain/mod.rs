//! 领域模型模块
//!
//! 纯数据结构，不依赖 axum/tokio

pub mod container;
pub mod project;

// Re-exports for convenience
pub use container::{ContainerDetails, ContainerInfo, ContainerState, ImageInfo, LiveContainer};
pub use project::{
    ProjectContainer, ProjectEnvironment, ProjectInfo, ProjectNetwork, ProjectVolume, ServiceDef,
    ServiceStatus, ServiceView,
};
