//! 项目（compose）相关领域模型

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::container::{ContainerState, LiveContainer};

/// 服务运行状态（由声明与引擎快照推导，不存储）
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Running,
    Stopped,
    NotCreated,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::NotCreated => "not_created",
        }
    }
}

/// 归一化后的服务定义
///
/// 缺失或形状不符的字段一律为空值，不会导致解析失败。
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ServiceDef {
    pub image: String,
    /// build 上下文（字符串形式或 `build.context`）
    pub build: String,
    /// 原始端口声明，不做解析
    pub ports: Vec<String>,
    /// 空字符串值与"未声明"不同
    pub environment: BTreeMap<String, String>,
    pub volumes: Vec<String>,
    pub depends_on: BTreeSet<String>,
    pub networks: BTreeSet<String>,
    pub restart: String,
    pub command: String,
}

/// 顶层 networks 中声明的网络
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectNetwork {
    pub name: String,
    pub driver: String,
    pub config: serde_json::Value,
}

/// 项目概要
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectInfo {
    pub name: String,
    pub path: String,
    pub service_count: usize,
    pub containers_running: usize,
    pub containers_stopped: usize,
}

/// 项目列表响应
#[derive(Debug, Serialize)]
pub struct ProjectsResponse {
    pub projects: Vec<ProjectInfo>,
    pub count: usize,
}

/// 项目内容器视图
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectContainer {
    pub id: String,
    pub name: String,
    pub service: String,
    pub state: ContainerState,
    pub status: String,
}

impl From<&LiveContainer> for ProjectContainer {
    fn from(c: &LiveContainer) -> Self {
        Self {
            id: c.short_id().to_string(),
            name: c.name.trim_start_matches('/').to_string(),
            service: c.service().unwrap_or_default().to_string(),
            state: c.state.clone(),
            status: c.status.clone(),
        }
    }
}

/// 服务声明的卷
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectVolume {
    pub service: String,
    pub volume: String,
}

/// 服务声明的环境变量
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectEnvironment {
    pub service: String,
    pub env: BTreeMap<String, String>,
}

/// 声明 + 推导状态
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceView {
    pub name: String,
    #[serde(flatten)]
    pub definition: ServiceDef,
    pub status: ServiceStatus,
}

/// 服务启停响应
#[derive(Debug, Serialize)]
pub struct ServiceActionResponse {
    pub message: String,
    pub project: String,
    pub service: String,
    /// docker compose 输出（仅在创建容器时）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
