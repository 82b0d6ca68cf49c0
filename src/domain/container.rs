//! 容器相关领域模型

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// compose 写入容器的项目标签
pub const PROJECT_LABEL: &str = "com.docker.compose.project";
/// compose 写入容器的服务标签
pub const SERVICE_LABEL: &str = "com.docker.compose.service";

/// 截断后的容器 ID 长度
const SHORT_ID_LEN: usize = 12;

/// 截断容器/镜像 ID（去掉 `sha256:` 前缀，保留 12 位）
pub fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// 引擎上报的容器状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown(String),
}

impl ContainerState {
    /// 从引擎文本解析（大小写不敏感）
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" => Self::Created,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "removing" => Self::Removing,
            "exited" => Self::Exited,
            "dead" => Self::Dead,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
            Self::Removing => "removing",
            Self::Exited => "exited",
            Self::Dead => "dead",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ContainerState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContainerState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// 引擎上报的容器（完整 ID）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    /// 引擎给出的可读状态，如 "Up 3 hours"
    pub status: String,
    pub ports: Vec<String>,
    pub labels: HashMap<String, String>,
}

impl LiveContainer {
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    /// compose 项目标签
    pub fn project(&self) -> Option<&str> {
        self.labels.get(PROJECT_LABEL).map(String::as_str)
    }

    /// compose 服务标签
    pub fn service(&self) -> Option<&str> {
        self.labels.get(SERVICE_LABEL).map(String::as_str)
    }
}

/// 容器列表项
#[derive(Debug, Clone, Serialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    pub status: String,
    pub ports: Vec<String>,
    pub labels: HashMap<String, String>,
}

impl From<&LiveContainer> for ContainerInfo {
    fn from(c: &LiveContainer) -> Self {
        Self {
            id: c.short_id().to_string(),
            name: c.name.trim_start_matches('/').to_string(),
            image: c.image.clone(),
            state: c.state.clone(),
            status: c.status.clone(),
            ports: c.ports.clone(),
            labels: c.labels.clone(),
        }
    }
}

/// 容器列表响应
#[derive(Debug, Serialize)]
pub struct ContainersResponse {
    pub containers: Vec<ContainerInfo>,
    pub count: usize,
}

/// 容器操作响应
#[derive(Debug, Serialize)]
pub struct ContainerActionResponse {
    pub message: String,
    pub id: String,
}

/// 容器详情（inspect）
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    pub image: String,
    pub image_id: String,
    pub created: String,
    pub platform: String,
    pub state: ContainerStateDetails,
    pub labels: HashMap<String, String>,
    pub mounts: Vec<MountInfo>,
    pub networks: HashMap<String, NetworkInfo>,
    pub env: Vec<String>,
    pub restart_policy: String,
    pub restart_count: i64,
}

/// inspect 中的状态块
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContainerStateDetails {
    pub status: String,
    pub running: bool,
    pub paused: bool,
    pub restarting: bool,
    pub oom_killed: bool,
    pub dead: bool,
    pub pid: i64,
    pub exit_code: i64,
    pub error: String,
    pub started_at: String,
    pub finished_at: String,
}

/// 挂载信息
#[derive(Debug, Clone, Default, Serialize)]
pub struct MountInfo {
    #[serde(rename = "type")]
    pub mount_type: String,
    pub source: String,
    pub destination: String,
    pub mode: String,
    pub rw: bool,
}

/// 容器网络端点
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkInfo {
    pub network_id: String,
    pub gateway: String,
    pub ip_address: String,
    pub ip_prefix_len: i64,
    pub mac_address: String,
}

/// 本地镜像
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub size: String,
    pub created: String,
}

/// 镜像列表响应
#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub images: Vec<ImageInfo>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parse_is_case_insensitive() {
        assert_eq!(ContainerState::parse("Running"), ContainerState::Running);
        assert_eq!(ContainerState::parse(" exited "), ContainerState::Exited);
        assert_eq!(
            ContainerState::parse("weird"),
            ContainerState::Unknown("weird".to_string())
        );
        assert!(ContainerState::parse("running").is_running());
        assert!(!ContainerState::parse("paused").is_running());
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&ContainerState::Restarting).unwrap();
        assert_eq!(json, "\"restarting\"");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef0123"), "0123456789ab");
        assert_eq!(short_id("sha256:0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_container_info_strips_leading_slash() {
        let live = LiveContainer {
            id: "0123456789abcdef".to_string(),
            name: "/blog-web-1".to_string(),
            image: "nginx".to_string(),
            state: ContainerState::Running,
            status: "Up 2 minutes".to_string(),
            ports: vec![],
            labels: HashMap::from([(SERVICE_LABEL.to_string(), "web".to_string())]),
        };

        let info = ContainerInfo::from(&live);
        assert_eq!(info.id, "0123456789ab");
        assert_eq!(info.name, "blog-web-1");
        assert_eq!(live.service(), Some("web"));
        assert_eq!(live.project(), None);
    }
}
