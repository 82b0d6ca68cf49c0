//! Docker 引擎客户端
//!
//! `ContainerEngine` 是引擎能力的窄接口，`DockerCli` 通过 docker CLI 实现它。
//! 项目服务只依赖 trait，测试中可注入假实现。

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::domain::container::{
    ContainerDetails, ContainerState, ContainerStateDetails, ImageInfo, LiveContainer, MountInfo,
    NetworkInfo, PROJECT_LABEL, SERVICE_LABEL,
};

use super::command::{CommandError, CommandRunner};

/// 引擎错误
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("container engine unavailable: {0}")]
    Unavailable(String),

    #[error("no such container: {0}")]
    NotFound(String),

    #[error("{0}")]
    Command(String),

    #[error("failed to decode engine output: {0}")]
    Decode(String),
}

/// 按标签过滤容器（所有标签需同时满足）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFilter {
    labels: Vec<(String, String)>,
}

impl LabelFilter {
    /// 匹配所有容器
    pub fn any() -> Self {
        Self::default()
    }

    /// compose 项目下的全部容器
    pub fn project(project: &str) -> Self {
        Self::any().with(PROJECT_LABEL, project)
    }

    /// compose 项目中某个服务的容器
    pub fn service(project: &str, service: &str) -> Self {
        Self::project(project).with(SERVICE_LABEL, service)
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.labels.push((key.to_string(), value.to_string()));
        self
    }

    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.labels
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }

    /// 转为 `docker ps --filter` 参数
    fn to_args(&self) -> Vec<String> {
        self.labels
            .iter()
            .flat_map(|(k, v)| ["--filter".to_string(), format!("label={}={}", k, v)])
            .collect()
    }
}

/// 容器引擎能力
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// 列出匹配标签的容器；`all` 为 true 时包含已停止容器
    async fn list_containers(
        &self,
        filter: &LabelFilter,
        all: bool,
    ) -> Result<Vec<LiveContainer>, EngineError>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    async fn stop_container(&self, id: &str) -> Result<(), EngineError>;

    async fn list_images(&self) -> Result<Vec<ImageInfo>, EngineError>;
}

/// 基于 docker CLI 的引擎实现
#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: String,
    timeout: Duration,
}

impl DockerCli {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    /// 执行 docker 子命令，返回 stdout
    async fn run(&self, args: &[&str]) -> Result<String, EngineError> {
        debug!(bin = %self.bin, ?args, "Running docker command");

        let output = CommandRunner::run_simple(&self.bin, args, self.timeout)
            .await
            .map_err(|e| match e {
                CommandError::SpawnFailed(err) => {
                    EngineError::Unavailable(format!("failed to run {}: {}", self.bin, err))
                }
                CommandError::Timeout(d) => {
                    EngineError::Unavailable(format!("docker did not respond within {:?}", d))
                }
                other => EngineError::Command(other.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// 根据 stderr 归类 docker 失败原因
fn classify_failure(stderr: String) -> EngineError {
    if stderr.contains("Cannot connect to the Docker daemon")
        || stderr.contains("error during connect")
    {
        EngineError::Unavailable(stderr)
    } else if stderr.contains("No such container") || stderr.contains("No such object") {
        EngineError::NotFound(stderr)
    } else {
        EngineError::Command(stderr)
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn list_containers(
        &self,
        filter: &LabelFilter,
        all: bool,
    ) -> Result<Vec<LiveContainer>, EngineError> {
        let filter_args = filter.to_args();
        let mut args = vec!["ps", "--no-trunc", "--format", "{{json .}}"];
        if all {
            args.push("-a");
        }
        args.extend(filter_args.iter().map(String::as_str));

        let stdout = self.run(&args).await?;
        parse_ps_output(&stdout)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, EngineError> {
        let stdout = self.run(&["container", "inspect", id]).await?;
        let mut records: Vec<InspectRecord> =
            serde_json::from_str(&stdout).map_err(|e| EngineError::Decode(e.to_string()))?;
        if records.is_empty() {
            return Err(EngineError::NotFound(id.to_string()));
        }
        Ok(records.swap_remove(0).into_details())
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.run(&["start", id]).await.map(|_| ())
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        self.run(&["stop", id]).await.map(|_| ())
    }

    async fn list_images(&self) -> Result<Vec<ImageInfo>, EngineError> {
        let stdout = self
            .run(&["images", "--no-trunc", "--format", "{{json .}}"])
            .await?;
        parse_images_output(&stdout)
    }
}

/// `docker ps --format '{{json .}}'` 的单行记录
#[derive(Debug, Deserialize)]
struct PsRecord {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Names", default)]
    names: String,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Ports", default)]
    ports: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

fn parse_ps_output(stdout: &str) -> Result<Vec<LiveContainer>, EngineError> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let record: PsRecord =
                serde_json::from_str(line).map_err(|e| EngineError::Decode(e.to_string()))?;
            Ok(LiveContainer {
                id: record.id,
                // 多个名称时取第一个
                name: record
                    .names
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches('/')
                    .to_string(),
                image: record.image,
                state: ContainerState::parse(&record.state),
                status: record.status,
                ports: record
                    .ports
                    .split(", ")
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect(),
                labels: parse_labels(&record.labels),
            })
        })
        .collect()
}

/// 解析 `k1=v1,k2=v2` 形式的标签
///
/// `docker ps` 用逗号拼接标签且不转义，值内的逗号（如 compose 的
/// `config_files=a.yml,b.yml`）会被拆开。不含 `=` 的片段并回上一个值；
/// 值内片段本身含 `=` 时仍无法区分。
fn parse_labels(raw: &str) -> HashMap<String, String> {
    let mut labels: HashMap<String, String> = HashMap::new();
    let mut last: Option<String> = None;

    for segment in raw.split(',') {
        match segment.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => {
                let key = k.trim().to_string();
                labels.insert(key.clone(), v.to_string());
                last = Some(key);
            }
            Some(_) => last = None,
            None => {
                if let Some(value) = last.as_ref().and_then(|k| labels.get_mut(k)) {
                    value.push(',');
                    value.push_str(segment);
                }
            }
        }
    }

    labels
}

#[derive(Debug, Deserialize)]
struct ImageRecord {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Repository", default)]
    repository: String,
    #[serde(rename = "Tag", default)]
    tag: String,
    #[serde(rename = "Size", default)]
    size: String,
    #[serde(rename = "CreatedAt", default)]
    created_at: String,
}

fn parse_images_output(stdout: &str) -> Result<Vec<ImageInfo>, EngineError> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let record: ImageRecord =
                serde_json::from_str(line).map_err(|e| EngineError::Decode(e.to_string()))?;
            Ok(ImageInfo {
                id: crate::domain::container::short_id(&record.id).to_string(),
                repository: record.repository,
                tag: record.tag,
                size: record.size,
                created: record.created_at,
            })
        })
        .collect()
}

/// `docker container inspect` 输出（只取需要的字段）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InspectRecord {
    id: String,
    name: String,
    created: String,
    image: String,
    platform: String,
    restart_count: i64,
    state: Option<InspectState>,
    config: Option<InspectConfig>,
    host_config: Option<InspectHostConfig>,
    mounts: Option<Vec<InspectMount>>,
    network_settings: Option<InspectNetworkSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InspectState {
    status: String,
    running: bool,
    paused: bool,
    restarting: bool,
    #[serde(rename = "OOMKilled")]
    oom_killed: bool,
    dead: bool,
    pid: i64,
    exit_code: i64,
    error: String,
    started_at: String,
    finished_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InspectConfig {
    image: String,
    env: Option<Vec<String>>,
    labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InspectHostConfig {
    restart_policy: Option<InspectRestartPolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InspectRestartPolicy {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InspectMount {
    #[serde(rename = "Type")]
    mount_type: String,
    source: String,
    destination: String,
    mode: String,
    #[serde(rename = "RW")]
    rw: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InspectNetworkSettings {
    networks: Option<HashMap<String, InspectEndpoint>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InspectEndpoint {
    #[serde(rename = "NetworkID")]
    network_id: String,
    #[serde(rename = "Gateway")]
    gateway: String,
    #[serde(rename = "IPAddress")]
    ip_address: String,
    #[serde(rename = "IPPrefixLen")]
    ip_prefix_len: i64,
    #[serde(rename = "MacAddress")]
    mac_address: String,
}

impl InspectRecord {
    fn into_details(self) -> ContainerDetails {
        let state = self.state.unwrap_or_default();
        let config = self.config.unwrap_or_default();

        let restart_policy = self
            .host_config
            .and_then(|h| h.restart_policy)
            .map(|p| p.name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "no".to_string());

        let mounts = self
            .mounts
            .unwrap_or_default()
            .into_iter()
            .map(|m| MountInfo {
                mount_type: m.mount_type,
                source: m.source,
                destination: m.destination,
                mode: m.mode,
                rw: m.rw,
            })
            .collect();

        let networks = self
            .network_settings
            .and_then(|n| n.networks)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, ep)| {
                (
                    name,
                    NetworkInfo {
                        network_id: ep.network_id,
                        gateway: ep.gateway,
                        ip_address: ep.ip_address,
                        ip_prefix_len: ep.ip_prefix_len,
                        mac_address: ep.mac_address,
                    },
                )
            })
            .collect();

        ContainerDetails {
            id: crate::domain::container::short_id(&self.id).to_string(),
            name: self.name.trim_start_matches('/').to_string(),
            image: config.image,
            image_id: self.image,
            created: self.created,
            platform: self.platform,
            state: ContainerStateDetails {
                status: state.status,
                running: state.running,
                paused: state.paused,
                restarting: state.restarting,
                oom_killed: state.oom_killed,
                dead: state.dead,
                pid: state.pid,
                exit_code: state.exit_code,
                error: state.error,
                started_at: state.started_at,
                finished_at: state.finished_at,
            },
            labels: config.labels.unwrap_or_default(),
            mounts,
            networks,
            env: config.env.unwrap_or_default(),
            restart_policy,
            restart_count: self.restart_count,
        }
    }
}
