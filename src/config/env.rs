//! 环境变量配置加载

use anyhow::{bail, Context};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use self::constants::{
    DEFAULT_COMPOSE_UP_TIMEOUT_SECS, DEFAULT_DOCKER_BIN, DEFAULT_DOCKER_TIMEOUT_SECS, DEFAULT_PORT,
};

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// API 密钥（未设置时关闭认证）
    pub api_key: Option<String>,
    /// 服务监听端口
    pub port: u16,
    /// 项目根目录，每个子目录是一个 compose 项目
    pub projects_root: PathBuf,
    /// docker 可执行文件
    pub docker_bin: String,
    /// 单次 docker CLI 调用超时
    pub docker_timeout: Duration,
    /// `compose up` 兜底调用超时
    pub compose_up_timeout: Duration,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        if env::var("API_KEY").is_ok() && env::var("DEPLOY_AGENT_API_KEY").is_err() {
            warn!("Deprecated environment variable API_KEY detected. Please use DEPLOY_AGENT_API_KEY");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 通过自定义查找函数加载配置
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("DEPLOY_AGENT_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .filter(|k| !k.is_empty());

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT);

        let projects_root = lookup("PROJECTS_ROOT_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .context("PROJECTS_ROOT_PATH environment variable is not set")?;
        if !projects_root.is_dir() {
            bail!(
                "projects root path does not exist: {}",
                projects_root.display()
            );
        }

        let docker_bin = lookup("DOCKER_BIN")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DOCKER_BIN.to_string());

        let docker_timeout = Duration::from_secs(parse_or(
            &lookup,
            "DOCKER_TIMEOUT_SECS",
            DEFAULT_DOCKER_TIMEOUT_SECS,
        ));
        let compose_up_timeout = Duration::from_secs(parse_or(
            &lookup,
            "COMPOSE_UP_TIMEOUT_SECS",
            DEFAULT_COMPOSE_UP_TIMEOUT_SECS,
        ));

        Ok(Self {
            api_key,
            port,
            projects_root,
            docker_bin,
            docker_timeout,
            compose_up_timeout,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// 常量
pub mod constants {
    /// 默认监听端口
    pub const DEFAULT_PORT: u16 = 5000;

    /// 默认 docker 可执行文件
    pub const DEFAULT_DOCKER_BIN: &str = "docker";

    /// docker CLI 单次调用超时（秒）
    pub const DEFAULT_DOCKER_TIMEOUT_SECS: u64 = 30;

    /// compose up 超时（秒）
    pub const DEFAULT_COMPOSE_UP_TIMEOUT_SECS: u64 = 300; // 5 分钟

    /// 服务名
    pub const SERVICE_NAME: &str = "deployment-agent";

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
