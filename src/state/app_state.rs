//! 应用状态

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 全局 shutdown token，用于优雅关闭所有后台任务
static GLOBAL_SHUTDOWN: std::sync::OnceLock<CancellationToken> = std::sync::OnceLock::new();

/// 获取全局 shutdown token
pub fn get_shutdown_token() -> CancellationToken {
    GLOBAL_SHUTDOWN
        .get_or_init(CancellationToken::new)
        .clone()
}

/// 触发全局 shutdown
pub fn trigger_shutdown() {
    if let Some(token) = GLOBAL_SHUTDOWN.get() {
        token.cancel();
    }
}

use crate::config::env::EnvConfig;
use crate::infra::{ContainerEngine, DockerCli};
use crate::services::projects::{ComposeCli, Materializer, ProjectService};

/// 应用状态
///
/// 只保存配置与协作者句柄；每个请求都重新读取磁盘与引擎。
pub struct AppState {
    /// API 密钥（未设置时不校验）
    pub api_key: Option<String>,
    /// 环境配置
    pub config: EnvConfig,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,
    /// 容器引擎
    pub engine: Arc<dyn ContainerEngine>,
    /// compose 项目服务
    pub projects: ProjectService,
}

impl AppState {
    /// 使用 docker CLI 创建应用状态
    pub fn new(config: EnvConfig) -> Self {
        let engine: Arc<dyn ContainerEngine> =
            Arc::new(DockerCli::new(config.docker_bin.clone(), config.docker_timeout));
        let materializer: Arc<dyn Materializer> = Arc::new(ComposeCli::new(
            config.docker_bin.clone(),
            config.compose_up_timeout,
            get_shutdown_token(),
        ));

        tracing::info!(
            port = config.port,
            projects_root = %config.projects_root.display(),
            docker_bin = %config.docker_bin,
            docker_timeout_secs = config.docker_timeout.as_secs(),
            compose_up_timeout_secs = config.compose_up_timeout.as_secs(),
            auth = config.api_key.is_some(),
            "Loaded configuration"
        );

        if config.api_key.is_none() {
            tracing::warn!("DEPLOY_AGENT_API_KEY is not set, API authentication is disabled");
        }

        Self::with_collaborators(config, engine, materializer)
    }

    /// 注入自定义引擎与 materializer
    pub fn with_collaborators(
        config: EnvConfig,
        engine: Arc<dyn ContainerEngine>,
        materializer: Arc<dyn Materializer>,
    ) -> Self {
        let projects =
            ProjectService::new(config.projects_root.clone(), engine.clone(), materializer);
        Self {
            api_key: config.api_key.clone(),
            config,
            started_at: Utc::now(),
            engine,
            projects,
        }
    }

    /// 已运行秒数
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
