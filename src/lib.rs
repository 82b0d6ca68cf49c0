//! Deployment Agent - compose 项目控制面
//!
//! 扫描项目根目录下的 compose 项目，与 docker 引擎中的容器对照，
//! 通过 HTTP API 暴露项目视图与服务启停。

pub mod error;
pub mod middleware;
pub mod infra;
pub mod domain;
pub mod config;
pub mod state;
pub mod api;
pub mod services;

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::EnvConfig;
use crate::state::{get_shutdown_token, trigger_shutdown, AppState};

/// 命令行覆盖的运行参数
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// `--port`，优先于 PORT 环境变量
    pub port_override: Option<u16>,
}

/// 加载配置并运行 HTTP 服务，直到收到 Ctrl+C
pub async fn run_agent(runtime: RuntimeConfig) -> anyhow::Result<()> {
    let mut config = EnvConfig::from_env()?;
    if let Some(port) = runtime.port_override {
        config.port = port;
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(AppState::new(config));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Deployment agent listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Deployment agent stopped");
    Ok(())
}

/// Ctrl+C 或全局 shutdown token 被触发时返回
async fn shutdown_signal() {
    let token = get_shutdown_token();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
            tracing::info!("Received Ctrl+C, shutting down");
            // 终止仍在运行的 docker compose 子进程
            trigger_shutdown();
        }
        _ = token.cancelled() => {}
    }
}
