//! 容器管理 API
//!
//! 包含 /containers/* 端点

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::domain::container::{ContainerActionResponse, ContainerInfo, ContainersResponse};
use crate::error::{ApiError, ApiResult};
use crate::infra::LabelFilter;
use crate::middleware::RequireApiKey;
use crate::state::AppState;

/// 创建容器管理路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/containers", get(list_containers))
        .route("/containers/:id", get(inspect_container))
        .route("/containers/:id/start", post(start_container))
        .route("/containers/:id/stop", post(stop_container))
}

/// 容器 ID/名称不能被 docker CLI 当作参数
fn check_id(id: &str) -> ApiResult<()> {
    if id.is_empty() || id.starts_with('-') {
        return Err(ApiError::bad_request(format!("invalid container id '{}'", id)));
    }
    Ok(())
}

/// 列出所有容器
///
/// GET /containers
/// 需要 API Key
async fn list_containers(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let containers: Vec<ContainerInfo> = state
        .engine
        .list_containers(&LabelFilter::any(), true)
        .await?
        .iter()
        .map(ContainerInfo::from)
        .collect();

    Ok(Json(ContainersResponse {
        count: containers.len(),
        containers,
    }))
}

/// 容器详情
///
/// GET /containers/:id
/// 需要 API Key
async fn inspect_container(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    check_id(&id)?;
    let details = state.engine.inspect_container(&id).await?;
    Ok(Json(details))
}

/// 启动容器
///
/// POST /containers/:id/start
/// 需要 API Key
async fn start_container(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    check_id(&id)?;
    state.engine.start_container(&id).await?;
    info!(container = %id, "Container started");

    Ok(Json(ContainerActionResponse {
        message: "Container started".to_string(),
        id,
    }))
}

/// 停止容器
///
/// POST /containers/:id/stop
/// 需要 API Key
async fn stop_container(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    check_id(&id)?;
    state.engine.stop_container(&id).await?;
    info!(container = %id, "Container stopped");

    Ok(Json(ContainerActionResponse {
        message: "Container stopped".to_string(),
        id,
    }))
}
