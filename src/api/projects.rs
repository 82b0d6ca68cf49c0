//! Compose 项目 API
//!
//! 包含 /projects/* 端点

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::project::{
    ProjectContainer, ProjectEnvironment, ProjectNetwork, ProjectVolume, ProjectsResponse,
    ServiceActionResponse, ServiceView,
};
use crate::error::ApiResult;
use crate::middleware::RequireApiKey;
use crate::services::projects::StartOutcome;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ComposeResponse {
    content: String,
}

#[derive(Debug, Serialize)]
struct ProjectContainersResponse {
    containers: Vec<ProjectContainer>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct VolumesResponse {
    volumes: Vec<ProjectVolume>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct EnvironmentResponse {
    environment: Vec<ProjectEnvironment>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct NetworksResponse {
    networks: Vec<ProjectNetwork>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct ServicesResponse {
    services: Vec<ServiceView>,
    count: usize,
}

/// 创建项目路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/:name", get(get_project))
        .route("/projects/:name/compose", get(get_compose))
        .route("/projects/:name/containers", get(get_containers))
        .route("/projects/:name/volumes", get(get_volumes))
        .route("/projects/:name/environment", get(get_environment))
        .route("/projects/:name/networks", get(get_networks))
        .route("/projects/:name/services", get(get_services))
        .route(
            "/projects/:name/services/:service/start",
            post(start_service),
        )
        .route("/projects/:name/services/:service/stop", post(stop_service))
}

/// 列出项目
///
/// GET /projects
/// 需要 API Key
async fn list_projects(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let projects = state.projects.list_projects().await?;
    Ok(Json(ProjectsResponse {
        count: projects.len(),
        projects,
    }))
}

/// GET /projects/:name
async fn get_project(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.projects.get_project(&name).await?))
}

/// GET /projects/:name/compose
async fn get_compose(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let content = state.projects.get_compose(&name).await?;
    Ok(Json(ComposeResponse { content }))
}

/// GET /projects/:name/containers
async fn get_containers(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let containers = state.projects.get_containers(&name).await?;
    Ok(Json(ProjectContainersResponse {
        count: containers.len(),
        containers,
    }))
}

/// GET /projects/:name/volumes
async fn get_volumes(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let volumes = state.projects.get_volumes(&name).await?;
    Ok(Json(VolumesResponse {
        count: volumes.len(),
        volumes,
    }))
}

/// GET /projects/:name/environment
async fn get_environment(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let environment = state.projects.get_environment(&name).await?;
    Ok(Json(EnvironmentResponse {
        count: environment.len(),
        environment,
    }))
}

/// GET /projects/:name/networks
async fn get_networks(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let networks = state.projects.get_networks(&name).await?;
    Ok(Json(NetworksResponse {
        count: networks.len(),
        networks,
    }))
}

/// 服务声明与状态
///
/// GET /projects/:name/services
/// 需要 API Key
async fn get_services(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let services = state.projects.get_services(&name).await?;
    Ok(Json(ServicesResponse {
        count: services.len(),
        services,
    }))
}

/// 启动服务（没有容器时通过 docker compose 创建）
///
/// POST /projects/:name/services/:service/start
/// 需要 API Key
async fn start_service(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path((project, service)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.projects.start_service(&project, &service).await?;

    let (message, details) = match outcome {
        StartOutcome::Started {
            started,
            already_running,
        } => (
            format!(
                "Service '{}' started ({} started, {} already running)",
                service, started, already_running
            ),
            None,
        ),
        StartOutcome::Materialized { output } => (
            format!("Service '{}' created and started", service),
            Some(output),
        ),
    };

    Ok(Json(ServiceActionResponse {
        message,
        project,
        service,
        details,
    }))
}

/// 停止服务
///
/// POST /projects/:name/services/:service/stop
/// 需要 API Key
async fn stop_service(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Path((project, service)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.projects.stop_service(&project, &service).await?;

    Ok(Json(ServiceActionResponse {
        message: format!(
            "Service '{}' stopped ({} stopped, {} already stopped)",
            service, outcome.stopped, outcome.already_stopped
        ),
        project,
        service,
        details: None,
    }))
}
