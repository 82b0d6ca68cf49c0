//! 统一错误处理
//!
//! 提供 `ApiError` 枚举实现 `IntoResponse`，并负责把服务层错误映射为 HTTP 状态码

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::infra::EngineError;
use crate::services::projects::ProjectError;

/// API 错误响应结构
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// 统一 API 错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 401 - 未授权（API Key 无效或缺失）
    Unauthorized,
    /// 404 - 资源未找到
    NotFound(String),
    /// 400 - 请求无效
    BadRequest(String),
    /// 422 - compose 文件无法解析
    Unprocessable(String),
    /// 500 - 内部错误
    Internal(String),
    /// 500 - 部分容器操作失败，details 逐个列出
    PartialFailure { message: String, details: String },
    /// 502 - 外部工具（docker compose）失败，details 为工具输出
    BadGateway { message: String, details: String },
    /// 503 - 容器引擎不可用
    ServiceUnavailable(String),
    /// 504 - 外部工具超时
    GatewayTimeout(String),
}

impl ApiError {
    /// 创建未授权错误
    pub fn unauthorized() -> Self {
        Self::Unauthorized
    }

    /// 创建未找到错误
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// 创建请求无效错误
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// 创建服务不可用错误
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) | ApiError::PartialFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Unauthorized => {
                ErrorResponse::new("unauthorized", "Invalid or missing API key")
            }
            ApiError::NotFound(resource) => {
                ErrorResponse::new("not_found", format!("{} not found", resource))
            }
            ApiError::BadRequest(msg) => ErrorResponse::new("bad_request", msg),
            ApiError::Unprocessable(msg) => ErrorResponse::new("unprocessable", msg),
            ApiError::Internal(msg) => ErrorResponse::new("internal_error", msg),
            ApiError::PartialFailure { message, details } => {
                ErrorResponse::new("partial_failure", message).with_details(details)
            }
            ApiError::BadGateway { message, details } => {
                ErrorResponse::new("external_tool_failed", message).with_details(details)
            }
            ApiError::ServiceUnavailable(msg) => ErrorResponse::new("service_unavailable", msg),
            ApiError::GatewayTimeout(msg) => ErrorResponse::new("timeout", msg),
        };

        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::NotFound(r) => write!(f, "Not found: {}", r),
            ApiError::BadRequest(m) => write!(f, "Bad request: {}", m),
            ApiError::Unprocessable(m) => write!(f, "Unprocessable: {}", m),
            ApiError::Internal(m) => write!(f, "Internal error: {}", m),
            ApiError::PartialFailure { message, .. } => write!(f, "Partial failure: {}", message),
            ApiError::BadGateway { message, .. } => write!(f, "Bad gateway: {}", message),
            ApiError::ServiceUnavailable(m) => write!(f, "Service unavailable: {}", m),
            ApiError::GatewayTimeout(m) => write!(f, "Gateway timeout: {}", m),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ProjectError> for ApiError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::NotFound(resource) => Self::NotFound(resource),
            ProjectError::InvalidName(_) => Self::BadRequest(err.to_string()),
            ProjectError::Parse { .. } => Self::Unprocessable(err.to_string()),
            ProjectError::EngineUnavailable(_) => {
                error!(error = %err, "Container engine unavailable");
                Self::ServiceUnavailable(err.to_string())
            }
            ProjectError::PartialFailure { ref failures, .. } => Self::PartialFailure {
                details: ProjectError::failure_details(failures),
                message: err.to_string(),
            },
            ProjectError::ExternalTool { ref output, .. } => Self::BadGateway {
                details: output.clone(),
                message: err.to_string(),
            },
            ProjectError::ToolTimeout(_) => Self::GatewayTimeout(err.to_string()),
            ProjectError::Cancelled => Self::ServiceUnavailable(err.to_string()),
            ProjectError::Engine(_) | ProjectError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable(_) => {
                error!(error = %err, "Container engine unavailable");
                Self::ServiceUnavailable(err.to_string())
            }
            EngineError::NotFound(id) => Self::NotFound(format!("Container '{}'", id)),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 便捷类型别名
pub type ApiResult<T> = Result<T, ApiError>;
