//! API Key 认证
//!
//! `RequireApiKey` 校验 `x-api-key` header；未配置 API key 时所有请求放行

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::HeaderMap, request::Parts},
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// 认证 header 名称
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
pub struct RequireApiKey;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match state.api_key.as_deref() {
            Some(expected) => verify_api_key(&parts.headers, expected),
            None => Ok(RequireApiKey),
        }
    }
}

/// header 缺失或不匹配时返回 401
pub fn verify_api_key(headers: &HeaderMap, expected_key: &str) -> Result<RequireApiKey, ApiError> {
    let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    if provided == Some(expected_key) {
        return Ok(RequireApiKey);
    }

    tracing::warn!(present = provided.is_some(), "Rejected request with invalid API key");
    Err(ApiError::unauthorized())
}
