//! Image API
//!
//! Endpoints:
//! - GET /images - List locally available images

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;

use crate::domain::container::ImagesResponse;
use crate::error::ApiResult;
use crate::middleware::RequireApiKey;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/images", get(list_images))
}

/// GET /images
async fn list_images(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let images = state.engine.list_images().await?;
    Ok(Json(ImagesResponse {
        count: images.len(),
        images,
    }))
}
