//! Signed media serving
//!
//! Stored media is private; the only way to read an object back is the
//! signed, expiring reference handed out at store time.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::services::Bucket;
use crate::AppState;

/// Query half of a signed media reference
#[derive(Debug, Deserialize)]
pub struct SignedRefQuery {
    pub expires: i64,
    pub sig: String,
}

/// GET /media/:bucket/:name?expires=..&sig=..
pub async fn serve_media(
    State(state): State<AppState>,
    Path((bucket, name)): Path<(String, String)>,
    Query(query): Query<SignedRefQuery>,
) -> ApiResult<Response> {
    let bucket = Bucket::parse(&bucket)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown bucket: {}", bucket)))?;

    if !state.media.verify(bucket, &name, query.expires, &query.sig) {
        return Err(ApiError::Forbidden(
            "Media reference is invalid or expired".to_string(),
        ));
    }

    let path = state
        .media
        .object_path(bucket, &name)
        .ok_or_else(|| ApiError::NotFound("Invalid object name".to_string()))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound(format!("Media object not found: {}", name)))?;

    let content_type = match bucket {
        Bucket::Audio => "audio/wav",
        Bucket::Images => "image/jpeg",
    };

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// Build media routes
pub fn media_routes() -> Router<AppState> {
    Router::new().route("/media/:bucket/:name", get(serve_media))
}
