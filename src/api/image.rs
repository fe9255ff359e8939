use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::warn;

use super::error::{ApiError, ApiResult};
use super::types::ImageQuery;
use crate::db::CelebrityRepo;
use crate::server::AppState;
use crate::util::{ImageResizerError, ResizeSpec};

/// Profile or cover image of a public celebrity, optionally resized.
pub async fn celebrity_image(
    State(state): State<AppState>,
    Path((slug, kind)): Path<(String, String)>,
    Query(query): Query<ImageQuery>,
) -> ApiResult<Response> {
    let celebrity = state.db.get_celebrity_by_slug(&slug).await?;
    if !celebrity.is_public() {
        return Err(ApiError::NotFound(format!("Celebrity not found: {}", slug)));
    }

    let url = match kind.as_str() {
        "profile" => celebrity.profile_image_url,
        "cover" => celebrity.cover_image_url,
        _ => return Err(ApiError::NotFound(format!("Unknown image kind: {}", kind))),
    }
    .ok_or_else(|| ApiError::NotFound(format!("No {} image for {}", kind, slug)))?;

    let source = state
        .image_resizer
        .source_for(&url)
        .ok_or_else(|| ApiError::NotFound(format!("Image unavailable for {}", slug)))?;

    let spec = ResizeSpec::new(query.width, query.height, query.quality);
    let path = state
        .image_resizer
        .variant(&source, spec)
        .await
        .map_err(|e| match e {
            ImageResizerError::NotFound(p) => ApiError::NotFound(format!("Image not found: {}", p)),
            ImageResizerError::Download(msg) => {
                warn!("Image download failed for {}: {}", slug, msg);
                ApiError::NotFound(format!("Image unavailable for {}", slug))
            }
            other => ApiError::Internal(other.to_string()),
        })?;

    let file = File::open(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to open {:?}: {}", path, e)))?;

    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        body,
    )
        .into_response())
}
