use crate::error::{AppError, AppResult};
use crate::media::MediaClient;
use crate::routes::helpers::require_admin;
use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use super::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(upload_image))
        .route("/{*public_id}", delete(delete_image))
}

fn media_client(state: &AppState) -> AppResult<&MediaClient> {
    state.media.as_ref().ok_or(AppError::MediaUnavailable)
}

/// Accept a multipart image and push it to the image host.
/// Fields: `file` (required), `folder` (optional)
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;
    let media = media_client(&state)?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .unwrap_or("upload.bin")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid file field: {}", e)))?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("folder") => {
                folder = field.text().await.ok().filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    let uploaded = media
        .upload_image(bytes, &filename, folder.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "url": uploaded.url,
            "public_id": uploaded.public_id,
        })),
    ))
}

/// Remove a hosted image. The public id may contain folder separators.
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Path(public_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;
    let media = media_client(&state)?;

    media.destroy_image(&public_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
