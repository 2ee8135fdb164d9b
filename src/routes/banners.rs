use crate::error::{AppError, AppResult};
use crate::models::{Banner, BannerResponse, CreateBannerRequest, UpdateBannerRequest};
use crate::routes::helpers::{pagination_headers, parse_object_id, require_admin};
use crate::routes::types::ListQuery;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bson::doc;
use chrono::Utc;
use futures::TryStreamExt;
use std::sync::Arc;
use validator::Validate;

use super::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_banners).post(create_banner))
        .route(
            "/{id}",
            get(get_banner).put(update_banner).delete(delete_banner),
        )
}

/// List banners in display order
pub async fn list_banners(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = query.bounds();

    let collection = state.db.banners();
    let total = collection.count_documents(doc! {}).await?;
    let banners: Vec<Banner> = collection
        .find(doc! {})
        .sort(doc! { "position": 1 })
        .skip(offset)
        .limit(limit)
        .await?
        .try_collect()
        .await?;

    let count = banners.len();
    let body: Vec<BannerResponse> = banners.into_iter().map(Into::into).collect();

    Ok((pagination_headers(total, offset, count), Json(body)))
}

pub async fn get_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let oid = parse_object_id(&id, "banner")?;
    let banner = state
        .db
        .banners()
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("banner {}", id)))?;

    Ok(Json(BannerResponse::from(banner)))
}

pub async fn create_banner(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateBannerRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut banner = Banner {
        id: None,
        title: payload.title,
        image_url: payload.image_url,
        image_public_id: payload.image_public_id,
        link_url: payload.link_url,
        position: payload.position,
        active: payload.active,
        created_at: Utc::now(),
    };

    let result = state.db.banners().insert_one(&banner).await?;
    banner.id = result.inserted_id.as_object_id();

    Ok((StatusCode::CREATED, Json(BannerResponse::from(banner))))
}

pub async fn update_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateBannerRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let oid = parse_object_id(&id, "banner")?;

    let mut set = doc! {};
    if let Some(title) = payload.title {
        set.insert("title", title);
    }
    if let Some(image_url) = payload.image_url {
        set.insert("image_url", image_url);
    }
    if let Some(image_public_id) = payload.image_public_id {
        set.insert("image_public_id", image_public_id);
    }
    if let Some(link_url) = payload.link_url {
        set.insert("link_url", link_url);
    }
    if let Some(position) = payload.position {
        set.insert("position", position);
    }
    if let Some(active) = payload.active {
        set.insert("active", active);
    }

    if set.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }

    let updated = state
        .db
        .banners()
        .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("banner {}", id)))?;

    Ok(Json(BannerResponse::from(updated)))
}

/// Delete a banner and, when possible, its hosted image
pub async fn delete_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    let oid = parse_object_id(&id, "banner")?;
    let collection = state.db.banners();

    let banner = collection
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("banner {}", id)))?;

    collection.delete_one(doc! { "_id": oid }).await?;

    if let (Some(media), Some(public_id)) = (&state.media, &banner.image_public_id) {
        if let Err(e) = media.destroy_image(public_id).await {
            tracing::warn!("Failed to remove image {}: {}", public_id, e);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
