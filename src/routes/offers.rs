use crate::error::{AppError, AppResult};
use crate::models::{CreateOfferRequest, Offer, OfferResponse, UpdateOfferRequest};
use crate::routes::helpers::{
    pagination_headers, parse_object_id, parse_optional_object_id, require_admin,
};
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
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::AppState;

/// Query parameters for listing offers
#[derive(Debug, Deserialize)]
pub struct OfferListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub active: Option<bool>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_offers).post(create_offer))
        .route(
            "/{id}",
            get(get_offer).put(update_offer).delete(delete_offer),
        )
}

pub async fn list_offers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OfferListQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0) as u64;

    let mut filter = doc! {};
    if let Some(active) = query.active {
        filter.insert("active", active);
    }

    let collection = state.db.offers();
    let total = collection.count_documents(filter.clone()).await?;
    let offers: Vec<Offer> = collection
        .find(filter)
        .sort(doc! { "starts_at": -1 })
        .skip(offset)
        .limit(limit)
        .await?
        .try_collect()
        .await?;

    let count = offers.len();
    let body: Vec<OfferResponse> = offers.into_iter().map(Into::into).collect();

    Ok((pagination_headers(total, offset, count), Json(body)))
}

pub async fn get_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let oid = parse_object_id(&id, "offer")?;
    let offer = state
        .db
        .offers()
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("offer {}", id)))?;

    Ok(Json(OfferResponse::from(offer)))
}

pub async fn create_offer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateOfferRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if payload.ends_at <= payload.starts_at {
        return Err(AppError::Validation(
            "Offer must end after it starts".to_string(),
        ));
    }

    let mut offer = Offer {
        id: None,
        title: payload.title,
        description: payload.description,
        discount_percent: payload.discount_percent,
        product_id: parse_optional_object_id(payload.product_id.as_ref(), "product")?,
        category_id: parse_optional_object_id(payload.category_id.as_ref(), "category")?,
        starts_at: payload.starts_at,
        ends_at: payload.ends_at,
        active: payload.active,
        created_at: Utc::now(),
    };

    let result = state.db.offers().insert_one(&offer).await?;
    offer.id = result.inserted_id.as_object_id();

    Ok((StatusCode::CREATED, Json(OfferResponse::from(offer))))
}

pub async fn update_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateOfferRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let oid = parse_object_id(&id, "offer")?;
    let collection = state.db.offers();

    let current = collection
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("offer {}", id)))?;

    // Window stays consistent whichever end moves
    let starts_at = payload.starts_at.unwrap_or(current.starts_at);
    let ends_at = payload.ends_at.unwrap_or(current.ends_at);
    if ends_at <= starts_at {
        return Err(AppError::Validation(
            "Offer must end after it starts".to_string(),
        ));
    }

    let mut set = doc! { "starts_at": starts_at, "ends_at": ends_at };
    if let Some(title) = payload.title {
        set.insert("title", title);
    }
    if let Some(description) = payload.description {
        set.insert("description", description);
    }
    if let Some(discount_percent) = payload.discount_percent {
        set.insert("discount_percent", discount_percent as i32);
    }
    if let Some(product_id) = parse_optional_object_id(payload.product_id.as_ref(), "product")? {
        set.insert("product_id", product_id);
    }
    if let Some(category_id) = parse_optional_object_id(payload.category_id.as_ref(), "category")? {
        set.insert("category_id", category_id);
    }
    if let Some(active) = payload.active {
        set.insert("active", active);
    }

    let updated = collection
        .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("offer {}", id)))?;

    Ok(Json(OfferResponse::from(updated)))
}

pub async fn delete_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    let oid = parse_object_id(&id, "offer")?;
    let result = state.db.offers().delete_one(doc! { "_id": oid }).await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound(format!("offer {}", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}
