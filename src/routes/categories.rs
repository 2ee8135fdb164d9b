use crate::error::{AppError, AppResult};
use crate::models::{Category, CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest};
use crate::routes::helpers::{
    ensure_slug, pagination_headers, parse_object_id, parse_optional_object_id, require_admin,
};
use crate::routes::types::ListQuery;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use bson::doc;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::Collection;
use std::sync::Arc;
use validator::Validate;

use super::AppState;

/// Which tier of the category tree a router instance serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Category,
    Subcategory,
    Subsubcategory,
}

impl Level {
    fn name(&self) -> &'static str {
        match self {
            Level::Category => "category",
            Level::Subcategory => "subcategory",
            Level::Subsubcategory => "subsubcategory",
        }
    }

    fn collection(&self, state: &AppState) -> Collection<Category> {
        match self {
            Level::Category => state.db.categories(),
            Level::Subcategory => state.db.subcategories(),
            Level::Subsubcategory => state.db.subsubcategories(),
        }
    }

    /// Collection the parent id must exist in, if this tier has parents
    fn parent_collection(&self, state: &AppState) -> Option<Collection<Category>> {
        match self {
            Level::Category => None,
            Level::Subcategory => Some(state.db.categories()),
            Level::Subsubcategory => Some(state.db.subcategories()),
        }
    }
}

/// One router per tier, sharing the handler set
pub fn router(level: Level) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .layer(Extension(level))
}

async fn resolve_parent(
    state: &AppState,
    level: Level,
    raw: Option<&String>,
) -> AppResult<Option<bson::oid::ObjectId>> {
    let parent_id = parse_optional_object_id(raw, "parent")?;
    match (level.parent_collection(state), parent_id) {
        (None, Some(_)) => Err(AppError::Validation(format!(
            "A {} cannot have a parent",
            level.name()
        ))),
        (Some(_), None) => Err(AppError::Validation(format!(
            "A {} requires a parent id",
            level.name()
        ))),
        (Some(parents), Some(id)) => {
            parents
                .find_one(doc! { "_id": id })
                .await?
                .ok_or_else(|| AppError::NotFound(format!("parent {}", id.to_hex())))?;
            Ok(Some(id))
        }
        (None, None) => Ok(None),
    }
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Extension(level): Extension<Level>,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let (limit, offset) = query.bounds();

    let collection = level.collection(&state);
    let total = collection.count_documents(doc! {}).await?;
    let categories: Vec<Category> = collection
        .find(doc! {})
        .sort(doc! { "name": 1 })
        .skip(offset)
        .limit(limit)
        .await?
        .try_collect()
        .await?;

    let count = categories.len();
    let body: Vec<CategoryResponse> = categories.into_iter().map(Into::into).collect();

    Ok((pagination_headers(total, offset, count), Json(body)))
}

pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Extension(level): Extension<Level>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let oid = parse_object_id(&id, level.name())?;
    let category = level
        .collection(&state)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", level.name(), id)))?;

    Ok(Json(CategoryResponse::from(category)))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(level): Extension<Level>,
    headers: HeaderMap,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    ensure_slug(&payload.slug)?;

    let collection = level.collection(&state);
    if collection
        .find_one(doc! { "slug": &payload.slug })
        .await?
        .is_some()
    {
        return Err(AppError::Duplicate(format!(
            "{} slug {}",
            level.name(),
            payload.slug
        )));
    }

    let parent_id = resolve_parent(&state, level, payload.parent_id.as_ref()).await?;

    let mut category = Category {
        id: None,
        name: payload.name,
        slug: payload.slug,
        parent_id,
        created_at: Utc::now(),
    };

    let result = collection.insert_one(&category).await?;
    category.id = result.inserted_id.as_object_id();

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Extension(level): Extension<Level>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateCategoryRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let oid = parse_object_id(&id, level.name())?;
    let collection = level.collection(&state);

    let mut set = doc! {};
    if let Some(name) = payload.name {
        set.insert("name", name);
    }
    if let Some(slug) = payload.slug {
        ensure_slug(&slug)?;
        if collection
            .find_one(doc! { "slug": &slug, "_id": { "$ne": oid } })
            .await?
            .is_some()
        {
            return Err(AppError::Duplicate(format!("{} slug {}", level.name(), slug)));
        }
        set.insert("slug", slug);
    }
    if payload.parent_id.is_some() {
        let parent_id = resolve_parent(&state, level, payload.parent_id.as_ref()).await?;
        set.insert("parent_id", parent_id);
    }

    if set.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }

    let updated = collection
        .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", level.name(), id)))?;

    Ok(Json(CategoryResponse::from(updated)))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(level): Extension<Level>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    let oid = parse_object_id(&id, level.name())?;
    let result = level
        .collection(&state)
        .delete_one(doc! { "_id": oid })
        .await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound(format!("{} {}", level.name(), id)));
    }

    Ok(StatusCode::NO_CONTENT)
}
