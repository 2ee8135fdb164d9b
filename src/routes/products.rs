use crate::error::{AppError, AppResult};
use crate::models::{CreateProductRequest, Product, ProductResponse, UpdateProductRequest};
use crate::routes::helpers::{
    ensure_slug, pagination_headers, parse_object_id, parse_optional_object_id, require_admin,
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

/// Query parameters for listing products
#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Restrict to a category id (any of the three levels)
    pub category: Option<String>,
    /// Case-insensitive name search
    pub q: Option<String>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// List products with pagination and optional filters
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0) as u64;

    let mut filter = doc! {};
    if let Some(category) = &query.category {
        let id = parse_object_id(category, "category")?;
        filter.insert(
            "$or",
            vec![
                doc! { "category_id": id },
                doc! { "subcategory_id": id },
                doc! { "subsubcategory_id": id },
            ],
        );
    }
    if let Some(q) = &query.q {
        filter.insert("name", doc! { "$regex": q, "$options": "i" });
    }

    let collection = state.db.products();
    let total = collection.count_documents(filter.clone()).await?;
    let products: Vec<Product> = collection
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .skip(offset)
        .limit(limit)
        .await?
        .try_collect()
        .await?;

    let count = products.len();
    let body: Vec<ProductResponse> = products.into_iter().map(Into::into).collect();

    Ok((pagination_headers(total, offset, count), Json(body)))
}

/// Fetch a single product
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let oid = parse_object_id(&id, "product")?;
    let product = state
        .db
        .products()
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", id)))?;

    Ok(Json(ProductResponse::from(product)))
}

/// Create a product
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    ensure_slug(&payload.slug)?;

    let collection = state.db.products();
    if collection
        .find_one(doc! { "slug": &payload.slug })
        .await?
        .is_some()
    {
        return Err(AppError::Duplicate(format!("product slug {}", payload.slug)));
    }

    let now = Utc::now();
    let mut product = Product {
        id: None,
        name: payload.name,
        slug: payload.slug,
        description: payload.description,
        price_cents: payload.price_cents,
        category_id: parse_optional_object_id(payload.category_id.as_ref(), "category")?,
        subcategory_id: parse_optional_object_id(payload.subcategory_id.as_ref(), "subcategory")?,
        subsubcategory_id: parse_optional_object_id(
            payload.subsubcategory_id.as_ref(),
            "subsubcategory",
        )?,
        image_url: payload.image_url,
        image_public_id: payload.image_public_id,
        stock: payload.stock,
        available: payload.available,
        created_at: now,
        updated_at: now,
    };

    let result = collection.insert_one(&product).await?;
    product.id = result.inserted_id.as_object_id();

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

/// Patch a product; only supplied fields change
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let oid = parse_object_id(&id, "product")?;
    let collection = state.db.products();

    let mut set = doc! { "updated_at": Utc::now() };
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
            return Err(AppError::Duplicate(format!("product slug {}", slug)));
        }
        set.insert("slug", slug);
    }
    if let Some(description) = payload.description {
        set.insert("description", description);
    }
    if let Some(price_cents) = payload.price_cents {
        set.insert("price_cents", price_cents);
    }
    if let Some(category_id) = parse_optional_object_id(payload.category_id.as_ref(), "category")? {
        set.insert("category_id", category_id);
    }
    if let Some(subcategory_id) =
        parse_optional_object_id(payload.subcategory_id.as_ref(), "subcategory")?
    {
        set.insert("subcategory_id", subcategory_id);
    }
    if let Some(subsubcategory_id) =
        parse_optional_object_id(payload.subsubcategory_id.as_ref(), "subsubcategory")?
    {
        set.insert("subsubcategory_id", subsubcategory_id);
    }
    if let Some(image_url) = payload.image_url {
        set.insert("image_url", image_url);
    }
    if let Some(image_public_id) = payload.image_public_id {
        set.insert("image_public_id", image_public_id);
    }
    if let Some(stock) = payload.stock {
        set.insert("stock", stock);
    }
    if let Some(available) = payload.available {
        set.insert("available", available);
    }

    let updated = collection
        .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", id)))?;

    Ok(Json(ProductResponse::from(updated)))
}

/// Delete a product and, when possible, its hosted image
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    let oid = parse_object_id(&id, "product")?;
    let collection = state.db.products();

    let product = collection
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", id)))?;

    collection.delete_one(doc! { "_id": oid }).await?;

    // Image removal is best effort; a dangling image is not worth a 500
    if let (Some(media), Some(public_id)) = (&state.media, &product.image_public_id) {
        if let Err(e) = media.destroy_image(public_id).await {
            tracing::warn!("Failed to remove image {}: {}", public_id, e);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
