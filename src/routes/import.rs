use crate::error::{AppError, AppResult};
use crate::models::{CreateProductRequest, ImportReport, Product};
use crate::routes::helpers::{ensure_slug, parse_optional_object_id, require_admin};
use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bson::doc;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use validator::Validate;

use super::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/products", post(import_products))
}

/// Bulk-load products from a JSON array. Each entry is validated
/// independently; bad entries are skipped and reported, good ones are
/// inserted in one batch.
pub async fn import_products(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Vec<CreateProductRequest>>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    if payload.is_empty() {
        return Err(AppError::Validation("Import payload is empty".to_string()));
    }

    let collection = state.db.products();
    let now = Utc::now();

    let mut batch = Vec::new();
    let mut errors = Vec::new();
    let mut seen_slugs: HashSet<String> = HashSet::new();

    for (index, entry) in payload.into_iter().enumerate() {
        if let Err(e) = entry.validate() {
            errors.push(format!("entry {}: {}", index, e));
            continue;
        }
        if let Err(e) = ensure_slug(&entry.slug) {
            errors.push(format!("entry {}: {}", index, e));
            continue;
        }
        if !seen_slugs.insert(entry.slug.clone()) {
            errors.push(format!("entry {}: duplicate slug '{}' in batch", index, entry.slug));
            continue;
        }
        if collection
            .find_one(doc! { "slug": &entry.slug })
            .await?
            .is_some()
        {
            errors.push(format!("entry {}: slug '{}' already exists", index, entry.slug));
            continue;
        }

        let product = match build_product(entry, now) {
            Ok(p) => p,
            Err(e) => {
                errors.push(format!("entry {}: {}", index, e));
                continue;
            }
        };
        batch.push(product);
    }

    let imported = if batch.is_empty() {
        0
    } else {
        collection.insert_many(&batch).await?.inserted_ids.len()
    };

    tracing::info!(imported, skipped = errors.len(), "Product import finished");

    Ok(Json(ImportReport {
        imported,
        skipped: errors.len(),
        errors,
    }))
}

fn build_product(
    entry: CreateProductRequest,
    now: chrono::DateTime<Utc>,
) -> AppResult<Product> {
    Ok(Product {
        id: None,
        category_id: parse_optional_object_id(entry.category_id.as_ref(), "category")?,
        subcategory_id: parse_optional_object_id(entry.subcategory_id.as_ref(), "subcategory")?,
        subsubcategory_id: parse_optional_object_id(
            entry.subsubcategory_id.as_ref(),
            "subsubcategory",
        )?,
        name: entry.name,
        slug: entry.slug,
        description: entry.description,
        price_cents: entry.price_cents,
        image_url: entry.image_url,
        image_public_id: entry.image_public_id,
        stock: entry.stock,
        available: entry.available,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(slug: &str) -> CreateProductRequest {
        CreateProductRequest {
            name: "Lamb skewers".to_string(),
            slug: slug.to_string(),
            description: None,
            price_cents: 1500,
            category_id: None,
            subcategory_id: None,
            subsubcategory_id: None,
            image_url: None,
            image_public_id: None,
            stock: 10,
            available: true,
        }
    }

    #[test]
    fn test_build_product_carries_fields() {
        let now = Utc::now();
        let product = build_product(entry("lamb-skewers"), now).unwrap();
        assert_eq!(product.slug, "lamb-skewers");
        assert_eq!(product.price_cents, 1500);
        assert_eq!(product.created_at, now);
        assert!(product.id.is_none());
    }

    #[test]
    fn test_build_product_rejects_bad_category_id() {
        let mut bad = entry("lamb-skewers");
        bad.category_id = Some("not-an-id".to_string());
        assert!(build_product(bad, Utc::now()).is_err());
    }
}
