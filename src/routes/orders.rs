use crate::error::{AppError, AppResult};
use crate::models::{
    CreateOrderRequest, Order, OrderItem, OrderResponse, OrderStatus, UpdateOrderStatusRequest,
};
use crate::routes::helpers::{pagination_headers, parse_object_id, require_admin};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use bson::doc;
use chrono::Utc;
use futures::TryStreamExt;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::AppState;

/// Query parameters for listing orders
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<OrderStatus>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/{id}", get(get_order).delete(delete_order))
        .route("/{id}/status", patch(update_order_status))
}

/// Create an order. Prices and the total are taken from the catalog,
/// never from the client.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let products = state.db.products();
    let mut items = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let oid = parse_object_id(&line.product_id, "product")?;
        let product = products
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {}", line.product_id)))?;

        if !product.available {
            return Err(AppError::Validation(format!(
                "Product '{}' is not available",
                product.name
            )));
        }

        items.push(OrderItem {
            product_id: oid,
            name: product.name,
            unit_price_cents: product.price_cents,
            quantity: line.quantity,
        });
    }

    let now = Utc::now();
    let mut order = Order {
        id: None,
        reference: generate_reference(),
        customer_name: payload.customer_name,
        customer_email: payload.customer_email,
        customer_phone: payload.customer_phone,
        delivery_address: payload.delivery_address,
        total_cents: order_total(&items),
        items,
        status: OrderStatus::Pending,
        notes: payload.notes,
        created_at: now,
        updated_at: now,
    };

    let result = state.db.orders().insert_one(&order).await?;
    order.id = result.inserted_id.as_object_id();

    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// List orders, optionally filtered by status (back office)
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<OrderListQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0) as u64;

    let mut filter = doc! {};
    if let Some(status) = query.status {
        filter.insert("status", status.as_str());
    }

    let collection = state.db.orders();
    let total = collection.count_documents(filter.clone()).await?;
    let orders: Vec<Order> = collection
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .skip(offset)
        .limit(limit)
        .await?
        .try_collect()
        .await?;

    let count = orders.len();
    let body: Vec<OrderResponse> = orders.into_iter().map(Into::into).collect();

    Ok((pagination_headers(total, offset, count), Json(body)))
}

/// Fetch a single order
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let oid = parse_object_id(&id, "order")?;
    let order = state
        .db
        .orders()
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {}", id)))?;

    Ok(Json(OrderResponse::from(order)))
}

/// Advance an order through its lifecycle
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    let oid = parse_object_id(&id, "order")?;
    let collection = state.db.orders();

    let order = collection
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {}", id)))?;

    if !order.status.can_transition_to(payload.status) {
        return Err(AppError::Validation(format!(
            "Cannot move order from {} to {}",
            order.status.as_str(),
            payload.status.as_str()
        )));
    }

    let updated = collection
        .find_one_and_update(
            doc! { "_id": oid },
            doc! { "$set": { "status": payload.status.as_str(), "updated_at": Utc::now() } },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {}", id)))?;

    Ok(Json(OrderResponse::from(updated)))
}

/// Delete an order (back office)
pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    let oid = parse_object_id(&id, "order")?;
    let result = state.db.orders().delete_one(doc! { "_id": oid }).await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound(format!("order {}", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Sum of line totals; the client never supplies this
fn order_total(items: &[OrderItem]) -> i64 {
    items
        .iter()
        .map(|item| item.unit_price_cents * item.quantity)
        .sum()
}

/// Generate a customer-facing order reference
fn generate_reference() -> String {
    // No 0/O or 1/I so references survive being read over the phone
    const ALPHABET: &[char] = &[
        '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K',
        'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    ];
    format!("SV-{}", nanoid::nanoid!(8, ALPHABET))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    fn item(price: i64, qty: i64) -> OrderItem {
        OrderItem {
            product_id: ObjectId::new(),
            name: "Mezze platter".to_string(),
            unit_price_cents: price,
            quantity: qty,
        }
    }

    #[test]
    fn test_order_total() {
        let items = vec![item(1250, 2), item(800, 3)];
        assert_eq!(order_total(&items), 2 * 1250 + 3 * 800);
    }

    #[test]
    fn test_order_total_empty() {
        assert_eq!(order_total(&[]), 0);
    }

    #[test]
    fn test_generate_reference_shape() {
        let reference = generate_reference();
        assert!(reference.starts_with("SV-"));
        assert_eq!(reference.len(), 11);
        assert!(reference[3..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert!(!reference.contains('0'));
        assert!(!reference.contains('O'));
    }

    #[test]
    fn test_references_are_unique() {
        let a = generate_reference();
        let b = generate_reference();
        assert_ne!(a, b);
    }
}
