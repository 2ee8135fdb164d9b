use crate::error::{AppError, AppResult};
use crate::models::{SettingsResponse, StoreSettings, UpdateSettingsRequest};
use crate::routes::helpers::require_admin;
use axum::{
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bson::doc;
use std::sync::Arc;
use validator::Validate;

use super::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

/// Store settings live in a single document; defaults apply until the
/// back office saves them for the first time.
pub async fn get_settings(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let settings = state
        .db
        .settings()
        .find_one(doc! {})
        .await?
        .unwrap_or_default();

    Ok(Json(SettingsResponse::from(settings)))
}

/// Replace the settings document (back office)
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<UpdateSettingsRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let update = doc! {
        "$set": {
            "store_name": &payload.store_name,
            "contact_email": payload.contact_email.as_deref(),
            "contact_phone": payload.contact_phone.as_deref(),
            "currency": &payload.currency,
            "delivery_fee_cents": payload.delivery_fee_cents,
            "min_order_cents": payload.min_order_cents,
        }
    };

    state
        .db
        .settings()
        .update_one(doc! {}, update)
        .upsert(true)
        .await?;

    let settings = StoreSettings {
        id: None,
        store_name: payload.store_name,
        contact_email: payload.contact_email,
        contact_phone: payload.contact_phone,
        currency: payload.currency,
        delivery_fee_cents: payload.delivery_fee_cents,
        min_order_cents: payload.min_order_cents,
    };

    Ok(Json(SettingsResponse::from(settings)))
}
