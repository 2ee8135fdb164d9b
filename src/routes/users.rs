use crate::error::{AppError, AppResult};
use crate::models::{LoginRequest, LoginResponse, RegisterUserRequest, User, UserResponse};
use crate::routes::helpers::{pagination_headers, parse_object_id, require_admin};
use crate::routes::types::ListQuery;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
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
        .route("/", get(list_users))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/{id}", get(get_user).delete(delete_user))
}

/// Register a new account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUserRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let email = payload.email.trim().to_lowercase();
    let collection = state.db.users();

    if collection.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(AppError::Duplicate(format!("user {}", email)));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let mut user = User {
        id: None,
        name: payload.name,
        email,
        password_hash,
        is_admin: false,
        created_at: Utc::now(),
    };

    let result = collection.insert_one(&user).await?;
    user.id = result.inserted_id.as_object_id();

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Exchange credentials for a JWT
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let email = payload.email.trim().to_lowercase();

    // Same error for unknown email and bad password
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .db
        .users()
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(invalid)?;

    let valid = bcrypt::verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
    if !valid {
        return Err(invalid());
    }

    let user_id = user.id.map(|id| id.to_hex()).unwrap_or_default();
    let token = state
        .auth_service
        .generate_token(&user_id, &user.email, user.is_admin)?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// List accounts (back office)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    let (limit, offset) = query.bounds();

    let collection = state.db.users();
    let total = collection.count_documents(doc! {}).await?;
    let users: Vec<User> = collection
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .skip(offset)
        .limit(limit)
        .await?
        .try_collect()
        .await?;

    let count = users.len();
    let body: Vec<UserResponse> = users.into_iter().map(Into::into).collect();

    Ok((pagination_headers(total, offset, count), Json(body)))
}

/// Fetch a single account (back office)
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    let oid = parse_object_id(&id, "user")?;
    let user = state
        .db
        .users()
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;

    Ok(Json(UserResponse::from(user)))
}

/// Delete an account (back office)
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    let oid = parse_object_id(&id, "user")?;
    let result = state.db.users().delete_one(doc! { "_id": oid }).await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound(format!("user {}", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}
