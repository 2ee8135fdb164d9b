//! Integration tests for the Savora API surface.
//!
//! These tests build the real router with injected dependencies and a
//! lazy database handle, so routing, CORS, body limits and the error
//! envelope are exercised without a live MongoDB instance. Handlers
//! that would actually query the database are not driven here.

use axum_test::TestServer;
use http::{HeaderName, HeaderValue, Method};
use savora::auth::AuthService;
use savora::config::{Environment, RateLimitConfig};
use savora::db::Database;
use savora::routes::create_router;
use savora::state::AppState;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";
const BODY_LIMIT: usize = 10 * 1024 * 1024;

async fn test_server(allowed_origins: Vec<String>) -> TestServer {
    let db = Database::connect_lazy("mongodb://localhost:27017", "savora_test")
        .await
        .expect("lazy database handle");

    let state = Arc::new(AppState {
        db,
        media: None,
        auth_service: AuthService::new(TEST_JWT_SECRET.to_string(), 24),
        environment: Environment::Development,
        started_at: Instant::now(),
    });

    let router = create_router(
        state,
        allowed_origins,
        RateLimitConfig {
            requests_per_minute: 60_000,
            burst_size: 1_000,
        },
        BODY_LIMIT,
    );

    TestServer::new(router).expect("test server")
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_returns_ok_without_dependencies() {
        let server = test_server(Vec::new()).await;

        let response = server.get("/health").await;
        assert_eq!(response.status_code(), 200);

        let body: Value = response.json();
        assert_eq!(body["status"], "OK");
        assert_eq!(body["environment"], "development");
        assert!(body["uptime"].as_u64().is_some());
        assert!(body["timestamp"].is_string());
    }
}

mod fallback_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let server = test_server(Vec::new()).await;

        let response = server.get("/api/nonexistent").await;
        assert_eq!(response.status_code(), 404);

        let body: Value = response.json();
        assert_eq!(body["error"], "NOT_FOUND");
        assert!(body["message"].as_str().unwrap().contains("/api/nonexistent"));
    }

    #[tokio::test]
    async fn test_root_path_is_json_404() {
        let server = test_server(Vec::new()).await;

        let response = server.get("/").await;
        assert_eq!(response.status_code(), 404);

        let body: Value = response.json();
        assert!(body["message"].is_string());
    }
}

mod cors_tests {
    use super::*;

    const ORIGIN: HeaderName = HeaderName::from_static("origin");
    const REQUEST_METHOD: HeaderName = HeaderName::from_static("access-control-request-method");

    #[tokio::test]
    async fn test_preflight_allows_exactly_the_fixed_method_set() {
        let server = test_server(Vec::new()).await;

        let response = server
            .method(Method::OPTIONS, "/api/products")
            .add_header(ORIGIN, HeaderValue::from_static("https://shop.example.com"))
            .add_header(REQUEST_METHOD, HeaderValue::from_static("POST"))
            .await;

        let headers = response.headers();
        let allowed: HashSet<&str> = headers
            .get("access-control-allow-methods")
            .expect("allow-methods header")
            .to_str()
            .unwrap()
            .split(',')
            .map(str::trim)
            .collect();

        let expected: HashSet<&str> = ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"]
            .into_iter()
            .collect();
        assert_eq!(allowed, expected);

        // Credentialed requests stay disabled
        assert!(headers.get("access-control-allow-credentials").is_none());
    }

    #[tokio::test]
    async fn test_wildcard_policy_when_no_origins_configured() {
        let server = test_server(Vec::new()).await;

        let response = server
            .method(Method::OPTIONS, "/api/products")
            .add_header(ORIGIN, HeaderValue::from_static("https://anywhere.example"))
            .add_header(REQUEST_METHOD, HeaderValue::from_static("GET"))
            .await;

        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            HeaderValue::from_static("*")
        );
    }

    #[tokio::test]
    async fn test_configured_origin_is_echoed() {
        let server = test_server(vec!["https://shop.example.com".to_string()]).await;

        let response = server
            .method(Method::OPTIONS, "/api/products")
            .add_header(ORIGIN, HeaderValue::from_static("https://shop.example.com"))
            .add_header(REQUEST_METHOD, HeaderValue::from_static("GET"))
            .await;

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            HeaderValue::from_static("https://shop.example.com")
        );
    }

    #[tokio::test]
    async fn test_unlisted_origin_is_not_allowed() {
        let server = test_server(vec!["https://shop.example.com".to_string()]).await;

        let response = server
            .method(Method::OPTIONS, "/api/products")
            .add_header(ORIGIN, HeaderValue::from_static("https://evil.example.com"))
            .add_header(REQUEST_METHOD, HeaderValue::from_static("GET"))
            .await;

        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }
}

mod body_limit_tests {
    use super::*;

    #[tokio::test]
    async fn test_oversized_body_rejected_before_handlers() {
        let server = test_server(Vec::new()).await;

        // 11 MB JSON payload, over the 10 MB cap
        let body = format!("{{\"name\":\"{}\"}}", "a".repeat(11 * 1024 * 1024));

        let response = server
            .post("/api/products")
            .content_type("application/json")
            .bytes(body.into_bytes().into())
            .await;

        assert_eq!(response.status_code(), 413);
    }

    #[tokio::test]
    async fn test_small_body_reaches_the_handler() {
        let server = test_server(Vec::new()).await;

        // Parses fine and reaches the admin gate, which rejects it: the
        // 401 (not 413) proves the body made it through ingestion
        let response = server
            .post("/api/products")
            .json(&json!({
                "name": "Mezze platter",
                "slug": "mezze-platter",
                "price_cents": 1500,
            }))
            .await;

        assert_eq!(response.status_code(), 401);
    }
}

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_catalog_mutation_requires_token() {
        let server = test_server(Vec::new()).await;

        let response = server
            .post("/api/products")
            .json(&json!({
                "name": "Mezze platter",
                "slug": "mezze-platter",
                "price_cents": 1500,
            }))
            .await;

        assert_eq!(response.status_code(), 401);
        let body: Value = response.json();
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_non_admin_token_is_rejected() {
        let server = test_server(Vec::new()).await;
        let auth = AuthService::new(TEST_JWT_SECRET.to_string(), 24);
        let token = auth
            .generate_token("65f0a1b2c3d4e5f6a7b8c9d0", "customer@savora.test", false)
            .unwrap();

        let response = server
            .post("/api/products")
            .add_header(http::header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "name": "Mezze platter",
                "slug": "mezze-platter",
                "price_cents": 1500,
            }))
            .await;

        assert_eq!(response.status_code(), 401);
    }
}

mod uploads_tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_delete_answers_503_without_media_client() {
        let server = test_server(Vec::new()).await;
        let auth = AuthService::new(TEST_JWT_SECRET.to_string(), 24);
        let token = auth
            .generate_token("65f0a1b2c3d4e5f6a7b8c9d0", "admin@savora.test", true)
            .unwrap();

        let response = server
            .delete("/api/upload/banners/spring-menu")
            .add_header(http::header::AUTHORIZATION, bearer(&token))
            .await;

        assert_eq!(response.status_code(), 503);
        let body: Value = response.json();
        assert_eq!(body["error"], "MEDIA_UNAVAILABLE");
    }
}

/// Test module for response shapes shared with the storefront
mod type_tests {
    use super::*;

    #[test]
    fn test_error_response_format() {
        let error = json!({
            "error": "NOT_FOUND",
            "message": "Not found: GET /api/unknown"
        });

        assert_eq!(error["error"], "NOT_FOUND");
        assert!(error["message"].as_str().unwrap().contains("/api/unknown"));
    }

    #[test]
    fn test_create_order_request_shape() {
        let request = json!({
            "customer_name": "Amelie Laurent",
            "customer_email": "amelie@example.com",
            "items": [
                { "product_id": "65f0a1b2c3d4e5f6a7b8c9d0", "quantity": 2 }
            ]
        });

        assert_eq!(request["items"][0]["quantity"], 2);
        assert!(request["customer_phone"].is_null());
    }

    #[test]
    fn test_import_report_shape() {
        let report = json!({
            "imported": 12,
            "skipped": 2,
            "errors": ["entry 3: duplicate slug 'mezze-platter' in batch"]
        });

        assert_eq!(report["imported"], 12);
        assert_eq!(report["errors"].as_array().unwrap().len(), 1);
    }
}
