use crate::auth::{AuthService, Claims};
use crate::error::{AppError, AppResult};
use axum::http::{header, HeaderName};
use bson::oid::ObjectId;
use regex::Regex;
use std::sync::LazyLock;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap());

pub(crate) const X_TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

/// Parse a hex document id from a path or payload
pub(crate) fn parse_object_id(raw: &str, what: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| AppError::Validation(format!("Invalid {} id", what)))
}

/// Parse an optional hex document id from a payload field
pub(crate) fn parse_optional_object_id(
    raw: Option<&String>,
    what: &str,
) -> AppResult<Option<ObjectId>> {
    raw.map(|s| parse_object_id(s, what)).transpose()
}

/// Slugs are lowercase kebab-case
pub(crate) fn ensure_slug(slug: &str) -> AppResult<()> {
    if SLUG_RE.is_match(slug) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Slug '{}' must be lowercase kebab-case",
            slug
        )))
    }
}

/// Helper to extract JWT claims from the Authorization header
pub(crate) fn extract_claims(
    headers: &axum::http::HeaderMap,
    auth_service: &AuthService,
) -> AppResult<Claims> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".to_string()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Expected a Bearer token".to_string()))?;

    auth_service.validate_token(token)
}

/// Admin gate for catalog and back-office mutations
pub(crate) fn require_admin(
    headers: &axum::http::HeaderMap,
    auth_service: &AuthService,
) -> AppResult<Claims> {
    let claims = extract_claims(headers, auth_service)?;
    if !claims.admin {
        return Err(AppError::Unauthorized("Admin access required".to_string()));
    }
    Ok(claims)
}

/// Pagination headers exposed through CORS for the storefront's tables
pub(crate) fn pagination_headers(
    total: u64,
    offset: u64,
    count: usize,
) -> [(HeaderName, String); 2] {
    let range = if count == 0 {
        format!("items */{}", total)
    } else {
        format!(
            "items {}-{}/{}",
            offset,
            offset + count as u64 - 1,
            total
        )
    };
    [
        (X_TOTAL_COUNT, total.to_string()),
        (header::CONTENT_RANGE, range),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_id_valid() {
        assert!(parse_object_id("65f0a1b2c3d4e5f6a7b8c9d0", "product").is_ok());
    }

    #[test]
    fn test_parse_object_id_invalid() {
        assert!(parse_object_id("nope", "product").is_err());
        assert!(parse_object_id("", "product").is_err());
    }

    #[test]
    fn test_ensure_slug_accepts_kebab() {
        assert!(ensure_slug("wedding-buffet").is_ok());
        assert!(ensure_slug("canape").is_ok());
        assert!(ensure_slug("menu-2024").is_ok());
    }

    #[test]
    fn test_ensure_slug_rejects_invalid() {
        assert!(ensure_slug("Wedding").is_err());
        assert!(ensure_slug("two words").is_err());
        assert!(ensure_slug("-leading").is_err());
        assert!(ensure_slug("trailing-").is_err());
        assert!(ensure_slug("").is_err());
    }

    #[test]
    fn test_pagination_headers_range() {
        let [(_, total), (_, range)] = pagination_headers(120, 40, 20);
        assert_eq!(total, "120");
        assert_eq!(range, "items 40-59/120");
    }

    #[test]
    fn test_pagination_headers_empty_page() {
        let [(_, total), (_, range)] = pagination_headers(5, 100, 0);
        assert_eq!(total, "5");
        assert_eq!(range, "items */5");
    }
}
