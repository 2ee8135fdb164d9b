use serde::{Deserialize, Serialize};

/// Common pagination query parameters for list endpoints
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    /// Clamp to sane bounds: default 50 items, at most 100
    pub fn bounds(&self) -> (i64, u64) {
        let limit = self.limit.unwrap_or(50).clamp(1, 100);
        let offset = self.offset.unwrap_or(0).max(0) as u64;
        (limit, offset)
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub uptime: u64,
    pub environment: &'static str,
}
