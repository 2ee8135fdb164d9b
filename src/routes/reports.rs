use crate::error::AppResult;
use crate::models::{SalesReport, StatusCount};
use crate::routes::helpers::require_admin;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bson::{doc, Document};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Deserialize;
use std::sync::Arc;

use super::AppState;

/// Reporting window; both bounds optional
#[derive(Debug, Deserialize)]
pub struct SalesReportQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/sales", get(sales_report))
}

/// Aggregate orders in the window: count, revenue, per-status breakdown.
/// Cancelled orders count toward the breakdown but not toward revenue.
pub async fn sales_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SalesReportQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&headers, &state.auth_service)?;

    let mut range = doc! {};
    if let Some(from) = query.from {
        range.insert("$gte", from);
    }
    if let Some(to) = query.to {
        range.insert("$lte", to);
    }

    let mut pipeline = Vec::new();
    if !range.is_empty() {
        pipeline.push(doc! { "$match": { "created_at": range } });
    }
    pipeline.push(doc! {
        "$group": {
            "_id": "$status",
            "count": { "$sum": 1 },
            "revenue": { "$sum": "$total_cents" },
        }
    });

    let groups: Vec<Document> = state
        .db
        .orders()
        .aggregate(pipeline)
        .await?
        .try_collect()
        .await?;

    let mut report = SalesReport {
        orders: 0,
        revenue_cents: 0,
        by_status: Vec::new(),
    };

    for group in &groups {
        let status = group.get_str("_id").unwrap_or("unknown").to_string();
        let count = read_i64(group, "count");
        report.orders += count;
        if status != "cancelled" {
            report.revenue_cents += read_i64(group, "revenue");
        }
        report.by_status.push(StatusCount { status, count });
    }
    report.by_status.sort_by(|a, b| a.status.cmp(&b.status));

    Ok(Json(report))
}

/// Aggregation sums come back as Int32 or Int64 depending on the inputs
fn read_i64(doc: &Document, key: &str) -> i64 {
    doc.get_i64(key)
        .or_else(|_| doc.get_i32(key).map(i64::from))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_i64_from_int32() {
        let doc = doc! { "count": 42i32 };
        assert_eq!(read_i64(&doc, "count"), 42);
    }

    #[test]
    fn test_read_i64_from_int64() {
        let doc = doc! { "revenue": 125_000i64 };
        assert_eq!(read_i64(&doc, "revenue"), 125_000);
    }

    #[test]
    fn test_read_i64_missing_key() {
        let doc = doc! {};
        assert_eq!(read_i64(&doc, "count"), 0);
    }
}
