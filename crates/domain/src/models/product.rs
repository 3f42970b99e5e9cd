//! Product domain models and the approval workflow API types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::user::UserBrief;

/// Review status of a product. Products start as `pending` and transition
/// exactly once to `approved` or `rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApprovalStatus::Pending),
            "approved" => Some(ApprovalStatus::Approved),
            "rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for vendor product submission.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    #[serde(default)]
    pub description: Option<String>,

    #[validate(custom(function = "shared::validation::validate_price_cents"))]
    pub price_cents: i64,

    #[validate(custom(function = "shared::validation::validate_stock"))]
    pub stock: i32,
}

/// Full product representation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub approval_status: ApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_comments: Option<String>,
    pub vendor: UserBrief,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Request body for approving a product. Comments are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveProductRequest {
    #[serde(default)]
    pub comments: Option<String>,
}

/// Request body for rejecting a product. Comments are mandatory and must
/// carry an actionable reason.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectProductRequest {
    #[validate(custom(function = "shared::validation::validate_rejection_comment"))]
    pub comments: String,
}

/// Confirmation payload returned by approve/reject.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalActionResponse {
    pub id: Uuid,
    pub title: String,
    pub status: ApprovalStatus,
    pub reviewed_at: DateTime<Utc>,
    pub reviewed_by: UserBrief,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// Query parameters for the pending/all listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    shared::pagination::DEFAULT_PAGE_SIZE
}

/// Pagination metadata for list responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: u32,
}

/// Response for the approval listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub pagination: PaginationMeta,
}

/// Query parameter for stats and revenue endpoints: a lookback window in
/// days, or `all` to disable the date filter.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeframeQuery {
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

fn default_timeframe() -> String {
    "all".to_string()
}

impl TimeframeQuery {
    /// Lookback window in days; `None` means no date filter.
    pub fn lookback_days(&self) -> Option<i64> {
        if self.timeframe.eq_ignore_ascii_case("all") {
            None
        } else {
            self.timeframe.parse::<i64>().ok().filter(|d| *d > 0)
        }
    }
}

/// Per-status counts in the stats view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

/// Approval latency summary in hours (approved_at - submitted_at).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalLatency {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hours: Option<f64>,
}

/// One entry in the recent approve/reject activity feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalActivityItem {
    pub product_id: Uuid,
    pub title: String,
    pub status: ApprovalStatus,
    pub reviewed_by: UserBrief,
    pub reviewed_at: DateTime<Utc>,
}

/// Response for the approval stats endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStatsResponse {
    pub timeframe: String,
    pub status_counts: StatusCounts,
    pub latency: ApprovalLatency,
    pub recent_activity: Vec<ApprovalActivityItem>,
}
