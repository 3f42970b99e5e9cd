//! Product entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for product approval status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
pub enum ApprovalStatusDb {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatusDb {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatusDb::Pending => "pending",
            ApprovalStatusDb::Approved => "approved",
            ApprovalStatusDb::Rejected => "rejected",
        }
    }
}

/// Database row mapping for the products table.
#[derive(Debug, Clone, FromRow)]
pub struct ProductEntity {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub created_by: Uuid,
    pub approval_status: ApprovalStatusDb,
    pub approval_comments: Option<String>,
    pub approved_by: Option<Uuid>,
    pub submitted_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product row extended with vendor (and optional reviewer) details for
/// listings.
#[derive(Debug, Clone, FromRow)]
pub struct ProductWithVendorEntity {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub created_by: Uuid,
    pub vendor_display_name: Option<String>,
    pub vendor_email: Option<String>,
    pub approval_status: ApprovalStatusDb,
    pub approval_comments: Option<String>,
    pub approved_by: Option<Uuid>,
    pub reviewer_display_name: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row for the per-status counts aggregate.
#[derive(Debug, Clone, FromRow)]
pub struct StatusCountRow {
    pub approval_status: ApprovalStatusDb,
    pub count: i64,
}

/// Row for the approval latency aggregate (hours).
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalLatencyRow {
    pub avg_hours: Option<f64>,
    pub min_hours: Option<f64>,
    pub max_hours: Option<f64>,
}

/// Row for the recent approve/reject activity feed.
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalActivityRow {
    pub product_id: Uuid,
    pub title: String,
    pub approval_status: ApprovalStatusDb,
    pub approved_by: Uuid,
    pub reviewer_display_name: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_str_forms() {
        assert_eq!(ApprovalStatusDb::Pending.as_str(), "pending");
        assert_eq!(ApprovalStatusDb::Approved.as_str(), "approved");
        assert_eq!(ApprovalStatusDb::Rejected.as_str(), "rejected");
    }
}
