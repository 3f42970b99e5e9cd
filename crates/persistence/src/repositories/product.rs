//! Product repository for database operations.
//!
//! Approval transitions use a single conditional UPDATE so that two
//! concurrent reviews of the same product cannot both succeed: the losing
//! call sees zero affected rows and reports a conflict.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{
    ApprovalActivityRow, ApprovalLatencyRow, ApprovalStatusDb, ProductEntity,
    ProductWithVendorEntity, StatusCountRow,
};
use crate::metrics::QueryTimer;

const PRODUCT_WITH_VENDOR_COLUMNS: &str = r#"
    p.id, p.title, p.description, p.price_cents, p.stock,
    p.created_by, v.display_name AS vendor_display_name, v.email AS vendor_email,
    p.approval_status, p.approval_comments,
    p.approved_by, r.display_name AS reviewer_display_name,
    p.submitted_at, p.approved_at, p.rejected_at, p.created_at
"#;

/// Repository for product-related database operations.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Creates a new ProductRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a product for a vendor with the given initial status.
    ///
    /// The initial status is decided by the caller from the feature-flag
    /// configuration: `pending` when approval is required, `approved`
    /// otherwise (backward-compatibility default).
    pub async fn create(
        &self,
        title: &str,
        description: Option<&str>,
        price_cents: i64,
        stock: i32,
        created_by: Uuid,
        initial_status: ApprovalStatusDb,
    ) -> Result<ProductEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_product");
        let result = sqlx::query_as::<_, ProductEntity>(
            r#"
            INSERT INTO products (title, description, price_cents, stock, created_by, approval_status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, price_cents, stock, created_by,
                      approval_status, approval_comments, approved_by,
                      submitted_at, approved_at, rejected_at, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(price_cents)
        .bind(stock)
        .bind(created_by)
        .bind(initial_status)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a product by ID with vendor details joined.
    pub async fn find_with_vendor(
        &self,
        id: Uuid,
    ) -> Result<Option<ProductWithVendorEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_product_with_vendor");
        let result = sqlx::query_as::<_, ProductWithVendorEntity>(&format!(
            r#"
            SELECT {PRODUCT_WITH_VENDOR_COLUMNS}
            FROM products p
            JOIN users v ON p.created_by = v.id
            LEFT JOIN users r ON p.approved_by = r.id
            WHERE p.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Current approval status of a product, if it exists. Used to build
    /// precise conflict responses after a transition lost the race.
    pub async fn status_of(&self, id: Uuid) -> Result<Option<ApprovalStatusDb>, sqlx::Error> {
        let timer = QueryTimer::new("product_status_of");
        let result = sqlx::query_scalar::<_, ApprovalStatusDb>(
            "SELECT approval_status FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List products filtered by status, newest submissions first, with
    /// vendor details joined.
    pub async fn list_by_status(
        &self,
        status_filter: Option<ApprovalStatusDb>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProductWithVendorEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_products_by_status");
        let result = if let Some(status) = status_filter {
            sqlx::query_as::<_, ProductWithVendorEntity>(&format!(
                r#"
                SELECT {PRODUCT_WITH_VENDOR_COLUMNS}
                FROM products p
                JOIN users v ON p.created_by = v.id
                LEFT JOIN users r ON p.approved_by = r.id
                WHERE p.approval_status = $1
                ORDER BY p.submitted_at DESC
                LIMIT $2 OFFSET $3
                "#
            ))
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, ProductWithVendorEntity>(&format!(
                r#"
                SELECT {PRODUCT_WITH_VENDOR_COLUMNS}
                FROM products p
                JOIN users v ON p.created_by = v.id
                LEFT JOIN users r ON p.approved_by = r.id
                ORDER BY p.submitted_at DESC
                LIMIT $1 OFFSET $2
                "#
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
        };
        timer.record();
        result
    }

    /// Count products, optionally filtered by status.
    pub async fn count_by_status(
        &self,
        status_filter: Option<ApprovalStatusDb>,
    ) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_products_by_status");
        let result = if let Some(status) = status_filter {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM products WHERE approval_status = $1",
            )
            .bind(status)
            .fetch_one(&self.pool)
            .await
        } else {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
                .fetch_one(&self.pool)
                .await
        };
        timer.record();
        result
    }

    /// Customer-facing listing. When `approved_only` is set (approval
    /// feature enabled), non-approved products are excluded.
    pub async fn list_public(
        &self,
        approved_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProductWithVendorEntity>, sqlx::Error> {
        let status_filter = approved_only.then_some(ApprovalStatusDb::Approved);
        self.list_by_status(status_filter, limit, offset).await
    }

    /// Count for the customer-facing listing.
    pub async fn count_public(&self, approved_only: bool) -> Result<i64, sqlx::Error> {
        let status_filter = approved_only.then_some(ApprovalStatusDb::Approved);
        self.count_by_status(status_filter).await
    }

    /// Approve a pending product. Conditional on the row still being
    /// `pending`; returns `None` when the product is missing or was already
    /// reviewed. Clears any rejection timestamp so only the most recent
    /// action's timestamp is populated.
    pub async fn approve(
        &self,
        id: Uuid,
        approved_by: Uuid,
        comments: Option<&str>,
    ) -> Result<Option<ProductEntity>, sqlx::Error> {
        let timer = QueryTimer::new("approve_product");
        let result = sqlx::query_as::<_, ProductEntity>(
            r#"
            UPDATE products
            SET approval_status = 'approved', approval_comments = $3,
                approved_by = $2, approved_at = NOW(), rejected_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND approval_status = 'pending'
            RETURNING id, title, description, price_cents, stock, created_by,
                      approval_status, approval_comments, approved_by,
                      submitted_at, approved_at, rejected_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(approved_by)
        .bind(comments)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Reject a pending product. Mirrors `approve` with the rejection
    /// timestamp set and the approval timestamp cleared; comments are the
    /// primary payload of a rejection and are always stored.
    pub async fn reject(
        &self,
        id: Uuid,
        rejected_by: Uuid,
        comments: &str,
    ) -> Result<Option<ProductEntity>, sqlx::Error> {
        let timer = QueryTimer::new("reject_product");
        let result = sqlx::query_as::<_, ProductEntity>(
            r#"
            UPDATE products
            SET approval_status = 'rejected', approval_comments = $3,
                approved_by = $2, rejected_at = NOW(), approved_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND approval_status = 'pending'
            RETURNING id, title, description, price_cents, stock, created_by,
                      approval_status, approval_comments, approved_by,
                      submitted_at, approved_at, rejected_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(rejected_by)
        .bind(comments)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Counts grouped by approval status within the lookback window.
    pub async fn status_counts(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StatusCountRow>, sqlx::Error> {
        let timer = QueryTimer::new("product_status_counts");
        let result = if let Some(since) = since {
            sqlx::query_as::<_, StatusCountRow>(
                r#"
                SELECT approval_status, COUNT(*) AS count
                FROM products
                WHERE submitted_at >= $1
                GROUP BY approval_status
                "#,
            )
            .bind(since)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, StatusCountRow>(
                r#"
                SELECT approval_status, COUNT(*) AS count
                FROM products
                GROUP BY approval_status
                "#,
            )
            .fetch_all(&self.pool)
            .await
        };
        timer.record();
        result
    }

    /// Approval latency aggregate in hours over approved products within
    /// the lookback window.
    pub async fn approval_latency(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<ApprovalLatencyRow, sqlx::Error> {
        let timer = QueryTimer::new("product_approval_latency");
        let result = if let Some(since) = since {
            sqlx::query_as::<_, ApprovalLatencyRow>(
                r#"
                SELECT AVG(EXTRACT(EPOCH FROM (approved_at - submitted_at)) / 3600.0)::float8 AS avg_hours,
                       MIN(EXTRACT(EPOCH FROM (approved_at - submitted_at)) / 3600.0)::float8 AS min_hours,
                       MAX(EXTRACT(EPOCH FROM (approved_at - submitted_at)) / 3600.0)::float8 AS max_hours
                FROM products
                WHERE approval_status = 'approved' AND approved_at IS NOT NULL
                  AND submitted_at >= $1
                "#,
            )
            .bind(since)
            .fetch_one(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, ApprovalLatencyRow>(
                r#"
                SELECT AVG(EXTRACT(EPOCH FROM (approved_at - submitted_at)) / 3600.0)::float8 AS avg_hours,
                       MIN(EXTRACT(EPOCH FROM (approved_at - submitted_at)) / 3600.0)::float8 AS min_hours,
                       MAX(EXTRACT(EPOCH FROM (approved_at - submitted_at)) / 3600.0)::float8 AS max_hours
                FROM products
                WHERE approval_status = 'approved' AND approved_at IS NOT NULL
                "#,
            )
            .fetch_one(&self.pool)
            .await
        };
        timer.record();
        result
    }

    /// Recent approve/reject activity, most recent first.
    pub async fn recent_activity(
        &self,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<ApprovalActivityRow>, sqlx::Error> {
        let timer = QueryTimer::new("product_recent_activity");
        let result = if let Some(since) = since {
            sqlx::query_as::<_, ApprovalActivityRow>(
                r#"
                SELECT p.id AS product_id, p.title, p.approval_status,
                       p.approved_by, r.display_name AS reviewer_display_name,
                       COALESCE(p.approved_at, p.rejected_at) AS reviewed_at
                FROM products p
                JOIN users r ON p.approved_by = r.id
                WHERE p.approval_status != 'pending'
                  AND COALESCE(p.approved_at, p.rejected_at) >= $1
                ORDER BY reviewed_at DESC
                LIMIT $2
                "#,
            )
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, ApprovalActivityRow>(
                r#"
                SELECT p.id AS product_id, p.title, p.approval_status,
                       p.approved_by, r.display_name AS reviewer_display_name,
                       COALESCE(p.approved_at, p.rejected_at) AS reviewed_at
                FROM products p
                JOIN users r ON p.approved_by = r.id
                WHERE p.approval_status != 'pending'
                ORDER BY reviewed_at DESC
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        };
        timer.record();
        result
    }
}
