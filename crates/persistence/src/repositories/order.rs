//! Order repository: read-only revenue aggregation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::entities::{PlatformRevenueRow, VendorRevenueRow};
use crate::metrics::QueryTimer;

/// Repository for order-related reporting queries. The checkout flow that
/// writes orders lives outside this service.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Per-vendor revenue reduction over completed orders, highest gross
    /// revenue first.
    pub async fn vendor_revenue(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<VendorRevenueRow>, sqlx::Error> {
        let timer = QueryTimer::new("vendor_revenue");
        let result = if let Some(since) = since {
            sqlx::query_as::<_, VendorRevenueRow>(
                r#"
                SELECT o.vendor_id, u.display_name AS vendor_display_name,
                       COUNT(*) AS order_count,
                       COALESCE(SUM(o.quantity), 0)::bigint AS units_sold,
                       COALESCE(SUM(o.quantity * o.unit_price_cents), 0)::bigint AS gross_revenue_cents,
                       COALESCE(SUM(o.shipping_fee_cents), 0)::bigint AS shipping_fees_cents
                FROM orders o
                JOIN users u ON o.vendor_id = u.id
                WHERE o.status = 'completed' AND o.created_at >= $1
                GROUP BY o.vendor_id, u.display_name
                ORDER BY gross_revenue_cents DESC
                "#,
            )
            .bind(since)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, VendorRevenueRow>(
                r#"
                SELECT o.vendor_id, u.display_name AS vendor_display_name,
                       COUNT(*) AS order_count,
                       COALESCE(SUM(o.quantity), 0)::bigint AS units_sold,
                       COALESCE(SUM(o.quantity * o.unit_price_cents), 0)::bigint AS gross_revenue_cents,
                       COALESCE(SUM(o.shipping_fee_cents), 0)::bigint AS shipping_fees_cents
                FROM orders o
                JOIN users u ON o.vendor_id = u.id
                WHERE o.status = 'completed'
                GROUP BY o.vendor_id, u.display_name
                ORDER BY gross_revenue_cents DESC
                "#,
            )
            .fetch_all(&self.pool)
            .await
        };
        timer.record();
        result
    }

    /// Platform-wide totals over completed orders.
    pub async fn platform_totals(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<PlatformRevenueRow, sqlx::Error> {
        let timer = QueryTimer::new("platform_revenue_totals");
        let result = if let Some(since) = since {
            sqlx::query_as::<_, PlatformRevenueRow>(
                r#"
                SELECT COUNT(*) AS order_count,
                       COALESCE(SUM(quantity * unit_price_cents), 0)::bigint AS gross_revenue_cents,
                       COALESCE(SUM(shipping_fee_cents), 0)::bigint AS shipping_fees_cents
                FROM orders
                WHERE status = 'completed' AND created_at >= $1
                "#,
            )
            .bind(since)
            .fetch_one(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, PlatformRevenueRow>(
                r#"
                SELECT COUNT(*) AS order_count,
                       COALESCE(SUM(quantity * unit_price_cents), 0)::bigint AS gross_revenue_cents,
                       COALESCE(SUM(shipping_fee_cents), 0)::bigint AS shipping_fees_cents
                FROM orders
                WHERE status = 'completed'
                "#,
            )
            .fetch_one(&self.pool)
            .await
        };
        timer.record();
        result
    }
}
