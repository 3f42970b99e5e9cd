//! Order aggregate rows.
//!
//! Orders are written by the checkout flow; this crate only reads them
//! for revenue reporting, so no full row mapping is needed.

use sqlx::FromRow;
use uuid::Uuid;

/// Per-vendor revenue aggregate row.
#[derive(Debug, Clone, FromRow)]
pub struct VendorRevenueRow {
    pub vendor_id: Uuid,
    pub vendor_display_name: Option<String>,
    pub order_count: i64,
    pub units_sold: i64,
    pub gross_revenue_cents: i64,
    pub shipping_fees_cents: i64,
}

/// Platform-wide revenue totals row.
#[derive(Debug, Clone, FromRow)]
pub struct PlatformRevenueRow {
    pub order_count: i64,
    pub gross_revenue_cents: i64,
    pub shipping_fees_cents: i64,
}
