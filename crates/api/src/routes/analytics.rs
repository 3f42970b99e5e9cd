//! Revenue analytics for SuperAdmins.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};

use domain::models::{
    PlatformRevenueTotals, RevenueReportResponse, TimeframeQuery, VendorRevenueSummary,
};
use persistence::repositories::OrderRepository;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::SuperAdmin;

/// Revenue report over completed orders: platform totals plus a per-vendor
/// breakdown ordered by gross revenue.
pub async fn revenue_report(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    Query(query): Query<TimeframeQuery>,
) -> Result<Json<RevenueReportResponse>, ApiError> {
    let since = query
        .lookback_days()
        .map(|days| Utc::now() - Duration::days(days));

    let repo = OrderRepository::new(state.pool.clone());
    let totals = repo.platform_totals(since).await?;
    let vendors = repo.vendor_revenue(since).await?;

    Ok(Json(RevenueReportResponse {
        timeframe: query.timeframe.clone(),
        totals: PlatformRevenueTotals {
            order_count: totals.order_count,
            gross_revenue_cents: totals.gross_revenue_cents,
            shipping_fees_cents: totals.shipping_fees_cents,
        },
        vendors: vendors
            .into_iter()
            .map(|row| VendorRevenueSummary {
                vendor_id: row.vendor_id,
                vendor_name: row.vendor_display_name,
                order_count: row.order_count,
                units_sold: row.units_sold,
                gross_revenue_cents: row.gross_revenue_cents,
                shipping_fees_cents: row.shipping_fees_cents,
            })
            .collect(),
    }))
}
