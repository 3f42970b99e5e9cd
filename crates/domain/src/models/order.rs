//! Order and revenue aggregation models.

use serde::Serialize;
use uuid::Uuid;

/// Read-only per-vendor revenue summary produced by the analytics
/// aggregation. Monetary values are in cents.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRevenueSummary {
    pub vendor_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    pub order_count: i64,
    pub units_sold: i64,
    pub gross_revenue_cents: i64,
    pub shipping_fees_cents: i64,
}

/// Platform-wide totals across all vendors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformRevenueTotals {
    pub order_count: i64,
    pub gross_revenue_cents: i64,
    pub shipping_fees_cents: i64,
}

/// Response for the revenue analytics endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReportResponse {
    pub timeframe: String,
    pub totals: PlatformRevenueTotals,
    pub vendors: Vec<VendorRevenueSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = VendorRevenueSummary {
            vendor_id: Uuid::new_v4(),
            vendor_name: Some("Acme Goods".to_string()),
            order_count: 12,
            units_sold: 30,
            gross_revenue_cents: 450_000,
            shipping_fees_cents: 12_000,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("grossRevenueCents").is_some());
        assert!(json.get("gross_revenue_cents").is_none());
    }
}
