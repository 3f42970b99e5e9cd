//! SuperAdmin product approval workflow.
//!
//! Approve and reject are single-shot transitions from `pending`. The
//! repository enforces this with a conditional update; when it reports no
//! row changed, the handler re-reads the status to tell "already reviewed"
//! apart from "no such product". Vendor notifications are best-effort and
//! never fail the request.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use domain::models::{
    ApprovalActionResponse, ApprovalActivityItem, ApprovalLatency, ApprovalListQuery,
    ApprovalStatsResponse, ApprovalStatus, ApproveProductRequest, PaginationMeta,
    ProductListResponse, RejectProductRequest, StatusCounts, TimeframeQuery, UserBrief,
};
use persistence::entities::{ApprovalStatusDb, ProductEntity};
use persistence::repositories::{ProductRepository, UserRepository};
use shared::pagination::PageParams;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::SuperAdmin;
use crate::middleware::metrics::record_approval_decision;
use crate::routes::products::{approval_status, product_response};

const RECENT_ACTIVITY_LIMIT: i64 = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pending", get(list_pending))
        .route("/all", get(list_all))
        .route("/:product_id/approve", post(approve_product))
        .route("/:product_id/reject", post(reject_product))
        .route("/stats", get(approval_stats))
}

/// Review queue: pending products, newest submissions first.
async fn list_pending(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    Query(query): Query<ApprovalListQuery>,
) -> Result<Json<ProductListResponse>, ApiError> {
    list_filtered(&state, Some(ApprovalStatusDb::Pending), &query).await
}

/// Every product regardless of status, with an optional status filter.
async fn list_all(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    Query(query): Query<ApprovalListQuery>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let filter = match query.status.as_deref() {
        None | Some("all") => None,
        Some(s) => {
            let status = ApprovalStatus::parse(s)
                .ok_or_else(|| ApiError::Validation(format!("Invalid status filter '{}'", s)))?;
            Some(status_db(status))
        }
    };
    list_filtered(&state, filter, &query).await
}

async fn list_filtered(
    state: &AppState,
    filter: Option<ApprovalStatusDb>,
    query: &ApprovalListQuery,
) -> Result<Json<ProductListResponse>, ApiError> {
    let params = PageParams {
        page: query.page,
        limit: query.limit,
    }
    .normalized();

    let repo = ProductRepository::new(state.pool.clone());
    let products = repo
        .list_by_status(filter, params.limit(), params.offset())
        .await?;
    let total = repo.count_by_status(filter).await?;

    Ok(Json(ProductListResponse {
        products: products.into_iter().map(product_response).collect(),
        pagination: PaginationMeta {
            page: params.page,
            limit: params.limit,
            total,
            total_pages: params.total_pages(total),
        },
    }))
}

/// Approve a pending product. Comments are optional; the body may be
/// omitted entirely.
async fn approve_product(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
    Path(product_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ApprovalActionResponse>, ApiError> {
    let request = parse_approve_body(&body)?;

    let repo = ProductRepository::new(state.pool.clone());
    let product = match repo
        .approve(product_id, admin.user_id, request.comments.as_deref())
        .await?
    {
        Some(product) => product,
        None => return Err(review_conflict(&repo, product_id).await),
    };

    record_approval_decision("approved");
    info!(product_id = %product.id, reviewer_id = %admin.user_id, "Product approved");

    let users = UserRepository::new(state.pool.clone());
    notify_vendor(&state, &users, &product, ApprovalStatus::Approved).await;

    let reviewed_by = reviewer_brief(&users, admin.user_id).await;
    Ok(Json(action_response(
        product,
        ApprovalStatus::Approved,
        reviewed_by,
    )))
}

/// Reject a pending product with a mandatory reason.
async fn reject_product(
    State(state): State<AppState>,
    SuperAdmin(admin): SuperAdmin,
    Path(product_id): Path<Uuid>,
    Json(request): Json<RejectProductRequest>,
) -> Result<Json<ApprovalActionResponse>, ApiError> {
    request.validate()?;

    let repo = ProductRepository::new(state.pool.clone());
    let product = match repo
        .reject(product_id, admin.user_id, &request.comments)
        .await?
    {
        Some(product) => product,
        None => return Err(review_conflict(&repo, product_id).await),
    };

    record_approval_decision("rejected");
    info!(product_id = %product.id, reviewer_id = %admin.user_id, "Product rejected");

    let users = UserRepository::new(state.pool.clone());
    notify_vendor(&state, &users, &product, ApprovalStatus::Rejected).await;

    let reviewed_by = reviewer_brief(&users, admin.user_id).await;
    Ok(Json(action_response(
        product,
        ApprovalStatus::Rejected,
        reviewed_by,
    )))
}

/// Workflow stats: per-status counts, approval latency and recent activity
/// over the requested timeframe.
async fn approval_stats(
    State(state): State<AppState>,
    _admin: SuperAdmin,
    Query(query): Query<TimeframeQuery>,
) -> Result<Json<ApprovalStatsResponse>, ApiError> {
    let since = query
        .lookback_days()
        .map(|days| Utc::now() - Duration::days(days));

    let repo = ProductRepository::new(state.pool.clone());
    let counts = repo.status_counts(since).await?;
    let latency = repo.approval_latency(since).await?;
    let activity = repo.recent_activity(since, RECENT_ACTIVITY_LIMIT).await?;

    let mut status_counts = StatusCounts {
        pending: 0,
        approved: 0,
        rejected: 0,
    };
    for row in counts {
        match row.approval_status {
            ApprovalStatusDb::Pending => status_counts.pending = row.count,
            ApprovalStatusDb::Approved => status_counts.approved = row.count,
            ApprovalStatusDb::Rejected => status_counts.rejected = row.count,
        }
    }

    let recent_activity = activity
        .into_iter()
        .map(|row| ApprovalActivityItem {
            product_id: row.product_id,
            title: row.title,
            status: approval_status(row.approval_status),
            reviewed_by: UserBrief {
                id: row.approved_by,
                display_name: row.reviewer_display_name,
                email: None,
            },
            reviewed_at: row.reviewed_at,
        })
        .collect();

    Ok(Json(ApprovalStatsResponse {
        timeframe: query.timeframe.clone(),
        status_counts,
        latency: ApprovalLatency {
            avg_hours: latency.avg_hours,
            min_hours: latency.min_hours,
            max_hours: latency.max_hours,
        },
        recent_activity,
    }))
}

/// An absent body means "no comments". A body that is present but not
/// valid JSON is a validation error, not an empty request.
fn parse_approve_body(body: &[u8]) -> Result<ApproveProductRequest, ApiError> {
    if body.is_empty() {
        return Ok(ApproveProductRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))
}

/// Distinguish "already reviewed" (409 with the current status) from "no
/// such product" (404) after a conditional update changed nothing.
async fn review_conflict(repo: &ProductRepository, product_id: Uuid) -> ApiError {
    match repo.status_of(product_id).await {
        Ok(Some(status)) => ApiError::InvalidTransition {
            current: status.as_str().to_string(),
        },
        Ok(None) => ApiError::NotFound("Product not found".to_string()),
        Err(e) => e.into(),
    }
}

fn action_response(
    product: ProductEntity,
    status: ApprovalStatus,
    reviewed_by: UserBrief,
) -> ApprovalActionResponse {
    let reviewed_at = match status {
        ApprovalStatus::Rejected => product.rejected_at,
        _ => product.approved_at,
    }
    .unwrap_or(product.updated_at);

    ApprovalActionResponse {
        id: product.id,
        title: product.title,
        status,
        reviewed_at,
        reviewed_by,
        comments: product.approval_comments,
    }
}

async fn reviewer_brief(users: &UserRepository, reviewer_id: Uuid) -> UserBrief {
    let display_name = match users.find_by_id(reviewer_id).await {
        Ok(Some(user)) => Some(user.display_name),
        _ => None,
    };
    UserBrief {
        id: reviewer_id,
        display_name,
        email: None,
    }
}

async fn notify_vendor(
    state: &AppState,
    users: &UserRepository,
    product: &ProductEntity,
    decision: ApprovalStatus,
) {
    let vendor = match users.find_by_id(product.created_by).await {
        Ok(Some(vendor)) => vendor,
        Ok(None) => {
            warn!(product_id = %product.id, "Vendor not found for review notification");
            return;
        }
        Err(e) => {
            warn!(product_id = %product.id, error = %e, "Failed to load vendor for review notification");
            return;
        }
    };

    let result = match decision {
        ApprovalStatus::Rejected => {
            let comments = product.approval_comments.as_deref().unwrap_or_default();
            state
                .email
                .send_product_rejected_email(
                    &vendor.email,
                    Some(&vendor.display_name),
                    &product.title,
                    comments,
                )
                .await
        }
        _ => {
            state
                .email
                .send_product_approved_email(
                    &vendor.email,
                    Some(&vendor.display_name),
                    &product.title,
                    product.approval_comments.as_deref(),
                )
                .await
        }
    };

    if let Err(e) = result {
        warn!(product_id = %product.id, error = %e, "Failed to send review notification");
    }
}

fn status_db(status: ApprovalStatus) -> ApprovalStatusDb {
    match status {
        ApprovalStatus::Pending => ApprovalStatusDb::Pending,
        ApprovalStatus::Approved => ApprovalStatusDb::Approved,
        ApprovalStatus::Rejected => ApprovalStatusDb::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reviewed_product(status: ApprovalStatusDb) -> ProductEntity {
        let now = Utc::now();
        ProductEntity {
            id: Uuid::new_v4(),
            title: "Walnut desk".to_string(),
            description: None,
            price_cents: 45_000,
            stock: 3,
            created_by: Uuid::new_v4(),
            approval_status: status,
            approval_comments: Some("Looks good".to_string()),
            approved_by: Some(Uuid::new_v4()),
            submitted_at: now - Duration::hours(4),
            approved_at: (status == ApprovalStatusDb::Approved).then_some(now),
            rejected_at: (status == ApprovalStatusDb::Rejected).then_some(now),
            created_at: now - Duration::hours(4),
            updated_at: now,
        }
    }

    #[test]
    fn test_approve_body_absent_means_no_comments() {
        let request = parse_approve_body(b"").unwrap();
        assert_eq!(request.comments, None);
    }

    #[test]
    fn test_approve_body_empty_object_means_no_comments() {
        let request = parse_approve_body(b"{}").unwrap();
        assert_eq!(request.comments, None);
    }

    #[test]
    fn test_approve_body_carries_comments() {
        let request = parse_approve_body(br#"{"comments": "Looks good"}"#).unwrap();
        assert_eq!(request.comments.as_deref(), Some("Looks good"));
    }

    #[test]
    fn test_approve_body_malformed_json_is_rejected() {
        let result = parse_approve_body(br#"{"comments": }"#);
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_status_db_mapping_roundtrip() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(approval_status(status_db(status)), status);
        }
    }

    #[test]
    fn test_action_response_uses_approval_timestamp() {
        let product = reviewed_product(ApprovalStatusDb::Approved);
        let approved_at = product.approved_at.unwrap();

        let reviewer = UserBrief {
            id: Uuid::new_v4(),
            display_name: Some("Admin".to_string()),
            email: None,
        };
        let response = action_response(product, ApprovalStatus::Approved, reviewer);

        assert_eq!(response.status, ApprovalStatus::Approved);
        assert_eq!(response.reviewed_at, approved_at);
        assert_eq!(response.comments.as_deref(), Some("Looks good"));
    }

    #[test]
    fn test_action_response_uses_rejection_timestamp() {
        let product = reviewed_product(ApprovalStatusDb::Rejected);
        let rejected_at = product.rejected_at.unwrap();

        let reviewer = UserBrief {
            id: Uuid::new_v4(),
            display_name: None,
            email: None,
        };
        let response = action_response(product, ApprovalStatus::Rejected, reviewer);

        assert_eq!(response.reviewed_at, rejected_at);
    }
}
