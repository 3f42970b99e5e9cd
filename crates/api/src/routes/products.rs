//! Public product catalogue and vendor submission routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::{
    ApprovalStatus, CreateProductRequest, PaginationMeta, ProductListResponse, ProductResponse,
    UserBrief, UserRole,
};
use persistence::entities::{ApprovalStatusDb, ProductWithVendorEntity};
use persistence::repositories::ProductRepository;
use shared::pagination::PageParams;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::feature_flags::REQUIRE_APPROVAL_FOR_NEW_PRODUCTS;

pub(crate) fn approval_status(db: ApprovalStatusDb) -> ApprovalStatus {
    match db {
        ApprovalStatusDb::Pending => ApprovalStatus::Pending,
        ApprovalStatusDb::Approved => ApprovalStatus::Approved,
        ApprovalStatusDb::Rejected => ApprovalStatus::Rejected,
    }
}

pub(crate) fn product_response(entity: ProductWithVendorEntity) -> ProductResponse {
    ProductResponse {
        id: entity.id,
        title: entity.title,
        description: entity.description,
        price_cents: entity.price_cents,
        stock: entity.stock,
        approval_status: approval_status(entity.approval_status),
        approval_comments: entity.approval_comments,
        vendor: UserBrief {
            id: entity.created_by,
            display_name: entity.vendor_display_name,
            email: entity.vendor_email,
        },
        submitted_at: entity.submitted_at,
        approved_at: entity.approved_at,
        rejected_at: entity.rejected_at,
        created_at: entity.created_at,
    }
}

/// Submit a new product listing.
///
/// With the approval workflow active the product starts in the pending
/// queue; otherwise it is live immediately, which matches the behavior
/// before the workflow existed.
pub async fn create_product(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    if !matches!(auth.role, UserRole::Vendor | UserRole::SuperAdmin) {
        return Err(ApiError::Forbidden(
            "Vendor account required to list products".to_string(),
        ));
    }
    request.validate()?;

    let requires_review = state.flags.is_product_approval_enabled()
        && state.flags.is_enabled(REQUIRE_APPROVAL_FOR_NEW_PRODUCTS)
        && !state.flags.should_auto_approve(&auth.user_id.to_string());
    let initial_status = if requires_review {
        ApprovalStatusDb::Pending
    } else {
        ApprovalStatusDb::Approved
    };

    let repo = ProductRepository::new(state.pool.clone());
    let created = repo
        .create(
            &request.title,
            request.description.as_deref(),
            request.price_cents,
            request.stock,
            auth.user_id,
            initial_status,
        )
        .await?;

    info!(
        product_id = %created.id,
        vendor_id = %auth.user_id,
        status = %created.approval_status.as_str(),
        "Product submitted"
    );

    let entity = repo
        .find_with_vendor(created.id)
        .await?
        .ok_or_else(|| ApiError::Internal("Created product row missing".to_string()))?;

    Ok((StatusCode::CREATED, Json(product_response(entity))))
}

/// Customer-facing catalogue. Only approved products are listed while the
/// approval feature is on.
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let params = params.normalized();
    let approved_only = state.flags.is_product_approval_enabled();

    let repo = ProductRepository::new(state.pool.clone());
    let products = repo
        .list_public(approved_only, params.limit(), params.offset())
        .await?;
    let total = repo.count_public(approved_only).await?;

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

/// Single product detail. Non-approved products are indistinguishable from
/// missing ones while the approval feature is on.
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let repo = ProductRepository::new(state.pool.clone());
    let entity = repo
        .find_with_vendor(product_id)
        .await?
        .ok_or_else(product_not_found)?;

    if state.flags.is_product_approval_enabled()
        && entity.approval_status != ApprovalStatusDb::Approved
    {
        return Err(product_not_found());
    }

    Ok(Json(product_response(entity)))
}

fn product_not_found() -> ApiError {
    ApiError::NotFound("Product not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entity(status: ApprovalStatusDb) -> ProductWithVendorEntity {
        let now = Utc::now();
        ProductWithVendorEntity {
            id: Uuid::new_v4(),
            title: "Walnut desk".to_string(),
            description: Some("Solid walnut".to_string()),
            price_cents: 45_000,
            stock: 3,
            created_by: Uuid::new_v4(),
            vendor_display_name: Some("Acme Goods".to_string()),
            vendor_email: Some("acme@example.com".to_string()),
            approval_status: status,
            approval_comments: None,
            approved_by: None,
            reviewer_display_name: None,
            submitted_at: now,
            approved_at: None,
            rejected_at: None,
            created_at: now,
        }
    }

    #[test]
    fn test_approval_status_mapping() {
        assert_eq!(
            approval_status(ApprovalStatusDb::Pending),
            ApprovalStatus::Pending
        );
        assert_eq!(
            approval_status(ApprovalStatusDb::Approved),
            ApprovalStatus::Approved
        );
        assert_eq!(
            approval_status(ApprovalStatusDb::Rejected),
            ApprovalStatus::Rejected
        );
    }

    #[test]
    fn test_product_response_carries_vendor_brief() {
        let source = entity(ApprovalStatusDb::Pending);
        let vendor_id = source.created_by;

        let response = product_response(source);
        assert_eq!(response.vendor.id, vendor_id);
        assert_eq!(response.vendor.display_name.as_deref(), Some("Acme Goods"));
        assert_eq!(response.approval_status, ApprovalStatus::Pending);
    }

    #[test]
    fn test_product_response_serializes_camel_case() {
        let json = serde_json::to_value(product_response(entity(ApprovalStatusDb::Approved)))
            .unwrap();
        assert!(json.get("priceCents").is_some());
        assert!(json.get("approvalStatus").is_some());
        assert!(json.get("price_cents").is_none());
    }
}
