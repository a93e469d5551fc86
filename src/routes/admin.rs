//! Admin routes
//!
//! Technician verification and a global view of service requests. All routes
//! require the admin role from the token's `app_metadata`.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{DataResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAdmin;
use crate::domain::{
    RequestStatus, ReviewTechnicianInput, ServiceRequestFilter, TechnicianFilter,
    VerificationStatus,
};
use crate::error::{ApiError, ApiResult};
use crate::services::cache::keys;

// ============================================================================
// Query Types
// ============================================================================

// Flat fields: serde's flatten does not parse numbers out of query strings
#[derive(Debug, Deserialize, Default)]
pub struct TechnicianQueryParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
    pub specialty: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ServiceRequestQueryParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
    pub service_type: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ============================================================================
// Technician verification
// ============================================================================

/// GET /admin/technicians
///
/// Technicians filtered by verification status (default: pending), by name.
pub async fn list_technicians(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(params): Query<TechnicianQueryParams>,
) -> ApiResult<impl IntoResponse> {
    let verification_status = match non_empty(params.status) {
        None => Some(VerificationStatus::Pending),
        Some(s) if s.eq_ignore_ascii_case("all") => None,
        Some(s) => Some(
            VerificationStatus::parse(&s)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown verification status: {}", s)))?,
        ),
    };

    let filter = TechnicianFilter {
        verification_status,
        specialty: non_empty(params.specialty),
    };
    let pagination = PaginationParams {
        page: params.page,
        per_page: params.per_page,
    };

    let technicians = state.technicians.list_technicians(&filter).await?;
    let total = technicians.len() as u64;

    Ok(Paginated::new(pagination.slice(technicians), &pagination, total))
}

/// POST /admin/technicians/:id/review
pub async fn review_technician(
    State(state): State<Arc<AppState>>,
    admin: RequireAdmin,
    Path(technician_id): Path<Uuid>,
    Json(input): Json<ReviewTechnicianInput>,
) -> ApiResult<impl IntoResponse> {
    let decision = input
        .into_decision()
        .ok_or_else(|| ApiError::bad_request("Decision must be approve or reject"))?;

    let technician = state.verifier.review(technician_id, decision).await?;

    tracing::info!(
        admin_id = %admin.user_id,
        technician_id = %technician_id,
        status = %technician.verification_status,
        "Admin reviewed technician"
    );

    // The candidate pool changed, so cached recommendations are stale
    if let Some(cache) = &state.cache {
        if let Err(e) = cache.delete_pattern(&keys::recommendations_pattern()).await {
            tracing::warn!(error = %e, "Failed to invalidate recommendation cache");
        }
    }

    Ok(Json(DataResponse::new(technician)))
}

// ============================================================================
// Service requests
// ============================================================================

/// GET /admin/service-requests
pub async fn list_service_requests(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(params): Query<ServiceRequestQueryParams>,
) -> ApiResult<impl IntoResponse> {
    let status = non_empty(params.status)
        .map(|s| {
            RequestStatus::parse(&s)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown status: {}", s)))
        })
        .transpose()?;

    let filter = ServiceRequestFilter {
        status,
        service_type: non_empty(params.service_type),
    };
    let pagination = PaginationParams {
        page: params.page,
        per_page: params.per_page,
    };

    let (requests, total) = state
        .manager
        .list_requests(&filter, pagination.limit(), pagination.offset())
        .await?;

    Ok(Paginated::new(requests, &pagination, total))
}
