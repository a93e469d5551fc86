//! Technician directory
//!
//! Non-admin callers only see verified technicians, plus their own record.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{TechnicianFilter, VerificationStatus};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize, Default)]
pub struct TechnicianQuery {
    pub specialty: Option<String>,
}

/// GET /technicians
pub async fn list_technicians(
    State(state): State<Arc<AppState>>,
    _auth: RequireAuth,
    Query(query): Query<TechnicianQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = TechnicianFilter {
        verification_status: Some(VerificationStatus::Verified),
        specialty: query.specialty.filter(|s| !s.trim().is_empty()),
    };

    let technicians = state.technicians.list_technicians(&filter).await?;
    Ok(Json(DataResponse::new(technicians)))
}

/// GET /technicians/:id
pub async fn get_technician(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(technician_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let technician = state
        .technicians
        .get_technician(technician_id)
        .await?
        .filter(|t| {
            t.verification_status == VerificationStatus::Verified
                || t.id == auth.user_id
                || auth.actor().is_admin()
        })
        .ok_or_else(|| ApiError::not_found("Technician not found"))?;

    Ok(Json(DataResponse::new(technician)))
}
