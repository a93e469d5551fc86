//! Service request endpoints
//!
//! Thin HTTP layer over [`ServiceRequestManager`](crate::services::ServiceRequestManager).
//! Emails go out after the write succeeds and never affect the response.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::notifications::NotificationType;
use crate::domain::{AssignTechnicianInput, ServiceRequest, SubmitServiceRequestInput, UpdateStatusInput};
use crate::error::ApiResult;
use crate::services::{mailer, notifications};

fn notify(state: &AppState, kind: NotificationType, request: &ServiceRequest) {
    let message = match kind {
        NotificationType::RequestSubmitted => notifications::request_submitted(request),
        _ => notifications::request_status_changed(request),
    };
    if let Some(message) = message {
        mailer::dispatch(state.mailer.clone(), kind, message);
    }
}

/// POST /service-requests
pub async fn create_service_request(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(input): Json<SubmitServiceRequestInput>,
) -> ApiResult<impl IntoResponse> {
    let request = state
        .manager
        .submit_request(input, Some(auth.user_id))
        .await?;

    notify(&state, NotificationType::RequestSubmitted, &request);

    Ok(Created(request))
}

/// GET /service-requests
///
/// The caller's own requests, newest first.
pub async fn list_my_requests(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> ApiResult<impl IntoResponse> {
    let requests = state
        .manager
        .get_requests_for_user(Some(auth.user_id))
        .await?;

    Ok(Json(DataResponse::new(requests)))
}

/// GET /technician/requests
///
/// Requests assigned to the caller, newest first.
pub async fn list_assigned_requests(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> ApiResult<impl IntoResponse> {
    let requests = state
        .manager
        .get_requests_for_technician(Some(auth.user_id))
        .await?;

    Ok(Json(DataResponse::new(requests)))
}

/// GET /service-requests/:id
pub async fn get_service_request(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(request_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let view = state.manager.get_request(&auth.actor(), request_id).await?;
    Ok(Json(DataResponse::new(view)))
}

/// PATCH /service-requests/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(request_id): Path<Uuid>,
    Json(input): Json<UpdateStatusInput>,
) -> ApiResult<impl IntoResponse> {
    let updated = state
        .manager
        .update_request_status(&auth.actor(), request_id, &input.status)
        .await?;

    notify(&state, NotificationType::RequestStatusChanged, &updated);

    Ok(Json(DataResponse::new(updated)))
}

/// POST /service-requests/:id/assign
pub async fn assign_technician(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(request_id): Path<Uuid>,
    Json(input): Json<AssignTechnicianInput>,
) -> ApiResult<impl IntoResponse> {
    let updated = state
        .manager
        .assign_technician(&auth.actor(), request_id, input.technician_id)
        .await?;

    notify(&state, NotificationType::TechnicianAssigned, &updated);

    Ok(Json(DataResponse::new(updated)))
}
