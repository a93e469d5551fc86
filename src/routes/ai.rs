//! Technician recommendations from the AI API.
//!
//! Only callers who can see the request may ask. Answers are cached in Redis
//! per request id and dropped whenever an admin reviews a technician.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::ai::{RecommendationResponse, ServiceRequestSummary, TechnicianSummary};
use crate::domain::{TechnicianFilter, VerificationStatus};
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestIdExt;
use crate::services::cache::keys;

/// GET /service-requests/:id/recommendations
pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(request_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let ai_client = state.ai_client.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Recommendations are not enabled".to_string())
    })?;

    let view = state.manager.get_request(&auth.actor(), request_id).await?;

    let cache_key = keys::recommendations(request_id);
    if let Some(cache) = &state.cache {
        if let Some(cached) = cache.get::<RecommendationResponse>(&cache_key).await {
            tracing::debug!(request_id = %request_id, "Returning cached recommendations");
            return Ok(Json(DataResponse::new(RecommendationResponse {
                cached: true,
                ..cached
            })));
        }
    }

    let service_type = view.request.service_type.as_str();
    let verified = state
        .technicians
        .list_technicians(&TechnicianFilter {
            verification_status: Some(VerificationStatus::Verified),
            specialty: None,
        })
        .await?;
    let candidates: Vec<TechnicianSummary> = verified
        .iter()
        .filter(|t| t.offers(service_type))
        .map(|t| TechnicianSummary::for_service(t, service_type))
        .collect();

    let recommendations = ai_client
        .recommend_technicians(
            &ServiceRequestSummary::from(&view.request),
            &candidates,
            headers.request_id(),
        )
        .await?;

    let response = RecommendationResponse {
        request_id,
        candidates: candidates.len(),
        recommendations,
        cached: false,
    };

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.set(&cache_key, &response).await {
            tracing::warn!(error = %e, "Failed to cache recommendations");
        }
    }

    Ok(Json(DataResponse::new(response)))
}
