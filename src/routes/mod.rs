pub mod admin;
pub mod ai;
pub mod health;
pub mod me;
pub mod notifications;
pub mod service_requests;
pub mod technicians;

use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Protected routes
        .route("/me", get(me::get_me))
        // Service requests
        .route(
            "/service-requests",
            post(service_requests::create_service_request).get(service_requests::list_my_requests),
        )
        .route(
            "/service-requests/:request_id",
            get(service_requests::get_service_request),
        )
        .route(
            "/service-requests/:request_id/status",
            patch(service_requests::update_status),
        )
        .route(
            "/service-requests/:request_id/assign",
            post(service_requests::assign_technician),
        )
        .route(
            "/service-requests/:request_id/recommendations",
            get(ai::get_recommendations),
        )
        .route(
            "/technician/requests",
            get(service_requests::list_assigned_requests),
        )
        // Technician directory
        .route("/technicians", get(technicians::list_technicians))
        .route("/technicians/:technician_id", get(technicians::get_technician))
        // Admin
        .route("/admin/technicians", get(admin::list_technicians))
        .route(
            "/admin/technicians/:technician_id/review",
            post(admin::review_technician),
        )
        .route("/admin/service-requests", get(admin::list_service_requests))
        // Notifications
        .route("/notifications/email", post(notifications::send_email))
}
