//! Email proxy
//!
//! Lets an authenticated client send a single email through the configured
//! email API. Admins may write to any address; everyone else only to the
//! address on their own token. The send happens in the background and the
//! response only says the message was queued.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::api::Accepted;
use crate::app::AppState;
use crate::auth::{AuthContext, RequireAuth};
use crate::domain::notifications::{EmailMessage, NotificationType};
use crate::domain::UserRole;
use crate::error::{ApiError, ApiResult};
use crate::services::mailer;

#[derive(Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Admins reach anyone; other callers only their own mailbox
fn may_send_to(auth: &AuthContext, to: &str) -> bool {
    auth.role == UserRole::Admin
        || auth
            .email
            .as_deref()
            .is_some_and(|own| own.trim().eq_ignore_ascii_case(to.trim()))
}

/// POST /notifications/email
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Json(message): Json<EmailMessage>,
) -> ApiResult<impl IntoResponse> {
    message.validate()?;

    if !may_send_to(&auth, &message.to) {
        tracing::warn!(user_id = %auth.user_id, role = %auth.role, "Email to foreign address refused");
        return Err(ApiError::Forbidden(
            "You can only send email to your own address".to_string(),
        ));
    }

    tracing::info!(user_id = %auth.user_id, to = %message.to, "Email queued by client");
    mailer::dispatch(state.mailer.clone(), NotificationType::Custom, message);

    Ok(Accepted(QueuedResponse { queued: true }))
}
