//! Email notification types
//!
//! Outbound email is fire-and-forget: a failed send is logged and dropped.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Notification kinds, used as a structured log field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    RequestSubmitted,
    RequestStatusChanged,
    TechnicianAssigned,
    TechnicianVerified,
    TechnicianRejected,
    Custom,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_string(self).unwrap_or_default();
        write!(f, "{}", s.trim_matches('"'))
    }
}

/// Outbound email, also the body of `POST /notifications/email`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct EmailMessage {
    #[validate(email)]
    pub to: String,
    #[validate(length(max = 998), custom = "not_blank")]
    pub subject: String,
    #[validate(custom = "not_blank")]
    pub html: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
