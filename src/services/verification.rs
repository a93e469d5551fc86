//! Technician verification
//!
//! Admin approve / reject of technician accounts. Each decision emails the
//! technician; the email never blocks or fails the decision.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::mailer::{dispatch, NotificationSender};
use super::notifications;
use crate::domain::notifications::NotificationType;
use crate::domain::{Technician, VerificationDecision};
use crate::error::VerificationError;
use crate::store::TechnicianStore;

#[derive(Clone)]
pub struct TechnicianVerifier {
    technicians: Arc<dyn TechnicianStore>,
    notifier: Arc<dyn NotificationSender>,
}

impl TechnicianVerifier {
    pub fn new(technicians: Arc<dyn TechnicianStore>, notifier: Arc<dyn NotificationSender>) -> Self {
        Self {
            technicians,
            notifier,
        }
    }

    /// Apply an admin decision. Re-applying the current status is a conflict.
    pub async fn review(
        &self,
        technician_id: Uuid,
        decision: VerificationDecision,
    ) -> Result<Technician, VerificationError> {
        let current = self
            .technicians
            .get_technician(technician_id)
            .await?
            .ok_or(VerificationError::NotFound(technician_id))?;

        let target = decision.target_status();
        if current.verification_status == target {
            return Err(VerificationError::AlreadyInStatus(target));
        }

        let reason = match &decision {
            VerificationDecision::Approve => None,
            VerificationDecision::Reject { reason } => Some(reason.clone()),
        };

        let updated = self
            .technicians
            .set_verification_status(technician_id, target, reason, Utc::now())
            .await?
            .ok_or(VerificationError::NotFound(technician_id))?;

        info!(
            technician_id = %technician_id,
            from = %current.verification_status,
            to = %updated.verification_status,
            "Technician verification updated"
        );

        let email = match &decision {
            VerificationDecision::Approve => notifications::technician_verified(&updated)
                .map(|m| (NotificationType::TechnicianVerified, m)),
            VerificationDecision::Reject { reason } => {
                notifications::technician_rejected(&updated, reason)
                    .map(|m| (NotificationType::TechnicianRejected, m))
            }
        };
        if let Some((kind, message)) = email {
            dispatch(self.notifier.clone(), kind, message);
        }

        Ok(updated)
    }
}
