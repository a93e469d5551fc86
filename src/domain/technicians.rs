//! Technician domain types
//!
//! Technicians are read-only for the request lifecycle. Their verification
//! status is an admin-controlled toggle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Technician verification status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "verified" | "approved" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Pending => write!(f, "pending"),
            VerificationStatus::Verified => write!(f, "verified"),
            VerificationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Where a technician operates
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceArea {
    pub base_lat: f64,
    pub base_lng: f64,
    pub radius_km: f64,
}

/// Technician record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Technician {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialties: BTreeSet<String>,
    pub service_area: ServiceArea,
    /// Price per service type
    pub pricing: HashMap<String, Decimal>,
    pub verification_status: VerificationStatus,
    pub rejection_reason: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Technician {
    pub fn offers(&self, service_type: &str) -> bool {
        self.specialties.contains(service_type) || self.pricing.contains_key(service_type)
    }

    pub fn price_for(&self, service_type: &str) -> Option<Decimal> {
        self.pricing.get(service_type).copied()
    }
}

/// Technician listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicianFilter {
    pub verification_status: Option<VerificationStatus>,
    pub specialty: Option<String>,
}

/// Admin decision on a technician account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationDecision {
    Approve,
    Reject { reason: String },
}

impl VerificationDecision {
    pub fn target_status(&self) -> VerificationStatus {
        match self {
            VerificationDecision::Approve => VerificationStatus::Verified,
            VerificationDecision::Reject { .. } => VerificationStatus::Rejected,
        }
    }
}

/// Review technician request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewTechnicianInput {
    /// "approve" or "reject"
    pub decision: String,
    pub reason: Option<String>,
}

impl ReviewTechnicianInput {
    pub fn into_decision(self) -> Option<VerificationDecision> {
        match self.decision.trim().to_lowercase().as_str() {
            "approve" | "verify" | "verified" => Some(VerificationDecision::Approve),
            "reject" | "rejected" => Some(VerificationDecision::Reject {
                reason: self
                    .reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "No reason provided".to_string()),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_input_maps_to_decision() {
        let approve = ReviewTechnicianInput {
            decision: "Approve".into(),
            reason: None,
        };
        assert_eq!(approve.into_decision(), Some(VerificationDecision::Approve));

        let reject = ReviewTechnicianInput {
            decision: "reject".into(),
            reason: Some("  ".into()),
        };
        assert_eq!(
            reject.into_decision(),
            Some(VerificationDecision::Reject {
                reason: "No reason provided".into()
            })
        );

        let unknown = ReviewTechnicianInput {
            decision: "maybe".into(),
            reason: None,
        };
        assert_eq!(unknown.into_decision(), None);
    }

    #[test]
    fn verification_status_wire_format() {
        let value = serde_json::to_value(VerificationStatus::Verified).unwrap();
        assert_eq!(value, "verified");
        assert_eq!(VerificationStatus::parse("approved"), Some(VerificationStatus::Verified));
    }
}
