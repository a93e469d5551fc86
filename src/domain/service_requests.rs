//! Service request domain types
//!
//! A service request is a customer's recorded need for roadside assistance,
//! tracked through a closed status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::location::{Location, LocationInput, UNSPECIFIED};

pub const UNKNOWN_VEHICLE_TYPE: &str = "unknown";
pub const UNKNOWN_VEHICLE_MODEL: &str = "Unknown Model";

// ============================================================================
// Status
// ============================================================================

/// Request status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Assigned,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Assigned => "assigned",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(RequestStatus::Pending),
            "assigned" => Some(RequestStatus::Assigned),
            "completed" => Some(RequestStatus::Completed),
            "cancelled" | "canceled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }

    /// Transition table:
    ///
    /// ```text
    /// pending  -> assigned | cancelled
    /// assigned -> completed | cancelled
    /// ```
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned) | (Pending, Cancelled) | (Assigned, Completed) | (Assigned, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status, tracked independently of the request status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Refunded => write!(f, "refunded"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

// ============================================================================
// Submission payload
// ============================================================================

/// Vehicle block of a submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInfo {
    #[serde(default, alias = "type", alias = "vehicle_type")]
    pub vehicle_type: Option<String>,
    #[serde(default, alias = "vehicle_model")]
    pub model: Option<String>,
}

/// Nested contact block of a submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(default, alias = "fullName", alias = "full_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Submit service request payload.
///
/// Status, payment and assignee fields sent by clients are not part of this
/// type and are dropped during deserialization. Assignment goes through
/// `assign_technician`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitServiceRequestInput {
    #[serde(default, alias = "service_type")]
    pub service_type: String,
    #[serde(default, alias = "vehicle_info")]
    pub vehicle_info: Option<VehicleInfo>,
    #[serde(default)]
    pub location: Option<LocationInput>,
    #[serde(default, alias = "details")]
    pub description: Option<String>,
    #[serde(default, alias = "personal_info")]
    pub personal_info: Option<PersonalInfo>,
    #[serde(default, alias = "contact_name", alias = "name")]
    pub contact_name: Option<String>,
    #[serde(default, alias = "contact_phone", alias = "phone")]
    pub contact_phone: Option<String>,
    #[serde(default, alias = "contact_email", alias = "email")]
    pub contact_email: Option<String>,
}

/// Normalized record handed to the store for insertion. New requests are
/// always unassigned.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct NewServiceRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, message = "Service type is required"))]
    pub service_type: String,
    pub vehicle_type: String,
    pub vehicle_model: String,
    #[validate]
    pub location: Location,
    pub description: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub status: RequestStatus,
    pub payment_status: PaymentStatus,
}

impl NewServiceRequest {
    /// Build the record to persist. Every optional field falls back to a placeholder.
    pub fn from_input(input: SubmitServiceRequestInput, user_id: Uuid) -> Self {
        let vehicle = input.vehicle_info.unwrap_or_default();
        let personal = input.personal_info.unwrap_or_default();

        Self {
            user_id,
            service_type: input.service_type.trim().to_string(),
            vehicle_type: first_present([vehicle.vehicle_type])
                .unwrap_or_else(|| UNKNOWN_VEHICLE_TYPE.to_string()),
            vehicle_model: first_present([vehicle.model])
                .unwrap_or_else(|| UNKNOWN_VEHICLE_MODEL.to_string()),
            location: Location::resolve(input.location),
            description: first_present([input.description]).unwrap_or_default(),
            contact_name: first_present([personal.name, input.contact_name])
                .unwrap_or_else(|| UNSPECIFIED.to_string()),
            contact_phone: first_present([personal.phone, input.contact_phone])
                .unwrap_or_else(|| UNSPECIFIED.to_string()),
            contact_email: first_present([personal.email, input.contact_email]),
            status: RequestStatus::Pending,
            payment_status: PaymentStatus::Pending,
        }
    }
}

/// First non-blank value, trimmed
fn first_present<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

// ============================================================================
// Stored records
// ============================================================================

/// Persisted service request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub technician_id: Option<Uuid>,
    pub service_type: String,
    pub vehicle_type: String,
    pub vehicle_model: String,
    pub location_lat: f64,
    pub location_lng: f64,
    pub address: String,
    pub description: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub status: RequestStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Technician contact fields joined onto customer-facing listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct TechnicianContact {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Requester profile fields joined onto technician-facing listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct RequesterProfile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Service request response with optional joined parties
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRequestView {
    #[serde(flatten)]
    pub request: ServiceRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician: Option<TechnicianContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<RequesterProfile>,
}

impl ServiceRequestView {
    pub fn bare(request: ServiceRequest) -> Self {
        Self {
            request,
            technician: None,
            requester: None,
        }
    }
}

/// Fields written by a status transition
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    /// Status the transition was checked against; the write only applies while it still holds
    pub from: RequestStatus,
    pub status: RequestStatus,
    pub updated_at: DateTime<Utc>,
    /// Only set when entering `completed`; the store never clears an existing value
    pub completed_at: Option<DateTime<Utc>>,
}

/// Admin listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceRequestFilter {
    pub status: Option<RequestStatus>,
    pub service_type: Option<String>,
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusInput {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignTechnicianInput {
    pub technician_id: Uuid,
}
