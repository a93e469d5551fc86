//! Types exchanged with the AI recommendation API.
//!
//! Recommendations are advisory free text. Nothing in the lifecycle reads them back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::service_requests::ServiceRequest;
use super::technicians::{ServiceArea, Technician};

/// What the model is told about the request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRequestSummary {
    pub service_type: String,
    pub vehicle_type: String,
    pub vehicle_model: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub description: String,
}

impl From<&ServiceRequest> for ServiceRequestSummary {
    fn from(r: &ServiceRequest) -> Self {
        Self {
            service_type: r.service_type.clone(),
            vehicle_type: r.vehicle_type.clone(),
            vehicle_model: r.vehicle_model.clone(),
            address: r.address.clone(),
            lat: r.location_lat,
            lng: r.location_lng,
            description: r.description.clone(),
        }
    }
}

/// What the model is told about each candidate technician
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicianSummary {
    pub id: Uuid,
    pub name: String,
    pub specialties: Vec<String>,
    pub service_area: ServiceArea,
    pub price: Option<Decimal>,
}

impl TechnicianSummary {
    pub fn for_service(technician: &Technician, service_type: &str) -> Self {
        Self {
            id: technician.id,
            name: technician.name.clone(),
            specialties: technician.specialties.iter().cloned().collect(),
            service_area: technician.service_area.clone(),
            price: technician.price_for(service_type),
        }
    }
}

/// Response for technician recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub request_id: Uuid,
    pub candidates: usize,
    pub recommendations: String,
    pub cached: bool,
}
