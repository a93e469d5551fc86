//! In-memory store
//!
//! Used by the test suite and by `STORE_BACKEND=memory` for local runs
//! without PostgreSQL. Mirrors the PostgreSQL semantics that the services
//! rely on: store-assigned ids and timestamps, newest-first ordering, and the
//! technician foreign key.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::{ServiceRequestStore, StoreError, StoreResult, TechnicianStore};
use crate::domain::{
    NewServiceRequest, RequestStatus, RequesterProfile, ServiceArea, ServiceRequest,
    ServiceRequestFilter, StatusUpdate, Technician, TechnicianContact, TechnicianFilter,
    VerificationStatus,
};

#[derive(Default)]
struct MemoryInner {
    requests: HashMap<Uuid, ServiceRequest>,
    technicians: HashMap<Uuid, Technician>,
    profiles: HashMap<Uuid, RequesterProfile>,
    last_created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
    /// Fail every call, as a lost connection would
    unavailable: Arc<AtomicBool>,
    /// Fail only the enrichment lookups
    joins_unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with a few technicians for local runs
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        let now = Utc::now();

        let demo = [
            (
                "Rapid Roadside Co.",
                "dispatch@rapidroadside.example",
                &["towing", "winching"][..],
                (40.7128, -74.0060, 40.0),
                &[("towing", Decimal::new(12000, 2)), ("winching", Decimal::new(9500, 2))][..],
                VerificationStatus::Verified,
            ),
            (
                "Jump & Go Mobile Mechanics",
                "hello@jumpandgo.example",
                &["jump_start", "tire_change", "diagnostic"][..],
                (40.7306, -73.9352, 25.0),
                &[
                    ("jump_start", Decimal::new(4500, 2)),
                    ("tire_change", Decimal::new(6000, 2)),
                    ("diagnostic", Decimal::new(8000, 2)),
                ][..],
                VerificationStatus::Verified,
            ),
            (
                "Keys Unlimited",
                "support@keysunlimited.example",
                &["lockout", "fuel_delivery"][..],
                (40.6782, -73.9442, 15.0),
                &[("lockout", Decimal::new(7500, 2)), ("fuel_delivery", Decimal::new(3500, 2))][..],
                VerificationStatus::Pending,
            ),
        ];

        for (name, email, specialties, (lat, lng, radius), prices, status) in demo {
            store.insert_technician(Technician {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: Some(email.to_string()),
                phone: None,
                specialties: specialties.iter().map(|s| s.to_string()).collect(),
                service_area: ServiceArea {
                    base_lat: lat,
                    base_lng: lng,
                    radius_km: radius,
                },
                pricing: prices.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                verification_status: status,
                rejection_reason: None,
                verified_at: (status == VerificationStatus::Verified).then_some(now),
                created_at: now,
                updated_at: now,
            });
        }

        store
    }

    pub fn insert_technician(&self, technician: Technician) {
        self.inner.write().technicians.insert(technician.id, technician);
    }

    pub fn insert_profile(&self, profile: RequesterProfile) {
        self.inner.write().profiles.insert(profile.id, profile);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_joins_unavailable(&self, unavailable: bool) {
        self.joins_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.inner.read().requests.len()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn check_joins_available(&self) -> StoreResult<()> {
        self.check_available()?;
        if self.joins_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("join lookups offline".to_string()));
        }
        Ok(())
    }
}

impl MemoryInner {
    /// Strictly increasing creation time, so ordering is total like a database clock
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let at = match self.last_created_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(at);
        at
    }

    fn check_technician(&self, technician_id: Uuid) -> StoreResult<()> {
        if !self.technicians.contains_key(&technician_id) {
            return Err(StoreError::Constraint(format!(
                "technician {} does not exist",
                technician_id
            )));
        }
        Ok(())
    }
}

fn newest_first(mut rows: Vec<ServiceRequest>) -> Vec<ServiceRequest> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    rows
}

#[async_trait]
impl ServiceRequestStore for MemoryStore {
    async fn insert_request(&self, record: NewServiceRequest) -> StoreResult<ServiceRequest> {
        self.check_available()?;
        let mut inner = self.inner.write();
        let created_at = inner.next_created_at();
        let request = ServiceRequest {
            id: Uuid::new_v4(),
            user_id: record.user_id,
            technician_id: None,
            service_type: record.service_type,
            vehicle_type: record.vehicle_type,
            vehicle_model: record.vehicle_model,
            location_lat: record.location.lat,
            location_lng: record.location.lng,
            address: record.location.address,
            description: record.description,
            contact_name: record.contact_name,
            contact_phone: record.contact_phone,
            contact_email: record.contact_email,
            status: record.status,
            payment_status: record.payment_status,
            created_at,
            updated_at: created_at,
            completed_at: None,
        };
        inner.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: Uuid) -> StoreResult<Option<ServiceRequest>> {
        self.check_available()?;
        Ok(self.inner.read().requests.get(&id).cloned())
    }

    async fn list_by_requester(&self, user_id: Uuid) -> StoreResult<Vec<ServiceRequest>> {
        self.check_available()?;
        let rows = self
            .inner
            .read()
            .requests
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn list_by_technician(&self, technician_id: Uuid) -> StoreResult<Vec<ServiceRequest>> {
        self.check_available()?;
        let rows = self
            .inner
            .read()
            .requests
            .values()
            .filter(|r| r.technician_id == Some(technician_id))
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn list_requests(
        &self,
        filter: &ServiceRequestFilter,
        limit: u32,
        offset: u32,
    ) -> StoreResult<(Vec<ServiceRequest>, u64)> {
        self.check_available()?;
        let rows: Vec<ServiceRequest> = self
            .inner
            .read()
            .requests
            .values()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| {
                filter
                    .service_type
                    .as_deref()
                    .map_or(true, |t| r.service_type == t)
            })
            .cloned()
            .collect();

        let total = rows.len() as u64;
        let page = newest_first(rows)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_status(
        &self,
        id: Uuid,
        update: StatusUpdate,
    ) -> StoreResult<Option<ServiceRequest>> {
        self.check_available()?;
        let mut inner = self.inner.write();
        let Some(request) = inner
            .requests
            .get_mut(&id)
            .filter(|r| r.status == update.from)
        else {
            return Ok(None);
        };

        request.status = update.status;
        request.updated_at = update.updated_at;
        if let Some(completed_at) = update.completed_at {
            request.completed_at = Some(completed_at);
        }
        Ok(Some(request.clone()))
    }

    async fn assign_technician(
        &self,
        id: Uuid,
        technician_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<ServiceRequest>> {
        self.check_available()?;
        let mut inner = self.inner.write();
        inner.check_technician(technician_id)?;
        let Some(request) = inner
            .requests
            .get_mut(&id)
            .filter(|r| r.status == RequestStatus::Pending)
        else {
            return Ok(None);
        };

        request.technician_id = Some(technician_id);
        request.status = RequestStatus::Assigned;
        request.updated_at = updated_at;
        Ok(Some(request.clone()))
    }

    async fn technician_contact(&self, technician_id: Uuid) -> StoreResult<Option<TechnicianContact>> {
        self.check_joins_available()?;
        Ok(self
            .inner
            .read()
            .technicians
            .get(&technician_id)
            .map(|t| TechnicianContact {
                id: t.id,
                name: t.name.clone(),
                phone: t.phone.clone(),
                email: t.email.clone(),
            }))
    }

    async fn requester_profile(&self, user_id: Uuid) -> StoreResult<Option<RequesterProfile>> {
        self.check_joins_available()?;
        Ok(self.inner.read().profiles.get(&user_id).cloned())
    }

    async fn health_check(&self) -> bool {
        self.check_available().is_ok()
    }
}

#[async_trait]
impl TechnicianStore for MemoryStore {
    async fn get_technician(&self, id: Uuid) -> StoreResult<Option<Technician>> {
        self.check_available()?;
        Ok(self.inner.read().technicians.get(&id).cloned())
    }

    async fn list_technicians(&self, filter: &TechnicianFilter) -> StoreResult<Vec<Technician>> {
        self.check_available()?;
        let mut rows: Vec<Technician> = self
            .inner
            .read()
            .technicians
            .values()
            .filter(|t| {
                filter
                    .verification_status
                    .map_or(true, |s| t.verification_status == s)
            })
            .filter(|t| {
                filter
                    .specialty
                    .as_deref()
                    .map_or(true, |s| t.specialties.contains(s))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn set_verification_status(
        &self,
        id: Uuid,
        status: VerificationStatus,
        rejection_reason: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Technician>> {
        self.check_available()?;
        let mut inner = self.inner.write();
        let Some(technician) = inner.technicians.get_mut(&id) else {
            return Ok(None);
        };

        technician.verification_status = status;
        technician.rejection_reason = rejection_reason;
        if status == VerificationStatus::Verified {
            technician.verified_at = Some(at);
        }
        technician.updated_at = at;
        Ok(Some(technician.clone()))
    }
}
