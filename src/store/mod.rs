//! Persistence interfaces
//!
//! Domain services talk to these traits only. `PgStore` backs them with
//! PostgreSQL, `MemoryStore` with in-process maps (tests and local demo mode).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    NewServiceRequest, RequesterProfile, ServiceRequest, ServiceRequestFilter, StatusUpdate,
    Technician, TechnicianContact, TechnicianFilter, VerificationStatus,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Record store for the `service_requests` table and the joins used to enrich it.
#[async_trait]
pub trait ServiceRequestStore: Send + Sync {
    /// Atomic insert. The store assigns `id` and the timestamps.
    async fn insert_request(&self, record: NewServiceRequest) -> StoreResult<ServiceRequest>;

    async fn get_request(&self, id: Uuid) -> StoreResult<Option<ServiceRequest>>;

    /// Requests created by `user_id`, newest first
    async fn list_by_requester(&self, user_id: Uuid) -> StoreResult<Vec<ServiceRequest>>;

    /// Requests assigned to `technician_id`, newest first
    async fn list_by_technician(&self, technician_id: Uuid) -> StoreResult<Vec<ServiceRequest>>;

    /// Filtered page of all requests, newest first, with the total match count
    async fn list_requests(
        &self,
        filter: &ServiceRequestFilter,
        limit: u32,
        offset: u32,
    ) -> StoreResult<(Vec<ServiceRequest>, u64)>;

    /// Single-row compare-and-set: applies only while the stored status still
    /// equals `update.from`. Returns `None` if the id does not exist or the
    /// status has moved on.
    async fn update_status(
        &self,
        id: Uuid,
        update: StatusUpdate,
    ) -> StoreResult<Option<ServiceRequest>>;

    /// Sets the assignee and moves a `pending` request to `assigned` in one
    /// statement. Returns `None` if the id does not exist or the request is no
    /// longer pending.
    async fn assign_technician(
        &self,
        id: Uuid,
        technician_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<ServiceRequest>>;

    async fn technician_contact(&self, technician_id: Uuid) -> StoreResult<Option<TechnicianContact>>;

    async fn requester_profile(&self, user_id: Uuid) -> StoreResult<Option<RequesterProfile>>;

    async fn health_check(&self) -> bool;
}

/// Record store for the `technicians` table
#[async_trait]
pub trait TechnicianStore: Send + Sync {
    async fn get_technician(&self, id: Uuid) -> StoreResult<Option<Technician>>;

    /// Technicians matching `filter`, ordered by name
    async fn list_technicians(&self, filter: &TechnicianFilter) -> StoreResult<Vec<Technician>>;

    /// Sets the verification status; `verified_at` is stamped when entering `verified`.
    async fn set_verification_status(
        &self,
        id: Uuid,
        status: VerificationStatus,
        rejection_reason: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Technician>>;
}
