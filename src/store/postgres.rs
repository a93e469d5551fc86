//! PostgreSQL-backed store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::{ServiceRequestStore, StoreError, StoreResult, TechnicianStore};
use crate::domain::{
    NewServiceRequest, RequesterProfile, ServiceArea, ServiceRequest, ServiceRequestFilter,
    StatusUpdate, Technician, TechnicianContact, TechnicianFilter, VerificationStatus,
};

const REQUEST_COLUMNS: &str = r#"
    id, user_id, technician_id, service_type, vehicle_type, vehicle_model,
    location_lat, location_lng, address, description,
    contact_name, contact_phone, contact_email,
    status, payment_status, created_at, updated_at, completed_at
"#;

const TECHNICIAN_COLUMNS: &str = r#"
    id, name, email, phone, specialties, service_area, pricing,
    verification_status, rejection_reason, verified_at, created_at, updated_at
"#;

// Postgres SQLSTATE codes
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const NOT_NULL_VIOLATION: &str = "23502";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if let Some(code) = db.code() {
            if matches!(
                code.as_ref(),
                FOREIGN_KEY_VIOLATION | CHECK_VIOLATION | NOT_NULL_VIOLATION
            ) {
                return StoreError::Constraint(db.message().to_string());
            }
        }
    }
    StoreError::Database(e)
}

// ============================================================================
// Database Row Types
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct TechnicianRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    specialties: Vec<String>,
    service_area: Json<ServiceArea>,
    pricing: Json<HashMap<String, Decimal>>,
    verification_status: VerificationStatus,
    rejection_reason: Option<String>,
    verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TechnicianRow> for Technician {
    fn from(row: TechnicianRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            specialties: row.specialties.into_iter().collect(),
            service_area: row.service_area.0,
            pricing: row.pricing.0,
            verification_status: row.verification_status,
            rejection_reason: row.rejection_reason,
            verified_at: row.verified_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ============================================================================
// Service requests
// ============================================================================

#[async_trait]
impl ServiceRequestStore for PgStore {
    async fn insert_request(&self, record: NewServiceRequest) -> StoreResult<ServiceRequest> {
        let query = format!(
            r#"
            INSERT INTO service_requests (
                id, user_id, service_type, vehicle_type, vehicle_model,
                location_lat, location_lng, address, description,
                contact_name, contact_phone, contact_email, status, payment_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );

        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(Uuid::new_v4())
            .bind(record.user_id)
            .bind(&record.service_type)
            .bind(&record.vehicle_type)
            .bind(&record.vehicle_model)
            .bind(record.location.lat)
            .bind(record.location.lng)
            .bind(&record.location.address)
            .bind(&record.description)
            .bind(&record.contact_name)
            .bind(&record.contact_phone)
            .bind(&record.contact_email)
            .bind(record.status)
            .bind(record.payment_status)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_request(&self, id: Uuid) -> StoreResult<Option<ServiceRequest>> {
        let query = format!("SELECT {} FROM service_requests WHERE id = $1", REQUEST_COLUMNS);
        Ok(sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_by_requester(&self, user_id: Uuid) -> StoreResult<Vec<ServiceRequest>> {
        let query = format!(
            "SELECT {} FROM service_requests WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            REQUEST_COLUMNS
        );
        Ok(sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_by_technician(&self, technician_id: Uuid) -> StoreResult<Vec<ServiceRequest>> {
        let query = format!(
            "SELECT {} FROM service_requests WHERE technician_id = $1 ORDER BY created_at DESC, id DESC",
            REQUEST_COLUMNS
        );
        Ok(sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(technician_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_requests(
        &self,
        filter: &ServiceRequestFilter,
        limit: u32,
        offset: u32,
    ) -> StoreResult<(Vec<ServiceRequest>, u64)> {
        let status = filter.status.map(|s| s.to_string());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM service_requests
            WHERE ($1::text IS NULL OR status = $1)
            AND ($2::text IS NULL OR service_type = $2)
            "#,
        )
        .bind(&status)
        .bind(&filter.service_type)
        .fetch_one(&self.pool)
        .await?;

        let query = format!(
            r#"
            SELECT {} FROM service_requests
            WHERE ($1::text IS NULL OR status = $1)
            AND ($2::text IS NULL OR service_type = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
            REQUEST_COLUMNS
        );

        let rows = sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(&status)
            .bind(&filter.service_type)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total.max(0) as u64))
    }

    async fn update_status(
        &self,
        id: Uuid,
        update: StatusUpdate,
    ) -> StoreResult<Option<ServiceRequest>> {
        let query = format!(
            r#"
            UPDATE service_requests
            SET status = $2, updated_at = $3, completed_at = COALESCE($4, completed_at)
            WHERE id = $1 AND status = $5
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );

        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .bind(update.status)
            .bind(update.updated_at)
            .bind(update.completed_at)
            .bind(update.from)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn assign_technician(
        &self,
        id: Uuid,
        technician_id: Uuid,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<ServiceRequest>> {
        let query = format!(
            r#"
            UPDATE service_requests
            SET technician_id = $2, status = 'assigned', updated_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        );

        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .bind(technician_id)
            .bind(updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn technician_contact(&self, technician_id: Uuid) -> StoreResult<Option<TechnicianContact>> {
        Ok(sqlx::query_as::<_, TechnicianContact>(
            "SELECT id, name, phone, email FROM technicians WHERE id = $1",
        )
        .bind(technician_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn requester_profile(&self, user_id: Uuid) -> StoreResult<Option<RequesterProfile>> {
        Ok(sqlx::query_as::<_, RequesterProfile>(
            "SELECT id, full_name, phone, email FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn health_check(&self) -> bool {
        crate::db::health_check(&self.pool).await
    }
}

// ============================================================================
// Technicians
// ============================================================================

#[async_trait]
impl TechnicianStore for PgStore {
    async fn get_technician(&self, id: Uuid) -> StoreResult<Option<Technician>> {
        let query = format!("SELECT {} FROM technicians WHERE id = $1", TECHNICIAN_COLUMNS);
        let row = sqlx::query_as::<_, TechnicianRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_technicians(&self, filter: &TechnicianFilter) -> StoreResult<Vec<Technician>> {
        let query = format!(
            r#"
            SELECT {} FROM technicians
            WHERE ($1::text IS NULL OR verification_status = $1)
            AND ($2::text IS NULL OR $2 = ANY(specialties))
            ORDER BY name ASC
            "#,
            TECHNICIAN_COLUMNS
        );

        let rows = sqlx::query_as::<_, TechnicianRow>(&query)
            .bind(filter.verification_status.map(|s| s.to_string()))
            .bind(&filter.specialty)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_verification_status(
        &self,
        id: Uuid,
        status: VerificationStatus,
        rejection_reason: Option<String>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Technician>> {
        let query = format!(
            r#"
            UPDATE technicians
            SET verification_status = $2,
                rejection_reason = $3,
                verified_at = CASE WHEN $2 = 'verified' THEN $4 ELSE verified_at END,
                updated_at = $4
            WHERE id = $1
            RETURNING {}
            "#,
            TECHNICIAN_COLUMNS
        );

        let row = sqlx::query_as::<_, TechnicianRow>(&query)
            .bind(id)
            .bind(status.to_string())
            .bind(rejection_reason)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(row.map(Into::into))
    }
}
