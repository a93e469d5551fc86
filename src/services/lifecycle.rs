//! Service request lifecycle
//!
//! Submission, scoped reads and status transitions for service requests.
//! The manager only persists; notifications are the caller's business.

use chrono::Utc;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    Actor, NewServiceRequest, RequestStatus, ServiceRequest, ServiceRequestFilter,
    ServiceRequestView, StatusUpdate, SubmitServiceRequestInput, TechnicianContact, UserRole,
};
use crate::error::RequestError;
use crate::store::ServiceRequestStore;

/// Present, non-nil identity
fn authenticated(id: Option<Uuid>) -> Option<Uuid> {
    id.filter(|id| !id.is_nil())
}

#[derive(Clone)]
pub struct ServiceRequestManager {
    store: Arc<dyn ServiceRequestStore>,
}

impl ServiceRequestManager {
    pub fn new(store: Arc<dyn ServiceRequestStore>) -> Self {
        Self { store }
    }

    /// Validate, normalize and persist a new request.
    ///
    /// Nothing is written when the requester is missing or the payload is invalid.
    #[instrument(skip(self, input), fields(service_type = %input.service_type))]
    pub async fn submit_request(
        &self,
        input: SubmitServiceRequestInput,
        requester_id: Option<Uuid>,
    ) -> Result<ServiceRequest, RequestError> {
        let user_id = authenticated(requester_id).ok_or(RequestError::AuthenticationRequired)?;

        let record = NewServiceRequest::from_input(input, user_id);
        validate(&record)?;

        let stored = self.store.insert_request(record).await.map_err(|e| {
            warn!(user_id = %user_id, error = %e, "Service request insert failed");
            RequestError::RequestSubmissionFailed(e)
        })?;

        info!(
            request_id = %stored.id,
            user_id = %user_id,
            service_type = %stored.service_type,
            "Service request submitted"
        );
        Ok(stored)
    }

    /// Requests created by `user_id`, newest first, with technician contact joined in.
    pub async fn get_requests_for_user(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<Vec<ServiceRequestView>, RequestError> {
        let Some(user_id) = authenticated(user_id) else {
            return Ok(Vec::new());
        };

        let requests = self
            .store
            .list_by_requester(user_id)
            .await
            .map_err(RequestError::RequestFetchFailed)?;

        Ok(self.with_technicians(requests).await)
    }

    /// Requests assigned to `technician_id`, newest first, with requester profile joined in.
    pub async fn get_requests_for_technician(
        &self,
        technician_id: Option<Uuid>,
    ) -> Result<Vec<ServiceRequestView>, RequestError> {
        let Some(technician_id) = authenticated(technician_id) else {
            return Ok(Vec::new());
        };

        let requests = self
            .store
            .list_by_technician(technician_id)
            .await
            .map_err(RequestError::RequestFetchFailed)?;

        Ok(self.with_requesters(requests).await)
    }

    /// Single request, visible to its requester, its assignee and admins.
    pub async fn get_request(
        &self,
        actor: &Actor,
        request_id: Uuid,
    ) -> Result<ServiceRequestView, RequestError> {
        let request = self
            .store
            .get_request(request_id)
            .await
            .map_err(RequestError::RequestFetchFailed)?
            .ok_or(RequestError::NotFound(request_id))?;

        authorize(actor, &request)?;

        let mut views = self.with_technicians(vec![request]).await;
        let mut view = views.pop().ok_or(RequestError::NotFound(request_id))?;
        view.requester = match self.store.requester_profile(view.request.user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Requester lookup failed");
                None
            }
        };
        Ok(view)
    }

    /// Admin listing
    pub async fn list_requests(
        &self,
        filter: &ServiceRequestFilter,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<ServiceRequest>, u64), RequestError> {
        self.store
            .list_requests(filter, limit, offset)
            .await
            .map_err(RequestError::RequestFetchFailed)
    }

    /// Move a request to `new_status`.
    ///
    /// Only the requester, the assigned technician or an admin may do this, and
    /// only along the transition table in [`RequestStatus::can_transition_to`].
    /// The write is conditional on the status that was checked, so of two
    /// racing updates the second sees `InvalidTransition`.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn update_request_status(
        &self,
        actor: &Actor,
        request_id: Uuid,
        new_status: &str,
    ) -> Result<ServiceRequest, RequestError> {
        let next = RequestStatus::parse(new_status).ok_or_else(|| {
            RequestError::ValidationFailure(format!("Unknown status: {}", new_status))
        })?;

        let current = self
            .store
            .get_request(request_id)
            .await
            .map_err(RequestError::RequestUpdateFailed)?
            .ok_or(RequestError::NotFound(request_id))?;

        authorize(actor, &current)?;

        if !current.status.can_transition_to(next) {
            if current.status.is_terminal() {
                debug!(request_id = %request_id, status = %current.status, "Request already closed");
            }
            return Err(RequestError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        let now = Utc::now();
        let update = StatusUpdate {
            from: current.status,
            status: next,
            updated_at: now,
            completed_at: (next == RequestStatus::Completed).then_some(now),
        };

        let updated = match self.store.update_status(request_id, update).await {
            Ok(Some(updated)) => updated,
            Ok(None) => return Err(self.lost_race(request_id, next).await),
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Status update failed");
                return Err(RequestError::RequestUpdateFailed(e));
            }
        };

        info!(
            request_id = %request_id,
            from = %current.status,
            to = %updated.status,
            "Service request status changed"
        );
        Ok(updated)
    }

    /// Attach a technician to a pending request and move it to `assigned`.
    ///
    /// Admins may assign anyone; technicians may only claim a request for themselves.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn assign_technician(
        &self,
        actor: &Actor,
        request_id: Uuid,
        technician_id: Uuid,
    ) -> Result<ServiceRequest, RequestError> {
        match actor.role {
            UserRole::Admin => {}
            UserRole::Technician if actor.user_id == technician_id => {}
            UserRole::Technician => {
                return Err(RequestError::Forbidden(
                    "Technicians can only claim requests for themselves".to_string(),
                ))
            }
            UserRole::Customer => {
                return Err(RequestError::Forbidden(
                    "Customers cannot assign technicians".to_string(),
                ))
            }
        }

        let current = self
            .store
            .get_request(request_id)
            .await
            .map_err(RequestError::RequestUpdateFailed)?
            .ok_or(RequestError::NotFound(request_id))?;

        if !current.status.can_transition_to(RequestStatus::Assigned) {
            return Err(RequestError::InvalidTransition {
                from: current.status,
                to: RequestStatus::Assigned,
            });
        }

        let updated = match self
            .store
            .assign_technician(request_id, technician_id, Utc::now())
            .await
            .map_err(RequestError::RequestUpdateFailed)?
        {
            Some(updated) => updated,
            None => return Err(self.lost_race(request_id, RequestStatus::Assigned).await),
        };

        info!(
            request_id = %request_id,
            technician_id = %technician_id,
            "Technician assigned"
        );
        Ok(updated)
    }

    /// A guarded write matched no row: either the request is gone or another
    /// writer moved it first.
    async fn lost_race(&self, request_id: Uuid, to: RequestStatus) -> RequestError {
        match self.store.get_request(request_id).await {
            Ok(Some(current)) => {
                debug!(request_id = %request_id, status = %current.status, "Concurrent update won");
                RequestError::InvalidTransition {
                    from: current.status,
                    to,
                }
            }
            Ok(None) => RequestError::NotFound(request_id),
            Err(e) => RequestError::RequestUpdateFailed(e),
        }
    }

    /// Join technician contact fields. Lookup failures leave the record bare.
    async fn with_technicians(&self, requests: Vec<ServiceRequest>) -> Vec<ServiceRequestView> {
        let ids: HashSet<Uuid> = requests.iter().filter_map(|r| r.technician_id).collect();

        let lookups = join_all(ids.into_iter().map(|id| async move {
            (id, self.store.technician_contact(id).await)
        }))
        .await;

        let mut contacts: HashMap<Uuid, TechnicianContact> = HashMap::new();
        for (id, result) in lookups {
            match result {
                Ok(Some(contact)) => {
                    contacts.insert(id, contact);
                }
                Ok(None) => debug!(technician_id = %id, "Technician not found for enrichment"),
                Err(e) => warn!(technician_id = %id, error = %e, "Technician lookup failed"),
            }
        }

        requests
            .into_iter()
            .map(|request| {
                let technician = request.technician_id.and_then(|id| contacts.get(&id).cloned());
                ServiceRequestView {
                    technician,
                    ..ServiceRequestView::bare(request)
                }
            })
            .collect()
    }

    /// Join requester profile fields. Lookup failures leave the record bare.
    async fn with_requesters(&self, requests: Vec<ServiceRequest>) -> Vec<ServiceRequestView> {
        let ids: HashSet<Uuid> = requests.iter().map(|r| r.user_id).collect();

        let lookups = join_all(ids.into_iter().map(|id| async move {
            (id, self.store.requester_profile(id).await)
        }))
        .await;

        let mut profiles = HashMap::new();
        for (id, result) in lookups {
            match result {
                Ok(Some(profile)) => {
                    profiles.insert(id, profile);
                }
                Ok(None) => {}
                Err(e) => warn!(user_id = %id, error = %e, "Requester lookup failed"),
            }
        }

        requests
            .into_iter()
            .map(|request| {
                let requester = profiles.get(&request.user_id).cloned();
                ServiceRequestView {
                    requester,
                    ..ServiceRequestView::bare(request)
                }
            })
            .collect()
    }
}

fn validate(record: &NewServiceRequest) -> Result<(), RequestError> {
    record
        .validate()
        .map_err(|e| RequestError::ValidationFailure(e.to_string()))
}

fn authorize(actor: &Actor, request: &ServiceRequest) -> Result<(), RequestError> {
    let allowed = actor.is_admin()
        || request.user_id == actor.user_id
        || request.technician_id == Some(actor.user_id);

    if allowed {
        Ok(())
    } else {
        Err(RequestError::Forbidden(
            "You don't have access to this service request".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PaymentStatus, RequesterProfile, ServiceArea, Technician, VerificationStatus};
    use crate::store::{MemoryStore, StoreResult};
    use serde_json::json;

    fn manager(store: &MemoryStore) -> ServiceRequestManager {
        ServiceRequestManager::new(Arc::new(store.clone()))
    }

    fn payload(value: serde_json::Value) -> SubmitServiceRequestInput {
        serde_json::from_value(value).unwrap()
    }

    fn towing() -> SubmitServiceRequestInput {
        payload(json!({ "serviceType": "towing" }))
    }

    fn technician(store: &MemoryStore, name: &str) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        store.insert_technician(Technician {
            id,
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            phone: Some("555-0101".into()),
            specialties: ["towing".to_string()].into_iter().collect(),
            service_area: ServiceArea::default(),
            pricing: Default::default(),
            verification_status: VerificationStatus::Verified,
            rejection_reason: None,
            verified_at: Some(now),
            created_at: now,
            updated_at: now,
        });
        id
    }

    fn customer(id: Uuid) -> Actor {
        Actor::new(id, UserRole::Customer)
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), UserRole::Admin)
    }

    #[tokio::test]
    async fn submission_is_always_pending() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        let stored = manager(&store)
            .submit_request(
                payload(json!({
                    "serviceType": "tire_change",
                    "status": "completed",
                    "paymentStatus": "paid",
                    "technicianId": Uuid::new_v4()
                })),
                Some(user),
            )
            .await
            .unwrap();

        assert_eq!(store.request_count(), 1);
        assert_eq!(stored.user_id, user);
        assert_eq!(stored.status, RequestStatus::Pending);
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
        assert_eq!(stored.completed_at, None);
        assert_eq!(stored.technician_id, None);
    }

    #[tokio::test]
    async fn submission_parses_coordinates_from_location_text() {
        let store = MemoryStore::new();
        let stored = manager(&store)
            .submit_request(
                payload(json!({
                    "serviceType": "towing",
                    "location": "Latitude: 12.34, Longitude: 56.78"
                })),
                Some(Uuid::new_v4()),
            )
            .await
            .unwrap();
        assert_eq!((stored.location_lat, stored.location_lng), (12.34, 56.78));

        let stored = manager(&store)
            .submit_request(
                payload(json!({ "serviceType": "towing", "location": "Exit 12, I-95" })),
                Some(Uuid::new_v4()),
            )
            .await
            .unwrap();
        assert_eq!((stored.location_lat, stored.location_lng), (0.0, 0.0));
        assert_eq!(stored.address, "Exit 12, I-95");
    }

    #[tokio::test]
    async fn submission_without_requester_writes_nothing() {
        let store = MemoryStore::new();
        let mgr = manager(&store);

        for requester in [None, Some(Uuid::nil())] {
            let err = mgr.submit_request(towing(), requester).await.unwrap_err();
            assert!(matches!(err, RequestError::AuthenticationRequired));
        }
        assert_eq!(store.request_count(), 0);
    }

    #[tokio::test]
    async fn blank_service_type_is_rejected() {
        let store = MemoryStore::new();
        let err = manager(&store)
            .submit_request(payload(json!({ "serviceType": "  " })), Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::ValidationFailure(_)));
        assert_eq!(store.request_count(), 0);
    }

    #[tokio::test]
    async fn out_of_range_structured_coordinates_are_rejected() {
        let store = MemoryStore::new();
        let err = manager(&store)
            .submit_request(
                payload(json!({
                    "serviceType": "towing",
                    "location": { "address": "Nowhere", "lat": 123.0, "lng": 10.0 }
                })),
                Some(Uuid::new_v4()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::ValidationFailure(_)));
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_submission_failed() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = manager(&store)
            .submit_request(towing(), Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::RequestSubmissionFailed(_)));
    }

    #[tokio::test]
    async fn user_listing_is_newest_first_and_scoped() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut mine = Vec::new();
        for _ in 0..4 {
            mine.push(mgr.submit_request(towing(), Some(user)).await.unwrap().id);
            mgr.submit_request(towing(), Some(other)).await.unwrap();
        }

        let listed = mgr.get_requests_for_user(Some(user)).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|v| v.request.id).collect();
        mine.reverse();
        assert_eq!(ids, mine);
        assert!(listed
            .windows(2)
            .all(|w| w[0].request.created_at > w[1].request.created_at));
    }

    #[tokio::test]
    async fn listing_without_identity_is_empty() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        mgr.submit_request(towing(), Some(Uuid::new_v4())).await.unwrap();

        assert!(mgr.get_requests_for_user(None).await.unwrap().is_empty());
        assert!(mgr.get_requests_for_user(Some(Uuid::nil())).await.unwrap().is_empty());
        assert!(mgr.get_requests_for_technician(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn user_listing_joins_technician_contact() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let user = Uuid::new_v4();
        let tech = technician(&store, "Alex");

        let assigned = mgr.submit_request(towing(), Some(user)).await.unwrap();
        mgr.assign_technician(&admin(), assigned.id, tech).await.unwrap();
        mgr.submit_request(towing(), Some(user)).await.unwrap();

        let listed = mgr.get_requests_for_user(Some(user)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].technician.is_none());
        let contact = listed[1].technician.as_ref().unwrap();
        assert_eq!(contact.name, "Alex");
        assert_eq!(contact.phone.as_deref(), Some("555-0101"));
    }

    #[tokio::test]
    async fn enrichment_failure_degrades_to_bare_records() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let user = Uuid::new_v4();
        let tech = technician(&store, "Alex");

        let request = mgr.submit_request(towing(), Some(user)).await.unwrap();
        mgr.assign_technician(&admin(), request.id, tech).await.unwrap();

        store.set_joins_unavailable(true);
        let listed = mgr.get_requests_for_user(Some(user)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].technician.is_none());

        let for_tech = mgr.get_requests_for_technician(Some(tech)).await.unwrap();
        assert_eq!(for_tech.len(), 1);
        assert!(for_tech[0].requester.is_none());
    }

    #[tokio::test]
    async fn technician_listing_joins_requester_profile() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let user = Uuid::new_v4();
        let tech = technician(&store, "Alex");
        store.insert_profile(RequesterProfile {
            id: user,
            full_name: Some("Dana Reyes".into()),
            phone: Some("555-0199".into()),
            email: None,
        });

        let first = mgr.submit_request(towing(), Some(user)).await.unwrap();
        let second = mgr.submit_request(towing(), Some(user)).await.unwrap();
        mgr.submit_request(towing(), Some(user)).await.unwrap();
        mgr.assign_technician(&admin(), first.id, tech).await.unwrap();
        mgr.assign_technician(&admin(), second.id, tech).await.unwrap();

        let listed = mgr.get_requests_for_technician(Some(tech)).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|v| v.request.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(listed
            .iter()
            .all(|v| v.requester.as_ref().and_then(|p| p.full_name.as_deref()) == Some("Dana Reyes")));
    }

    #[tokio::test]
    async fn completion_stamps_completed_at_and_is_terminal() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let user = Uuid::new_v4();
        let tech = technician(&store, "Alex");
        let request = mgr.submit_request(towing(), Some(user)).await.unwrap();

        let assigned = mgr.assign_technician(&admin(), request.id, tech).await.unwrap();
        assert_eq!(assigned.status, RequestStatus::Assigned);
        assert!(assigned.completed_at.is_none());

        let tech_actor = Actor::new(tech, UserRole::Technician);
        let completed = mgr
            .update_request_status(&tech_actor, request.id, "completed")
            .await
            .unwrap();
        assert_eq!(completed.status, RequestStatus::Completed);
        let completed_at = completed.completed_at.expect("completed_at stamped");
        assert!(completed.updated_at >= request.updated_at);

        let err = mgr
            .update_request_status(&customer(user), request.id, "pending")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RequestError::InvalidTransition {
                from: RequestStatus::Completed,
                to: RequestStatus::Pending
            }
        ));

        let view = mgr.get_request(&customer(user), request.id).await.unwrap();
        assert_eq!(view.request.status, RequestStatus::Completed);
        assert_eq!(view.request.completed_at, Some(completed_at));
    }

    #[tokio::test]
    async fn illegal_jumps_are_rejected() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let user = Uuid::new_v4();
        let request = mgr.submit_request(towing(), Some(user)).await.unwrap();

        let err = mgr
            .update_request_status(&customer(user), request.id, "completed")
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::InvalidTransition { .. }));

        let err = mgr
            .update_request_status(&customer(user), request.id, "on_the_way")
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::ValidationFailure(_)));

        let cancelled = mgr
            .update_request_status(&customer(user), request.id, "cancelled")
            .await
            .unwrap();
        assert_eq!(cancelled.status, RequestStatus::Cancelled);
        assert!(cancelled.completed_at.is_none());
    }

    #[tokio::test]
    async fn strangers_cannot_update_or_read() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let request = mgr.submit_request(towing(), Some(Uuid::new_v4())).await.unwrap();
        let stranger = customer(Uuid::new_v4());

        let err = mgr
            .update_request_status(&stranger, request.id, "cancelled")
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Forbidden(_)));

        let err = mgr.get_request(&stranger, request.id).await.unwrap_err();
        assert!(matches!(err, RequestError::Forbidden(_)));

        let by_admin = mgr
            .update_request_status(&admin(), request.id, "cancelled")
            .await
            .unwrap();
        assert_eq!(by_admin.status, RequestStatus::Cancelled);
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let store = MemoryStore::new();
        let err = manager(&store)
            .update_request_status(&admin(), Uuid::new_v4(), "cancelled")
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::NotFound(_)));
    }

    #[tokio::test]
    async fn assignment_rules() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let user = Uuid::new_v4();
        let alex = technician(&store, "Alex");
        let blair = technician(&store, "Blair");
        let request = mgr.submit_request(towing(), Some(user)).await.unwrap();

        let err = mgr
            .assign_technician(&customer(user), request.id, alex)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Forbidden(_)));

        let err = mgr
            .assign_technician(&Actor::new(blair, UserRole::Technician), request.id, alex)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Forbidden(_)));

        let claimed = mgr
            .assign_technician(&Actor::new(alex, UserRole::Technician), request.id, alex)
            .await
            .unwrap();
        assert_eq!(claimed.technician_id, Some(alex));
        assert_eq!(claimed.status, RequestStatus::Assigned);

        let err = mgr
            .assign_technician(&admin(), request.id, blair)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn assigning_unknown_technician_fails_in_store() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let request = mgr.submit_request(towing(), Some(Uuid::new_v4())).await.unwrap();

        let err = mgr
            .assign_technician(&admin(), request.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::RequestUpdateFailed(_)));
    }

    /// Yields between every read and the following write, so joined futures interleave
    struct YieldingStore(MemoryStore);

    #[async_trait::async_trait]
    impl ServiceRequestStore for YieldingStore {
        async fn insert_request(&self, record: NewServiceRequest) -> StoreResult<ServiceRequest> {
            self.0.insert_request(record).await
        }

        async fn get_request(&self, id: Uuid) -> StoreResult<Option<ServiceRequest>> {
            let found = self.0.get_request(id).await;
            tokio::task::yield_now().await;
            found
        }

        async fn list_by_requester(&self, user_id: Uuid) -> StoreResult<Vec<ServiceRequest>> {
            self.0.list_by_requester(user_id).await
        }

        async fn list_by_technician(&self, technician_id: Uuid) -> StoreResult<Vec<ServiceRequest>> {
            self.0.list_by_technician(technician_id).await
        }

        async fn list_requests(
            &self,
            filter: &ServiceRequestFilter,
            limit: u32,
            offset: u32,
        ) -> StoreResult<(Vec<ServiceRequest>, u64)> {
            self.0.list_requests(filter, limit, offset).await
        }

        async fn update_status(
            &self,
            id: Uuid,
            update: StatusUpdate,
        ) -> StoreResult<Option<ServiceRequest>> {
            self.0.update_status(id, update).await
        }

        async fn assign_technician(
            &self,
            id: Uuid,
            technician_id: Uuid,
            updated_at: chrono::DateTime<Utc>,
        ) -> StoreResult<Option<ServiceRequest>> {
            self.0.assign_technician(id, technician_id, updated_at).await
        }

        async fn technician_contact(
            &self,
            technician_id: Uuid,
        ) -> StoreResult<Option<TechnicianContact>> {
            self.0.technician_contact(technician_id).await
        }

        async fn requester_profile(&self, user_id: Uuid) -> StoreResult<Option<RequesterProfile>> {
            self.0.requester_profile(user_id).await
        }

        async fn health_check(&self) -> bool {
            self.0.health_check().await
        }
    }

    fn interleaving(store: &MemoryStore) -> ServiceRequestManager {
        ServiceRequestManager::new(Arc::new(YieldingStore(store.clone())))
    }

    #[tokio::test]
    async fn racing_close_and_cancel_have_one_winner() {
        let store = MemoryStore::new();
        let mgr = interleaving(&store);
        let user = Uuid::new_v4();
        let tech = technician(&store, "Alex");
        let request = mgr.submit_request(towing(), Some(user)).await.unwrap();
        mgr.assign_technician(&admin(), request.id, tech).await.unwrap();

        let tech_actor = Actor::new(tech, UserRole::Technician);
        let user_actor = customer(user);
        let (completed, cancelled) = tokio::join!(
            mgr.update_request_status(&tech_actor, request.id, "completed"),
            mgr.update_request_status(&user_actor, request.id, "cancelled"),
        );

        assert!(completed.is_ok() != cancelled.is_ok());
        let loser = if completed.is_ok() { cancelled } else { completed };
        assert!(matches!(
            loser.unwrap_err(),
            RequestError::InvalidTransition { from, .. } if from.is_terminal()
        ));

        let stored = store.get_request(request.id).await.unwrap().unwrap();
        assert_eq!(
            stored.completed_at.is_some(),
            stored.status == RequestStatus::Completed
        );
    }

    #[tokio::test]
    async fn racing_claims_keep_the_first_technician() {
        let store = MemoryStore::new();
        let mgr = interleaving(&store);
        let alex = technician(&store, "Alex");
        let blair = technician(&store, "Blair");
        let request = mgr.submit_request(towing(), Some(Uuid::new_v4())).await.unwrap();

        let alex_actor = Actor::new(alex, UserRole::Technician);
        let blair_actor = Actor::new(blair, UserRole::Technician);
        let (by_alex, by_blair) = tokio::join!(
            mgr.assign_technician(&alex_actor, request.id, alex),
            mgr.assign_technician(&blair_actor, request.id, blair),
        );

        assert!(by_alex.is_ok() != by_blair.is_ok());
        let winner = by_alex.as_ref().or(by_blair.as_ref()).unwrap().technician_id;
        let stored = store.get_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.technician_id, winner);
        assert_eq!(stored.status, RequestStatus::Assigned);
    }

    #[tokio::test]
    async fn admin_listing_filters_by_status() {
        let store = MemoryStore::new();
        let mgr = manager(&store);
        let user = Uuid::new_v4();
        let first = mgr.submit_request(towing(), Some(user)).await.unwrap();
        mgr.submit_request(towing(), Some(user)).await.unwrap();
        mgr.update_request_status(&customer(user), first.id, "cancelled")
            .await
            .unwrap();

        let filter = ServiceRequestFilter {
            status: Some(RequestStatus::Pending),
            service_type: None,
        };
        let (rows, total) = mgr.list_requests(&filter, 20, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].status, RequestStatus::Pending);
    }
}
