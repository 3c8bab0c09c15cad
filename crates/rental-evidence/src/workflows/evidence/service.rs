use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::catalog::ChecklistPolicy;
use super::clock::{truncate_to_millis, Clock, SystemClock};
use super::domain::{Actor, GeoPoint, PhaseKind, Rental, RentalId, RentalKind, RentalStatus};
use super::errors::{EvidenceError, NotFoundError};
use super::geolocation::{locate_within, LocationError};
use super::store::{EvidenceStore, FieldUpdate};
use crate::config::EvidenceConfig;

/// Service composing the evidence store, a clock, and evidence settings.
///
/// Operations are split by concern across `photos`, `checklists`, `signature`, `lifecycle`
/// and `comparison`; this module holds the shared loading and authorization helpers.
pub struct EvidenceService<S> {
    pub(crate) store: Arc<S>,
    clock: Arc<dyn Clock>,
    pub(crate) config: EvidenceConfig,
}

impl<S> EvidenceService<S>
where
    S: EvidenceStore + 'static,
{
    pub fn new(store: Arc<S>, config: EvidenceConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(store: Arc<S>, clock: Arc<dyn Clock>, config: EvidenceConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EvidenceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn checklist_policy(&self, kind: RentalKind) -> ChecklistPolicy {
        if self.config.mandatory_checklists.contains(&kind) {
            ChecklistPolicy::Mandatory
        } else {
            ChecklistPolicy::Advisory
        }
    }

    /// Runs a device location lookup bounded by the configured timeout.
    pub async fn capture_location<F>(&self, lookup: F) -> Option<GeoPoint>
    where
        F: Future<Output = Result<GeoPoint, LocationError>>,
    {
        locate_within(lookup, self.config.geolocation_timeout).await
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        truncate_to_millis(self.clock.now())
    }

    /// Latest persisted snapshot. Soft-deleted rentals read as missing.
    pub(crate) async fn load(&self, rental_id: &RentalId) -> Result<Rental, EvidenceError> {
        let rental = self
            .store
            .read_rental(rental_id)
            .await
            .map_err(|error| EvidenceError::from_store(error, rental_id))?;
        if rental.is_deleted() {
            return Err(NotFoundError::Rental(rental_id.clone()).into());
        }
        Ok(rental)
    }

    pub(crate) async fn load_for_write(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        action: &'static str,
    ) -> Result<Rental, EvidenceError> {
        let rental = self.load(rental_id).await?;
        if !actor.can_write(&rental) {
            debug!(actor = %actor.user_id, rental_id = %rental_id, action, "write refused");
            return Err(EvidenceError::Forbidden {
                actor: actor.user_id.clone(),
                action,
                rental_id: rental_id.clone(),
            });
        }
        Ok(rental)
    }

    pub(crate) async fn load_for_read(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
    ) -> Result<Rental, EvidenceError> {
        let rental = self.load(rental_id).await?;
        if !actor.can_read(&rental) {
            return Err(EvidenceError::Forbidden {
                actor: actor.user_id.clone(),
                action: "read",
                rental_id: rental_id.clone(),
            });
        }
        Ok(rental)
    }

    /// Check-out evidence on a checked-in rental moves it from pending to active.
    pub(crate) async fn note_evidence(
        &self,
        rental: &Rental,
        phase: PhaseKind,
    ) -> Result<(), EvidenceError> {
        if phase != PhaseKind::CheckOut
            || rental.status != RentalStatus::Pending
            || !rental.check_in.is_complete()
        {
            return Ok(());
        }
        self.store
            .set_field(&rental.id, FieldUpdate::Status(RentalStatus::Active))
            .await
            .map_err(|error| EvidenceError::from_store(error, &rental.id))?;
        debug!(rental_id = %rental.id, "rental active after first check-out evidence");
        Ok(())
    }
}
