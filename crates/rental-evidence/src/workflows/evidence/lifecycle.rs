//! Rental creation, phase completion, soft deletion and listings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::catalog::normalize_custom_areas;
use super::domain::{
    Actor, Phase, PhaseKind, Rental, RentalId, RentalKind, RentalStatus, Role,
};
use super::errors::{CompletionBlocker, EvidenceError, NotFoundError, ValidationError};
use super::service::EvidenceService;
use super::store::{EvidenceStore, FieldUpdate, RentalFilter, StoreError};
use super::validator;

/// Where a rental stands in the check-in / check-out sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    NotStarted,
    CheckInOpen,
    CheckInComplete,
    CheckOutOpen,
    CheckOutComplete,
}

impl LifecycleState {
    pub fn of(rental: &Rental) -> Self {
        if rental.check_out.is_complete() {
            Self::CheckOutComplete
        } else if rental.check_in.is_complete() && rental.check_out.has_evidence() {
            Self::CheckOutOpen
        } else if rental.check_in.is_complete() {
            Self::CheckInComplete
        } else if rental.check_in.has_evidence() || rental.check_out.has_evidence() {
            Self::CheckInOpen
        } else {
            Self::NotStarted
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::CheckInOpen => "Check-in in progress",
            Self::CheckInComplete => "Checked in",
            Self::CheckOutOpen => "Check-out in progress",
            Self::CheckOutComplete => "Checked out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRental {
    pub kind: RentalKind,
    pub title: String,
    pub contract_start: DateTime<Utc>,
    pub contract_end: DateTime<Utc>,
    #[serde(default)]
    pub custom_areas: Vec<String>,
}

impl NewRental {
    fn validate(&self, max_custom_areas: usize) -> Result<Vec<String>, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::BlankTitle);
        }
        if self.contract_end < self.contract_start {
            return Err(ValidationError::InvalidContractWindow {
                start: self.contract_start,
                end: self.contract_end,
            });
        }
        normalize_custom_areas(self.kind, &self.custom_areas, max_custom_areas)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseCompletion {
    pub rental_id: RentalId,
    pub phase: PhaseKind,
    pub completed_at: DateTime<Utc>,
    pub state: LifecycleState,
    /// `true` when the phase was already complete and nothing was written.
    pub already_complete: bool,
}

/// Counts of live rentals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RentalStatistics {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_kind: BTreeMap<&'static str, usize>,
}

impl RentalStatistics {
    pub fn tally<'a>(rentals: impl IntoIterator<Item = &'a Rental>) -> Self {
        let mut stats = Self::default();
        for rental in rentals.into_iter().filter(|rental| !rental.is_deleted()) {
            stats.total += 1;
            *stats.by_status.entry(status_key(rental.status)).or_default() += 1;
            *stats.by_kind.entry(rental.kind.as_str()).or_default() += 1;
        }
        stats
    }
}

fn status_key(status: RentalStatus) -> &'static str {
    match status {
        RentalStatus::Pending => "pending",
        RentalStatus::Active => "active",
        RentalStatus::Completed => "completed",
        RentalStatus::Deleted => "deleted",
    }
}

impl<S> EvidenceService<S>
where
    S: EvidenceStore + 'static,
{
    pub async fn create_rental(
        &self,
        actor: &Actor,
        request: NewRental,
    ) -> Result<Rental, EvidenceError> {
        if !actor.can_create() {
            return Err(EvidenceError::CreateForbidden {
                actor: actor.user_id.clone(),
            });
        }
        let custom_areas = request.validate(self.config.max_custom_areas)?;

        let rental = Rental {
            id: RentalId::generate(),
            kind: request.kind,
            title: request.title.trim().to_string(),
            owner: actor.user_id.clone(),
            contract_start: request.contract_start,
            contract_end: request.contract_end,
            status: RentalStatus::Pending,
            check_in: Phase::default(),
            check_out: Phase::default(),
            custom_areas,
            created_at: self.now(),
        };

        let stored = self
            .store
            .insert_rental(rental)
            .await
            .map_err(|error| match error {
                StoreError::Conflict => EvidenceError::Conflict("rental id".to_string()),
                StoreError::NotFound => EvidenceError::StoreUnavailable(
                    "store rejected insert as not found".to_string(),
                ),
                StoreError::Unavailable(reason) => EvidenceError::StoreUnavailable(reason),
            })?;
        info!(
            rental_id = %stored.id,
            kind = stored.kind.as_str(),
            owner = %stored.owner,
            custom_areas = stored.custom_areas.len(),
            "rental created"
        );
        Ok(stored)
    }

    pub async fn get_rental(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
    ) -> Result<Rental, EvidenceError> {
        self.load_for_read(actor, rental_id).await
    }

    /// Owners see their own rentals; admins see every live rental.
    pub async fn list_rentals(&self, actor: &Actor) -> Result<Vec<Rental>, EvidenceError> {
        let filter = match actor.role {
            Role::Admin => RentalFilter::default(),
            Role::Owner | Role::Counterparty => RentalFilter {
                owner: Some(actor.user_id.clone()),
                include_deleted: false,
            },
        };
        self.store
            .list_rentals(&filter)
            .await
            .map_err(|error| match error {
                StoreError::Unavailable(reason) => EvidenceError::StoreUnavailable(reason),
                other => EvidenceError::StoreUnavailable(other.to_string()),
            })
    }

    pub async fn statistics(&self, actor: &Actor) -> Result<RentalStatistics, EvidenceError> {
        let rentals = self.list_rentals(actor).await?;
        Ok(RentalStatistics::tally(&rentals))
    }

    pub async fn lifecycle_state(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
    ) -> Result<LifecycleState, EvidenceError> {
        let rental = self.load_for_read(actor, rental_id).await?;
        Ok(LifecycleState::of(&rental))
    }

    pub async fn complete_check_in(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
    ) -> Result<PhaseCompletion, EvidenceError> {
        self.complete_phase(actor, rental_id, PhaseKind::CheckIn)
            .await
    }

    pub async fn complete_check_out(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
    ) -> Result<PhaseCompletion, EvidenceError> {
        self.complete_phase(actor, rental_id, PhaseKind::CheckOut)
            .await
    }

    /// Validates the latest persisted snapshot and stamps the phase complete.
    ///
    /// Completing an already complete phase succeeds with the original timestamp and writes
    /// nothing. A blocked completion writes nothing either.
    pub async fn complete_phase(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        phase: PhaseKind,
    ) -> Result<PhaseCompletion, EvidenceError> {
        let mut rental = self.load_for_write(actor, rental_id, "complete").await?;
        if rental.phase(phase).is_complete() {
            return self.existing_completion(rental, phase).await;
        }

        if phase == PhaseKind::CheckOut && !rental.check_in.is_complete() {
            let blocker = CompletionBlocker::CheckInNotComplete;
            info!(rental_id = %rental_id, %phase, blocker = blocker.code(), "completion blocked");
            return Err(blocker.into());
        }

        let policy = self.checklist_policy(rental.kind);
        if let Err(blocker) =
            validator::can_complete(rental.kind, &rental.custom_areas, rental.phase(phase), policy)
        {
            info!(
                rental_id = %rental_id,
                %phase,
                blocker = blocker.code(),
                missing = ?blocker.missing_area_names(),
                "completion blocked"
            );
            return Err(blocker.into());
        }

        let at = self.now();
        match self
            .store
            .set_field(rental_id, FieldUpdate::CompletedAt { phase, at })
            .await
        {
            Ok(()) => {}
            Err(StoreError::Conflict) => {
                debug!(rental_id = %rental_id, %phase, "phase completed concurrently");
                let current = self.load(rental_id).await?;
                return self.existing_completion(current, phase).await;
            }
            Err(error) => return Err(EvidenceError::from_store(error, rental_id)),
        }
        rental.phase_mut(phase).completed_at = Some(at);

        match phase {
            // Check-out evidence recorded early starts counting once check-in closes.
            PhaseKind::CheckIn if rental.check_out.has_evidence() => {
                self.note_evidence(&rental, PhaseKind::CheckOut).await?;
                rental.status = rental.status.advance(RentalStatus::Active);
            }
            PhaseKind::CheckIn => {}
            PhaseKind::CheckOut => {
                self.mark_completed(&rental.id).await?;
                rental.status = rental.status.advance(RentalStatus::Completed);
            }
        }

        info!(rental_id = %rental_id, %phase, completed_at = %at, "phase completed");
        Ok(PhaseCompletion {
            rental_id: rental.id.clone(),
            phase,
            completed_at: at,
            state: LifecycleState::of(&rental),
            already_complete: false,
        })
    }

    /// Soft delete. The document is kept but every later operation reports it missing.
    pub async fn delete_rental(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
    ) -> Result<(), EvidenceError> {
        self.load_for_write(actor, rental_id, "delete").await?;
        self.store
            .set_field(rental_id, FieldUpdate::Status(RentalStatus::Deleted))
            .await
            .map_err(|error| EvidenceError::from_store(error, rental_id))?;
        info!(rental_id = %rental_id, actor = %actor.user_id, "rental deleted");
        Ok(())
    }

    async fn existing_completion(
        &self,
        mut rental: Rental,
        phase: PhaseKind,
    ) -> Result<PhaseCompletion, EvidenceError> {
        let completed_at = rental
            .phase(phase)
            .completed_at
            .ok_or_else(|| NotFoundError::Rental(rental.id.clone()))?;

        // Repairs a check-out completion whose status write was lost.
        if phase == PhaseKind::CheckOut && rental.status != RentalStatus::Completed {
            self.mark_completed(&rental.id).await?;
            rental.status = rental.status.advance(RentalStatus::Completed);
        }

        debug!(rental_id = %rental.id, %phase, "phase already complete");
        Ok(PhaseCompletion {
            rental_id: rental.id.clone(),
            phase,
            completed_at,
            state: LifecycleState::of(&rental),
            already_complete: true,
        })
    }

    async fn mark_completed(&self, rental_id: &RentalId) -> Result<(), EvidenceError> {
        self.store
            .set_field(rental_id, FieldUpdate::Status(RentalStatus::Completed))
            .await
            .map_err(|error| EvidenceError::from_store(error, rental_id))
    }
}
