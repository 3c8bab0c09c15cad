use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::catalog::{checklist_item, AreaCatalog};
use super::domain::{Actor, ChecklistAnswer, ChecklistEntry, PhaseKind, RentalId, RentalKind};
use super::errors::{EvidenceError, NotFoundError, ValidationError};
use super::service::EvidenceService;
use super::store::{EvidenceStore, ListItem, ListKey, StoreError};

const MERGE_ATTEMPTS: usize = 3;

/// Answers to fold into an area's checklist. Items not mentioned keep their previous answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChecklistUpdate {
    #[serde(default)]
    pub answers: BTreeMap<String, ChecklistAnswer>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ChecklistUpdate {
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.note.is_none()
    }

    /// Checks the update against the kind's template and resolves the target area key.
    pub fn validate(
        &self,
        kind: RentalKind,
        catalog: &AreaCatalog,
        area_key: Option<&str>,
    ) -> Result<String, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyChecklist);
        }
        if let Some(item) = self
            .answers
            .keys()
            .find(|item| checklist_item(kind, item).is_none())
        {
            return Err(ValidationError::UnknownChecklistItem {
                item: item.clone(),
                kind: kind.as_str(),
            });
        }
        catalog.checklist_area_key(area_key)
    }
}

impl<S> EvidenceService<S>
where
    S: EvidenceStore + 'static,
{
    /// Merges answers into the area's checklist entry, creating it on first use.
    pub async fn update_checklist(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        phase: PhaseKind,
        area_key: Option<&str>,
        update: ChecklistUpdate,
    ) -> Result<ChecklistEntry, EvidenceError> {
        let mut rental = self
            .load_for_write(actor, rental_id, "update checklists of")
            .await?;
        let key = update.validate(rental.kind, &rental.catalog(), area_key)?;

        for attempt in 1..=MERGE_ATTEMPTS {
            let now = self.now();
            let (entry, outcome) = match rental.phase(phase).checklist_for_area(&key) {
                Some(existing) => {
                    let mut entry = existing.clone();
                    entry.merge(&update.answers, update.note.as_deref(), now);
                    let item = ListItem::Checklist {
                        phase,
                        entry: entry.clone(),
                    };
                    (entry, self.store.replace_in_list(rental_id, item).await)
                }
                None => {
                    let mut entry = ChecklistEntry {
                        area_key: key.clone(),
                        answers: BTreeMap::new(),
                        note: None,
                        updated_at: now,
                    };
                    entry.merge(&update.answers, update.note.as_deref(), now);
                    let item = ListItem::Checklist {
                        phase,
                        entry: entry.clone(),
                    };
                    (entry, self.store.append_to_list(rental_id, item).await)
                }
            };

            match outcome {
                Ok(()) => {
                    info!(
                        rental_id = %rental_id,
                        %phase,
                        area_key = %entry.area_key,
                        answers = entry.answers.len(),
                        "checklist updated"
                    );
                    self.note_evidence(&rental, phase).await?;
                    return Ok(entry);
                }
                Err(StoreError::Conflict | StoreError::NotFound) => {
                    debug!(rental_id = %rental_id, attempt, area_key = %key, "checklist changed underneath; merging again");
                    rental = self.load(rental_id).await?;
                }
                Err(error) => return Err(EvidenceError::from_store(error, rental_id)),
            }
        }

        Err(EvidenceError::Conflict(format!("{}.checklists.{key}", phase.field())))
    }

    pub async fn checklist(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        phase: PhaseKind,
        area_key: &str,
    ) -> Result<ChecklistEntry, EvidenceError> {
        let rental = self.load_for_read(actor, rental_id).await?;
        rental
            .phase(phase)
            .checklist_for_area(area_key)
            .cloned()
            .ok_or_else(|| {
                NotFoundError::Checklist {
                    phase,
                    area_key: area_key.to_string(),
                }
                .into()
            })
    }

    pub async fn remove_checklist(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        phase: PhaseKind,
        area_key: &str,
    ) -> Result<(), EvidenceError> {
        self.load_for_write(actor, rental_id, "update checklists of")
            .await?;
        let key = ListKey::Checklist {
            phase,
            area_key: area_key.to_string(),
        };
        match self.store.remove_from_list(rental_id, key).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => Err(NotFoundError::Checklist {
                phase,
                area_key: area_key.to_string(),
            }
            .into()),
            Err(error) => Err(EvidenceError::from_store(error, rental_id)),
        }
    }
}
