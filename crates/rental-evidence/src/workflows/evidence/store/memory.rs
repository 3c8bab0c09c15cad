use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{EvidenceStore, FieldUpdate, ListItem, ListKey, RentalFilter, StoreError};
use crate::workflows::evidence::domain::{Rental, RentalId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Process-local store used by the demo server and tests.
#[derive(Debug, Clone)]
pub struct InMemoryEvidenceStore {
    rentals: Arc<Mutex<HashMap<RentalId, Rental>>>,
    blobs: Arc<Mutex<HashMap<String, StoredBlob>>>,
    base_url: String,
}

impl Default for InMemoryEvidenceStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_BLOB_BASE_URL)
    }
}

impl InMemoryEvidenceStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            rentals: Arc::default(),
            blobs: Arc::default(),
            base_url: base_url.into(),
        }
    }

    pub fn blob(&self, url: &str) -> Option<StoredBlob> {
        let blobs = self.blobs.lock().ok()?;
        blobs.get(url).cloned()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().map(|blobs| blobs.len()).unwrap_or_default()
    }

    fn rentals(&self) -> Result<MutexGuard<'_, HashMap<RentalId, Rental>>, StoreError> {
        self.rentals
            .lock()
            .map_err(|_| StoreError::Unavailable("rental map lock poisoned".to_string()))
    }

    fn with_rental<T>(
        &self,
        id: &RentalId,
        apply: impl FnOnce(&mut Rental) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut rentals = self.rentals()?;
        let rental = rentals.get_mut(id).ok_or(StoreError::NotFound)?;
        apply(rental)
    }
}

impl EvidenceStore for InMemoryEvidenceStore {
    async fn insert_rental(&self, rental: Rental) -> Result<Rental, StoreError> {
        let mut rentals = self.rentals()?;
        if rentals.contains_key(&rental.id) {
            return Err(StoreError::Conflict);
        }
        rentals.insert(rental.id.clone(), rental.clone());
        Ok(rental)
    }

    async fn read_rental(&self, id: &RentalId) -> Result<Rental, StoreError> {
        let rentals = self.rentals()?;
        rentals.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_rentals(&self, filter: &RentalFilter) -> Result<Vec<Rental>, StoreError> {
        let rentals = self.rentals()?;
        let mut matching: Vec<Rental> = rentals
            .values()
            .filter(|rental| filter.include_deleted || !rental.is_deleted())
            .filter(|rental| {
                filter
                    .owner
                    .as_ref()
                    .map_or(true, |owner| &rental.owner == owner)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(matching)
    }

    async fn append_to_list(&self, id: &RentalId, item: ListItem) -> Result<(), StoreError> {
        self.with_rental(id, |rental| match item {
            ListItem::Photo { phase, record } => {
                let photos = &mut rental.phase_mut(phase).photos;
                if photos
                    .last()
                    .is_some_and(|last| last.taken_at >= record.taken_at)
                {
                    return Err(StoreError::Conflict);
                }
                photos.push(record);
                Ok(())
            }
            ListItem::Checklist { phase, entry } => {
                let checklists = &mut rental.phase_mut(phase).checklists;
                if checklists
                    .iter()
                    .any(|existing| existing.area_key == entry.area_key)
                {
                    return Err(StoreError::Conflict);
                }
                checklists.push(entry);
                Ok(())
            }
        })
    }

    async fn replace_in_list(&self, id: &RentalId, item: ListItem) -> Result<(), StoreError> {
        self.with_rental(id, |rental| match item {
            ListItem::Photo { phase, record } => {
                let slot = rental
                    .phase_mut(phase)
                    .photos
                    .iter_mut()
                    .find(|photo| photo.taken_at == record.taken_at)
                    .ok_or(StoreError::NotFound)?;
                *slot = record;
                Ok(())
            }
            ListItem::Checklist { phase, entry } => {
                let slot = rental
                    .phase_mut(phase)
                    .checklists
                    .iter_mut()
                    .find(|existing| existing.area_key == entry.area_key)
                    .ok_or(StoreError::NotFound)?;
                *slot = entry;
                Ok(())
            }
        })
    }

    async fn remove_from_list(&self, id: &RentalId, key: ListKey) -> Result<(), StoreError> {
        self.with_rental(id, |rental| {
            let removed = match &key {
                ListKey::Photo { phase, taken_at } => {
                    let photos = &mut rental.phase_mut(*phase).photos;
                    let before = photos.len();
                    photos.retain(|photo| photo.taken_at != *taken_at);
                    photos.len() != before
                }
                ListKey::Checklist { phase, area_key } => {
                    let checklists = &mut rental.phase_mut(*phase).checklists;
                    let before = checklists.len();
                    checklists.retain(|entry| &entry.area_key != area_key);
                    checklists.len() != before
                }
            };

            if removed {
                Ok(())
            } else {
                Err(StoreError::NotFound)
            }
        })
    }

    async fn set_field(&self, id: &RentalId, update: FieldUpdate) -> Result<(), StoreError> {
        self.with_rental(id, |rental| {
            match update {
                FieldUpdate::Signature { phase, signature } => {
                    rental.phase_mut(phase).signature = Some(signature);
                }
                FieldUpdate::CompletedAt { phase, at } => {
                    let slot = &mut rental.phase_mut(phase).completed_at;
                    if slot.is_some() {
                        return Err(StoreError::Conflict);
                    }
                    *slot = Some(at);
                }
                FieldUpdate::Status(status) => {
                    rental.status = rental.status.advance(status);
                }
            }
            Ok(())
        })
    }

    async fn upload_blob(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Unavailable("blob map lock poisoned".to_string()))?;
        blobs.insert(
            url.clone(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(url)
    }
}
