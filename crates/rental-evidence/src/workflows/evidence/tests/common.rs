use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::EvidenceConfig;
use crate::workflows::evidence::clock::ManualClock;
use crate::workflows::evidence::domain::{Actor, PhaseKind, Rental, RentalId, RentalKind};
use crate::workflows::evidence::lifecycle::NewRental;
use crate::workflows::evidence::photos::PhotoUpload;
use crate::workflows::evidence::store::{
    EvidenceStore, FieldUpdate, InMemoryEvidenceStore, ListItem, ListKey, RentalFilter,
    StoreError,
};
use crate::workflows::evidence::EvidenceService;

pub(super) const OWNER: &str = "owner-1";

pub(super) fn owner() -> Actor {
    Actor::owner(OWNER)
}

pub(super) fn renter() -> Actor {
    Actor::counterparty("renter-7")
}

pub(super) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0)
        .single()
        .expect("valid start time")
}

pub(super) fn jpeg() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend_from_slice(b"condition photo");
    bytes
}

pub(super) fn png() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(b"signature strokes");
    bytes
}

pub(super) fn upload(area_key: Option<&str>) -> PhotoUpload {
    PhotoUpload {
        area_key: area_key.map(str::to_string),
        image: jpeg(),
        memo: None,
        location: None,
    }
}

pub(super) type MemoryService = EvidenceService<InMemoryEvidenceStore>;

pub(super) fn build_service_with(
    config: EvidenceConfig,
) -> (MemoryService, Arc<InMemoryEvidenceStore>, Arc<ManualClock>) {
    let store = Arc::new(InMemoryEvidenceStore::default());
    let clock = Arc::new(ManualClock::starting_at(start_time()));
    let service = EvidenceService::with_clock(store.clone(), clock.clone(), config);
    (service, store, clock)
}

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryEvidenceStore>, Arc<ManualClock>) {
    build_service_with(EvidenceConfig::default())
}

pub(super) fn new_rental(kind: RentalKind, custom_areas: &[&str]) -> NewRental {
    NewRental {
        kind,
        title: format!("{} rental", kind.label()),
        contract_start: start_time(),
        contract_end: start_time() + Duration::days(7),
        custom_areas: custom_areas.iter().map(|name| name.to_string()).collect(),
    }
}

pub(super) async fn create<S: EvidenceStore + 'static>(
    service: &EvidenceService<S>,
    kind: RentalKind,
) -> Rental {
    service
        .create_rental(&owner(), new_rental(kind, &[]))
        .await
        .expect("rental created")
}

/// Photographs every area in `keys`, then signs the phase.
pub(super) async fn document_phase(
    service: &MemoryService,
    rental_id: &RentalId,
    phase: PhaseKind,
    keys: &[&str],
) {
    for key in keys {
        service
            .add_photo(&owner(), rental_id, phase, upload(Some(key)))
            .await
            .expect("photo recorded");
    }
    service
        .set_signature(&owner(), rental_id, phase, png())
        .await
        .expect("signature stored");
}

pub(super) const VEHICLE_REQUIRED: [&str; 4] = ["front", "rear", "left", "right"];

/// Store whose backend is down for every call.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("document store offline".to_string()))
}

impl EvidenceStore for UnavailableStore {
    async fn insert_rental(&self, _rental: Rental) -> Result<Rental, StoreError> {
        offline()
    }

    async fn read_rental(&self, _id: &RentalId) -> Result<Rental, StoreError> {
        offline()
    }

    async fn list_rentals(&self, _filter: &RentalFilter) -> Result<Vec<Rental>, StoreError> {
        offline()
    }

    async fn append_to_list(&self, _id: &RentalId, _item: ListItem) -> Result<(), StoreError> {
        offline()
    }

    async fn replace_in_list(&self, _id: &RentalId, _item: ListItem) -> Result<(), StoreError> {
        offline()
    }

    async fn remove_from_list(&self, _id: &RentalId, _key: ListKey) -> Result<(), StoreError> {
        offline()
    }

    async fn set_field(&self, _id: &RentalId, _update: FieldUpdate) -> Result<(), StoreError> {
        offline()
    }

    async fn upload_blob(
        &self,
        _path: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StoreError> {
        offline()
    }
}

/// In-memory store that reports a conflict for the first `conflicts` list appends.
#[derive(Debug, Default)]
pub(super) struct ContendedStore {
    pub(super) inner: InMemoryEvidenceStore,
    pub(super) conflicts: AtomicUsize,
    pub(super) appends: AtomicUsize,
}

impl ContendedStore {
    pub(super) fn with_conflicts(conflicts: usize) -> Self {
        Self {
            conflicts: AtomicUsize::new(conflicts),
            ..Self::default()
        }
    }
}

impl EvidenceStore for ContendedStore {
    async fn insert_rental(&self, rental: Rental) -> Result<Rental, StoreError> {
        self.inner.insert_rental(rental).await
    }

    async fn read_rental(&self, id: &RentalId) -> Result<Rental, StoreError> {
        self.inner.read_rental(id).await
    }

    async fn list_rentals(&self, filter: &RentalFilter) -> Result<Vec<Rental>, StoreError> {
        self.inner.list_rentals(filter).await
    }

    async fn append_to_list(&self, id: &RentalId, item: ListItem) -> Result<(), StoreError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Conflict);
        }
        self.inner.append_to_list(id, item).await
    }

    async fn replace_in_list(&self, id: &RentalId, item: ListItem) -> Result<(), StoreError> {
        self.inner.replace_in_list(id, item).await
    }

    async fn remove_from_list(&self, id: &RentalId, key: ListKey) -> Result<(), StoreError> {
        self.inner.remove_from_list(id, key).await
    }

    async fn set_field(&self, id: &RentalId, update: FieldUpdate) -> Result<(), StoreError> {
        self.inner.set_field(id, update).await
    }

    async fn upload_blob(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        self.inner.upload_blob(path, bytes, content_type).await
    }
}
