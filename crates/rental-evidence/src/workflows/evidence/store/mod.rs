//! Narrow interface over the document database and blob store.
//!
//! Every write is field scoped: photo appends, checklist updates and signature changes touch
//! different paths of the rental document, so concurrent sessions do not overwrite each other.

mod memory;

pub use memory::{InMemoryEvidenceStore, StoredBlob};

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};

use super::domain::{
    ChecklistEntry, PhaseKind, PhotoRecord, Rental, RentalId, RentalStatus, SignatureArtifact,
    UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Photos,
    Checklists,
}

/// Address of a list inside the rental document, e.g. `checkIn.photos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListPath {
    pub phase: PhaseKind,
    pub list: ListKind,
}

impl fmt::Display for ListPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = match self.list {
            ListKind::Photos => "photos",
            ListKind::Checklists => "checklists",
        };
        write!(f, "{}.{}", self.phase.field(), list)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListItem {
    Photo {
        phase: PhaseKind,
        record: PhotoRecord,
    },
    Checklist {
        phase: PhaseKind,
        entry: ChecklistEntry,
    },
}

impl ListItem {
    pub fn path(&self) -> ListPath {
        self.key().path()
    }

    pub fn key(&self) -> ListKey {
        match self {
            Self::Photo { phase, record } => ListKey::Photo {
                phase: *phase,
                taken_at: record.taken_at,
            },
            Self::Checklist { phase, entry } => ListKey::Checklist {
                phase: *phase,
                area_key: entry.area_key.clone(),
            },
        }
    }
}

/// Natural key of a list element: photo timestamp or checklist area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKey {
    Photo {
        phase: PhaseKind,
        taken_at: DateTime<Utc>,
    },
    Checklist {
        phase: PhaseKind,
        area_key: String,
    },
}

impl ListKey {
    pub fn path(&self) -> ListPath {
        match self {
            Self::Photo { phase, .. } => ListPath {
                phase: *phase,
                list: ListKind::Photos,
            },
            Self::Checklist { phase, .. } => ListPath {
                phase: *phase,
                list: ListKind::Checklists,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Signature {
        phase: PhaseKind,
        signature: SignatureArtifact,
    },
    /// Write-once; stores reject a second completion with [`StoreError::Conflict`].
    CompletedAt {
        phase: PhaseKind,
        at: DateTime<Utc>,
    },
    /// Applied with [`RentalStatus::advance`], so status never regresses.
    Status(RentalStatus),
}

impl FieldUpdate {
    pub fn path(&self) -> String {
        match self {
            Self::Signature { phase, .. } => format!("{}.signature", phase.field()),
            Self::CompletedAt { phase, .. } => format!("{}.completedAt", phase.field()),
            Self::Status(_) => "status".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RentalFilter {
    pub owner: Option<UserId>,
    pub include_deleted: bool,
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("conflicting write")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction so the evidence service can be exercised against any backend.
///
/// All methods return `Send` futures so the trait works behind axum handlers.
pub trait EvidenceStore: Send + Sync {
    /// Persists a new rental document. Fails with `Conflict` when the id is taken.
    fn insert_rental(
        &self,
        rental: Rental,
    ) -> impl Future<Output = Result<Rental, StoreError>> + Send;

    fn read_rental(
        &self,
        id: &RentalId,
    ) -> impl Future<Output = Result<Rental, StoreError>> + Send;

    fn list_rentals(
        &self,
        filter: &RentalFilter,
    ) -> impl Future<Output = Result<Vec<Rental>, StoreError>> + Send;

    /// Atomic append. Photos must be newer than the list's last photo and checklist areas
    /// must be unique; otherwise `Conflict`.
    fn append_to_list(
        &self,
        id: &RentalId,
        item: ListItem,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replaces the element sharing the item's key; `NotFound` if it is gone.
    fn replace_in_list(
        &self,
        id: &RentalId,
        item: ListItem,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn remove_from_list(
        &self,
        id: &RentalId,
        key: ListKey,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn set_field(
        &self,
        id: &RentalId,
        update: FieldUpdate,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stores bytes and returns the URL the rental document should reference.
    fn upload_blob(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;
}
