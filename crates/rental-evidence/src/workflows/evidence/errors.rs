use chrono::{DateTime, Utc};

use super::catalog::Area;
use super::domain::{PhaseKind, RentalId, UserId};
use super::store::StoreError;

/// Input rejected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("image payload is empty")]
    EmptyImage,
    #[error("image payload of {size} bytes exceeds the {max} byte ceiling")]
    ImageTooLarge { size: usize, max: usize },
    #[error("payload is not a supported image format (jpeg, png, webp, heic, gif)")]
    UnsupportedImageFormat,
    #[error("area '{0}' is not part of this rental's catalog")]
    UnknownArea(String),
    #[error("an area key is required for rentals with an area catalog")]
    AreaRequired,
    #[error("checklist item '{item}' is not defined for {kind} rentals")]
    UnknownChecklistItem { item: String, kind: &'static str },
    #[error("checklist update contains no answers")]
    EmptyChecklist,
    #[error("signature payload is empty")]
    EmptySignature,
    #[error("signature payload of {size} bytes exceeds the {max} byte ceiling")]
    SignatureTooLarge { size: usize, max: usize },
    #[error("overlay opacity must be between 0 and 100, got {0}")]
    InvalidOpacity(u32),
    #[error("unknown comparison mode '{0}'")]
    UnknownRenderMode(String),
    #[error("rental title must not be blank")]
    BlankTitle,
    #[error("contract end {end} precedes contract start {start}")]
    InvalidContractWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("custom areas are only supported for goods rentals, not {0}")]
    CustomAreasNotSupported(&'static str),
    #[error("custom area names must not be blank")]
    BlankCustomArea,
    #[error("at most {max} custom areas are allowed, got {count}")]
    TooManyCustomAreas { count: usize, max: usize },
    #[error("unknown rental phase '{0}'")]
    UnknownPhase(String),
    #[error("unknown rental kind '{0}'")]
    UnknownKind(String),
    #[error("{0} is not a valid photo timestamp")]
    InvalidTimestamp(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFoundError {
    #[error("rental {0} not found")]
    Rental(RentalId),
    #[error("no {phase} photo taken at {taken_at}")]
    Photo {
        phase: PhaseKind,
        taken_at: DateTime<Utc>,
    },
    #[error("no {phase} checklist for area '{area_key}'")]
    Checklist { phase: PhaseKind, area_key: String },
}

/// Why a phase cannot be marked complete yet. Expected and user-actionable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionBlocker {
    #[error("at least one photo is required")]
    NoPhotos,
    #[error("required areas have no photo: {}", area_names(.0))]
    MissingRequiredAreas(Vec<Area>),
    #[error("required areas have no checklist: {}", area_names(.0))]
    MissingChecklists(Vec<Area>),
    #[error("phase has not been signed")]
    MissingSignature,
    #[error("check-in must be completed before check-out")]
    CheckInNotComplete,
}

impl CompletionBlocker {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoPhotos => "no_photos",
            Self::MissingRequiredAreas(_) => "missing_required_areas",
            Self::MissingChecklists(_) => "missing_checklists",
            Self::MissingSignature => "missing_signature",
            Self::CheckInNotComplete => "check_in_not_complete",
        }
    }

    /// Display names of the areas still lacking evidence, if any.
    pub fn missing_area_names(&self) -> Vec<&str> {
        match self {
            Self::MissingRequiredAreas(areas) | Self::MissingChecklists(areas) => {
                areas.iter().map(|area| area.name.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn area_names(areas: &[Area]) -> String {
    areas
        .iter()
        .map(|area| area.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error raised by the evidence service.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Incomplete(#[from] CompletionBlocker),
    #[error("user {actor} may not {action} rental {rental_id}")]
    Forbidden {
        actor: UserId,
        action: &'static str,
        rental_id: RentalId,
    },
    #[error("user {actor} may not create rentals")]
    CreateForbidden { actor: UserId },
    #[error("conflicting write to {0}")]
    Conflict(String),
    #[error("evidence store unavailable: {0}")]
    StoreUnavailable(String),
}

impl EvidenceError {
    /// Maps a store failure for a whole-rental read or write.
    pub(crate) fn from_store(error: StoreError, rental_id: &RentalId) -> Self {
        match error {
            StoreError::NotFound => NotFoundError::Rental(rental_id.clone()).into(),
            StoreError::Conflict => Self::Conflict(rental_id.to_string()),
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}
