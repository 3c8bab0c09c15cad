use chrono::{DateTime, Utc};
use serde::Serialize;

use super::super::domain::{PhaseKind, RentalKind, RentalStatus};

pub const NO_PHOTO: &str = "No photo";
pub const LOCATION_UNAVAILABLE: &str = "Location unavailable";
pub const UNSIGNED: &str = "Not signed";

/// Renderer-agnostic condition report. Field order is the print order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub cover: CoverPage,
    pub sections: Vec<ReportSection>,
    pub signatures: Vec<SignatureSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverPage {
    pub rental_id: String,
    pub title: String,
    pub kind: RentalKind,
    pub kind_label: &'static str,
    pub status: RentalStatus,
    pub status_label: &'static str,
    pub contract_start: DateTime<Utc>,
    pub contract_end: DateTime<Utc>,
    pub check_in_completed_at: Option<DateTime<Utc>>,
    pub check_out_completed_at: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub area_key: String,
    pub area_name: String,
    pub before: ReportSlot,
    pub after: ReportSlot,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checklist_before: Vec<ReportChecklistLine>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checklist_after: Vec<ReportChecklistLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum ReportSlot {
    Photos { photos: Vec<ReportPhoto> },
    NoPhoto { placeholder: &'static str },
}

impl ReportSlot {
    pub fn photos(&self) -> &[ReportPhoto] {
        match self {
            Self::Photos { photos } => photos,
            Self::NoPhoto { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPhoto {
    pub image_url: String,
    pub taken_at: DateTime<Utc>,
    pub memo: Option<String>,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportChecklistLine {
    pub item: String,
    pub label: String,
    pub answer_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureSlot {
    pub phase: PhaseKind,
    pub phase_label: &'static str,
    #[serde(flatten)]
    pub state: SignatureState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "signature", rename_all = "snake_case")]
pub enum SignatureState {
    Signed {
        image_url: String,
        signed_at: DateTime<Utc>,
    },
    Unsigned {
        placeholder: &'static str,
    },
}
