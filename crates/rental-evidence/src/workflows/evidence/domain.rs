use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::{areas_for, AreaCatalog};

/// Identifier wrapper for rentals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RentalId(pub String);

impl RentalId {
    pub fn generate() -> Self {
        Self(format!("rnt_{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for RentalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to an account managed outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalKind {
    Vehicle,
    Dwelling,
    Goods,
}

impl RentalKind {
    pub const fn ordered() -> [Self; 3] {
        [Self::Vehicle, Self::Dwelling, Self::Goods]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Vehicle => "Vehicle",
            Self::Dwelling => "Dwelling",
            Self::Goods => "Goods",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Dwelling => "dwelling",
            Self::Goods => "goods",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vehicle" | "car" => Some(Self::Vehicle),
            "dwelling" | "home" | "house" | "apartment" => Some(Self::Dwelling),
            "goods" | "item" => Some(Self::Goods),
            _ => None,
        }
    }
}

/// Coarse status shown in listings. Only moves forward; `Deleted` absorbs everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Pending,
    Active,
    Completed,
    Deleted,
}

impl RentalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Deleted => "Deleted",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Active => 1,
            Self::Completed => 2,
            Self::Deleted => 3,
        }
    }

    /// Returns the status after requesting `next`, ignoring backwards moves.
    pub fn advance(self, next: Self) -> Self {
        if next.rank() > self.rank() {
            next
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    CheckIn,
    CheckOut,
}

impl PhaseKind {
    pub const fn ordered() -> [Self; 2] {
        [Self::CheckIn, Self::CheckOut]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CheckIn => "Check-in",
            Self::CheckOut => "Check-out",
        }
    }

    /// Field name of the phase inside the rental document.
    pub const fn field(self) -> &'static str {
        match self {
            Self::CheckIn => "checkIn",
            Self::CheckOut => "checkOut",
        }
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::CheckIn => "check-in",
            Self::CheckOut => "check-out",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "checkin" | "before" => Some(Self::CheckIn),
            "checkout" | "after" => Some(Self::CheckOut),
            _ => None,
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// WGS84 coordinate attached to a photo when the capturing device shares it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Returns `None` for non-finite or out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    pub fn display(&self) -> String {
        format!("{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub image_url: String,
    pub content_type: String,
    pub area_key: String,
    /// Append time; identifies the photo within its phase.
    pub taken_at: DateTime<Utc>,
    pub location: Option<GeoPoint>,
    pub memo: Option<String>,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistAnswer {
    Good,
    Damaged,
    Missing,
    NotApplicable,
}

impl ChecklistAnswer {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Damaged => "Damaged",
            Self::Missing => "Missing",
            Self::NotApplicable => "N/A",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub area_key: String,
    pub answers: BTreeMap<String, ChecklistAnswer>,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ChecklistEntry {
    /// Folds newer answers into this entry; answers not mentioned are kept.
    pub fn merge(
        &mut self,
        answers: &BTreeMap<String, ChecklistAnswer>,
        note: Option<&str>,
        at: DateTime<Utc>,
    ) {
        for (item, answer) in answers {
            self.answers.insert(item.clone(), *answer);
        }
        if let Some(note) = note {
            let trimmed = note.trim();
            self.note = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        self.updated_at = at;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureArtifact {
    pub image_url: String,
    pub content_type: String,
    pub signed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub photos: Vec<PhotoRecord>,
    pub checklists: Vec<ChecklistEntry>,
    pub signature: Option<SignatureArtifact>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Phase {
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn has_evidence(&self) -> bool {
        !self.photos.is_empty() || !self.checklists.is_empty() || self.signature.is_some()
    }

    /// Photos recorded against `area_key`, in append order.
    pub fn photos_for_area<'a>(&'a self, area_key: &'a str) -> impl Iterator<Item = &'a PhotoRecord> {
        self.photos
            .iter()
            .filter(move |photo| photo.area_key == area_key)
    }

    pub fn photo(&self, taken_at: DateTime<Utc>) -> Option<&PhotoRecord> {
        self.photos.iter().find(|photo| photo.taken_at == taken_at)
    }

    pub fn latest_photo_at(&self) -> Option<DateTime<Utc>> {
        self.photos.iter().map(|photo| photo.taken_at).max()
    }

    pub fn checklist_for_area(&self, area_key: &str) -> Option<&ChecklistEntry> {
        self.checklists
            .iter()
            .find(|entry| entry.area_key == area_key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rental {
    pub id: RentalId,
    pub kind: RentalKind,
    pub title: String,
    pub owner: UserId,
    pub contract_start: DateTime<Utc>,
    pub contract_end: DateTime<Utc>,
    pub status: RentalStatus,
    pub check_in: Phase,
    pub check_out: Phase,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_areas: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Rental {
    pub fn phase(&self, phase: PhaseKind) -> &Phase {
        match phase {
            PhaseKind::CheckIn => &self.check_in,
            PhaseKind::CheckOut => &self.check_out,
        }
    }

    pub fn phase_mut(&mut self, phase: PhaseKind) -> &mut Phase {
        match phase {
            PhaseKind::CheckIn => &mut self.check_in,
            PhaseKind::CheckOut => &mut self.check_out,
        }
    }

    pub fn catalog(&self) -> AreaCatalog {
        areas_for(self.kind, &self.custom_areas)
    }

    pub fn is_deleted(&self) -> bool {
        self.status == RentalStatus::Deleted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Counterparty,
    Admin,
}

/// Capability passed into every operation; authentication happens upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn owner(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role: Role::Owner,
        }
    }

    pub fn counterparty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role: Role::Counterparty,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            role: Role::Admin,
        }
    }

    pub fn can_create(&self) -> bool {
        matches!(self.role, Role::Owner | Role::Admin)
    }

    pub fn can_write(&self, rental: &Rental) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Owner => rental.owner == self.user_id,
            Role::Counterparty => false,
        }
    }

    /// Counter-parties reach a rental through a shared link, so any rental they name is readable.
    pub fn can_read(&self, rental: &Rental) -> bool {
        match self.role {
            Role::Admin | Role::Counterparty => true,
            Role::Owner => rental.owner == self.user_id,
        }
    }
}
