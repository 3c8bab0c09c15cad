use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::RentalKind;
use super::errors::ValidationError;

pub const CUSTOM_KEY_PREFIX: &str = "custom_";
pub const FREE_KEY_PREFIX: &str = "free_";
/// Checklist key used when a rental has no area catalog.
pub const GENERAL_CHECKLIST_KEY: &str = "general";

/// Named inspection zone; catalog entry, never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub key: String,
    pub name: String,
    pub required: bool,
}

/// Areas that apply to a rental. Goods without custom areas are captured free-form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "areas", rename_all = "snake_case")]
pub enum AreaCatalog {
    Structured(Vec<Area>),
    FreeForm,
}

impl AreaCatalog {
    pub fn areas(&self) -> &[Area] {
        match self {
            Self::Structured(areas) => areas,
            Self::FreeForm => &[],
        }
    }

    pub fn is_free_form(&self) -> bool {
        matches!(self, Self::FreeForm)
    }

    pub fn find(&self, key: &str) -> Option<&Area> {
        self.areas().iter().find(|area| area.key == key)
    }

    pub fn required(&self) -> impl Iterator<Item = &Area> {
        self.areas().iter().filter(|area| area.required)
    }

    /// Resolves the key a new photo is filed under.
    pub(crate) fn photo_area_key(
        &self,
        requested: Option<&str>,
        taken_at: DateTime<Utc>,
    ) -> Result<String, ValidationError> {
        match (self, requested) {
            (Self::FreeForm, None) => Ok(free_area_key(taken_at)),
            (Self::FreeForm, Some(key)) => Err(ValidationError::UnknownArea(key.to_string())),
            (Self::Structured(_), None) => Err(ValidationError::AreaRequired),
            (Self::Structured(_), Some(key)) => self
                .find(key)
                .map(|area| area.key.clone())
                .ok_or_else(|| ValidationError::UnknownArea(key.to_string())),
        }
    }

    pub(crate) fn checklist_area_key(&self, requested: Option<&str>) -> Result<String, ValidationError> {
        match (self, requested) {
            (Self::FreeForm, None) => Ok(GENERAL_CHECKLIST_KEY.to_string()),
            (Self::FreeForm, Some(key)) if key == GENERAL_CHECKLIST_KEY => Ok(key.to_string()),
            (Self::FreeForm, Some(key)) => Err(ValidationError::UnknownArea(key.to_string())),
            (Self::Structured(_), None) => Err(ValidationError::AreaRequired),
            (Self::Structured(_), Some(key)) => self
                .find(key)
                .map(|area| area.key.clone())
                .ok_or_else(|| ValidationError::UnknownArea(key.to_string())),
        }
    }
}

pub fn free_area_key(taken_at: DateTime<Utc>) -> String {
    format!("{FREE_KEY_PREFIX}{}", taken_at.timestamp_millis())
}

/// Catalog for a rental kind. `custom_areas` only matters for goods.
pub fn areas_for(kind: RentalKind, custom_areas: &[String]) -> AreaCatalog {
    match kind {
        RentalKind::Vehicle => AreaCatalog::Structured(from_templates(&VEHICLE_AREAS)),
        RentalKind::Dwelling => AreaCatalog::Structured(from_templates(&DWELLING_AREAS)),
        RentalKind::Goods if custom_areas.is_empty() => AreaCatalog::FreeForm,
        RentalKind::Goods => AreaCatalog::Structured(
            custom_areas
                .iter()
                .enumerate()
                .map(|(index, name)| Area {
                    key: format!("{CUSTOM_KEY_PREFIX}{index}"),
                    name: name.clone(),
                    required: false,
                })
                .collect(),
        ),
    }
}

/// Trims and checks user supplied area names before a rental is created.
pub fn normalize_custom_areas(
    kind: RentalKind,
    names: &[String],
    max: usize,
) -> Result<Vec<String>, ValidationError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    if kind != RentalKind::Goods {
        return Err(ValidationError::CustomAreasNotSupported(kind.as_str()));
    }
    if names.len() > max {
        return Err(ValidationError::TooManyCustomAreas {
            count: names.len(),
            max,
        });
    }

    names
        .iter()
        .map(|name| {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                Err(ValidationError::BlankCustomArea)
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

struct AreaTemplate {
    key: &'static str,
    name: &'static str,
    required: bool,
}

fn from_templates(templates: &[AreaTemplate]) -> Vec<Area> {
    templates
        .iter()
        .map(|template| Area {
            key: template.key.to_string(),
            name: template.name.to_string(),
            required: template.required,
        })
        .collect()
}

const VEHICLE_AREAS: [AreaTemplate; 8] = [
    AreaTemplate {
        key: "front",
        name: "Front",
        required: true,
    },
    AreaTemplate {
        key: "rear",
        name: "Rear",
        required: true,
    },
    AreaTemplate {
        key: "left",
        name: "Left side",
        required: true,
    },
    AreaTemplate {
        key: "right",
        name: "Right side",
        required: true,
    },
    AreaTemplate {
        key: "interior",
        name: "Interior",
        required: false,
    },
    AreaTemplate {
        key: "dashboard",
        name: "Dashboard & odometer",
        required: false,
    },
    AreaTemplate {
        key: "trunk",
        name: "Trunk",
        required: false,
    },
    AreaTemplate {
        key: "wheels",
        name: "Wheels & tires",
        required: false,
    },
];

const DWELLING_AREAS: [AreaTemplate; 8] = [
    AreaTemplate {
        key: "entrance",
        name: "Entrance",
        required: true,
    },
    AreaTemplate {
        key: "living_room",
        name: "Living room",
        required: true,
    },
    AreaTemplate {
        key: "kitchen",
        name: "Kitchen",
        required: true,
    },
    AreaTemplate {
        key: "bathroom",
        name: "Bathroom",
        required: true,
    },
    AreaTemplate {
        key: "bedroom",
        name: "Bedroom",
        required: true,
    },
    AreaTemplate {
        key: "windows",
        name: "Windows",
        required: false,
    },
    AreaTemplate {
        key: "balcony",
        name: "Balcony",
        required: false,
    },
    AreaTemplate {
        key: "meters",
        name: "Utility meters",
        required: false,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub id: &'static str,
    pub label: &'static str,
}

/// Checklist items offered for every area of a rental kind.
pub fn checklist_template(kind: RentalKind) -> &'static [ChecklistItem] {
    match kind {
        RentalKind::Vehicle => &VEHICLE_CHECKLIST,
        RentalKind::Dwelling => &DWELLING_CHECKLIST,
        RentalKind::Goods => &GOODS_CHECKLIST,
    }
}

pub fn checklist_item(kind: RentalKind, id: &str) -> Option<&'static ChecklistItem> {
    checklist_template(kind).iter().find(|item| item.id == id)
}

const VEHICLE_CHECKLIST: [ChecklistItem; 6] = [
    ChecklistItem {
        id: "scratches",
        label: "Scratches",
    },
    ChecklistItem {
        id: "dents",
        label: "Dents",
    },
    ChecklistItem {
        id: "glass",
        label: "Glass & mirrors",
    },
    ChecklistItem {
        id: "lights",
        label: "Lights",
    },
    ChecklistItem {
        id: "tires",
        label: "Tire condition",
    },
    ChecklistItem {
        id: "cleanliness",
        label: "Cleanliness",
    },
];

const DWELLING_CHECKLIST: [ChecklistItem; 6] = [
    ChecklistItem {
        id: "walls",
        label: "Walls & ceiling",
    },
    ChecklistItem {
        id: "floor",
        label: "Floor",
    },
    ChecklistItem {
        id: "fixtures",
        label: "Fixtures & fittings",
    },
    ChecklistItem {
        id: "appliances",
        label: "Appliances",
    },
    ChecklistItem {
        id: "plumbing",
        label: "Plumbing",
    },
    ChecklistItem {
        id: "cleanliness",
        label: "Cleanliness",
    },
];

const GOODS_CHECKLIST: [ChecklistItem; 4] = [
    ChecklistItem {
        id: "condition",
        label: "Overall condition",
    },
    ChecklistItem {
        id: "functional",
        label: "Works as expected",
    },
    ChecklistItem {
        id: "accessories",
        label: "Accessories complete",
    },
    ChecklistItem {
        id: "cleanliness",
        label: "Cleanliness",
    },
];

/// Whether checklist answers gate phase completion for a rental kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistPolicy {
    #[default]
    Advisory,
    Mandatory,
}
