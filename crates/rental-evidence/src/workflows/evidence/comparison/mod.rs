//! Before/after reconciliation of the two phases.

mod report;
pub mod views;

pub use report::build_report;
pub use views::{
    CoverPage, ReportChecklistLine, ReportDocument, ReportPhoto, ReportSection, ReportSlot,
    SignatureSlot, SignatureState,
};

use serde::Serialize;

use super::catalog::{Area, AreaCatalog};
use super::domain::{Actor, PhotoRecord, Rental, RentalId};
use super::errors::{EvidenceError, ValidationError};
use super::service::EvidenceService;
use super::store::EvidenceStore;

/// How a client wants paired photos presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    SideBySide,
    Overlay { opacity: u8 },
}

impl RenderMode {
    pub fn overlay(opacity: u8) -> Result<Self, ValidationError> {
        if opacity > 100 {
            return Err(ValidationError::InvalidOpacity(opacity.into()));
        }
        Ok(Self::Overlay { opacity })
    }

    /// Parses the `mode` / `opacity` query pair. Overlay defaults to half opacity.
    pub fn parse(mode: Option<&str>, opacity: Option<u32>) -> Result<Self, ValidationError> {
        match mode.map(str::trim) {
            None | Some("") | Some("side_by_side") | Some("side-by-side") => Ok(Self::SideBySide),
            Some("overlay") => {
                let opacity = opacity.unwrap_or(50);
                let narrowed =
                    u8::try_from(opacity).map_err(|_| ValidationError::InvalidOpacity(opacity))?;
                Self::overlay(narrowed)
            }
            Some(other) => Err(ValidationError::UnknownRenderMode(other.to_string())),
        }
    }
}

/// Presentation hint for an area that has photos in both phases.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenderDescriptor {
    SideBySide {
        before: String,
        after: String,
    },
    Overlay {
        base: String,
        top: String,
        opacity: u8,
        /// `opacity` as a 0.0 to 1.0 alpha for the top layer.
        blend_weight: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub area: Area,
    pub before: Vec<PhotoRecord>,
    pub after: Vec<PhotoRecord>,
    pub has_both: bool,
    pub render: Option<RenderDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreeGallery {
    pub before: Vec<PhotoRecord>,
    pub after: Vec<PhotoRecord>,
}

/// One result per catalog area, in catalog order. Free-form rentals have no areas to pair.
pub fn compare_areas(rental: &Rental, mode: RenderMode) -> Vec<ComparisonResult> {
    let catalog = rental.catalog();
    catalog
        .areas()
        .iter()
        .map(|area| {
            let before: Vec<PhotoRecord> =
                rental.check_in.photos_for_area(&area.key).cloned().collect();
            let after: Vec<PhotoRecord> = rental
                .check_out
                .photos_for_area(&area.key)
                .cloned()
                .collect();
            let render = match (before.first(), after.first()) {
                (Some(first_before), Some(first_after)) => {
                    Some(describe(mode, first_before, first_after))
                }
                _ => None,
            };

            ComparisonResult {
                area: area.clone(),
                has_both: render.is_some(),
                before,
                after,
                render,
            }
        })
        .collect()
}

fn describe(mode: RenderMode, before: &PhotoRecord, after: &PhotoRecord) -> RenderDescriptor {
    match mode {
        RenderMode::SideBySide => RenderDescriptor::SideBySide {
            before: before.image_url.clone(),
            after: after.image_url.clone(),
        },
        RenderMode::Overlay { opacity } => RenderDescriptor::Overlay {
            base: before.image_url.clone(),
            top: after.image_url.clone(),
            opacity,
            blend_weight: f32::from(opacity) / 100.0,
        },
    }
}

/// Flat before/after galleries for rentals captured without an area catalog.
pub fn free_gallery(rental: &Rental) -> FreeGallery {
    FreeGallery {
        before: rental.check_in.photos.clone(),
        after: rental.check_out.photos.clone(),
    }
}

/// Comparison payload returned to clients; exactly one of the two shapes is populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "catalog", rename_all = "snake_case")]
pub enum Comparison {
    Structured { areas: Vec<ComparisonResult> },
    FreeForm { gallery: FreeGallery },
}

impl<S> EvidenceService<S>
where
    S: EvidenceStore + 'static,
{
    pub async fn compare(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
        mode: RenderMode,
    ) -> Result<Comparison, EvidenceError> {
        let rental = self.load_for_read(actor, rental_id).await?;
        Ok(match rental.catalog() {
            AreaCatalog::FreeForm => Comparison::FreeForm {
                gallery: free_gallery(&rental),
            },
            AreaCatalog::Structured(_) => Comparison::Structured {
                areas: compare_areas(&rental, mode),
            },
        })
    }

    pub async fn report(
        &self,
        actor: &Actor,
        rental_id: &RentalId,
    ) -> Result<ReportDocument, EvidenceError> {
        let rental = self.load_for_read(actor, rental_id).await?;
        Ok(build_report(&rental, self.now()))
    }
}
