use chrono::{DateTime, Utc};

use super::super::catalog::{checklist_item, Area, AreaCatalog, GENERAL_CHECKLIST_KEY};
use super::super::domain::{ChecklistEntry, Phase, PhaseKind, PhotoRecord, Rental, RentalKind};
use super::views::{
    CoverPage, ReportChecklistLine, ReportDocument, ReportPhoto, ReportSection, ReportSlot,
    SignatureSlot, SignatureState, LOCATION_UNAVAILABLE, NO_PHOTO, UNSIGNED,
};

const FREE_SECTION_KEY: &str = "free";
const FREE_SECTION_NAME: &str = "Photos";

/// Lays out the printable condition report for a rental snapshot.
///
/// Areas without a photo in either phase are left out. Free-form rentals get a single
/// section holding every photo.
pub fn build_report(rental: &Rental, generated_at: DateTime<Utc>) -> ReportDocument {
    let sections = match rental.catalog() {
        AreaCatalog::FreeForm => free_section(rental).into_iter().collect(),
        AreaCatalog::Structured(areas) => areas
            .iter()
            .filter_map(|area| area_section(rental, area))
            .collect(),
    };

    ReportDocument {
        cover: cover(rental, generated_at),
        sections,
        signatures: PhaseKind::ordered()
            .into_iter()
            .map(|phase| signature_slot(rental.phase(phase), phase))
            .collect(),
    }
}

fn cover(rental: &Rental, generated_at: DateTime<Utc>) -> CoverPage {
    CoverPage {
        rental_id: rental.id.to_string(),
        title: rental.title.clone(),
        kind: rental.kind,
        kind_label: rental.kind.label(),
        status: rental.status,
        status_label: rental.status.label(),
        contract_start: rental.contract_start,
        contract_end: rental.contract_end,
        check_in_completed_at: rental.check_in.completed_at,
        check_out_completed_at: rental.check_out.completed_at,
        generated_at,
    }
}

fn area_section(rental: &Rental, area: &Area) -> Option<ReportSection> {
    let before: Vec<&PhotoRecord> = rental.check_in.photos_for_area(&area.key).collect();
    let after: Vec<&PhotoRecord> = rental.check_out.photos_for_area(&area.key).collect();
    if before.is_empty() && after.is_empty() {
        return None;
    }

    Some(ReportSection {
        area_key: area.key.clone(),
        area_name: area.name.clone(),
        before: slot(&before),
        after: slot(&after),
        checklist_before: checklist_lines(
            rental.kind,
            rental.check_in.checklist_for_area(&area.key),
        ),
        checklist_after: checklist_lines(
            rental.kind,
            rental.check_out.checklist_for_area(&area.key),
        ),
    })
}

fn free_section(rental: &Rental) -> Option<ReportSection> {
    if rental.check_in.photos.is_empty() && rental.check_out.photos.is_empty() {
        return None;
    }
    let before: Vec<&PhotoRecord> = rental.check_in.photos.iter().collect();
    let after: Vec<&PhotoRecord> = rental.check_out.photos.iter().collect();

    Some(ReportSection {
        area_key: FREE_SECTION_KEY.to_string(),
        area_name: FREE_SECTION_NAME.to_string(),
        before: slot(&before),
        after: slot(&after),
        checklist_before: checklist_lines(
            rental.kind,
            rental.check_in.checklist_for_area(GENERAL_CHECKLIST_KEY),
        ),
        checklist_after: checklist_lines(
            rental.kind,
            rental.check_out.checklist_for_area(GENERAL_CHECKLIST_KEY),
        ),
    })
}

fn slot(photos: &[&PhotoRecord]) -> ReportSlot {
    if photos.is_empty() {
        return ReportSlot::NoPhoto {
            placeholder: NO_PHOTO,
        };
    }
    ReportSlot::Photos {
        photos: photos
            .iter()
            .map(|photo| ReportPhoto {
                image_url: photo.image_url.clone(),
                taken_at: photo.taken_at,
                memo: photo.memo.clone(),
                location: photo
                    .location
                    .map(|point| point.display())
                    .unwrap_or_else(|| LOCATION_UNAVAILABLE.to_string()),
            })
            .collect(),
    }
}

fn checklist_lines(kind: RentalKind, entry: Option<&ChecklistEntry>) -> Vec<ReportChecklistLine> {
    let Some(entry) = entry else {
        return Vec::new();
    };
    entry
        .answers
        .iter()
        .map(|(item, answer)| ReportChecklistLine {
            item: item.clone(),
            label: checklist_item(kind, item)
                .map(|template| template.label.to_string())
                .unwrap_or_else(|| item.clone()),
            answer_label: answer.label(),
        })
        .collect()
}

fn signature_slot(phase: &Phase, kind: PhaseKind) -> SignatureSlot {
    let state = match &phase.signature {
        Some(signature) => SignatureState::Signed {
            image_url: signature.image_url.clone(),
            signed_at: signature.signed_at,
        },
        None => SignatureState::Unsigned {
            placeholder: UNSIGNED,
        },
    };
    SignatureSlot {
        phase: kind,
        phase_label: kind.label(),
        state,
    }
}
