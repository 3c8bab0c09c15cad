//! Decides whether a phase has enough evidence to be marked complete.
//!
//! Pure functions over a snapshot: no store access, no clock.

use super::catalog::{areas_for, Area, AreaCatalog, ChecklistPolicy, GENERAL_CHECKLIST_KEY};
use super::domain::{Phase, RentalKind};
use super::errors::CompletionBlocker;

/// Checks a phase against the catalog for `kind` and its custom areas.
pub fn can_complete(
    kind: RentalKind,
    custom_areas: &[String],
    phase: &Phase,
    policy: ChecklistPolicy,
) -> Result<(), CompletionBlocker> {
    check_phase(&areas_for(kind, custom_areas), phase, policy)
}

/// Blockers are reported in a fixed order: photo coverage, checklists, then signature.
pub fn check_phase(
    catalog: &AreaCatalog,
    phase: &Phase,
    policy: ChecklistPolicy,
) -> Result<(), CompletionBlocker> {
    match catalog {
        AreaCatalog::FreeForm => {
            if phase.photos.is_empty() {
                return Err(CompletionBlocker::NoPhotos);
            }
        }
        AreaCatalog::Structured(_) => {
            let missing: Vec<Area> = catalog
                .required()
                .filter(|area| phase.photos_for_area(&area.key).next().is_none())
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(CompletionBlocker::MissingRequiredAreas(missing));
            }
        }
    }

    if policy == ChecklistPolicy::Mandatory {
        let missing = missing_checklists(catalog, phase);
        if !missing.is_empty() {
            return Err(CompletionBlocker::MissingChecklists(missing));
        }
    }

    if !phase.is_signed() {
        return Err(CompletionBlocker::MissingSignature);
    }

    Ok(())
}

fn missing_checklists(catalog: &AreaCatalog, phase: &Phase) -> Vec<Area> {
    match catalog {
        AreaCatalog::FreeForm => {
            if phase.checklist_for_area(GENERAL_CHECKLIST_KEY).is_some() {
                Vec::new()
            } else {
                vec![Area {
                    key: GENERAL_CHECKLIST_KEY.to_string(),
                    name: "General".to_string(),
                    required: true,
                }]
            }
        }
        AreaCatalog::Structured(_) => catalog
            .required()
            .filter(|area| phase.checklist_for_area(&area.key).is_none())
            .cloned()
            .collect(),
    }
}
