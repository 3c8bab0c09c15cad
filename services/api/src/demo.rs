use crate::infra::parse_kind;
use chrono::{Duration, Utc};
use clap::Args;
use rental_evidence::config::EvidenceConfig;
use rental_evidence::error::AppError;
use rental_evidence::workflows::evidence::catalog::{areas_for, checklist_template, AreaCatalog};
use rental_evidence::workflows::evidence::checklists::ChecklistUpdate;
use rental_evidence::workflows::evidence::comparison::{Comparison, RenderMode, ReportDocument};
use rental_evidence::workflows::evidence::geolocation::LocationError;
use rental_evidence::workflows::evidence::lifecycle::NewRental;
use rental_evidence::workflows::evidence::photos::PhotoUpload;
use rental_evidence::workflows::evidence::{
    Actor, ChecklistAnswer, EvidenceError, EvidenceService, GeoPoint, InMemoryEvidenceStore,
    PhaseKind, RentalId, RentalKind,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Smallest byte sequence the image sniffer accepts as JPEG.
const SAMPLE_JPEG: [u8; 12] = [
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01,
];
const SAMPLE_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Only print one rental kind (vehicle, dwelling, goods)
    #[arg(long, value_parser = parse_kind)]
    pub(crate) kind: Option<RentalKind>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Rental kind to walk through
    #[arg(long, value_parser = parse_kind, default_value = "vehicle")]
    pub(crate) kind: RentalKind,
    /// Custom inspection areas (goods only); repeat the flag for several areas
    #[arg(long = "area")]
    pub(crate) custom_areas: Vec<String>,
    /// Overlay opacity for the comparison; side-by-side when omitted
    #[arg(long)]
    pub(crate) overlay: Option<u8>,
    /// Print the condition report as JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let kinds: Vec<RentalKind> = match args.kind {
        Some(kind) => vec![kind],
        None => RentalKind::ordered().to_vec(),
    };

    for kind in kinds {
        println!("{}", kind.label());
        match areas_for(kind, &[]) {
            AreaCatalog::FreeForm => {
                println!("  areas: free-form (custom areas optional, at least one photo)")
            }
            AreaCatalog::Structured(areas) => {
                for area in areas {
                    let marker = if area.required { "*" } else { " " };
                    println!("  {marker} {:<12} {}", area.key, area.name);
                }
            }
        }
        let items: Vec<&str> = checklist_template(kind)
            .iter()
            .map(|item| item.label)
            .collect();
        println!("  checklist: {}", items.join(", "));
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        kind,
        custom_areas,
        overlay,
        json,
    } = args;

    let mode = match overlay {
        Some(opacity) => RenderMode::overlay(opacity).map_err(EvidenceError::from)?,
        None => RenderMode::SideBySide,
    };

    let service = EvidenceService::new(
        Arc::new(InMemoryEvidenceStore::default()),
        EvidenceConfig::default(),
    );
    let owner = Actor::owner("demo-owner");
    let start = Utc::now();
    let rental = service
        .create_rental(
            &owner,
            NewRental {
                kind,
                title: format!("Demo {} rental", kind.as_str()),
                contract_start: start,
                contract_end: start + Duration::days(7),
                custom_areas,
            },
        )
        .await?;

    println!("Rental evidence demo");
    println!("  rental {} ({})", rental.id, rental.kind.label());

    let catalog = rental.catalog();
    let keys: Vec<Option<String>> = match &catalog {
        AreaCatalog::FreeForm => vec![None, None],
        AreaCatalog::Structured(areas) => areas.iter().map(|area| Some(area.key.clone())).collect(),
    };

    if let Some(first) = keys.first() {
        capture(&service, &owner, &rental.id, PhaseKind::CheckIn, first.clone(), None).await?;
    }
    if let Err(EvidenceError::Incomplete(blocker)) =
        service.complete_check_in(&owner, &rental.id).await
    {
        println!("  check-in blocked: {blocker}");
    }

    for key in keys.iter().skip(1) {
        capture(&service, &owner, &rental.id, PhaseKind::CheckIn, key.clone(), None).await?;
    }
    record_checklist(&service, &owner, &rental.id, kind, PhaseKind::CheckIn, &catalog, false).await?;
    service
        .set_signature(&owner, &rental.id, PhaseKind::CheckIn, SAMPLE_SIGNATURE.to_vec())
        .await?;
    let check_in = service.complete_check_in(&owner, &rental.id).await?;
    println!("  check-in completed at {}", check_in.completed_at);

    for (index, key) in keys.iter().enumerate() {
        let memo = (index == 0).then(|| "new scratch noticed on return".to_string());
        capture(&service, &owner, &rental.id, PhaseKind::CheckOut, key.clone(), memo).await?;
    }
    record_checklist(&service, &owner, &rental.id, kind, PhaseKind::CheckOut, &catalog, true).await?;
    service
        .set_signature(&owner, &rental.id, PhaseKind::CheckOut, SAMPLE_SIGNATURE.to_vec())
        .await?;
    let check_out = service.complete_check_out(&owner, &rental.id).await?;
    println!("  check-out completed at {}", check_out.completed_at);

    match service.compare(&owner, &rental.id, mode).await? {
        Comparison::Structured { areas } => {
            let paired = areas.iter().filter(|result| result.has_both).count();
            println!("  comparison: {paired} of {} areas paired", areas.len());
        }
        Comparison::FreeForm { gallery } => println!(
            "  comparison: {} before / {} after photos",
            gallery.before.len(),
            gallery.after.len()
        ),
    }

    let report = service.report(&owner, &rental.id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_report(&report);
    }

    Ok(())
}

async fn capture(
    service: &EvidenceService<InMemoryEvidenceStore>,
    owner: &Actor,
    rental_id: &RentalId,
    phase: PhaseKind,
    area_key: Option<String>,
    memo: Option<String>,
) -> Result<(), AppError> {
    let location = service
        .capture_location(async {
            GeoPoint::new(41.5868, -93.625).ok_or(LocationError::Unavailable(
                "no fix".to_string(),
            ))
        })
        .await;
    service
        .add_photo(
            owner,
            rental_id,
            phase,
            PhotoUpload {
                area_key,
                image: SAMPLE_JPEG.to_vec(),
                memo,
                location,
            },
        )
        .await?;
    Ok(())
}

async fn record_checklist(
    service: &EvidenceService<InMemoryEvidenceStore>,
    owner: &Actor,
    rental_id: &RentalId,
    kind: RentalKind,
    phase: PhaseKind,
    catalog: &AreaCatalog,
    damaged: bool,
) -> Result<(), AppError> {
    let first_item = match checklist_template(kind).first() {
        Some(item) => item.id,
        None => return Ok(()),
    };
    let answer = if damaged {
        ChecklistAnswer::Damaged
    } else {
        ChecklistAnswer::Good
    };
    let area_key = catalog.areas().first().map(|area| area.key.as_str());
    service
        .update_checklist(
            owner,
            rental_id,
            phase,
            area_key,
            ChecklistUpdate {
                answers: BTreeMap::from([(first_item.to_string(), answer)]),
                note: None,
            },
        )
        .await?;
    Ok(())
}

fn render_report(report: &ReportDocument) {
    println!("\nCondition report: {}", report.cover.title);
    println!(
        "  {} | {} | generated {}",
        report.cover.kind_label, report.cover.status_label, report.cover.generated_at
    );
    for section in &report.sections {
        println!(
            "  - {:<20} before: {:>2} photo(s)  after: {:>2} photo(s)",
            section.area_name,
            section.before.photos().len(),
            section.after.photos().len()
        );
        for line in section.checklist_before.iter().chain(&section.checklist_after) {
            println!("      {}: {}", line.label, line.answer_label);
        }
    }
    for slot in &report.signatures {
        println!("  signature {}: {:?}", slot.phase_label, slot.state);
    }
}
