use std::collections::BTreeMap;

use chrono::Duration;

use super::common::*;
use crate::config::EvidenceConfig;
use crate::workflows::evidence::checklists::ChecklistUpdate;
use crate::workflows::evidence::domain::{
    Actor, ChecklistAnswer, PhaseKind, RentalKind, RentalStatus,
};
use crate::workflows::evidence::errors::{CompletionBlocker, EvidenceError, ValidationError};
use crate::workflows::evidence::lifecycle::LifecycleState;

fn blocker(error: EvidenceError) -> CompletionBlocker {
    match error {
        EvidenceError::Incomplete(blocker) => blocker,
        other => panic!("expected a completion blocker, got {other:?}"),
    }
}

#[tokio::test]
async fn vehicle_check_in_waits_for_every_side_and_a_signature() {
    let (service, _store, clock) = build_service();
    let rental = create(&service, RentalKind::Vehicle).await;

    for key in ["front", "rear", "left"] {
        service
            .add_photo(&owner(), &rental.id, PhaseKind::CheckIn, upload(Some(key)))
            .await
            .expect("photo");
    }
    let error = service
        .complete_check_in(&owner(), &rental.id)
        .await
        .expect_err("right side missing");
    let blocker = blocker(error);
    assert_eq!(blocker.missing_area_names(), vec!["Right side"]);

    let unchanged = service.get_rental(&owner(), &rental.id).await.expect("read");
    assert!(unchanged.check_in.completed_at.is_none());

    document_phase(&service, &rental.id, PhaseKind::CheckIn, &["right"]).await;
    clock.advance(Duration::minutes(1));
    let completion = service
        .complete_check_in(&owner(), &rental.id)
        .await
        .expect("check-in completes");
    assert_eq!(completion.completed_at, start_time() + Duration::minutes(1));
    assert_eq!(completion.state, LifecycleState::CheckInComplete);
    assert!(!completion.already_complete);
}

#[tokio::test]
async fn free_form_goods_need_a_photo() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Goods).await;

    let error = service
        .complete_check_in(&owner(), &rental.id)
        .await
        .expect_err("no photos yet");
    assert_eq!(blocker(error), CompletionBlocker::NoPhotos);

    service
        .add_photo(&owner(), &rental.id, PhaseKind::CheckIn, upload(None))
        .await
        .expect("photo");
    service
        .set_signature(&owner(), &rental.id, PhaseKind::CheckIn, png())
        .await
        .expect("signed");
    service
        .complete_check_in(&owner(), &rental.id)
        .await
        .expect("check-in completes");
}

#[tokio::test]
async fn check_out_requires_completed_check_in() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Vehicle).await;
    document_phase(&service, &rental.id, PhaseKind::CheckOut, &VEHICLE_REQUIRED).await;

    let error = service
        .complete_check_out(&owner(), &rental.id)
        .await
        .expect_err("check-in still open");
    assert_eq!(blocker(error), CompletionBlocker::CheckInNotComplete);

    document_phase(&service, &rental.id, PhaseKind::CheckIn, &VEHICLE_REQUIRED).await;
    service
        .complete_check_in(&owner(), &rental.id)
        .await
        .expect("check-in");
    let completion = service
        .complete_check_out(&owner(), &rental.id)
        .await
        .expect("check-out");
    assert_eq!(completion.state, LifecycleState::CheckOutComplete);

    let stored = service.get_rental(&owner(), &rental.id).await.expect("read");
    assert_eq!(stored.status, RentalStatus::Completed);
}

#[tokio::test]
async fn completion_is_idempotent() {
    let (service, _store, clock) = build_service();
    let rental = create(&service, RentalKind::Vehicle).await;
    document_phase(&service, &rental.id, PhaseKind::CheckIn, &VEHICLE_REQUIRED).await;

    let first = service
        .complete_check_in(&owner(), &rental.id)
        .await
        .expect("first completion");
    clock.advance(Duration::hours(2));
    let second = service
        .complete_check_in(&owner(), &rental.id)
        .await
        .expect("second completion");

    assert_eq!(second.completed_at, first.completed_at);
    assert!(second.already_complete);
}

#[tokio::test]
async fn later_edits_never_uncomplete_a_phase() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Vehicle).await;
    document_phase(&service, &rental.id, PhaseKind::CheckIn, &VEHICLE_REQUIRED).await;
    let completion = service
        .complete_check_in(&owner(), &rental.id)
        .await
        .expect("complete");

    let snapshot = service.get_rental(&owner(), &rental.id).await.expect("read");
    let front = snapshot.check_in.photos[0].taken_at;
    service
        .delete_photo(&owner(), &rental.id, PhaseKind::CheckIn, front)
        .await
        .expect("photo deleted");

    let after = service.get_rental(&owner(), &rental.id).await.expect("read");
    assert_eq!(after.check_in.completed_at, Some(completion.completed_at));
}

#[tokio::test]
async fn mandatory_checklists_block_completion_when_configured() {
    let (service, _store, _clock) = build_service_with(EvidenceConfig {
        mandatory_checklists: vec![RentalKind::Vehicle],
        ..EvidenceConfig::default()
    });
    let rental = create(&service, RentalKind::Vehicle).await;
    document_phase(&service, &rental.id, PhaseKind::CheckIn, &VEHICLE_REQUIRED).await;

    let error = service
        .complete_check_in(&owner(), &rental.id)
        .await
        .expect_err("checklists required");
    assert_eq!(blocker(error).code(), "missing_checklists");

    for key in VEHICLE_REQUIRED {
        service
            .update_checklist(
                &owner(),
                &rental.id,
                PhaseKind::CheckIn,
                Some(key),
                ChecklistUpdate {
                    answers: BTreeMap::from([("scratches".to_string(), ChecklistAnswer::Good)]),
                    note: None,
                },
            )
            .await
            .expect("checklist");
    }
    service
        .complete_check_in(&owner(), &rental.id)
        .await
        .expect("complete with checklists");
}

#[tokio::test]
async fn deleted_rentals_disappear() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Dwelling).await;
    let kept = create(&service, RentalKind::Vehicle).await;

    service
        .delete_rental(&owner(), &rental.id)
        .await
        .expect("deleted");

    let error = service
        .get_rental(&owner(), &rental.id)
        .await
        .expect_err("hidden");
    assert!(matches!(error, EvidenceError::NotFound(_)));
    let error = service
        .delete_rental(&owner(), &rental.id)
        .await
        .expect_err("second delete");
    assert!(matches!(error, EvidenceError::NotFound(_)));

    let listed = service.list_rentals(&owner()).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, kept.id);

    let stats = service.statistics(&owner()).await.expect("stats");
    assert_eq!(stats.total, 1);
    assert_eq!(stats.by_kind.get("dwelling"), None);
}

#[tokio::test]
async fn listings_are_scoped_to_the_owner() {
    let (service, _store, _clock) = build_service();
    create(&service, RentalKind::Vehicle).await;
    service
        .create_rental(
            &Actor::owner("owner-2"),
            new_rental(RentalKind::Goods, &["Lens", "Body"]),
        )
        .await
        .expect("second owner's rental");

    assert_eq!(service.list_rentals(&owner()).await.expect("list").len(), 1);
    assert_eq!(
        service
            .list_rentals(&Actor::admin("ops"))
            .await
            .expect("admin list")
            .len(),
        2
    );
}

#[tokio::test]
async fn rental_creation_rules() {
    let (service, _store, _clock) = build_service();

    let error = service
        .create_rental(&renter(), new_rental(RentalKind::Vehicle, &[]))
        .await
        .expect_err("counterparties cannot create");
    assert!(matches!(error, EvidenceError::CreateForbidden { .. }));

    let error = service
        .create_rental(&owner(), new_rental(RentalKind::Vehicle, &["Roof box"]))
        .await
        .expect_err("custom areas are for goods");
    assert!(matches!(
        error,
        EvidenceError::Validation(ValidationError::CustomAreasNotSupported("vehicle"))
    ));

    let rental = service
        .create_rental(&owner(), new_rental(RentalKind::Goods, &[" Lens "]))
        .await
        .expect("goods with custom areas");
    assert_eq!(rental.custom_areas, vec!["Lens".to_string()]);
    assert_eq!(rental.status, RentalStatus::Pending);
    assert!(rental.id.0.starts_with("rnt_"));
}

#[tokio::test]
async fn other_owners_cannot_complete() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Vehicle).await;
    let error = service
        .complete_check_in(&Actor::owner("owner-2"), &rental.id)
        .await
        .expect_err("not the owner");
    assert!(matches!(error, EvidenceError::Forbidden { .. }));
}
