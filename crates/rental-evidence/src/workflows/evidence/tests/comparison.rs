use super::common::*;
use crate::workflows::evidence::comparison::{
    build_report, compare_areas, free_gallery, Comparison, RenderDescriptor, RenderMode,
    ReportSlot, SignatureState,
};
use crate::workflows::evidence::domain::{GeoPoint, PhaseKind, RentalKind};
use crate::workflows::evidence::photos::PhotoUpload;

#[tokio::test]
async fn comparison_pairs_first_photos_per_area() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Vehicle).await;
    let before = service
        .add_photo(&owner(), &rental.id, PhaseKind::CheckIn, upload(Some("front")))
        .await
        .expect("before");
    service
        .add_photo(&owner(), &rental.id, PhaseKind::CheckIn, upload(Some("front")))
        .await
        .expect("second before");
    let after = service
        .add_photo(&owner(), &rental.id, PhaseKind::CheckOut, upload(Some("front")))
        .await
        .expect("after");
    service
        .add_photo(&owner(), &rental.id, PhaseKind::CheckOut, upload(Some("rear")))
        .await
        .expect("after only");

    let snapshot = service.get_rental(&owner(), &rental.id).await.expect("read");
    let results = compare_areas(&snapshot, RenderMode::SideBySide);
    assert_eq!(results.len(), snapshot.catalog().areas().len());

    let front = &results[0];
    assert_eq!(front.area.key, "front");
    assert!(front.has_both);
    assert_eq!(front.before.len(), 2);
    assert_eq!(
        front.render,
        Some(RenderDescriptor::SideBySide {
            before: before.image_url.clone(),
            after: after.image_url.clone(),
        })
    );

    let rear = &results[1];
    assert!(!rear.has_both);
    assert!(rear.render.is_none());
    assert_eq!(rear.after.len(), 1);

    let overlay = compare_areas(&snapshot, RenderMode::overlay(40).expect("valid opacity"));
    match &overlay[0].render {
        Some(RenderDescriptor::Overlay {
            base,
            top,
            opacity,
            blend_weight,
        }) => {
            assert_eq!(base, &before.image_url);
            assert_eq!(top, &after.image_url);
            assert_eq!(*opacity, 40);
            assert!((blend_weight - 0.4).abs() < f32::EPSILON);
        }
        other => panic!("expected overlay, got {other:?}"),
    }
}

#[tokio::test]
async fn has_both_is_symmetric_across_phases() {
    let (service, _store, _clock) = build_service();
    let first = create(&service, RentalKind::Dwelling).await;
    let mirrored = create(&service, RentalKind::Dwelling).await;

    service
        .add_photo(&owner(), &first.id, PhaseKind::CheckIn, upload(Some("kitchen")))
        .await
        .expect("photo");
    service
        .add_photo(&owner(), &mirrored.id, PhaseKind::CheckOut, upload(Some("kitchen")))
        .await
        .expect("photo");

    let first = service.get_rental(&owner(), &first.id).await.expect("read");
    let mirrored = service.get_rental(&owner(), &mirrored.id).await.expect("read");
    let left = compare_areas(&first, RenderMode::SideBySide);
    let right = compare_areas(&mirrored, RenderMode::SideBySide);
    for (a, b) in left.iter().zip(right.iter()) {
        assert_eq!(a.has_both, b.has_both);
        assert_eq!(a.before.len(), b.after.len());
    }
}

#[tokio::test]
async fn deleting_the_only_check_out_photo_unpairs_the_area() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Vehicle).await;
    service
        .add_photo(&owner(), &rental.id, PhaseKind::CheckIn, upload(Some("front")))
        .await
        .expect("before");
    let after = service
        .add_photo(&owner(), &rental.id, PhaseKind::CheckOut, upload(Some("front")))
        .await
        .expect("after");

    let paired = service.get_rental(&owner(), &rental.id).await.expect("read");
    assert!(compare_areas(&paired, RenderMode::SideBySide)[0].has_both);

    service
        .delete_photo(&owner(), &rental.id, PhaseKind::CheckOut, after.taken_at)
        .await
        .expect("delete check-out photo");

    let unpaired = service.get_rental(&owner(), &rental.id).await.expect("read");
    let front = &compare_areas(&unpaired, RenderMode::SideBySide)[0];
    assert_eq!(front.area.key, "front");
    assert!(!front.has_both);
    assert!(front.render.is_none());
    assert_eq!(front.before.len(), 1);
    assert!(front.after.is_empty());
    assert_eq!(unpaired.check_in, paired.check_in);
}

#[tokio::test]
async fn free_form_rentals_compare_as_galleries() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Goods).await;
    service
        .add_photo(&owner(), &rental.id, PhaseKind::CheckIn, upload(None))
        .await
        .expect("photo");

    let snapshot = service.get_rental(&owner(), &rental.id).await.expect("read");
    assert!(compare_areas(&snapshot, RenderMode::SideBySide).is_empty());
    assert_eq!(free_gallery(&snapshot).before.len(), 1);

    let comparison = service
        .compare(&renter(), &rental.id, RenderMode::SideBySide)
        .await
        .expect("comparison");
    assert!(matches!(comparison, Comparison::FreeForm { .. }));
}

#[tokio::test]
async fn report_lists_photographed_areas_with_placeholders() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Vehicle).await;
    service
        .add_photo(
            &owner(),
            &rental.id,
            PhaseKind::CheckIn,
            PhotoUpload {
                memo: Some("scuffed bumper".to_string()),
                location: GeoPoint::new(41.5868, -93.625),
                ..upload(Some("rear"))
            },
        )
        .await
        .expect("photo");
    service
        .add_photo(&owner(), &rental.id, PhaseKind::CheckIn, upload(Some("front")))
        .await
        .expect("photo");
    service
        .set_signature(&owner(), &rental.id, PhaseKind::CheckIn, png())
        .await
        .expect("signed");

    let snapshot = service.get_rental(&owner(), &rental.id).await.expect("read");
    let report = build_report(&snapshot, start_time());

    assert_eq!(report.cover.kind_label, "Vehicle");
    assert_eq!(report.cover.generated_at, start_time());
    let keys: Vec<&str> = report
        .sections
        .iter()
        .map(|section| section.area_key.as_str())
        .collect();
    assert_eq!(keys, vec!["front", "rear"]);

    let rear = &report.sections[1];
    let photo = &rear.before.photos()[0];
    assert_eq!(photo.memo.as_deref(), Some("scuffed bumper"));
    assert_eq!(photo.location, "41.586800, -93.625000");
    assert!(matches!(
        rear.after,
        ReportSlot::NoPhoto {
            placeholder: "No photo"
        }
    ));
    assert_eq!(
        report.sections[0].before.photos()[0].location,
        "Location unavailable"
    );

    assert_eq!(report.signatures.len(), 2);
    assert!(matches!(
        report.signatures[0].state,
        SignatureState::Signed { .. }
    ));
    assert!(matches!(
        report.signatures[1].state,
        SignatureState::Unsigned { .. }
    ));
}

#[tokio::test]
async fn free_form_report_has_one_photo_section() {
    let (service, _store, _clock) = build_service();
    let rental = create(&service, RentalKind::Goods).await;

    let empty = service.report(&owner(), &rental.id).await.expect("report");
    assert!(empty.sections.is_empty());

    service
        .add_photo(&owner(), &rental.id, PhaseKind::CheckOut, upload(None))
        .await
        .expect("photo");
    let report = service.report(&owner(), &rental.id).await.expect("report");
    assert_eq!(report.sections.len(), 1);
    assert_eq!(report.sections[0].area_key, "free");
    assert_eq!(report.sections[0].area_name, "Photos");
    assert!(matches!(report.sections[0].before, ReportSlot::NoPhoto { .. }));
}
