mod common;

use assert_matches::assert_matches;
use common::{facility, TestApp};
use serde_json::json;
use sportfacility_api::{
    errors::ServiceError,
    models::{DaySchedule, FacilityFields, FacilityPatch},
    services::taxonomy::{TaxonomyAxis, DEFAULT_OWNING_TYPE},
};
use uuid::Uuid;

#[tokio::test]
async fn create_normalizes_taxonomy_and_defaults_owning_type() {
    let app = TestApp::new().await;
    let mut fields = facility("Aquapark", "  Бассейны ");
    fields.paying_type = vec!["Платные".into(), " платные".into(), "БЮДЖЕТНЫЕ".into()];
    fields.age = vec!["Дети".into()];
    fields.covering_type = Some("Резиновое".into());

    let created = app.services().facilities.create(fields).await.unwrap();

    assert_eq!(created.type_name, "бассейны");
    assert_eq!(created.owning_type.as_deref(), Some(DEFAULT_OWNING_TYPE));
    assert_eq!(created.covering_type.as_deref(), Some("резиновое"));
    assert_eq!(created.paying_type, vec!["бюджетные", "платные"]);
    assert_eq!(created.age, vec!["дети"]);
    assert!(created.hidden);
    assert!(created.photos.is_empty());

    let types = app
        .services()
        .taxonomy
        .list(TaxonomyAxis::Type)
        .await
        .unwrap();
    assert_eq!(types, vec!["бассейны".to_string()]);
}

#[tokio::test]
async fn replaced_paying_type_is_returned_on_fetch() {
    let app = TestApp::new().await;
    let facilities = &app.services().facilities;

    let created = facilities
        .create(FacilityFields::new("Pool A", "City", "1 Main St", 100.0, "Бассейны"))
        .await
        .unwrap();
    assert_eq!(created.type_name, "бассейны");
    assert_eq!(created.owning_type.as_deref(), Some("другая"));
    assert!(created.paying_type.is_empty());
    assert!(created.age.is_empty());

    let mut replacement = FacilityFields::new("Pool A", "City", "1 Main St", 100.0, "Бассейны");
    replacement.paying_type = vec!["платные".into()];
    facilities.replace(created.id, replacement).await.unwrap();

    let fetched = facilities.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.paying_type, vec!["платные"]);
}

#[tokio::test]
async fn duplicate_identity_is_rejected() {
    let app = TestApp::new().await;
    let facilities = &app.services().facilities;

    facilities
        .create(facility("Stadium", "плоскостные"))
        .await
        .unwrap();
    // Same identity once the type label is normalized
    let err = facilities
        .create(facility("Stadium", "Плоскостные"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::AlreadyExists(_));

    // A different area is a different facility
    let mut other = facility("Stadium", "плоскостные");
    other.area = 250.0;
    facilities.create(other).await.unwrap();
}

#[tokio::test]
async fn invalid_payload_never_reaches_the_store() {
    let app = TestApp::new().await;
    let mut fields = facility("Bad", "бассейны");
    fields.area = -3.0;

    let err = app.services().facilities.create(fields).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    assert!(app
        .services()
        .taxonomy
        .list(TaxonomyAxis::Type)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn replace_overwrites_fields_and_links() {
    let app = TestApp::new().await;
    let facilities = &app.services().facilities;

    let mut fields = facility("Gym", "спортивные залы");
    fields.paying_type = vec!["платные".into()];
    fields.age = vec!["взрослые".into(), "дети".into()];
    fields.note = Some("old note".into());
    let created = facilities.create(fields).await.unwrap();

    let mut replacement = facility("Gym 2", "Спортивные Залы");
    replacement.age = vec!["пенсионеры".into()];
    replacement.working_hours.monday = DaySchedule {
        open: true,
        all_day: Some(false),
        since: Some("08:00".into()),
        to: Some("22:00".into()),
    };
    let replaced = facilities.replace(created.id, replacement).await.unwrap();

    assert_eq!(replaced.id, created.id);
    assert_eq!(replaced.name, "Gym 2");
    assert_eq!(replaced.note, None);
    assert!(replaced.paying_type.is_empty());
    assert_eq!(replaced.age, vec!["пенсионеры"]);
    assert!(replaced.working_hours.monday.open);
    assert_eq!(replaced.created_at, created.created_at);
}

#[tokio::test]
async fn replace_missing_facility_is_not_found() {
    let app = TestApp::new().await;
    let err = app
        .services()
        .facilities
        .replace(Uuid::new_v4(), facility("Ghost", "другие"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn patch_changes_only_present_keys() {
    let app = TestApp::new().await;
    let facilities = &app.services().facilities;

    let mut fields = facility("Rink", "крытые катки");
    fields.note = Some("keep me".into());
    fields.site = Some("https://rink.example".into());
    fields.paying_type = vec!["платные".into()];
    let created = facilities.create(fields).await.unwrap();

    let patch: FacilityPatch = serde_json::from_value(json!({
        "hidden": false,
        "site": null,
        "age": ["Молодёжь"]
    }))
    .unwrap();
    let patched = facilities.partial_update(created.id, patch).await.unwrap();

    assert!(!patched.hidden);
    assert_eq!(patched.site, None);
    assert_eq!(patched.note.as_deref(), Some("keep me"));
    assert_eq!(patched.paying_type, vec!["платные"]);
    assert_eq!(patched.age, vec!["молодёжь"]);
    assert_eq!(patched.name, created.name);
}

#[tokio::test]
async fn patch_with_null_link_set_clears_it() {
    let app = TestApp::new().await;
    let facilities = &app.services().facilities;

    let mut fields = facility("Field", "плоскостные");
    fields.paying_type = vec!["бюджетные".into()];
    let created = facilities.create(fields).await.unwrap();

    let patch: FacilityPatch =
        serde_json::from_value(json!({ "paying_type": null, "type": "Рекреационные" })).unwrap();
    let patched = facilities.partial_update(created.id, patch).await.unwrap();

    assert!(patched.paying_type.is_empty());
    assert_eq!(patched.type_name, "рекреационные");
}

#[tokio::test]
async fn empty_patch_returns_record_unchanged() {
    let app = TestApp::new().await;
    let facilities = &app.services().facilities;
    let created = facilities
        .create(facility("Range", "стрелковые объекты"))
        .await
        .unwrap();

    let patched = facilities
        .partial_update(created.id, FacilityPatch::default())
        .await
        .unwrap();
    assert_eq!(patched, created);

    let err = facilities
        .partial_update(Uuid::new_v4(), FacilityPatch::default())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn patch_into_existing_identity_conflicts() {
    let app = TestApp::new().await;
    let facilities = &app.services().facilities;
    facilities
        .create(facility("Alpha", "другие"))
        .await
        .unwrap();
    let beta = facilities.create(facility("Beta", "другие")).await.unwrap();

    let patch: FacilityPatch = serde_json::from_value(json!({
        "name": "Alpha",
        "address": "Alpha street 1"
    }))
    .unwrap();
    let err = facilities.partial_update(beta.id, patch).await.unwrap_err();
    assert_matches!(err, ServiceError::AlreadyExists(_));

    // The failed patch left the record alone
    let reloaded = facilities.get_by_id(beta.id).await.unwrap();
    assert_eq!(reloaded.name, "Beta");
}

#[tokio::test]
async fn delete_removes_record_but_keeps_vocabulary() {
    let app = TestApp::new().await;
    let facilities = &app.services().facilities;

    let mut fields = facility("Temp", "бассейны");
    fields.age = vec!["дети".into()];
    let created = facilities.create(fields).await.unwrap();

    facilities.delete(created.id).await.unwrap();

    assert_matches!(
        facilities.get_by_id(created.id).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        facilities.delete(created.id).await,
        Err(ServiceError::NotFound(_))
    );
    assert_eq!(
        app.services()
            .taxonomy
            .list(TaxonomyAxis::Age)
            .await
            .unwrap(),
        vec!["дети".to_string()]
    );
}
