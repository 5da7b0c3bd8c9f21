mod common;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use common::{facility, TestApp};
use bytes::Bytes;
use sportfacility_api::{errors::ServiceError, handlers::photos::store_photo};
use uuid::Uuid;

#[tokio::test]
async fn attach_is_idempotent_per_url() {
    let app = TestApp::new().await;
    let created = app
        .services()
        .facilities
        .create(facility("Pool", "бассейны"))
        .await
        .unwrap();
    let photos = &app.services().photos;

    let first = photos
        .attach(created.id, "http://files.test/static/a.jpg", "a.jpg")
        .await
        .unwrap();
    let again = photos
        .attach(created.id, "http://files.test/static/a.jpg", "a.jpg")
        .await
        .unwrap();
    assert_eq!(first, again);

    photos
        .attach(created.id, "http://files.test/static/b.jpg", "b.jpg")
        .await
        .unwrap();

    let view = app
        .services()
        .facilities
        .get_by_id(created.id)
        .await
        .unwrap();
    let urls: Vec<&str> = view.photos.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "http://files.test/static/a.jpg",
            "http://files.test/static/b.jpg"
        ]
    );
}

#[tokio::test]
async fn detach_returns_storage_key_and_unlinks() {
    let app = TestApp::new().await;
    let created = app
        .services()
        .facilities
        .create(facility("Gym", "спортивные залы"))
        .await
        .unwrap();
    let photos = &app.services().photos;
    let photo = photos
        .attach(created.id, "http://files.test/static/gym.png", "gym.png")
        .await
        .unwrap();

    let key = photos.detach(created.id, photo.id).await.unwrap();
    assert_eq!(key, "gym.png");

    let view = app
        .services()
        .facilities
        .get_by_id(created.id)
        .await
        .unwrap();
    assert!(view.photos.is_empty());

    // Second detach has nothing left to remove
    assert_matches!(
        photos.detach(created.id, photo.id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn unknown_facility_or_photo_is_not_found() {
    let app = TestApp::new().await;
    let photos = &app.services().photos;

    assert_matches!(
        photos.attach(Uuid::new_v4(), "http://x/y.jpg", "y.jpg").await,
        Err(ServiceError::NotFound(_))
    );

    let created = app
        .services()
        .facilities
        .create(facility("Rink", "крытые катки"))
        .await
        .unwrap();
    assert_matches!(
        photos.detach(created.id, Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn upload_and_delete_through_the_api() {
    let app = TestApp::new().await;
    let created = app
        .services()
        .facilities
        .create(facility("Court", "плоскостные"))
        .await
        .unwrap();
    let token = app.admin_token().to_string();

    let uri = format!("/api/v1/facility/{}/photo?filename=court.jpg", created.id);
    let (status, photo) = app
        .request_raw(
            Method::POST,
            &uri,
            Some(vec![0xFF, 0xD8, 0xFF, 0xE0]),
            "image/jpeg",
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let key = photo["filename"].as_str().unwrap().to_string();
    assert!(key.ends_with("-court.jpg"));
    assert!(photo["url"].as_str().unwrap().ends_with(&key));
    let stored = std::path::Path::new(&app.state.config.storage_root).join(&key);
    assert_eq!(std::fs::read(&stored).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE0]);

    let uri = format!(
        "/api/v1/facility/{}/photo/{}",
        created.id,
        photo["id"].as_str().unwrap()
    );
    let (status, _) = app.request(Method::DELETE, &uri, None, Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!stored.exists());

    let (status, _) = app.request(Method::DELETE, &uri, None, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_to_missing_facility_writes_nothing() {
    let app = TestApp::new().await;
    let token = app.admin_token().to_string();
    let uri = format!("/api/v1/facility/{}/photo?filename=x.jpg", Uuid::new_v4());

    let (status, _) = app
        .request_raw(Method::POST, &uri, Some(vec![1, 2, 3]), "image/jpeg", Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!std::path::Path::new(&app.state.config.storage_root).exists());
}

#[tokio::test]
async fn failed_attach_removes_the_stored_object() {
    let app = TestApp::new().await;

    let result = store_photo(
        app.services(),
        Uuid::new_v4(),
        "orphan.jpg",
        Bytes::from_static(&[1, 2, 3]),
    )
    .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));

    let root = std::path::Path::new(&app.state.config.storage_root);
    let leftovers = std::fs::read_dir(root)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}
