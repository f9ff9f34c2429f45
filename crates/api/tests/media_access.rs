//! Integration tests for signed media URL verification at `/media/...`.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use common::{body_json, get, media_path, post_json, register_photo, TEST_SIGNING_KEY};
use photoshare_core::signing::{Signer, SigningKey};
use serde_json::json;
use uuid::Uuid;

/// Fetch a photo through the API and return its issued media URL as a path.
async fn issued_media_path(app: &axum::Router, resource_path: &str) -> String {
    let photo_id = register_photo(app, resource_path).await;
    let json = body_json(get(app.clone(), &format!("/api/v1/photos/{photo_id}")).await).await;
    media_path(json["data"]["url"].as_str().unwrap())
}

async fn assert_denied(app: axum::Router, uri: &str, reason: &str) {
    let response = get(app, uri).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri {uri}");
    let json = body_json(response).await;
    assert_eq!(json["code"], "ACCESS_DENIED");
    assert_eq!(json["reason"], reason);
}

// ---------------------------------------------------------------------------
// Test: a freshly issued URL is accepted
// ---------------------------------------------------------------------------

#[tokio::test]
async fn issued_url_is_allowed() {
    let app = common::build_test_app();
    let path = issued_media_path(&app, "photos/2026/beach.jpg").await;

    let response = get(app, &path).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn url_without_kid_uses_active_key() {
    let app = common::build_test_app();
    let path = issued_media_path(&app, "photos/a.jpg").await;
    let without_kid = path.strip_suffix("&kid=test").unwrap();

    let response = get(app, without_kid).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn issued_url_with_every_allowed_character_is_allowed() {
    let app = common::build_test_app();
    let path = issued_media_path(&app, "photos/Sun-set_v2.~final/IMG.0001.jpg").await;

    let response = get(app, &path).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn paths_that_would_not_survive_url_decoding_are_rejected() {
    let app = common::build_test_app();

    for path in ["photos/a%41.jpg", "photos/100%.jpg", "photos/a+b.jpg", "photos/caf\u{e9}.jpg"] {
        let response = post_json(
            app.clone(),
            "/api/v1/photos",
            json!({ "photo_id": Uuid::new_v4(), "resource_path": path }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "path {path:?}");
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }
}

// ---------------------------------------------------------------------------
// Test: tampering is reported as invalid
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tampered_signature_is_invalid() {
    let app = common::build_test_app();
    let path = issued_media_path(&app, "photos/a.jpg").await;

    // Flip the last hex digit of the signature.
    let sig_start = path.find("sig=").unwrap() + 4;
    let sig_end = path[sig_start..].find('&').unwrap() + sig_start;
    let last = &path[sig_end - 1..sig_end];
    let flipped = if last == "0" { "1" } else { "0" };
    let tampered = format!("{}{}{}", &path[..sig_end - 1], flipped, &path[sig_end..]);

    assert_denied(app, &tampered, "invalid").await;
}

#[tokio::test]
async fn signature_for_other_path_is_invalid() {
    let app = common::build_test_app();
    let path = issued_media_path(&app, "photos/a.jpg").await;
    let other = path.replacen("photos/a.jpg", "photos/b.jpg", 1);

    assert_denied(app, &other, "invalid").await;
}

#[tokio::test]
async fn extended_expiry_is_invalid() {
    let app = common::build_test_app();
    let path = issued_media_path(&app, "photos/a.jpg").await;
    let extended = path.replacen("expires=", "expires=9", 1);

    assert_denied(app, &extended, "invalid").await;
}

#[tokio::test]
async fn malformed_parameters_are_invalid() {
    let app = common::build_test_app();

    assert_denied(app.clone(), "/media/photos/a.jpg", "invalid").await;
    assert_denied(app.clone(), "/media/photos/a.jpg?expires=abc&sig=00", "invalid").await;
    assert_denied(app.clone(), "/media/photos/a.jpg?expires=4102444800", "invalid").await;
    assert_denied(app, "/media/photos/a.jpg?expires=4102444800&sig=zz", "invalid").await;
}

#[tokio::test]
async fn unknown_key_id_is_invalid() {
    let app = common::build_test_app();
    let path = issued_media_path(&app, "photos/a.jpg").await;
    let unknown = path.replacen("&kid=test", "&kid=nope", 1);

    assert_denied(app, &unknown, "invalid").await;
}

// ---------------------------------------------------------------------------
// Test: expiry and key rotation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_url_is_denied_as_expired() {
    let app = common::build_test_app();
    let signer = Signer::new(SigningKey::new("test", TEST_SIGNING_KEY).unwrap());
    let issued = Utc::now() - chrono::Duration::hours(2);
    let token = signer.issue_at("photos/old.jpg", Duration::from_secs(60), issued);

    let path = media_path(&token.to_url("http://localhost:3000/media"));
    assert_denied(app, &path, "expired").await;
}

#[tokio::test]
async fn url_signed_with_retired_key_is_allowed() {
    let app = common::build_test_app();
    let retired = Signer::new(SigningKey::new("old", "retired-test-key").unwrap());
    let token = retired.issue("photos/a.jpg", Duration::from_secs(300));

    let path = media_path(&token.to_url("http://localhost:3000/media"));
    let response = get(app, &path).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
