mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;

use card_vault_api::auth::permissions::LegacyRole;

#[tokio::test]
async fn missing_token_is_unauthorized() -> Result<()> {
    let state = legacy_state().await?;
    let app = router(&state);

    let (status, body) = send(&app, Method::GET, "/api/data/cards", None, &[], None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn create_and_list_use_the_success_envelope() -> Result<()> {
    let state = legacy_state().await?;
    let app = router(&state);
    let token = legacy_token("1", LegacyRole::User);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/data/teams",
        Some(&token),
        &[],
        Some(json!({"name": "Dodgers", "city": "Brooklyn"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Dodgers");

    let (status, body) = send(&app, Method::GET, "/api/data/teams", Some(&token), &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn legacy_users_cannot_modify_but_managers_can() -> Result<()> {
    let state = legacy_state().await?;
    let app = router(&state);
    let user = legacy_token("1", LegacyRole::User);
    let manager = legacy_token("2", LegacyRole::Manager);

    let (_, created) = send(
        &app,
        Method::POST,
        "/api/data/cards",
        Some(&user),
        &[],
        Some(json!({"year": 1989, "set_name": "Upper Deck"})),
    )
    .await;
    let uri = format!("/api/data/cards/{}", created["data"]["id"]);

    let (status, body) = send(&app, Method::PUT, &uri, Some(&user), &[], Some(json!({"grade": 9.5}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PERMISSION_DENIED");

    let (status, body) = send(&app, Method::PUT, &uri, Some(&manager), &[], Some(json!({"grade": 9.5}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["grade"], 9.5);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&user), &[], None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&manager), &[], None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &uri, Some(&user), &[], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn bad_input_is_rejected() -> Result<()> {
    let state = legacy_state().await?;
    let app = router(&state);
    let token = legacy_token("1", LegacyRole::Admin);

    let (status, body) = send(&app, Method::GET, "/api/data/widgets", Some(&token), &[], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/data/teams",
        Some(&token),
        &[],
        Some(json!({"name": "Cubs", "id": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["field"], "id");

    let (status, _) = send(&app, Method::GET, "/api/data/teams/abc", Some(&token), &[], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn tenant_registry_is_unavailable_on_the_legacy_engine() -> Result<()> {
    let state = legacy_state().await?;
    let app = router(&state);

    let (status, body) = send(&app, Method::GET, "/api/tenants", Some(&legacy_token("1", LegacyRole::Admin)), &[], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Method::GET, "/api/tenants", Some(&legacy_token("2", LegacyRole::Manager)), &[], None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/tenants/current",
        Some(&legacy_token("2", LegacyRole::Manager)),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["engine"], "legacy");
    assert!(body["data"]["tenant"].is_null());
    Ok(())
}

#[tokio::test]
async fn upload_hand_off_between_devices() -> Result<()> {
    let state = legacy_state().await?;
    let app = router(&state);
    let owner = legacy_token("1", LegacyRole::User);
    let stranger = legacy_token("2", LegacyRole::User);

    let (status, body) = send(&app, Method::POST, "/api/uploads", Some(&owner), &[], None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "waiting");
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    // No tenant on the legacy engine, so only the owner can see the session.
    let (status, _) = send(&app, Method::GET, &format!("/api/uploads/{}", id), Some(&stranger), &[], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/uploads/{}/complete", id),
        Some(&owner),
        &[],
        Some(json!({"image_url": "/uploads/front.jpg"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "uploaded");
    assert_eq!(body["data"]["image_url"], "/uploads/front.jpg");

    // A session completes once; later uploads do not replace the image.
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/uploads/{}/complete", id),
        Some(&owner),
        &[],
        Some(json!({"image_url": "/uploads/other.jpg"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (_, body) = send(&app, Method::GET, &format!("/api/uploads/{}", id), Some(&owner), &[], None).await;
    assert_eq!(body["data"]["image_url"], "/uploads/front.jpg");

    let (status, _) = send(&app, Method::GET, "/api/uploads/unknown", Some(&owner), &[], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
