mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

/// GET /archetypes/{name} returns the stored archetype JSON.
#[tokio::test]
async fn test_get_archetype() {
    let (app, _tmp) = common::test_app();
    let response = app.oneshot(common::get("/archetypes/node-fullstack")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body["name"], "node-fullstack");
    assert!(body["rules"].is_array());
}

/// Unknown archetypes are 404 with the structured error body.
#[tokio::test]
async fn test_get_archetype_not_found() {
    let (app, _tmp) = common::test_app();
    let response = app.oneshot(common::get("/archetypes/ghost")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = common::body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

/// Path-walking names are rejected before touching the store.
#[tokio::test]
async fn test_get_archetype_path_walk_rejected() {
    let (app, _tmp) = common::test_app();
    let response = app.oneshot(common::get("/archetypes/..%2Fsecrets")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// GET /rules/{name} serves `{name}-rule.json`.
#[tokio::test]
async fn test_get_rule() {
    let (app, _tmp) = common::test_app();
    let response = app
        .oneshot(common::get("/rules/noDatabases-iterative"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body["name"], "noDatabases-iterative");
    assert_eq!(body["event"]["type"], "error");
}

/// GET /exemptions/{archetype} serves the exemption list.
#[tokio::test]
async fn test_get_exemptions() {
    let (app, _tmp) = common::test_app();
    let response = app
        .oneshot(common::get("/exemptions/node-fullstack"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body[0]["ruleName"], "noDatabases-iterative");
}

/// Archetypes without exemptions yield an empty list, not a 404.
#[tokio::test]
async fn test_get_exemptions_absent_is_empty_list() {
    let (app, _tmp) = common::test_app();
    let response = app
        .oneshot(common::get("/exemptions/java-microservice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body, serde_json::json!([]));
}

/// A cached archetype survives deletion of the backing file until the
/// TTL lapses.
#[tokio::test]
async fn test_archetype_served_from_cache() {
    let (app, tmp) = common::test_app();

    let first = app
        .clone()
        .oneshot(common::get("/archetypes/node-fullstack"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    std::fs::remove_file(tmp.path().join("archetypes/node-fullstack.json")).unwrap();

    let second = app
        .oneshot(common::get("/archetypes/node-fullstack"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
}

/// Reads past the TTL miss the cache and fall back to the store.
#[tokio::test]
async fn test_expired_entry_reloads_from_store() {
    let (app, tmp) = common::test_app_with_ttl(0);

    let first = app
        .clone()
        .oneshot(common::get("/archetypes/node-fullstack"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    std::fs::remove_file(tmp.path().join("archetypes/node-fullstack.json")).unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let second = app
        .oneshot(common::get("/archetypes/node-fullstack"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
}

/// GET /health reports status and cache occupancy.
#[tokio::test]
async fn test_health() {
    let (app, _tmp) = common::test_app();
    let response = app.oneshot(common::get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}
