#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;

use xfi_config_server::config::ServerConfig;
use xfi_config_server::routes::{build_router, AppState};

pub const TEST_SHARED_SECRET: &str = "test-secret-for-integration-tests";

/// Create a test app over a populated temp config directory.
pub fn test_app() -> (Router, TempDir) {
    test_app_with_ttl(300)
}

/// Same, with a caller-chosen cache TTL in seconds.
pub fn test_app_with_ttl(cache_ttl_secs: u64) -> (Router, TempDir) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    populate_store(tmp.path().to_path_buf());

    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        config_dir: tmp.path().to_path_buf(),
        cache_ttl_secs,
        shared_secret: Some(TEST_SHARED_SECRET.into()),
    };

    (build_router(AppState::new(config)), tmp)
}

fn populate_store(root: PathBuf) {
    fs::create_dir_all(root.join("archetypes")).unwrap();
    fs::create_dir_all(root.join("rules")).unwrap();
    fs::create_dir_all(root.join("exemptions")).unwrap();

    fs::write(
        root.join("archetypes/node-fullstack.json"),
        json!({
            "name": "node-fullstack",
            "rules": ["noDatabases-iterative"],
            "facts": ["repoFileAnalysis"],
            "operators": ["hasMatches", "notEqual"],
            "config": {"blacklistPatterns": [], "whitelistPatterns": [".*\\.js$"]}
        })
        .to_string(),
    )
    .unwrap();

    fs::write(
        root.join("rules/noDatabases-iterative-rule.json"),
        json!({
            "name": "noDatabases-iterative",
            "conditions": {"all": []},
            "event": {"type": "error", "params": {}}
        })
        .to_string(),
    )
    .unwrap();

    fs::write(
        root.join("exemptions/node-fullstack-exemptions.json"),
        json!([{
            "repoUrl": "git@host:org/x.git",
            "ruleName": "noDatabases-iterative",
            "expirationDate": "2099-01-01",
            "reason": "migration"
        }])
        .to_string(),
    )
    .unwrap();
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

pub fn get_with_secret(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .header("x-shared-secret", TEST_SHARED_SECRET)
        .body(Body::empty())
        .unwrap()
}

pub fn post_with_secret(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-shared-secret", TEST_SHARED_SECRET)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
