//! HTTP tests for configuration activation.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use relayhub_core::encoding::base64_decode;

use super::test_helpers::TestApp;

async fn config_tasks(app: &TestApp, relay: &str) -> Vec<(String, String)> {
    let (status, body) = app.get(&format!("/relays/{relay}/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| {
            (
                t["spec"]["serial"].as_str().unwrap().to_string(),
                t["status"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

fn pending(serial: &str) -> (String, String) {
    (serial.to_string(), "PENDING".to_string())
}

#[tokio::test]
async fn activation_assigns_the_active_serial() {
    let app = TestApp::new().await;
    app.fx.add_relays(&["a", "b"]).await;
    app.write_snapshot("s1", &["a", "b"]);

    let (status, body) = app.post_as_user("/relays/activate-config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["serial"], "s1");
    assert_eq!(body["created"], json!(["a", "b"]));

    assert_eq!(config_tasks(&app, "a").await, [pending("s1")]);
    assert_eq!(config_tasks(&app, "b").await, [pending("s1")]);
}

#[tokio::test]
async fn repeated_activation_creates_no_duplicates() {
    let app = TestApp::new().await;
    app.fx.add_relays(&["a"]).await;
    app.write_snapshot("s1", &["a"]);

    app.post_as_user("/relays/activate-config", None).await;
    let (status, body) = app.post_as_user("/relays/activate-config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], json!([]));
    assert_eq!(body["already_pending"], json!(["a"]));

    assert_eq!(config_tasks(&app, "a").await, [pending("s1")]);
}

#[tokio::test]
async fn relay_missing_from_snapshot_gets_nothing() {
    let app = TestApp::new().await;
    app.fx.add_relays(&["a", "b"]).await;
    // "b" is configured on the site but not yet rendered into the snapshot.
    app.write_snapshot("s1", &["a"]);

    app.post_as_user("/relays/activate-config", None).await;
    assert!(config_tasks(&app, "b").await.is_empty());

    app.write_snapshot("s2", &["a", "b"]);
    app.post_as_user("/relays/activate-config", None).await;
    assert_eq!(config_tasks(&app, "b").await, [pending("s2")]);
}

#[tokio::test]
async fn empty_snapshot_is_a_no_op() {
    let app = TestApp::new().await;
    app.fx.add_relays(&["a"]).await;
    app.write_snapshot("s1", &[]);

    let (status, body) = app.post_as_user("/relays/activate-config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], json!([]));
    assert!(config_tasks(&app, "a").await.is_empty());
}

#[tokio::test]
async fn activation_without_snapshot_is_500() {
    let app = TestApp::new().await;
    let (status, body) = app.post_as_user("/relays/activate-config", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "snapshot_unavailable");
}

#[tokio::test]
async fn activation_requires_a_site_user() {
    let app = TestApp::new().await;
    app.fx.add_relays(&["a"]).await;
    app.write_snapshot("s1", &["a"]);

    let (status, _) = app
        .call(Method::POST, "/relays/activate-config", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .call(Method::POST, "/relays/activate-config", Some("forged"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(config_tasks(&app, "a").await.is_empty());
}

#[tokio::test]
async fn site_outage_is_503() {
    let app = TestApp::new().await;
    app.fx.add_relays(&["a"]).await;
    app.write_snapshot("s1", &["a"]);
    app.fx.site.set_unavailable(true);

    let (status, body) = app.post_as_user("/relays/activate-config", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "site_unavailable");
}

#[tokio::test]
async fn pending_deletion_relay_is_skipped_but_keeps_old_tasks() {
    let app = TestApp::new().await;
    app.fx.add_relays(&["a", "b"]).await;
    app.write_snapshot("s1", &["a", "b"]);
    app.post_as_user("/relays/activate-config", None).await;

    app.fx.delete_on_site("b");
    app.write_snapshot("s2", &["a", "b"]);
    let (_, body) = app.post_as_user("/relays/activate-config", None).await;
    assert_eq!(body["created"], json!(["a"]));
    assert_eq!(body["skipped"], json!(["b"]));

    assert_eq!(config_tasks(&app, "b").await, [pending("s1")]);
}

#[tokio::test]
async fn config_task_carries_a_tar_archive() {
    let app = TestApp::new().await;
    app.fx.add_relays(&["a"]).await;
    app.write_snapshot("s1", &["a"]);
    app.post_as_user("/relays/activate-config", None).await;

    let (_, body) = app.get("/relays/a/tasks").await;
    let spec = &body["tasks"][0]["spec"];
    assert_eq!(spec["type"], "relay_config");
    let archive = base64_decode(spec["tar_data"].as_str().unwrap()).unwrap();
    // Tar archives are whole 512-byte blocks.
    assert!(!archive.is_empty());
    assert_eq!(archive.len() % 512, 0);
}
