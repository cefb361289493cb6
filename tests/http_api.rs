//! End-to-end tests against a real listener.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};

use taskboard::api::auth::IdentityVerifier;
use taskboard::api::routes::{router, AppState};
use taskboard::config::{AuthConfig, Config};
use taskboard::service::TaskService;
use taskboard::store::TaskStore;

fn test_config(db_path: PathBuf) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: db_path,
        dev_mode: true,
        retention_days: 7,
        cors_origin: None,
        auth: AuthConfig {
            google_client_id: "test-client".to_string(),
            allowed_emails: vec!["alice@example.com".to_string()],
            api_key: None,
            service_email: "bot@example.com".to_string(),
            tokeninfo_url: "http://127.0.0.1:9/unused".to_string(),
        },
    }
}

async fn spawn_app(config: Config) -> SocketAddr {
    let store = TaskStore::open(&config.database_path).unwrap();
    let service = TaskService::new(store, config.retention_days);
    let verifier = IdentityVerifier::new(&config.auth);
    let state = Arc::new(AppState {
        config,
        service,
        verifier,
    });
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Serves a fixed tokeninfo response, standing in for the identity provider.
async fn spawn_tokeninfo(payload: Value) -> SocketAddr {
    let app = Router::new().route("/tokeninfo", get(move || ready_json(payload.clone())));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn ready_json(payload: Value) -> Json<Value> {
    Json(payload)
}

fn backdate(db_path: &Path, task_id: &str, days: i64) {
    let conn = rusqlite::Connection::open(db_path).unwrap();
    let stale = (Utc::now() - chrono::Duration::days(days))
        .to_rfc3339_opts(SecondsFormat::Micros, true);
    let changed = conn
        .execute(
            "UPDATE tasks SET updated_at = ?1 WHERE id = ?2",
            rusqlite::params![stale, task_id],
        )
        .unwrap();
    assert_eq!(changed, 1);
}

#[tokio::test]
async fn health_is_public() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_app(test_config(dir.path().join("tasks.db"))).await;

    let resp = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn task_lifecycle_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tasks.db");
    let addr = spawn_app(test_config(db_path.clone())).await;
    let base = format!("http://{addr}/api/tasks");
    let http = reqwest::Client::new();

    // Missing title -> 400.
    let resp = http.post(&base).json(&json!({})).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Create applies defaults.
    let resp = http
        .post(&base)
        .json(&json!({"title": "Fix bug"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task: Value = resp.json().await.unwrap();
    assert_eq!(task["status"], "todo");
    assert_eq!(task["priority"], "medium");
    assert_eq!(task["agent"], "main");
    assert_eq!(task["tags"], json!([]));
    assert_eq!(task["created_by"], "dev@localhost");
    let id = task["id"].as_str().unwrap().to_string();

    // Empty / unrecognized patch -> 400.
    let resp = http
        .patch(format!("{base}/{id}"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let resp = http
        .patch(format!("{base}/{id}"))
        .json(&json!({"bogus": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Invalid enum value -> 400.
    let resp = http
        .patch(format!("{base}/{id}"))
        .json(&json!({"status": "doing"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Move to done; updated_at advances past created_at.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let resp = http
        .patch(format!("{base}/{id}"))
        .json(&json!({"status": "done", "note": "shipped"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["status"], "done");
    let created_at =
        chrono::DateTime::parse_from_rfc3339(updated["created_at"].as_str().unwrap()).unwrap();
    let updated_at =
        chrono::DateTime::parse_from_rfc3339(updated["updated_at"].as_str().unwrap()).unwrap();
    assert!(updated_at > created_at);
    assert_eq!(updated["notes"][0]["note"], "shipped");
    assert_eq!(updated["notes"][0]["by"], "dev@localhost");

    // Unknown id -> 404.
    let missing = uuid::Uuid::new_v4();
    let resp = http
        .get(format!("{base}/{missing}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Fresh done task stays listed.
    let resp = http.get(&base).send().await.unwrap();
    let listed: Vec<Value> = resp.json().await.unwrap();
    assert!(listed.iter().any(|t| t["id"] == id.as_str()));

    // Simulate 8 days elapsed; the next list sweeps it into the archive.
    backdate(&db_path, &id, 8);
    let resp = http.get(&base).send().await.unwrap();
    let listed: Vec<Value> = resp.json().await.unwrap();
    assert!(listed.iter().all(|t| t["id"] != id.as_str()));

    let resp = http
        .get(format!("{base}?archived=true"))
        .send()
        .await
        .unwrap();
    let archived: Vec<Value> = resp.json().await.unwrap();
    let swept = archived.iter().find(|t| t["id"] == id.as_str()).unwrap();
    assert_eq!(swept["archived"], true);
    assert!(swept["archived_at"].is_string());
}

#[tokio::test]
async fn delete_soft_archives() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_app(test_config(dir.path().join("tasks.db"))).await;
    let base = format!("http://{addr}/api/tasks");
    let http = reqwest::Client::new();

    let task: Value = http
        .post(&base)
        .json(&json!({"title": "Old chore", "agent": "bot"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = task["id"].as_str().unwrap().to_string();

    let resp = http.delete(format!("{base}/{id}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let archived: Value = resp.json().await.unwrap();
    assert_eq!(archived["archived"], true);
    assert!(archived["archived_at"].is_string());

    // Still fetchable by id (soft delete), hidden from the default list.
    let resp = http.get(format!("{base}/{id}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let listed: Vec<Value> = http.get(&base).send().await.unwrap().json().await.unwrap();
    assert!(listed.iter().all(|t| t["id"] != id.as_str()));

    // Archived tasks drop out of the agent listing.
    let agents: Vec<String> = http
        .get(format!("{base}/agents"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!agents.contains(&"bot".to_string()));

    let missing = uuid::Uuid::new_v4();
    let resp = http.delete(format!("{base}/{missing}")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_validates_filters_and_orders_by_priority() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_app(test_config(dir.path().join("tasks.db"))).await;
    let base = format!("http://{addr}/api/tasks");
    let http = reqwest::Client::new();

    for (title, priority) in [("a", "low"), ("b", "urgent"), ("c", "medium")] {
        http.post(&base)
            .json(&json!({"title": title, "priority": priority}))
            .send()
            .await
            .unwrap();
    }

    let resp = http.get(format!("{base}?status=bogus")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let listed: Vec<Value> = http.get(&base).send().await.unwrap().json().await.unwrap();
    let priorities: Vec<&str> = listed
        .iter()
        .map(|t| t["priority"].as_str().unwrap())
        .collect();
    assert_eq!(priorities, vec!["urgent", "medium", "low"]);

    let limited: Vec<Value> = http
        .get(format!("{base}?limit=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn api_key_grants_service_account_access() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path().join("tasks.db"));
    config.dev_mode = false;
    config.auth.api_key = Some("super-secret".to_string());
    let addr = spawn_app(config).await;
    let base = format!("http://{addr}/api/tasks");
    let http = reqwest::Client::new();

    // No credentials at all.
    let resp = http.get(&base).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Wrong key.
    let resp = http
        .get(&base)
        .header("x-api-key", "nope")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Right key; the actor is the configured service account.
    let resp = http
        .post(&base)
        .header("x-api-key", "super-secret")
        .json(&json!({"title": "From the bot"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task: Value = resp.json().await.unwrap();
    assert_eq!(task["created_by"], "bot@example.com");
}

#[tokio::test]
async fn bearer_token_is_verified_and_allow_listed() {
    let idp = spawn_tokeninfo(json!({
        "aud": "test-client",
        "email": "alice@example.com",
        "name": "Alice",
        "picture": null
    }))
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path().join("tasks.db"));
    config.dev_mode = false;
    config.auth.tokeninfo_url = format!("http://{idp}/tokeninfo");
    let addr = spawn_app(config).await;
    let base = format!("http://{addr}/api/tasks");
    let http = reqwest::Client::new();

    let resp = http
        .get(&base)
        .bearer_auth("some-id-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let task: Value = http
        .post(&base)
        .bearer_auth("some-id-token")
        .json(&json!({"title": "Mine"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(task["created_by"], "alice@example.com");
}

#[tokio::test]
async fn bearer_token_with_unlisted_email_is_rejected() {
    let idp = spawn_tokeninfo(json!({
        "aud": "test-client",
        "email": "mallory@example.com",
        "name": "Mallory",
        "picture": null
    }))
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path().join("tasks.db"));
    config.dev_mode = false;
    config.auth.tokeninfo_url = format!("http://{idp}/tokeninfo");
    let addr = spawn_app(config).await;

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/api/tasks"))
        .bearer_auth("some-id-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_token_with_wrong_audience_is_rejected() {
    let idp = spawn_tokeninfo(json!({
        "aud": "someone-else",
        "email": "alice@example.com",
        "name": "Alice",
        "picture": null
    }))
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path().join("tasks.db"));
    config.dev_mode = false;
    config.auth.tokeninfo_url = format!("http://{idp}/tokeninfo");
    let addr = spawn_app(config).await;

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/api/tasks"))
        .bearer_auth("some-id-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
