//! # Project Handler Tests
//!
//! Requests go through the full router, so auth middleware and error mapping
//! are exercised too.

use super::*;
use crate::chat::test_support::{test_state, token_for};
use crate::server::{create_router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use lib_core::dto::FileNode;
use lib_core::model::store::UserRepository;
use serde_json::{json, Value};
use tower::ServiceExt;

struct Fixture {
    app: Router,
    state: AppState,
    project_id: Uuid,
    token: String,
}

async fn fixture() -> Fixture {
    let state = test_state().await;
    let ada = UserRepository::create(&state.db, "ada@example.com").await.unwrap();
    let project = ProjectRepository::create(&state.db, "factorial", ada.id).await.unwrap();

    Fixture {
        app: create_router(state.clone(), &[]),
        token: token_for(ada.id, &ada.email),
        project_id: project.id,
        state,
    }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    // Arrange
    let fx = fixture().await;
    let uri = format!("/api/projects/{}", fx.project_id);

    // Act
    let response = fx.app.oneshot(request("GET", &uri, None, None)).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "AuthenticationError");
}

#[tokio::test]
async fn test_malformed_project_id_is_bad_request() {
    let fx = fixture().await;

    let response = fx
        .app
        .oneshot(request("GET", "/api/projects/not-a-uuid", Some(&fx.token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_project_is_not_found() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}", Uuid::new_v4());

    let response = fx.app.oneshot(request("GET", &uri, Some(&fx.token), None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_save_then_fetch_round_trips_file_tree() {
    // Arrange
    let fx = fixture().await;
    let tree = json!({
        "app.js": { "file": { "contents": "console.log(1)" } },
        "lib": { "directory": { "math.js": { "file": { "contents": "export {}" } } } }
    });

    // Act
    let saved = fx
        .app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/projects/{}/file-tree", fx.project_id),
            Some(&fx.token),
            Some(json!({ "fileTree": tree })),
        ))
        .await
        .unwrap();
    let fetched = fx
        .app
        .oneshot(request("GET", &format!("/api/projects/{}", fx.project_id), Some(&fx.token), None))
        .await
        .unwrap();

    // Assert
    assert_eq!(saved.status(), StatusCode::OK);
    assert_eq!(fetched.status(), StatusCode::OK);
    let body = json_body(fetched).await;
    assert_eq!(body["fileTree"], tree);
    assert_eq!(body["name"], "factorial");
    assert_eq!(body["users"][0]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_delete_file_and_missing_path() {
    // Arrange
    let fx = fixture().await;
    let tree = FileTree::new()
        .with("index.html", FileNode::file("<html></html>"))
        .with("src", FileNode::Directory(FileTree::new().with("main.js", FileNode::file("1"))));
    FileTreeStore::save(&fx.state.db, fx.project_id, &tree).await.unwrap();

    // Act
    let deleted = fx
        .app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/projects/{}/files/src/main.js", fx.project_id),
            Some(&fx.token),
            None,
        ))
        .await
        .unwrap();
    let missing = fx
        .app
        .oneshot(request(
            "DELETE",
            &format!("/api/projects/{}/files/src/nope/main.js", fx.project_id),
            Some(&fx.token),
            None,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(json_body(deleted).await["message"], "File deleted successfully");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(missing).await["code"], "NotFoundError");

    let stored = FileTreeStore::load(&fx.state.db, fx.project_id).await.unwrap();
    assert!(stored.lookup("src/main.js").is_none());
    assert!(stored.lookup("src").is_some());
    assert!(stored.lookup("index.html").is_some());
}

#[tokio::test]
async fn test_append_message_shows_up_hydrated() {
    let fx = fixture().await;

    let appended = fx
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/projects/{}/messages", fx.project_id),
            Some(&fx.token),
            Some(json!({ "message": "hello team" })),
        ))
        .await
        .unwrap();
    let fetched = fx
        .app
        .oneshot(request("GET", &format!("/api/projects/{}", fx.project_id), Some(&fx.token), None))
        .await
        .unwrap();

    assert_eq!(appended.status(), StatusCode::OK);
    let record = json_body(appended).await;
    assert_eq!(record["message"], "hello team");
    assert!(record["expiresAt"].is_string());

    let project = json_body(fetched).await;
    assert_eq!(project["messages"][0]["message"], "hello team");
    assert_eq!(project["messages"][0]["sender"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_membership_is_enforced_when_required() {
    let mut state = test_state().await;
    state.config.require_membership = true;
    let ada = UserRepository::create(&state.db, "ada@example.com").await.unwrap();
    let eve = UserRepository::create(&state.db, "eve@example.com").await.unwrap();
    let project = ProjectRepository::create(&state.db, "private", ada.id).await.unwrap();
    let app = create_router(state, &[]);

    let response = app
        .oneshot(request(
            "GET",
            &format!("/api/projects/{}", project.id),
            Some(&token_for(eve.id, &eve.email)),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_health_is_public() {
    let fx = fixture().await;

    let response = fx.app.oneshot(request("GET", "/health", None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_save_file_tree_above_default_body_limit() {
    // Arrange
    let fx = fixture().await;
    let big = "x".repeat(3 * 1024 * 1024);
    let tree = json!({ "bundle.js": { "file": { "contents": big } } });

    // Act
    let response = fx
        .app
        .oneshot(request(
            "PUT",
            &format!("/api/projects/{}/file-tree", fx.project_id),
            Some(&fx.token),
            Some(json!({ "fileTree": tree })),
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let stored = FileTreeStore::load(&fx.state.db, fx.project_id).await.unwrap();
    match stored.get("bundle.js") {
        Some(FileNode::File { contents }) => assert_eq!(contents.len(), 3 * 1024 * 1024),
        other => panic!("expected bundle.js, got {:?}", other),
    }
}

#[tokio::test]
async fn test_save_deeply_nested_file_tree() {
    // Arrange
    let fx = fixture().await;
    let mut tree = FileTree::new().with("leaf.js", FileNode::file("1"));
    for depth in 0..80 {
        tree = FileTree::new().with(format!("d{}", depth), FileNode::Directory(tree));
    }
    let body = json!({ "fileTree": serde_json::to_value(&tree).unwrap() });

    // Act
    let saved = fx
        .app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/projects/{}/file-tree", fx.project_id),
            Some(&fx.token),
            Some(body),
        ))
        .await
        .unwrap();
    let fetched = fx
        .app
        .oneshot(request("GET", &format!("/api/projects/{}", fx.project_id), Some(&fx.token), None))
        .await
        .unwrap();

    // Assert
    assert_eq!(saved.status(), StatusCode::OK);
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(FileTreeStore::load(&fx.state.db, fx.project_id).await.unwrap(), tree);
}

#[tokio::test]
async fn test_malformed_file_tree_body_is_bad_request() {
    let fx = fixture().await;

    let response = fx
        .app
        .oneshot(request(
            "PUT",
            &format!("/api/projects/{}/file-tree", fx.project_id),
            Some(&fx.token),
            Some(json!({ "fileTree": { "a.js": { "folder": {} } } })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
