use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use portal_db::{create_pool, run_migrations, DbPool, PoolSettings};
use portal_server::{app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup_app() -> (axum::Router, DbPool, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("portal.db");
    let pool = create_pool(db_path.to_str().unwrap(), PoolSettings::default()).unwrap();
    {
        let conn = pool.get().unwrap();
        let migrations = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
        run_migrations(&conn, &migrations).unwrap();
    }
    let state = AppState { pool: pool.clone() };
    (app(state), pool, tmp)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seed_user(app: &axum::Router, name: &str, email: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users",
            &json!({"name": name, "email": email}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn update_changes_only_provided_fields() {
    let (app, _pool, _tmp) = setup_app();
    let id = seed_user(&app, "Ada", "ada@example.com").await;

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/users/{id}"),
            &json!({"name": "Ada Lovelace"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "Ada Lovelace");
    assert_eq!(json["data"]["email"], "ada@example.com");
}

#[tokio::test]
async fn update_to_taken_email_is_conflict() {
    let (app, _pool, _tmp) = setup_app();
    seed_user(&app, "Ada", "ada@example.com").await;
    let grace = seed_user(&app, "Grace", "grace@example.com").await;

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/users/{grace}"),
            &json!({"email": "ada@example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_missing_user_is_404() {
    let (app, _pool, _tmp) = setup_app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/v1/users/4242",
            &json!({"name": "Nobody"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deactivating_a_user_round_trips() {
    let (app, _pool, _tmp) = setup_app();
    let id = seed_user(&app, "Ada", "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/users/{id}"),
            &json!({"is_active": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["is_active"], false);
}

#[tokio::test]
async fn delete_then_get_is_404() {
    let (app, _pool, _tmp) = setup_app();
    let id = seed_user(&app, "Ada", "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/users/{id}"))
                .method("DELETE")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let gone = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/users/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_missing_user_is_404() {
    let (app, _pool, _tmp) = setup_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/4242")
                .method("DELETE")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_finds_by_name_substring() {
    let (app, _pool, _tmp) = setup_app();
    seed_user(&app, "Ada Lovelace", "ada@example.com").await;
    seed_user(&app, "Grace Hopper", "grace@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/search?q=Lovelace")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let hits = json["data"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], "Ada Lovelace");
}

#[tokio::test]
async fn search_without_query_is_rejected() {
    let (app, _pool, _tmp) = setup_app();

    // Missing q fails query extraction, empty q fails validation.
    let missing = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/search")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let empty = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/search?q=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}
