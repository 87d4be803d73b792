use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use portal_db::{create_pool, run_migrations, DbPool, PoolSettings};
use portal_server::{app, middleware::REQUEST_ID_HEADER, AppState};
use serde_json::Value;
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

#[tokio::test]
async fn health_check_reports_connected_database() {
    let (app, _pool, _tmp) = setup_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key(REQUEST_ID_HEADER),
        "logging middleware should stamp a request id"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "connected");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}
