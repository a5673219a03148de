#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use lakeq::{config::LakeConfig, server::build_router, storage::MemoryStore, Orchestrator};
use serde_json::{json, Value};
use time::macros::date;
use tower::ServiceExt;

fn router(store: MemoryStore) -> Router {
    let orchestrator =
        Orchestrator::new(Arc::new(store), LakeConfig::default()).with_today(date!(2024 - 04 - 30));
    build_router(Arc::new(orchestrator), &[])
}

fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    store.put(
        "csv-data/year=2024/month=04/day=01/a.csv.gz",
        "sku,qty,price\nA-1,3,9.5\nB-2,0,4\n",
    );
    store.put(
        "csv-data/year=2024/month=04/day=02/a.csv.gz",
        "sku,qty,price\nC-3,12,1.25\n",
    );
    store
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    let body = serde_json::from_slice(&bytes).expect("json body");
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(router(MemoryStore::new()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn available_dates() {
    let (status, body) = send(router(seeded()), get("/api/available-dates")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"start_date": "2024-04-01", "end_date": "2024-04-02"})
    );

    let (status, body) = send(router(MemoryStore::new()), get("/api/available-dates")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NotFound");
}

#[tokio::test]
async fn query_answers_question() {
    let request = post_json(
        "/api/query",
        json!({
            "question": "SELECT sku, qty WHERE qty > 0",
            "start_date": "2024-04-01",
            "end_date": "2024-04-02",
        }),
    );
    let (status, body) = send(router(seeded()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sql_query"], "SELECT sku, qty WHERE qty > 0");
    assert_eq!(
        body["results"],
        json!([{"sku": "A-1", "qty": 3}, {"sku": "C-3", "qty": 12}])
    );
    assert!(body["explanation"].as_str().unwrap().contains("2 rows"));
}

#[tokio::test]
async fn query_errors_map_to_statuses() {
    let cases = [
        (
            json!({"question": "SELECT *", "start_date": "2024-04-01"}),
            StatusCode::BAD_REQUEST,
            "Validation",
        ),
        (
            json!({"question": "SELECT *", "start_date": "04/01/2024", "end_date": "2024-04-02"}),
            StatusCode::BAD_REQUEST,
            "Validation",
        ),
        (
            json!({"question": "SELECT *", "provider": "gemini"}),
            StatusCode::BAD_REQUEST,
            "Validation",
        ),
        (json!({}), StatusCode::BAD_REQUEST, "Validation"),
        (
            json!({"question": "DELETE FROM t"}),
            StatusCode::BAD_REQUEST,
            "NotASelect",
        ),
        (
            json!({"question": "SELECT missing"}),
            StatusCode::BAD_REQUEST,
            "UnknownColumn",
        ),
        (
            json!({"question": "SELECT * WHERE sku >"}),
            StatusCode::BAD_REQUEST,
            "InvalidFilter",
        ),
        (
            json!({"question": "SELECT *", "start_date": "2023-01-01", "end_date": "2023-01-02"}),
            StatusCode::NOT_FOUND,
            "NotFound",
        ),
    ];
    for (payload, expected_status, expected_code) in cases {
        let (status, body) = send(router(seeded()), post_json("/api/query", payload.clone())).await;
        assert_eq!(status, expected_status, "{payload}");
        assert_eq!(body["code"], expected_code, "{payload}");
        assert!(body["error"].is_string(), "{payload}");
    }
}

#[tokio::test]
async fn malformed_body_is_validation() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/query")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(router(seeded()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "Validation");
}

#[tokio::test]
async fn providers_are_listed() {
    let (status, body) = send(router(MemoryStore::new()), get("/api/providers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["default"], "passthrough");
    assert_eq!(body["providers"][0]["name"], "passthrough");
    assert_eq!(body["providers"][0]["requires_key"], false);
}
