//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use mirror_core::config::PipelineConfig;
use mirror_core::{MirrorConfig, Monitor};
use mirror_observer::router::build_router;
use mirror_observer::state::AppState;
use mirror_types::SafetyObject;
use serde_json::Value;
use tower::ServiceExt;

fn make_test_state() -> Arc<AppState> {
    let config = MirrorConfig {
        pipeline: PipelineConfig {
            seed: Some(7),
            ..PipelineConfig::default()
        },
        ..MirrorConfig::default()
    };
    Arc::new(AppState::new(Arc::new(Monitor::new(config))))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(router: Router, path: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post_json(router: Router, path: &str, body: &Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post_empty(router: Router, path: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::post(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post_bytes(router: Router, path: &str, bytes: &'static [u8]) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::post(path)
                .header(header::CONTENT_TYPE, "image/jpeg")
                .body(Body::from(bytes))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// =========================================================================
// Status
// =========================================================================

#[tokio::test]
async fn test_index() {
    let router = build_router(make_test_state());
    let (status, json) = get(router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "active");
}

#[tokio::test]
async fn test_health() {
    let router = build_router(make_test_state());
    let (status, json) = get(router, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model_loaded"], true);
    assert_eq!(json["detection_active"], false);
    assert_eq!(json["observers"], 0);
}

// =========================================================================
// Detection
// =========================================================================

#[tokio::test]
async fn test_predict_numbers_detections() {
    let router = build_router(make_test_state());
    let (status, json) = post_bytes(router, "/api/predict", b"\xff\xd8fake-jpeg").await;

    assert_eq!(status, StatusCode::OK);
    let detections = json["detections"].as_array().unwrap();
    assert_eq!(detections.len(), SafetyObject::ALL.len());
    assert_eq!(json["total_objects"], SafetyObject::ALL.len());
    assert_eq!(json["image_size"], 11);
    assert_eq!(json["model_version"], "YOLOv8n-safety-v1.2");
    for (i, det) in detections.iter().enumerate() {
        assert_eq!(det["id"], i + 1);
        let confidence = det["confidence"].as_f64().unwrap();
        assert!((0.75..=0.98).contains(&confidence));
        assert_eq!(det["bbox"].as_array().unwrap().len(), 4);
        assert!(det["class"].is_string());
    }
}

#[tokio::test]
async fn test_predict_updates_metrics() {
    let state = make_test_state();
    post_bytes(build_router(Arc::clone(&state)), "/api/predict", b"frame").await;

    let (status, json) = get(build_router(state), "/api/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["metrics"]["objects_detected"], SafetyObject::ALL.len());
    assert_eq!(json["metrics"]["frames_processed"], 1);
}

#[tokio::test]
async fn test_detection_frame_with_empty_payload() {
    let router = build_router(make_test_state());
    let (status, json) = post_bytes(router, "/api/detection/frame", b"").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["frame_id"].as_i64().unwrap() > 0);
    assert!(!json["detections"].as_array().unwrap().is_empty());
    assert!(json["processing_time"].as_str().unwrap().ends_with('s'));
}

#[tokio::test]
async fn test_start_and_stop_detection() {
    let state = make_test_state();

    let (status, json) = post_empty(build_router(Arc::clone(&state)), "/api/detection/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Detection started");
    assert!(state.monitor.is_detection_active().await);

    let (_, health) = get(build_router(Arc::clone(&state)), "/api/health").await;
    assert_eq!(health["detection_active"], true);

    let (status, _) = post_empty(build_router(Arc::clone(&state)), "/api/detection/stop").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!state.monitor.is_detection_active().await);
}

#[tokio::test]
async fn test_start_detection_notifies_observers() {
    let state = make_test_state();
    let (_id, mut rx) = state.monitor.registry().register_channel().await;

    post_empty(build_router(Arc::clone(&state)), "/api/detection/start").await;

    let event = rx.recv().await.unwrap();
    assert_eq!(event.kind(), "detection_started");
}

// =========================================================================
// Pipeline
// =========================================================================

#[tokio::test]
async fn test_resimulate_defaults() {
    let router = build_router(make_test_state());
    let (status, json) = post_empty(router, "/api/resimulate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"]["object_class"], "Fire Extinguisher");
    assert_eq!(json["result"]["samples_generated"], 100);
}

#[tokio::test]
async fn test_resimulate_named_class() {
    let router = build_router(make_test_state());
    let body = serde_json::json!({
        "object_class": "Oxygen Tank",
        "num_samples": 250,
        "variations": ["glare", "smoke"],
    });
    let (status, json) = post_json(router, "/api/resimulate", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"]["object_class"], "Oxygen Tank");
    assert_eq!(json["result"]["samples_generated"], 250);
    assert_eq!(
        json["result"]["variations_applied"],
        serde_json::json!(["glare", "smoke"])
    );
}

#[tokio::test]
async fn test_resimulate_unsupported_class() {
    let state = make_test_state();
    let body = serde_json::json!({ "object_class": "Not A Real Object", "num_samples": 10 });
    let (status, json) = post_json(build_router(Arc::clone(&state)), "/api/resimulate", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("Not A Real Object"));
    assert!(state.monitor.query_history().await.is_empty());
}

#[tokio::test]
async fn test_retrain_then_logs() {
    let state = make_test_state();

    let body = serde_json::json!({ "samples_used": 1000, "trigger": "drift_detection" });
    let (status, json) = post_json(build_router(Arc::clone(&state)), "/api/retrain", &body).await;
    assert_eq!(status, StatusCode::OK);
    let record = &json["result"];
    assert_eq!(record["id"], 1);
    assert_eq!(record["status"], "completed");
    assert_eq!(record["trigger"], "Drift Detection");
    assert_eq!(record["synthetic_samples_used"], 1000);
    let map_after = record["metrics"]["mAP"]["after"].as_f64().unwrap();
    assert!((95.7..=99.0).contains(&map_after));

    post_empty(build_router(Arc::clone(&state)), "/api/retrain").await;

    let (status, json) = get(build_router(state), "/api/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    let ids: Vec<u64> = json["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn test_logs_pair_metrics_by_name() {
    let state = make_test_state();
    let before = state.monitor.query_metrics().await;
    post_empty(build_router(Arc::clone(&state)), "/api/retrain").await;

    let (_, json) = get(build_router(Arc::clone(&state)), "/api/logs").await;
    let entry = &json["logs"][0];
    assert_eq!(entry["trigger"], "Manual Trigger");
    assert_eq!(entry["metrics"]["mAP"]["before"], before.accuracy);
    assert_eq!(entry["metrics"]["precision"]["before"], before.precision);
    assert_eq!(entry["metrics"]["recall"]["before"], before.recall);
    assert_eq!(entry["metrics"]["f1Score"]["before"], before.f1_score);

    let history = state.monitor.query_history().await;
    let record = history.first().unwrap();
    assert_eq!(entry["metrics"]["mAP"]["after"], record.metrics_after.map);
    assert!(entry.get("metrics_before").is_none());
    assert!(entry.get("metrics_after").is_none());
}

#[tokio::test]
async fn test_retrain_rejects_zero_epochs() {
    let state = make_test_state();
    let body = serde_json::json!({ "epochs": 0 });
    let (status, json) = post_json(build_router(Arc::clone(&state)), "/api/retrain", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
    assert!(state.monitor.query_history().await.is_empty());
}

// =========================================================================
// Queries
// =========================================================================

#[tokio::test]
async fn test_metrics_initial_values() {
    let router = build_router(make_test_state());
    let (status, json) = get(router, "/api/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!((json["metrics"]["accuracy"].as_f64().unwrap() - 95.7).abs() < 1e-9);
    assert_eq!(json["metrics"]["alerts_today"], 3);
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_logs_empty_at_start() {
    let router = build_router(make_test_state());
    let (status, json) = get(router, "/api/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
    assert!(json["logs"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let router = build_router(make_test_state());
    let response = router
        .oneshot(
            Request::get("/api/health")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let router = build_router(make_test_state());
    let response = router
        .oneshot(
            Request::get("/api/health")
                .header(header::ORIGIN, "http://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let router = build_router(make_test_state());
    let response = router
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
