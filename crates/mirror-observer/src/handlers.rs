//! REST API endpoint handlers for the Observer server.
//!
//! Every handler delegates to the shared [`Monitor`](mirror_core::Monitor)
//! through [`AppState`]. Frame payloads are taken as the raw request body.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Service name and status |
//! | `GET` | `/api/health` | Health, detection flag, observer count |
//! | `POST` | `/api/predict` | Detect objects in an uploaded image |
//! | `POST` | `/api/detection/frame` | Detect objects in a live frame |
//! | `POST` | `/api/detection/start` | Start the detection session |
//! | `POST` | `/api/detection/stop` | Stop the detection session |
//! | `POST` | `/api/resimulate` | Generate synthetic training data |
//! | `POST` | `/api/retrain` | Retrain the model |
//! | `GET` | `/api/metrics` | Current metrics |
//! | `GET` | `/api/logs` | Training history, most recent first |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use chrono::Utc;
use mirror_core::RetrainRequest;
use mirror_types::{Detection, RetrainTrigger, SafetyObject};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::ApiError;
use crate::state::AppState;

/// Object class used when a resimulation request names none.
const DEFAULT_OBJECT_CLASS: SafetyObject = SafetyObject::FireExtinguisher;

/// Sample count used when a resimulation request names none.
const DEFAULT_NUM_SAMPLES: u32 = 100;

/// Synthetic samples credited to a retrain request that names none.
const DEFAULT_SAMPLES_USED: u64 = 1000;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/resimulate`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ResimulateBody {
    /// Catalog display name, e.g. `"Oxygen Tank"`.
    pub object_class: Option<String>,
    /// Number of samples to generate.
    pub num_samples: Option<u32>,
    /// Variation tags to apply.
    pub variations: Option<Vec<String>>,
}

/// Body of `POST /api/retrain`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct RetrainBody {
    /// Synthetic samples the run is credited with.
    pub samples_used: Option<u64>,
    /// Epoch count override.
    pub epochs: Option<u32>,
    /// Learning rate override.
    pub learning_rate: Option<f64>,
    /// What prompted the run.
    pub trigger: Option<RetrainTrigger>,
}

impl From<RetrainBody> for RetrainRequest {
    fn from(body: RetrainBody) -> Self {
        Self {
            samples_used: body.samples_used.unwrap_or(DEFAULT_SAMPLES_USED),
            epochs: body.epochs,
            learning_rate: body.learning_rate,
            trigger: body.trigger.unwrap_or_default(),
        }
    }
}

/// A detection with its 1-based position in the response.
#[derive(Debug, Serialize)]
pub struct NumberedDetection {
    /// Position in the batch, starting at 1.
    pub id: usize,
    /// The detection itself.
    #[serde(flatten)]
    pub detection: Detection,
}

fn numbered(detections: Vec<Detection>) -> Vec<NumberedDetection> {
    detections
        .into_iter()
        .enumerate()
        .map(|(i, detection)| NumberedDetection {
            id: i.saturating_add(1),
            detection,
        })
        .collect()
}

fn seconds(started: Instant) -> String {
    format!("{:.3}s", started.elapsed().as_secs_f64())
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// `GET /`
pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Safety Mirror API",
        "status": "active",
    }))
}

/// `GET /api/health`
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let detection_active = state.monitor.is_detection_active().await;
    let observers = state.monitor.registry().len().await;
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "model_loaded": true,
        "detection_active": detection_active,
        "observers": observers,
    }))
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// `POST /api/predict`
///
/// Runs the detector on the uploaded image and records the batch.
pub async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let started = Instant::now();
    let detections = numbered(state.monitor.submit_frame(&body).await);
    Json(serde_json::json!({
        "status": "success",
        "total_objects": detections.len(),
        "detections": detections,
        "processing_time": seconds(started),
        "image_size": body.len(),
        "model_version": state.model_version(),
    }))
}

/// `POST /api/detection/frame`
///
/// Live-feed variant of [`predict`]. The frame id is the arrival time in
/// Unix milliseconds.
pub async fn detection_frame(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let started = Instant::now();
    let frame_id = Utc::now().timestamp_millis();
    let detections = numbered(state.monitor.submit_frame(&body).await);
    Json(serde_json::json!({
        "status": "success",
        "detections": detections,
        "frame_id": frame_id,
        "processing_time": seconds(started),
    }))
}

/// `POST /api/detection/start`
pub async fn start_detection(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.monitor.start_detection().await;
    Json(serde_json::json!({
        "status": "success",
        "message": "Detection started",
    }))
}

/// `POST /api/detection/stop`
pub async fn stop_detection(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.monitor.stop_detection().await;
    Json(serde_json::json!({
        "status": "success",
        "message": "Detection stopped",
    }))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// `POST /api/resimulate`
///
/// Unsupported object classes are rejected with `400`.
pub async fn resimulate(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ResimulateBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let object_class = body
        .object_class
        .unwrap_or_else(|| DEFAULT_OBJECT_CLASS.as_str().to_owned());
    let result = state
        .monitor
        .request_generation(
            &object_class,
            body.num_samples.unwrap_or(DEFAULT_NUM_SAMPLES),
            body.variations,
        )
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Synthetic data generation completed",
        "result": result,
    })))
}

/// `POST /api/retrain`
///
/// The run is committed to the history and broadcast before this returns.
pub async fn retrain(
    State(state): State<Arc<AppState>>,
    body: Option<Json<RetrainBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let record = state.monitor.request_retrain(body.into()).await?;
    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Model retraining completed",
        "result": record,
    })))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// `GET /api/metrics`
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metrics = state.monitor.query_metrics().await;
    Json(serde_json::json!({
        "status": "success",
        "metrics": metrics,
        "timestamp": Utc::now(),
    }))
}

/// `GET /api/logs`
pub async fn logs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let logs = state.monitor.query_history().await;
    Json(serde_json::json!({
        "status": "success",
        "count": logs.len(),
        "logs": logs,
    }))
}
