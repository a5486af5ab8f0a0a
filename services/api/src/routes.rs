use crate::infra::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use greenscore::rubric::InputSchema;
use greenscore::{AppError, BuildingRecord, EvaluationResult, ScoringEngine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct BatchRequest {
    pub(crate) records: Vec<BuildingRecord>,
    #[serde(default)]
    pub(crate) named: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchResponse {
    pub(crate) results: Vec<EvaluationResult>,
}

pub(crate) fn with_evaluation_routes(engine: Arc<ScoringEngine>) -> Router {
    Router::new()
        .route("/api/v1/standard/schema", get(schema_endpoint))
        .route("/api/v1/evaluations", post(evaluation_endpoint))
        .route("/api/v1/evaluations/named", post(named_evaluation_endpoint))
        .route("/api/v1/evaluations/batch", post(batch_evaluation_endpoint))
        .with_state(engine)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn schema_endpoint(State(engine): State<Arc<ScoringEngine>>) -> Json<InputSchema> {
    Json(engine.schema())
}

pub(crate) async fn evaluation_endpoint(
    State(engine): State<Arc<ScoringEngine>>,
    Json(record): Json<BuildingRecord>,
) -> Result<Json<EvaluationResult>, AppError> {
    Ok(Json(engine.evaluate(&record)?))
}

pub(crate) async fn named_evaluation_endpoint(
    State(engine): State<Arc<ScoringEngine>>,
    Json(answers): Json<BuildingRecord>,
) -> Result<Json<EvaluationResult>, AppError> {
    Ok(Json(engine.evaluate_named(&answers)?))
}

pub(crate) async fn batch_evaluation_endpoint(
    State(engine): State<Arc<ScoringEngine>>,
    Json(payload): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    let BatchRequest { records, named } = payload;
    info!(records = records.len(), named, "batch evaluation requested");

    let records = if named {
        records
            .iter()
            .map(|answers| engine.index().translate_named_record(answers))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        records
    };

    let results = engine
        .evaluate_batch(&records)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(BatchResponse { results }))
}
