//! HTTP trigger surface.
//!
//! Load routes schedule a generate run and answer `202 Accepted` right away;
//! the run's outcome is kept by the [`JobTracker`] under the returned job id.

use crate::jobs::JobTracker;
use crate::orchestrator::{LoadOrchestrator, OrchestratorError};
use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use loadtest_distributed::{FanoutCoordinator, WorkCount};
use loadtest_pipeline::{PrometheusSink, MEMORY_BACKEND};
use loadtest_pipeline_fjall::FJALL_BACKEND;
use loadtest_pipeline_redis::REDIS_BACKEND;
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Trace count used when a request carries none (or zero).
pub const DEFAULT_TRACE_COUNT: u64 = 2;

pub const REDIS_LOAD_PATH: &str = "/gen-redis-load";
pub const FJALL_LOAD_PATH: &str = "/gen-badger-load";
pub const MEMORY_LOAD_PATH: &str = "/gen-memory-load";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<LoadOrchestrator>,
    pub jobs: Arc<JobTracker>,
    pub fanout: Arc<FanoutCoordinator>,
    pub metrics: Arc<PrometheusSink>,
    pub spans_per_trace: u64,
    pub compaction_levels: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route(REDIS_LOAD_PATH, get(gen_redis_load))
        .route(FJALL_LOAD_PATH, get(gen_fjall_load))
        .route(MEMORY_LOAD_PATH, get(gen_memory_load))
        .route("/gen-redis-load-all", get(gen_redis_load_all))
        .route("/gen-badger-load-all", get(gen_fjall_load_all))
        .route("/gen-memory-load-all", get(gen_memory_load_all))
        .route("/get-badger-data", get(get_fjall_data))
        .route("/get-badger-random-data", get(get_fjall_random_data))
        .route("/get-badger-total-count", get(get_fjall_total_count))
        .route("/badger-start-compaction", get(start_fjall_compaction))
        .route("/badger-start-gc", get(start_fjall_gc))
        .route("/jobs/{id}", get(job_status))
        .with_state(state)
}

/// Serve `state` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!(%addr, "Trigger surface listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("HTTP server failed")?;

    info!("Trigger surface stopped");
    Ok(())
}

/// Counts are parsed leniently: anything unparsable counts as absent.
fn parse_count(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse().ok())
}

#[derive(Deserialize)]
struct LoadParams {
    #[serde(rename = "traceCount")]
    trace_count: Option<String>,
}

impl LoadParams {
    fn trace_count(&self) -> u64 {
        parse_count(self.trace_count.as_deref())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_TRACE_COUNT)
    }
}

#[derive(Deserialize)]
struct FanoutParams {
    #[serde(rename = "traceCountPerPod")]
    trace_count_per_pod: Option<String>,
    #[serde(rename = "traceCount")]
    trace_count: Option<String>,
}

#[derive(Deserialize)]
struct KeyParams {
    id: Option<String>,
}

fn error_response(e: OrchestratorError) -> Response {
    let status = match &e {
        OrchestratorError::UnknownBackend(_) => StatusCode::NOT_FOUND,
        OrchestratorError::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
        OrchestratorError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {e}");
    }
    (status, e.to_string()).into_response()
}

fn not_enabled(backend: &str) -> Response {
    error_response(OrchestratorError::UnknownBackend(backend.to_string()))
}

async fn healthz() -> &'static str {
    "pong"
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn schedule_generate(state: &AppState, backend: &'static str, params: &LoadParams) -> Response {
    if !state.orchestrator.has_backend(backend) {
        return not_enabled(backend);
    }
    let trace_count = params.trace_count();
    let spans_per_trace = state.spans_per_trace;
    let orchestrator = state.orchestrator.clone();

    let job = state.jobs.spawn("generate", backend, async move {
        orchestrator
            .generate(backend, trace_count, spans_per_trace)
            .await
    });
    info!(%job, backend, trace_count, "Scheduled generate run");

    (
        StatusCode::ACCEPTED,
        format!("accepted: {trace_count} traces for {backend}, job {job}"),
    )
        .into_response()
}

async fn gen_redis_load(State(state): State<AppState>, Query(params): Query<LoadParams>) -> Response {
    schedule_generate(&state, REDIS_BACKEND, &params)
}

async fn gen_fjall_load(State(state): State<AppState>, Query(params): Query<LoadParams>) -> Response {
    schedule_generate(&state, FJALL_BACKEND, &params)
}

async fn gen_memory_load(
    State(state): State<AppState>,
    Query(params): Query<LoadParams>,
) -> Response {
    schedule_generate(&state, MEMORY_BACKEND, &params)
}

async fn fan_out(state: &AppState, target_path: &str, params: &FanoutParams) -> Response {
    let count = WorkCount::from_params(
        parse_count(params.trace_count_per_pod.as_deref()),
        parse_count(params.trace_count.as_deref()),
    );
    let report = state.fanout.distribute(count, target_path).await;
    (StatusCode::ACCEPTED, report.to_string()).into_response()
}

async fn gen_redis_load_all(
    State(state): State<AppState>,
    Query(params): Query<FanoutParams>,
) -> Response {
    fan_out(&state, REDIS_LOAD_PATH, &params).await
}

async fn gen_fjall_load_all(
    State(state): State<AppState>,
    Query(params): Query<FanoutParams>,
) -> Response {
    fan_out(&state, FJALL_LOAD_PATH, &params).await
}

async fn gen_memory_load_all(
    State(state): State<AppState>,
    Query(params): Query<FanoutParams>,
) -> Response {
    fan_out(&state, MEMORY_LOAD_PATH, &params).await
}

async fn get_fjall_data(State(state): State<AppState>, Query(params): Query<KeyParams>) -> Response {
    let Some(key) = params.id.filter(|id| !id.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing id parameter").into_response();
    };
    match state.orchestrator.get_by_key(FJALL_BACKEND, &key).await {
        Ok(Some(value)) => String::from_utf8_lossy(&value).into_owned().into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, format!("key {key} not found")).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_fjall_random_data(State(state): State<AppState>) -> Response {
    match state.orchestrator.get_any_entry(FJALL_BACKEND).await {
        Ok(Some((key, value))) => {
            format!("Key: {key}, Value: {}", String::from_utf8_lossy(&value)).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "no entries").into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_fjall_total_count(State(state): State<AppState>) -> Response {
    match state.orchestrator.count_entries(FJALL_BACKEND).await {
        Ok(count) => format!("Count: {count}").into_response(),
        Err(e) => error_response(e),
    }
}

async fn start_fjall_compaction(State(state): State<AppState>) -> Response {
    if !state.orchestrator.has_backend(FJALL_BACKEND) {
        return not_enabled(FJALL_BACKEND);
    }
    let orchestrator = state.orchestrator.clone();
    let levels = state.compaction_levels;

    let job = state.jobs.spawn("compaction", FJALL_BACKEND, async move {
        orchestrator
            .trigger_compaction(FJALL_BACKEND, levels)
            .await
            .map(|report| {
                serde_json::json!({
                    "passes": report.passes,
                    "disk_space_before": report.disk_space_before,
                    "disk_space_after": report.disk_space_after,
                })
            })
    });
    (StatusCode::ACCEPTED, format!("Started Compaction, job {job}")).into_response()
}

async fn start_fjall_gc(State(state): State<AppState>) -> Response {
    if !state.orchestrator.has_backend(FJALL_BACKEND) {
        return not_enabled(FJALL_BACKEND);
    }
    let orchestrator = state.orchestrator.clone();

    let job = state.jobs.spawn("gc", FJALL_BACKEND, async move {
        orchestrator
            .run_garbage_collection(FJALL_BACKEND)
            .await
            .map(|report| {
                serde_json::json!({
                    "expired_removed": report.expired_removed,
                    "bytes_reclaimed": report.bytes_reclaimed,
                })
            })
    });
    (StatusCode::ACCEPTED, format!("Started GC, job {job}")).into_response()
}

async fn job_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<Uuid>() else {
        return (StatusCode::BAD_REQUEST, format!("invalid job id {id}")).into_response();
    };
    match state.jobs.get(&id) {
        Some(record) => Json(record).into_response(),
        None => (StatusCode::NOT_FOUND, format!("job {id} not found")).into_response(),
    }
}
