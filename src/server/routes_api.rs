use crate::drive::discover_optical_devices;
use crate::server::AppContext;
use crate::state::{CancelOutcome, Job};
use crate::storage::{pool_members, PoolDisk};
use crate::workflow::{self, RipJob};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use ripforge_av::check_tools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/status", get(status))
        .route("/stats", get(stats))
        .route("/devices", get(devices))
        .route("/rip", post(submit_rip))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/cancel", post(cancel_job))
        .route("/queue", get(get_queue))
        .route("/history", get(get_history))
        .route("/storage", get(storage))
        .route("/tools", get(get_tools))
}

async fn status(State(ctx): State<AppContext>) -> impl IntoResponse {
    let running = ctx
        .state
        .get_active_jobs()
        .into_iter()
        .filter(|j| j.status == crate::state::JobStatus::Running)
        .count();

    Json(serde_json::json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "storage_path": ctx.config.storage.path,
        "default_device": ctx.config.drive.default_device,
        "available_devices": discover_optical_devices(),
        "queue_depth": ctx.state.get_queue().len(),
        "running_jobs": running,
    }))
}

async fn stats(State(ctx): State<AppContext>) -> impl IntoResponse {
    let stats = ctx.state.get_stats();
    Json(serde_json::json!({
        "total_processed": stats.total_processed,
        "successful": stats.successful,
        "failed": stats.failed,
        "cancelled": stats.cancelled,
        "success_rate": stats.success_rate(),
    }))
}

async fn devices() -> impl IntoResponse {
    Json(serde_json::json!({ "devices": discover_optical_devices() }))
}

/// Movie: `{device, category, movie}`. TV: `{device, show, season_disc}`.
#[derive(Deserialize)]
struct RipRequest {
    device: Option<String>,
    category: Option<String>,
    movie: Option<String>,
    show: Option<String>,
    season_disc: Option<String>,
}

#[derive(Serialize)]
struct RipResponse {
    status: &'static str,
    job_id: Uuid,
    device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    movie: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    show: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn submit_rip(
    State(ctx): State<AppContext>,
    Json(req): Json<RipRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let device = non_empty(&req.device).ok_or((
        StatusCode::BAD_REQUEST,
        "Missing required field: device".to_string(),
    ))?;

    let job = match non_empty(&req.show) {
        Some(show) => {
            let season_disc = non_empty(&req.season_disc).ok_or((
                StatusCode::BAD_REQUEST,
                "Missing required field: season_disc".to_string(),
            ))?;
            RipJob::tv(device, show, season_disc)
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
        }
        None => match (non_empty(&req.category), non_empty(&req.movie)) {
            (Some(category), Some(movie)) => {
                let category = workflow::validate_category(category)
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
                RipJob::movie(device, category, movie)
            }
            _ => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    "Missing required fields: device, category, movie".to_string(),
                ))
            }
        },
    };

    let queued = ctx.state.queue_job(job);
    tracing::info!("Rip submitted for {}: job {}", device, queued.id);

    Ok((
        StatusCode::ACCEPTED,
        Json(RipResponse {
            status: "rip started",
            job_id: queued.id,
            device: device.to_string(),
            movie: non_empty(&req.movie)
                .filter(|_| req.show.is_none())
                .map(str::to_string),
            show: non_empty(&req.show).map(str::to_string),
        }),
    ))
}

#[derive(Deserialize)]
struct ListJobsQuery {
    status: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn list_jobs(
    State(ctx): State<AppContext>,
    Query(params): Query<ListJobsQuery>,
) -> impl IntoResponse {
    let mut jobs = ctx.state.get_active_jobs();

    if let Some(status) = params.status {
        jobs.retain(|j| format!("{:?}", j.status).to_lowercase() == status.to_lowercase());
    }

    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);
    let jobs: Vec<_> = jobs.into_iter().skip(offset).take(limit).collect();

    Json(jobs)
}

async fn get_job(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, StatusCode> {
    ctx.state.get_job(id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn cancel_job(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match ctx.state.cancel_job(id) {
        Some(outcome) => {
            let status = match outcome {
                CancelOutcome::Cancelled => StatusCode::OK,
                CancelOutcome::Requested => StatusCode::ACCEPTED,
            };
            Ok((
                status,
                Json(serde_json::json!({ "job_id": id, "outcome": outcome })),
            ))
        }
        None if ctx.state.get_job(id).is_some() => Err((
            StatusCode::CONFLICT,
            format!("Job {} has already finished", id),
        )),
        None => Err((StatusCode::NOT_FOUND, format!("Job {} not found", id))),
    }
}

async fn get_queue(State(ctx): State<AppContext>) -> impl IntoResponse {
    let jobs: Vec<_> = ctx
        .state
        .get_queue()
        .into_iter()
        .filter_map(|id| ctx.state.get_job(id))
        .collect();
    Json(jobs)
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn get_history(
    State(ctx): State<AppContext>,
    Query(params): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(100);
    Json(ctx.state.get_history(limit))
}

#[derive(Serialize)]
struct StorageResponse {
    path: String,
    pool_enabled: bool,
    min_free_bytes: u64,
    disks: Vec<PoolDisk>,
    unavailable: Vec<String>,
}

/// Free space of each pool member, or of the storage root without a pool.
async fn storage(State(ctx): State<AppContext>) -> impl IntoResponse {
    let storage = &ctx.config.storage;

    let candidates = if storage.pool.enabled {
        pool_members(&storage.pool.fstab, &storage.path, &storage.pool.fs_type)
    } else {
        vec![storage.path.clone()]
    };

    let mut disks = Vec::new();
    let mut unavailable = Vec::new();
    for path in candidates {
        match ctx.space.available_bytes(&path) {
            Ok(available_bytes) => disks.push(PoolDisk {
                mount_path: path,
                available_bytes,
            }),
            Err(e) => {
                tracing::debug!("Could not stat {:?}: {}", path, e);
                unavailable.push(path.display().to_string());
            }
        }
    }

    Json(StorageResponse {
        path: storage.path.display().to_string(),
        pool_enabled: storage.pool.enabled,
        min_free_bytes: storage.pool.min_free_bytes,
        disks,
        unavailable,
    })
}

async fn get_tools(State(ctx): State<AppContext>) -> impl IntoResponse {
    let config = ctx.config.clone();
    let tools = tokio::task::spawn_blocking(move || {
        check_tools(|name| config.tools.program_for(name))
    })
    .await
    .unwrap_or_default();
    Json(tools)
}
