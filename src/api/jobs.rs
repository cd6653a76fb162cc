//! Job API handlers.

use actix_web::{HttpResponse, delete, get, post, web};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{AcceptComparisonRequest, JobListResponse, LatestJobResponse};
use crate::services::{BaselineService, JobRunner};

/// Run a capture-and-compare job over all channels.
///
/// Per-link capture failures do not abort the run; they are embedded in the
/// returned job record.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/run",
    tag = "Jobs",
    responses(
        (status = 201, description = "Job executed and recorded", body = crate::models::JobDetailResponse),
    )
)]
#[post("/jobs/run")]
pub async fn run_job(runner: web::Data<JobRunner>) -> AppResult<HttpResponse> {
    let detail = runner.run_job().await?;
    Ok(HttpResponse::Created().json(detail))
}

/// List all recorded jobs, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "Jobs",
    responses(
        (status = 200, description = "Jobs", body = JobListResponse)
    )
)]
#[get("/jobs")]
pub async fn list_jobs(pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let jobs = pool.list_jobs().await?;
    Ok(HttpResponse::Ok().json(JobListResponse { jobs }))
}

/// Get the id of the most recent job.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/latest",
    tag = "Jobs",
    responses(
        (status = 200, description = "Most recent job, if any", body = LatestJobResponse)
    )
)]
#[get("/jobs/latest")]
pub async fn latest_job(pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let job = pool.latest_job().await?;
    Ok(HttpResponse::Ok().json(LatestJobResponse {
        job_id: job.as_ref().map(|j| j.id),
        run_at: job.map(|j| j.run_at),
    }))
}

/// Get a job's full platform → comparison tree.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job_id}",
    tag = "Jobs",
    params(
        ("job_id" = Uuid, Path, description = "Job UUID")
    ),
    responses(
        (status = 200, description = "Job detail", body = crate::models::JobDetailResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse),
    )
)]
#[get("/jobs/{job_id}")]
pub async fn get_job(pool: web::Data<DbPool>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let job_id = path.into_inner();
    let detail = pool
        .get_job_detail(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {}", job_id)))?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Discard a job run together with its diff artifacts.
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{job_id}",
    tag = "Jobs",
    params(
        ("job_id" = Uuid, Path, description = "Job UUID")
    ),
    responses(
        (status = 204, description = "Job deleted"),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse),
    )
)]
#[delete("/jobs/{job_id}")]
pub async fn delete_job(
    baselines: web::Data<BaselineService>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    baselines.delete_job(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Accept ("fix") a comparison: its test image becomes the new baseline and
/// the comparison is removed from the job record.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{job_id}/accept",
    tag = "Jobs",
    params(
        ("job_id" = Uuid, Path, description = "Job UUID")
    ),
    request_body = AcceptComparisonRequest,
    responses(
        (status = 200, description = "Baseline promoted", body = crate::models::AcceptComparisonResponse),
        (status = 404, description = "Job, platform, or comparison not found", body = crate::error::ErrorResponse),
    )
)]
#[post("/jobs/{job_id}/accept")]
pub async fn accept_comparison(
    baselines: web::Data<BaselineService>,
    path: web::Path<Uuid>,
    body: web::Json<AcceptComparisonRequest>,
) -> AppResult<HttpResponse> {
    let response = baselines
        .accept(path.into_inner(), &body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Configure job routes.
///
/// `/jobs/latest` must register before `/jobs/{job_id}`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(run_job)
        .service(list_jobs)
        .service(latest_job)
        .service(get_job)
        .service(delete_job)
        .service(accept_comparison);
}
