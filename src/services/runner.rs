//! Job orchestrator.
//!
//! Runs one visual-regression pass over every channel: captures each link,
//! establishes missing baselines, diffs the rest, and persists the job
//! record. A failing capture for one link never aborts the run; it lands in
//! the job's failure list instead.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use crate::db::DbPool;
use crate::db::jobs::NewComparison;
use crate::entity::{channel, link};
use crate::error::{AppError, AppResult};
use crate::models::{CaptureFailure, DiffArtifact, FailureKind, JobDetailResponse};
use crate::services::capture::{CaptureRequest, CaptureService};
use crate::services::diff::{self, DiffOutcome};
use crate::services::storage::{PNG_CONTENT_TYPE, Storage};

/// Orchestrates capture-and-compare runs.
#[derive(Clone)]
pub struct JobRunner {
    pool: DbPool,
    storage: Storage,
    capture: Arc<CaptureService>,
    diff_threshold: f64,
}

impl JobRunner {
    pub fn new(
        pool: DbPool,
        storage: Storage,
        capture: Arc<CaptureService>,
        diff_threshold: f64,
    ) -> Self {
        JobRunner {
            pool,
            storage,
            capture,
            diff_threshold,
        }
    }

    /// Run a job over all channels and persist the result.
    ///
    /// Only failing comparisons are recorded: an empty platform means every
    /// scenario matched its baseline, not "not tested".
    pub async fn run_job(&self) -> AppResult<JobDetailResponse> {
        let channels = self.pool.list_channels().await?;
        let job_id = Uuid::now_v7();
        let run_at = Utc::now();

        info!(job_id = %job_id, channels = channels.len(), "starting job run");

        // Channels run concurrently, bounded by the capture page pool.
        let channel_runs = channels
            .iter()
            .map(|channel| self.run_channel(job_id, channel));
        let outcomes = join_all(channel_runs).await;

        let mut comparisons = Vec::new();
        let mut failures = Vec::new();
        for (mut channel_comparisons, mut channel_failures) in outcomes {
            comparisons.append(&mut channel_comparisons);
            failures.append(&mut channel_failures);
        }

        self.pool
            .insert_job(job_id, run_at, &comparisons, &failures)
            .await?;

        info!(
            job_id = %job_id,
            comparisons = comparisons.len(),
            failures = failures.len(),
            "job run complete"
        );

        self.pool
            .get_job_detail(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {}", job_id)))
    }

    /// Capture and compare all links of one channel, collecting failures.
    async fn run_channel(
        &self,
        job_id: Uuid,
        channel: &channel::Model,
    ) -> (Vec<NewComparison>, Vec<CaptureFailure>) {
        let links = match self.pool.list_links(channel.id).await {
            Ok(links) => links,
            Err(e) => {
                warn!(channel = %channel.name, "failed to load links: {}", e);
                return (
                    Vec::new(),
                    vec![CaptureFailure {
                        channel: channel.name.clone(),
                        url: String::new(),
                        kind: failure_kind(&e),
                        detail: e.to_string(),
                    }],
                );
            }
        };

        let mut comparisons = Vec::new();
        let mut failures = Vec::new();

        for link in &links {
            match self.run_link(job_id, channel, link).await {
                Ok(Some(comparison)) => comparisons.push(comparison),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        channel = %channel.name,
                        url = %link.url,
                        "capture failed during job run: {}", e
                    );
                    failures.push(CaptureFailure {
                        channel: channel.name.clone(),
                        url: link.url.clone(),
                        kind: failure_kind(&e),
                        detail: e.to_string(),
                    });
                }
            }
        }

        (comparisons, failures)
    }

    /// Capture one link and compare it against its baseline, if any.
    async fn run_link(
        &self,
        job_id: Uuid,
        channel: &channel::Model,
        link: &link::Model,
    ) -> AppResult<Option<NewComparison>> {
        let request = CaptureRequest {
            channel: channel.name.clone(),
            url: link.url.clone(),
            selector: channel.selector.clone(),
            bypass_script: channel.bypass_script.clone(),
        };

        let captured = self.capture.capture(&request).await?;

        let Some(reference) = self.pool.find_reference(&channel.name, &link.url).await? else {
            // First run for this link: the capture becomes the baseline.
            let key = Storage::reference_key(&channel.name, link.id);
            self.storage
                .put(&key, captured, Some(PNG_CONTENT_TYPE))
                .await?;
            self.pool
                .insert_reference(&channel.name, &link.url, &key, &viewport_label())
                .await?;
            info!(channel = %channel.name, url = %link.url, "baseline established");
            return Ok(None);
        };

        let test_key = Storage::test_key(&channel.name, link.id);
        self.storage
            .put(&test_key, captured.clone(), Some(PNG_CONTENT_TYPE))
            .await?;
        self.pool.set_link_test_location(link.id, &test_key).await?;

        let (baseline_bytes, _) = self.storage.get(&reference.image_location).await?;
        let baseline = image::load_from_memory(&baseline_bytes)?.to_rgba8();
        let test = image::load_from_memory(&captured)?.to_rgba8();

        match diff::compare(&baseline, &test, self.diff_threshold) {
            DiffOutcome::Match => Ok(None),
            DiffOutcome::Diff {
                pixel_count,
                artifact,
            } => {
                let diff_key = Storage::diff_key(job_id, &channel.name, link.id);
                let diff_png = diff::encode_png(&artifact)?;
                self.storage
                    .put(&diff_key, diff_png, Some(PNG_CONTENT_TYPE))
                    .await?;

                info!(
                    channel = %channel.name,
                    url = %link.url,
                    pixel_count,
                    "pixel differences detected"
                );

                Ok(Some(NewComparison {
                    channel_name: channel.name.clone(),
                    image_name: link.scenario.clone(),
                    reference_location: reference.image_location,
                    test_location: test_key,
                    diff: DiffArtifact::Location(diff_key),
                }))
            }
            DiffOutcome::SizeMismatch { reference: a, test: b } => {
                warn!(
                    channel = %channel.name,
                    url = %link.url,
                    "dimensions changed: baseline {}x{}, test {}x{}",
                    a.0, a.1, b.0, b.1
                );

                Ok(Some(NewComparison {
                    channel_name: channel.name.clone(),
                    image_name: link.scenario.clone(),
                    reference_location: reference.image_location,
                    test_location: test_key,
                    diff: DiffArtifact::SizeMismatch,
                }))
            }
        }
    }
}

/// The viewport string stored on references, e.g. "1920x1080".
pub fn viewport_label() -> String {
    format!("{}x{}", VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
}

fn failure_kind(err: &AppError) -> FailureKind {
    match err {
        AppError::Capture(e) => e.into(),
        AppError::Storage(_) => FailureKind::Storage,
        _ => FailureKind::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::capture::CaptureError;

    #[test]
    fn test_viewport_label() {
        assert_eq!(viewport_label(), "1920x1080");
    }

    #[test]
    fn test_failure_kind_mapping() {
        let capture = AppError::Capture(CaptureError::BypassScript("boom".to_string()));
        assert_eq!(failure_kind(&capture), FailureKind::BypassScript);

        let storage = AppError::Storage("s3 down".to_string());
        assert_eq!(failure_kind(&storage), FailureKind::Storage);

        let database = AppError::Database("connection reset".to_string());
        assert_eq!(failure_kind(&database), FailureKind::Internal);
    }
}
