//! Reference lifecycle management.
//!
//! Establishing baselines when links are added, promoting accepted test
//! images to become the new baseline ("fixed"), and cascade deletion of
//! baselines when channels, links, or job runs are removed.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    AcceptComparisonRequest, AcceptComparisonResponse, AddLinkRequest, AddLinkResponse,
    DiffArtifact, LinkSummary, canonicalize_url, normalize_channel_name,
};
use crate::services::capture::{CaptureRequest, CaptureService};
use crate::services::runner::viewport_label;
use crate::services::storage::{PNG_CONTENT_TYPE, Storage};

/// Manages baselines and their cascade lifecycle.
#[derive(Clone)]
pub struct BaselineService {
    pool: DbPool,
    storage: Storage,
    capture: Arc<CaptureService>,
}

impl BaselineService {
    pub fn new(pool: DbPool, storage: Storage, capture: Arc<CaptureService>) -> Self {
        BaselineService {
            pool,
            storage,
            capture,
        }
    }

    /// Add a link to a channel and establish its baseline.
    ///
    /// The capture runs before anything is persisted: a failed capture
    /// leaves neither a link row nor a reference behind.
    pub async fn establish_baseline(
        &self,
        channel_name: &str,
        request: &AddLinkRequest,
    ) -> AppResult<AddLinkResponse> {
        request.validate()?;

        let name = normalize_channel_name(channel_name);
        let channel = self
            .pool
            .find_channel_by_name(&name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Channel {}", name)))?;

        let url = canonicalize_url(&name, &request.url)?;

        if self.pool.find_link(channel.id, &url).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "URL already exists for channel {}",
                name
            )));
        }

        let capture_request = CaptureRequest {
            channel: name.clone(),
            url: url.clone(),
            selector: channel.selector.clone(),
            bypass_script: channel.bypass_script.clone(),
        };
        let captured = self.capture.capture(&capture_request).await?;

        let link_id = Uuid::new_v4();
        let key = Storage::reference_key(&name, link_id);
        self.storage
            .put(&key, captured, Some(PNG_CONTENT_TYPE))
            .await?;

        let (link, reference) = self
            .pool
            .insert_link_with_reference(
                channel.id,
                link_id,
                &name,
                &url,
                request.scenario.trim(),
                &key,
                &viewport_label(),
            )
            .await?;

        info!(channel = %name, url = %url, "link added, baseline established");

        Ok(AddLinkResponse {
            link: LinkSummary {
                id: link.id,
                url: link.url,
                scenario: link.scenario,
                baseline_location: Some(reference.image_location.clone()),
                test_location: link.test_location,
            },
            reference: reference.into(),
        })
    }

    /// Accept a comparison from a job: the test image becomes the new
    /// baseline and the comparison leaves the job record.
    ///
    /// Idempotent on the baseline: once a comparison has been accepted, a
    /// second call finds no comparison row and reports NotFound without
    /// touching anything.
    pub async fn accept(
        &self,
        job_id: Uuid,
        request: &AcceptComparisonRequest,
    ) -> AppResult<AcceptComparisonResponse> {
        if request.url.trim().is_empty() {
            return Err(AppError::Validation("URL is required".to_string()));
        }

        let name = normalize_channel_name(&request.channel);
        let reference = self
            .pool
            .find_reference(&name, &request.url)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Reference for {} {}", name, request.url))
            })?;

        let updated = self.pool.promote_reference(job_id, &reference).await?;

        info!(
            channel = %name,
            url = %request.url,
            job_id = %job_id,
            "comparison accepted, baseline promoted"
        );

        Ok(AcceptComparisonResponse {
            reference: updated.into(),
        })
    }

    /// Delete one link and its baseline, including the stored artifacts.
    pub async fn delete_link(&self, channel_name: &str, url: &str) -> AppResult<()> {
        let name = normalize_channel_name(channel_name);
        let channel = self
            .pool
            .find_channel_by_name(&name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Channel {}", name)))?;

        let url = canonicalize_url(&name, url)?;
        let link = self
            .pool
            .find_link(channel.id, &url)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Link {}", url)))?;

        self.pool.delete_link_row(link.id).await?;

        if let Some(reference) = self.pool.find_reference(&name, &url).await? {
            self.pool.delete_reference_row(reference.id).await?;
            self.delete_blob(&reference.image_location).await;
        }
        if let Some(ref test_location) = link.test_location {
            self.delete_blob(test_location).await;
        }

        info!(channel = %name, url = %url, "link deleted");

        Ok(())
    }

    /// Delete a channel, all of its links, their baselines, and the stored
    /// artifacts.
    pub async fn delete_channel(&self, channel_name: &str) -> AppResult<()> {
        let name = normalize_channel_name(channel_name);
        let channel = self
            .pool
            .find_channel_by_name(&name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Channel {}", name)))?;

        let links = self.pool.list_links(channel.id).await?;
        let references = self.pool.list_references(&name).await?;

        // Link rows cascade with the channel row.
        self.pool.delete_channel_row(channel.id).await?;

        for reference in references {
            self.pool.delete_reference_row(reference.id).await?;
            self.delete_blob(&reference.image_location).await;
        }
        for link in links {
            if let Some(ref test_location) = link.test_location {
                self.delete_blob(test_location).await;
            }
        }

        info!(channel = %name, "channel deleted");

        Ok(())
    }

    /// Discard a job run and its diff artifacts.
    pub async fn delete_job(&self, job_id: Uuid) -> AppResult<()> {
        self.pool
            .get_job(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {}", job_id)))?;

        let comparisons = self.pool.get_job_comparisons(job_id).await?;
        self.pool.delete_job_row(job_id).await?;

        for comparison in comparisons {
            if let DiffArtifact::Location(key) =
                DiffArtifact::from_location(&comparison.diff_location)
            {
                self.delete_blob(&key).await;
            }
        }

        info!(job_id = %job_id, "job deleted");

        Ok(())
    }

    /// Best-effort blob deletion: rows are already gone, a stale object in
    /// the bucket must not fail the request.
    async fn delete_blob(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            warn!(key = %key, "failed to delete stored image: {}", e);
        }
    }
}
