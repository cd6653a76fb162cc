//! Database queries for jobs and their comparison trees.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entity::image_comparison::{self, Entity as ImageComparison};
use crate::entity::job::{self, ActiveModel, Entity as Job};
use crate::error::{AppError, AppResult};
use crate::models::{
    CaptureFailure, DiffArtifact, ImageComparisonView, JobDetailResponse, JobSummary,
    PlatformResultView,
};

use super::DbPool;

/// A comparison produced by a job run, before persistence.
#[derive(Debug, Clone)]
pub struct NewComparison {
    pub channel_name: String,
    pub image_name: String,
    pub reference_location: String,
    pub test_location: String,
    pub diff: DiffArtifact,
}

impl DbPool {
    /// Persist a completed run: the job row plus all its comparison rows,
    /// committed as one unit.
    pub async fn insert_job(
        &self,
        id: Uuid,
        run_at: DateTime<Utc>,
        comparisons: &[NewComparison],
        failures: &[CaptureFailure],
    ) -> AppResult<job::Model> {
        let now = Utc::now();

        let failures_json = if failures.is_empty() {
            None
        } else {
            Some(serde_json::to_value(failures)?)
        };

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let model = ActiveModel {
            id: Set(id),
            run_at: Set(run_at),
            failures: Set(failures_json),
            created_at: Set(now),
        };

        let inserted = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert job: {}", e)))?;

        for comparison in comparisons {
            let row = image_comparison::ActiveModel {
                id: Set(Uuid::new_v4()),
                job_id: Set(id),
                channel_name: Set(comparison.channel_name.clone()),
                image_name: Set(comparison.image_name.clone()),
                reference_location: Set(comparison.reference_location.clone()),
                test_location: Set(comparison.test_location.clone()),
                diff_location: Set(comparison.diff.as_location_str().to_string()),
                created_at: Set(now),
            };

            row.insert(&txn)
                .await
                .map_err(|e| AppError::Database(format!("Failed to insert comparison: {}", e)))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;

        Ok(inserted)
    }

    /// Get a job row by id.
    pub async fn get_job(&self, id: Uuid) -> AppResult<Option<job::Model>> {
        let result = Job::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get job: {}", e)))?;

        Ok(result)
    }

    /// Get the most recent job, by run timestamp.
    pub async fn latest_job(&self) -> AppResult<Option<job::Model>> {
        let result = Job::find()
            .order_by_desc(job::Column::RunAt)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get latest job: {}", e)))?;

        Ok(result)
    }

    /// List all jobs, newest first, with comparison/failure counts.
    pub async fn list_jobs(&self) -> AppResult<Vec<JobSummary>> {
        let jobs = Job::find()
            .order_by_desc(job::Column::RunAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list jobs: {}", e)))?;

        let mut summaries = Vec::with_capacity(jobs.len());
        for job in jobs {
            let comparison_count = ImageComparison::find()
                .filter(image_comparison::Column::JobId.eq(job.id))
                .count(self.connection())
                .await
                .map_err(|e| AppError::Database(format!("Failed to count comparisons: {}", e)))?;

            summaries.push(JobSummary {
                id: job.id,
                run_at: job.run_at,
                comparison_count,
                failure_count: parse_failures(job.failures.as_ref()).len() as u64,
            });
        }

        Ok(summaries)
    }

    /// Load a job's comparison rows in insertion order.
    pub async fn get_job_comparisons(
        &self,
        job_id: Uuid,
    ) -> AppResult<Vec<image_comparison::Model>> {
        let result = ImageComparison::find()
            .filter(image_comparison::Column::JobId.eq(job_id))
            .order_by_asc(image_comparison::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to load comparisons: {}", e)))?;

        Ok(result)
    }

    /// Assemble the full platform → comparison tree for a job.
    pub async fn get_job_detail(&self, job_id: Uuid) -> AppResult<Option<JobDetailResponse>> {
        let Some(job) = self.get_job(job_id).await? else {
            return Ok(None);
        };

        let comparisons = self.get_job_comparisons(job_id).await?;
        let total_comparisons = comparisons.len() as u64;

        // Group by channel, preserving first-seen order.
        let mut platforms: Vec<PlatformResultView> = Vec::new();
        for comparison in comparisons {
            let view = ImageComparisonView::from(comparison.clone());
            match platforms
                .iter_mut()
                .find(|p| p.platform_name == comparison.channel_name)
            {
                Some(platform) => platform.images.push(view),
                None => platforms.push(PlatformResultView {
                    platform_name: comparison.channel_name.clone(),
                    images: vec![view],
                }),
            }
        }

        Ok(Some(JobDetailResponse {
            id: job.id,
            run_at: job.run_at,
            platforms,
            failures: parse_failures(job.failures.as_ref()),
            total_comparisons,
        }))
    }

    /// Delete a job row; its comparisons cascade away.
    pub async fn delete_job_row(&self, id: Uuid) -> AppResult<()> {
        Job::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete job: {}", e)))?;

        Ok(())
    }
}

fn parse_failures(value: Option<&serde_json::Value>) -> Vec<CaptureFailure> {
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}
