//! Database queries for screenshot references (baselines).

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::image_comparison::{self, Entity as ImageComparison};
use crate::entity::job::Entity as Job;
use crate::entity::link;
use crate::entity::screenshot_reference::{self, Entity as ScreenshotReference};
use crate::error::{AppError, AppResult};

use super::DbPool;

impl DbPool {
    /// Find the live baseline for a (channel, scenario URL) pair.
    pub async fn find_reference(
        &self,
        channel_name: &str,
        url: &str,
    ) -> AppResult<Option<screenshot_reference::Model>> {
        let result = ScreenshotReference::find()
            .filter(screenshot_reference::Column::ChannelName.eq(channel_name))
            .filter(screenshot_reference::Column::Url.eq(url))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to find reference: {}", e)))?;

        Ok(result)
    }

    /// List all baselines belonging to a channel.
    pub async fn list_references(
        &self,
        channel_name: &str,
    ) -> AppResult<Vec<screenshot_reference::Model>> {
        let result = ScreenshotReference::find()
            .filter(screenshot_reference::Column::ChannelName.eq(channel_name))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list references: {}", e)))?;

        Ok(result)
    }

    /// Insert a baseline captured during a job run (first-run path).
    pub async fn insert_reference(
        &self,
        channel_name: &str,
        url: &str,
        image_location: &str,
        viewport: &str,
    ) -> AppResult<screenshot_reference::Model> {
        let now = Utc::now();

        let model = screenshot_reference::ActiveModel {
            id: Set(Uuid::new_v4()),
            channel_name: Set(channel_name.to_string()),
            url: Set(url.to_string()),
            image_location: Set(image_location.to_string()),
            viewport: Set(viewport.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert reference: {}", e)))?;

        Ok(result)
    }

    /// Create a link together with its freshly captured baseline.
    ///
    /// Both rows commit atomically: a failure inserting either leaves no
    /// half-created link behind.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_link_with_reference(
        &self,
        channel_id: Uuid,
        link_id: Uuid,
        channel_name: &str,
        url: &str,
        scenario: &str,
        image_location: &str,
        viewport: &str,
    ) -> AppResult<(link::Model, screenshot_reference::Model)> {
        let now = Utc::now();

        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let link_model = link::ActiveModel {
            id: Set(link_id),
            channel_id: Set(channel_id),
            url: Set(url.to_string()),
            scenario: Set(scenario.to_string()),
            test_location: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted_link = link_model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert link: {}", e)))?;

        let reference_model = screenshot_reference::ActiveModel {
            id: Set(Uuid::new_v4()),
            channel_name: Set(channel_name.to_string()),
            url: Set(url.to_string()),
            image_location: Set(image_location.to_string()),
            viewport: Set(viewport.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted_reference = reference_model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert reference: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;

        Ok((inserted_link, inserted_reference))
    }

    /// Accept a comparison: repoint the baseline at the comparison's test
    /// image and remove the comparison from the job record.
    ///
    /// Both writes happen in one transaction, baseline first, so a failure
    /// leaves job record and baseline untouched. A comparison that was
    /// already accepted is simply gone and reports NotFound.
    pub async fn promote_reference(
        &self,
        job_id: Uuid,
        reference: &screenshot_reference::Model,
    ) -> AppResult<screenshot_reference::Model> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        Job::find_by_id(job_id)
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to find job: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("Job {}", job_id)))?;

        let platform_comparisons = ImageComparison::find()
            .filter(image_comparison::Column::JobId.eq(job_id))
            .filter(image_comparison::Column::ChannelName.eq(reference.channel_name.clone()))
            .all(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to load comparisons: {}", e)))?;

        if platform_comparisons.is_empty() {
            return Err(AppError::NotFound(format!(
                "Platform {} in job {}",
                reference.channel_name, job_id
            )));
        }

        let comparison = platform_comparisons
            .into_iter()
            .find(|c| c.reference_location == reference.image_location)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Comparison for {} {}",
                    reference.channel_name, reference.url
                ))
            })?;

        let mut active: screenshot_reference::ActiveModel = reference.clone().into();
        active.image_location = Set(comparison.test_location.clone());
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update reference: {}", e)))?;

        ImageComparison::delete_by_id(comparison.id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete comparison: {}", e)))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;

        Ok(updated)
    }

    /// Delete a baseline row.
    pub async fn delete_reference_row(&self, id: Uuid) -> AppResult<()> {
        ScreenshotReference::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete reference: {}", e)))?;

        Ok(())
    }
}
