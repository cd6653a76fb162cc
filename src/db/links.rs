//! Database queries for links.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::link::{self, ActiveModel, Entity as Link};
use crate::error::{AppError, AppResult};

use super::DbPool;

impl DbPool {
    /// Find a link by its canonical URL within a channel.
    pub async fn find_link(&self, channel_id: Uuid, url: &str) -> AppResult<Option<link::Model>> {
        let result = Link::find()
            .filter(link::Column::ChannelId.eq(channel_id))
            .filter(link::Column::Url.eq(url))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to find link: {}", e)))?;

        Ok(result)
    }

    /// List a channel's links in creation order.
    pub async fn list_links(&self, channel_id: Uuid) -> AppResult<Vec<link::Model>> {
        let result = Link::find()
            .filter(link::Column::ChannelId.eq(channel_id))
            .order_by_asc(link::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list links: {}", e)))?;

        Ok(result)
    }

    /// Record the S3 key of a link's latest test capture.
    pub async fn set_link_test_location(
        &self,
        link_id: Uuid,
        test_location: &str,
    ) -> AppResult<link::Model> {
        let link = Link::find_by_id(link_id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to find link: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("Link {}", link_id)))?;

        let mut active: ActiveModel = link.into();
        active.test_location = Set(Some(test_location.to_string()));
        active.updated_at = Set(Utc::now());

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update link: {}", e)))?;

        Ok(result)
    }

    /// Delete a link row.
    pub async fn delete_link_row(&self, id: Uuid) -> AppResult<()> {
        Link::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete link: {}", e)))?;

        Ok(())
    }
}
