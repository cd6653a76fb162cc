//! Database queries for channels.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::channel::{self, ActiveModel, Entity as Channel};
use crate::error::{AppError, AppResult};

use super::DbPool;

impl DbPool {
    /// Insert a new channel. The name must already be normalized.
    pub async fn insert_channel(
        &self,
        name: &str,
        selector: &str,
        bypass_script: Option<String>,
    ) -> AppResult<channel::Model> {
        let now = Utc::now();

        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            selector: Set(selector.to_string()),
            bypass_script: Set(bypass_script),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert channel: {}", e)))?;

        Ok(result)
    }

    /// Find a channel by its normalized name.
    pub async fn find_channel_by_name(&self, name: &str) -> AppResult<Option<channel::Model>> {
        let result = Channel::find()
            .filter(channel::Column::Name.eq(name))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to find channel: {}", e)))?;

        Ok(result)
    }

    /// List all channels ordered by name.
    pub async fn list_channels(&self) -> AppResult<Vec<channel::Model>> {
        let result = Channel::find()
            .order_by_asc(channel::Column::Name)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list channels: {}", e)))?;

        Ok(result)
    }

    /// Update a channel's selector and/or bypass script.
    ///
    /// An empty bypass script clears the stored one.
    pub async fn update_channel(
        &self,
        name: &str,
        selector: Option<String>,
        bypass_script: Option<String>,
    ) -> AppResult<channel::Model> {
        let channel = self
            .find_channel_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Channel {}", name)))?;

        let mut active: ActiveModel = channel.into();
        if let Some(selector) = selector {
            active.selector = Set(selector);
        }
        if let Some(script) = bypass_script {
            active.bypass_script = Set(if script.trim().is_empty() {
                None
            } else {
                Some(script)
            });
        }
        active.updated_at = Set(Utc::now());

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update channel: {}", e)))?;

        Ok(result)
    }

    /// Delete a channel row; its links cascade away.
    pub async fn delete_channel_row(&self, id: Uuid) -> AppResult<()> {
        Channel::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete channel: {}", e)))?;

        Ok(())
    }
}
