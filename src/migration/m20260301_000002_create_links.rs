//! Migration: Create links table.
//!
//! One test scenario (post URL + description) per row, owned by a channel.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE links (
                    id UUID PRIMARY KEY,
                    channel_id UUID NOT NULL REFERENCES channels(id) ON DELETE CASCADE,

                    -- Canonicalized post URL
                    url VARCHAR(1000) NOT NULL,
                    scenario VARCHAR(500) NOT NULL,

                    -- S3 key of the latest test capture (NULL until first run)
                    test_location VARCHAR(500),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_links_channel_id ON links(channel_id);

                -- URL is unique within its channel
                CREATE UNIQUE INDEX idx_links_channel_url ON links(channel_id, url);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS links;")
            .await?;

        Ok(())
    }
}
