//! Migration: Create screenshot_references table.
//!
//! Durable baseline image records, keyed by (channel, scenario URL).

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
                CREATE TABLE screenshot_references (
                    id UUID PRIMARY KEY,
                    channel_name VARCHAR(100) NOT NULL,
                    url VARCHAR(1000) NOT NULL,

                    -- S3 key of the current accepted baseline; promotion
                    -- overwrites this in place
                    image_location VARCHAR(500) NOT NULL,
                    viewport VARCHAR(20) NOT NULL,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- At most one live baseline per (channel, url) pair
                CREATE UNIQUE INDEX idx_screenshot_references_channel_url
                    ON screenshot_references(channel_name, url);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS screenshot_references;")
            .await?;

        Ok(())
    }
}
