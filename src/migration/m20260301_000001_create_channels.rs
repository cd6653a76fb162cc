//! Migration: Create channels table.
//!
//! One row per social-media source under test.

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
                CREATE TABLE channels (
                    id UUID PRIMARY KEY,
                    -- Stored lower-case; unique across all channels
                    name VARCHAR(100) NOT NULL,
                    -- CSS selector for the region to screenshot
                    selector VARCHAR(500) NOT NULL CHECK (selector <> ''),
                    -- Operator-supplied script run in-page before capture
                    bypass_script TEXT,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE UNIQUE INDEX idx_channels_name ON channels(name);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS channels;")
            .await?;

        Ok(())
    }
}
