//! Migration: Create image_comparisons table.
//!
//! Unresolved discrepancies recorded by a job run. Rows are deleted when a
//! comparison is accepted and cascade away with their job.

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
                CREATE TABLE image_comparisons (
                    id UUID PRIMARY KEY,
                    job_id UUID NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,

                    channel_name VARCHAR(100) NOT NULL,
                    image_name VARCHAR(500) NOT NULL,

                    reference_location VARCHAR(500) NOT NULL,
                    test_location VARCHAR(500) NOT NULL,
                    -- S3 key of the diff artifact, or the reserved
                    -- 'size-mismatch' sentinel when no diff was computed
                    diff_location VARCHAR(500) NOT NULL,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_image_comparisons_job_id ON image_comparisons(job_id);
                CREATE INDEX idx_image_comparisons_channel ON image_comparisons(job_id, channel_name);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS image_comparisons;")
            .await?;

        Ok(())
    }
}
