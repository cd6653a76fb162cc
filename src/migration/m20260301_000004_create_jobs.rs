//! Migration: Create jobs table.
//!
//! One row per visual-regression run.

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
                CREATE TABLE jobs (
                    id UUID PRIMARY KEY, -- UUIDv7 for time-ordered sorting
                    run_at TIMESTAMPTZ NOT NULL,

                    -- Per-link capture failures collected during the run:
                    -- [{channel, url, kind, detail}]
                    failures JSONB,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_jobs_run_at ON jobs(run_at);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS jobs;")
            .await?;

        Ok(())
    }
}
