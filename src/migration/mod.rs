//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_channels;
mod m20260301_000002_create_links;
mod m20260301_000003_create_screenshot_references;
mod m20260301_000004_create_jobs;
mod m20260301_000005_create_image_comparisons;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_channels::Migration),
            Box::new(m20260301_000002_create_links::Migration),
            Box::new(m20260301_000003_create_screenshot_references::Migration),
            Box::new(m20260301_000004_create_jobs::Migration),
            Box::new(m20260301_000005_create_image_comparisons::Migration),
        ]
    }
}
