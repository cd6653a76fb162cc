//! Job entity for SeaORM.
//!
//! One visual-regression run. Comparison rows hang off the job and are
//! cascade-deleted when the run is discarded.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid, // UUIDv7 for time-ordered sorting
    pub run_at: DateTimeUtc,
    /// Per-link capture failures collected during the run, as JSON
    pub failures: Option<Json>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::image_comparison::Entity")]
    ImageComparison,
}

impl Related<super::image_comparison::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImageComparison.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
