//! Image comparison entity for SeaORM.
//!
//! One unresolved discrepancy inside a job: reference, test and diff
//! artifact locations. `diff_location` holds the reserved sentinel value
//! when the images' dimensions did not match and no diff was computed.
//! Accepting a comparison deletes the row.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "image_comparisons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub job_id: Uuid,
    pub channel_name: String,
    /// Scenario description of the link this comparison belongs to
    pub image_name: String,
    pub reference_location: String,
    pub test_location: String,
    /// S3 key of the diff artifact, or the size-mismatch sentinel
    pub diff_location: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::job::Entity",
        from = "Column::JobId",
        to = "super::job::Column::Id",
        on_delete = "Cascade"
    )]
    Job,
}

impl Related<super::job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
