//! Screenshot reference entity for SeaORM.
//!
//! The durable baseline record for one (channel, scenario URL) pair.
//! Exactly one live row exists per pair; accepting a comparison overwrites
//! `image_location` in place rather than inserting a duplicate.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "screenshot_references")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub channel_name: String,
    /// Canonical scenario URL
    pub url: String,
    /// S3 key of the current accepted baseline image
    pub image_location: String,
    /// Viewport the baseline was captured at, e.g. "1920x1080"
    pub viewport: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
