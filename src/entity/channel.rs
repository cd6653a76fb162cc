//! Channel entity for SeaORM.
//!
//! A channel is one social-media source under test: its element selector
//! and optional operator-supplied bypass script apply to all of its links.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "channels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Unique, stored lower-case
    pub name: String,
    /// CSS selector identifying the region to screenshot
    pub selector: String,
    /// Operator-authored script run in-page before capture (trusted code)
    pub bypass_script: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::link::Entity")]
    Link,
}

impl Related<super::link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Link.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
