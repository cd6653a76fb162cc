//! SeaORM entity definitions for PostgreSQL database.

pub mod channel;
pub mod image_comparison;
pub mod job;
pub mod link;
pub mod screenshot_reference;
