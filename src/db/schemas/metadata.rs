//! Fields and traits shared by every stored record

use bson::DateTime;

use crate::db::store::IndexSpec;

/// Identifier key of every document
pub const ID: &str = "_id";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Records that carry creation/update timestamps
pub trait MutMetadata {
    fn timestamps(&mut self) -> (&mut Option<DateTime>, &mut Option<DateTime>);

    /// Stamp both timestamps with the current time
    fn init_metadata(&mut self) {
        let now = DateTime::now();
        let (created_at, updated_at) = self.timestamps();
        *created_at = Some(now);
        *updated_at = Some(now);
    }
}

/// Records that declare indexes on their collection
pub trait IntoIndexes {
    fn into_indices() -> Vec<IndexSpec>;
}
