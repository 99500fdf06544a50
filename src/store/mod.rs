mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the catalog database interface.
pub trait Store: Send + Sync {
    /// Creates the schema and seeds the built-in sources. Safe to call on
    /// every process start.
    fn initialize(&self) -> Result<()>;

    // Photo operations
    fn insert_photo(&self, photo: &Photo) -> Result<()>;
    fn get_photo(&self, id: &str) -> Result<Option<Photo>>;
    fn list_photos(
        &self,
        source_id: Option<&str>,
        limit: i64,
        offset: i64,
        order: PhotoOrder,
    ) -> Result<Vec<Photo>>;
    fn count_photos(&self, source_id: Option<&str>) -> Result<i64>;
    fn delete_photo(&self, id: &str) -> Result<bool>;
    fn find_photo_by_filename(&self, source_id: &str, filename: &str) -> Result<Option<Photo>>;

    // Source operations
    fn create_source(&self, source: &PhotoSource) -> Result<()>;
    fn get_source(&self, id: &str) -> Result<Option<PhotoSource>>;
    fn list_sources(&self) -> Result<Vec<SourceWithCount>>;
    fn update_source_sync(&self, id: &str, at: DateTime<Utc>) -> Result<()>;
    fn delete_source(&self, id: &str) -> Result<bool>;

    // Album operations
    fn insert_album(&self, album: &Album) -> Result<()>;
    fn list_albums(&self, source_id: &str) -> Result<Vec<Album>>;
    fn count_albums(&self, source_id: &str) -> Result<i64>;

    fn close(&self) -> Result<()>;
}
