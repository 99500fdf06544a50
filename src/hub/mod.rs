mod ingest;
pub mod media;

pub use ingest::{ImportFailure, ImportSummary};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::blob::{BlobStore, thumbnail};
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::store::{SqliteStore, Store};
use crate::types::*;

/// Central photo service: catalog, blob placement, thumbnails, ingest.
///
/// All filesystem and database work runs on the blocking worker pool; the
/// async methods here are thin dispatch wrappers awaited by HTTP handlers.
pub struct PhotoHub {
    inner: Arc<HubInner>,
}

pub(crate) struct HubInner {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) blob: BlobStore,
}

impl PhotoHub {
    /// Opens the hub over the configured data directory. The catalog and
    /// blob roots are created by `initialize`, not here.
    pub fn open(config: &ServerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store = SqliteStore::new(config.db_path())?;
        Ok(Self::with_store(
            Arc::new(store),
            BlobStore::new(config.photos_dir(), config.thumbnails_dir()),
        ))
    }

    pub fn with_store(store: Arc<dyn Store>, blob: BlobStore) -> Self {
        Self {
            inner: Arc::new(HubInner { store, blob }),
        }
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&HubInner) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| Error::Internal(format!("worker task failed: {e}")))?
    }

    /// Creates directories and schema, and seeds the built-in sources.
    /// Idempotent; a failure here means the hub never becomes ready.
    pub async fn initialize(&self) -> Result<()> {
        self.run(|hub| {
            hub.blob.ensure_dirs()?;
            hub.store.initialize()?;
            info!("Photo Hub initialized");
            Ok(())
        })
        .await
    }

    pub async fn add_photo(
        &self,
        data: Vec<u8>,
        filename: String,
        source_id: String,
        metadata: Option<serde_json::Value>,
    ) -> Result<String> {
        self.run(move |hub| hub.add_photo_sync(&data, &filename, &source_id, metadata))
            .await
    }

    pub async fn import_zip(&self, zip_data: Vec<u8>) -> Result<ImportSummary> {
        self.run(move |hub| hub.import_zip_sync(&zip_data)).await
    }

    pub async fn scan_local_folder(&self, folder: PathBuf) -> Result<usize> {
        self.run(move |hub| hub.scan_local_folder_sync(&folder))
            .await
    }

    pub async fn list_photos(
        &self,
        source_id: Option<String>,
        limit: i64,
        offset: i64,
        order: PhotoOrder,
    ) -> Result<Vec<Photo>> {
        self.run(move |hub| hub.store.list_photos(source_id.as_deref(), limit, offset, order))
            .await
    }

    pub async fn get_photo(&self, id: String) -> Result<Option<Photo>> {
        self.run(move |hub| hub.store.get_photo(&id)).await
    }

    pub async fn count_photos(&self, source_id: Option<String>) -> Result<i64> {
        self.run(move |hub| hub.store.count_photos(source_id.as_deref()))
            .await
    }

    pub async fn list_sources(&self) -> Result<Vec<SourceWithCount>> {
        self.run(|hub| hub.store.list_sources()).await
    }

    /// Removes the catalog row, the original file, and the thumbnail.
    /// Returns false without touching the filesystem when no row exists.
    pub async fn delete_photo(&self, id: String) -> Result<bool> {
        self.run(move |hub| hub.delete_photo_sync(&id)).await
    }

    /// Absolute path of the original image, or NotFound if the row is
    /// absent, orphaned, or fails containment.
    pub async fn photo_path(&self, id: String) -> Result<PathBuf> {
        self.run(move |hub| hub.photo_path_sync(&id)).await
    }

    /// Absolute path of the thumbnail, generating and caching it on first
    /// access. NotFound when the original is missing or undecodable.
    pub async fn thumbnail_path(&self, id: String) -> Result<PathBuf> {
        self.run(move |hub| hub.thumbnail_path_sync(&id)).await
    }
}

impl HubInner {
    fn photo_path_sync(&self, id: &str) -> Result<PathBuf> {
        let photo = self.store.get_photo(id)?.ok_or(Error::NotFound)?;
        let relative = photo.local_path.ok_or(Error::NotFound)?;
        self.blob.resolve_original(&relative)
    }

    fn thumbnail_path_sync(&self, id: &str) -> Result<PathBuf> {
        let thumb = self.blob.thumbnail_path(id);
        if thumb.is_file() {
            return Ok(thumb);
        }

        let original = self.photo_path_sync(id)?;
        match thumbnail::generate(&original, &thumb) {
            Ok(()) => Ok(thumb),
            Err(Error::Decode(e)) => {
                warn!("Thumbnail generation failed for {id}: {e}");
                Err(Error::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    fn delete_photo_sync(&self, id: &str) -> Result<bool> {
        let Some(photo) = self.store.get_photo(id)? else {
            return Ok(false);
        };

        self.store.delete_photo(id)?;

        if let Some(relative) = photo.local_path.as_deref() {
            if let Err(e) = self.blob.delete_original(relative) {
                warn!("Failed to remove original for {id}: {e}");
            }
        }
        if let Err(e) = self.blob.delete_thumbnail(id) {
            warn!("Failed to remove thumbnail for {id}: {e}");
        }

        info!("Deleted photo {id}");
        Ok(true)
    }

    pub(crate) fn mark_source_synced(&self, source_id: &str) {
        if let Err(e) = self.store.update_source_sync(source_id, Utc::now()) {
            warn!("Failed to record sync time for source {source_id}: {e}");
        }
    }
}

/// Convenience for tests and embedders that already hold a directory.
pub fn data_layout(data_dir: &Path) -> ServerConfig {
    ServerConfig {
        data_dir: data_dir.to_path_buf(),
        ..ServerConfig::default()
    }
}
