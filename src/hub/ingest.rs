use std::io::{Cursor, Read};
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::{HubInner, media};
use crate::error::{Error, Result};
use crate::types::Photo;

/// Outcome of a bulk ZIP import. Partial failure is the expected common
/// case; per-entry errors are collected here, never raised.
#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportFailure>,
    /// First 10 ids, in archive order.
    pub photo_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportFailure {
    pub file: String,
    pub error: String,
}

impl HubInner {
    /// Validated admission of one photo: extension gate, blob write,
    /// best-effort dimension and EXIF probes, catalog insert.
    pub(crate) fn add_photo_sync(
        &self,
        data: &[u8],
        filename: &str,
        source_id: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<String> {
        if !media::is_supported(filename) {
            return Err(Error::UnsupportedFormat(filename.to_string()));
        }

        let photo_id = Uuid::new_v4().to_string();
        let (relative_path, digest) =
            self.blob
                .write_original(source_id, &photo_id, filename, data)?;

        // Decode failures degrade the record, they never block admission
        let dimensions = media::probe_dimensions(data);
        let taken_at = media::extract_taken_at(data);

        let mut meta = metadata.unwrap_or_else(|| json!({}));
        if let Some(obj) = meta.as_object_mut() {
            obj.insert("sha256".to_string(), json!(digest));
        }

        let now = Utc::now();
        let photo = Photo {
            id: photo_id.clone(),
            source_id: source_id.to_string(),
            remote_id: None,
            filename: filename.to_string(),
            local_path: Some(relative_path.clone()),
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            taken_at,
            created_at: now,
            metadata: Some(meta.to_string()),
            synced_at: Some(now),
        };

        if let Err(e) = self.store.insert_photo(&photo) {
            let _ = self.blob.delete_original(&relative_path);
            return Err(e);
        }

        info!("Added photo {photo_id} ({filename})");
        Ok(photo_id)
    }

    /// Imports every supported entry of a ZIP archive into the `imported`
    /// source, in archive order. One bad entry never aborts the rest.
    pub(crate) fn import_zip_sync(&self, zip_data: &[u8]) -> Result<ImportSummary> {
        let mut archive = zip::ZipArchive::new(Cursor::new(zip_data))
            .map_err(|e| Error::ArchiveCorrupt(e.to_string()))?;

        let mut summary = ImportSummary::default();
        let mut imported_total = 0usize;

        for index in 0..archive.len() {
            let (name, data) = {
                let mut entry = match archive.by_index(index) {
                    Ok(entry) => entry,
                    Err(e) => {
                        summary.errors.push(ImportFailure {
                            file: format!("entry #{index}"),
                            error: e.to_string(),
                        });
                        continue;
                    }
                };

                if entry.is_dir() {
                    continue;
                }
                let name = entry.name().to_string();
                if !media::is_supported(&name) {
                    summary.skipped += 1;
                    continue;
                }

                let mut data = Vec::new();
                if let Err(e) = entry.read_to_end(&mut data) {
                    warn!("Failed to extract {name}: {e}");
                    summary.errors.push(ImportFailure {
                        file: name,
                        error: e.to_string(),
                    });
                    continue;
                }
                (name, data)
            };

            // Internal folder structure is flattened to the base filename
            let base = Path::new(&name)
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| name.clone());

            match self.add_photo_sync(&data, &base, "imported", None) {
                Ok(id) => {
                    imported_total += 1;
                    if summary.photo_ids.len() < 10 {
                        summary.photo_ids.push(id);
                    }
                }
                Err(e) => {
                    warn!("Failed to import {name}: {e}");
                    summary.errors.push(ImportFailure {
                        file: name,
                        error: e.to_string(),
                    });
                }
            }
        }

        summary.imported = imported_total;
        self.mark_source_synced("imported");
        Ok(summary)
    }

    /// Admits supported files directly inside `folder` into the `local`
    /// source. Files already cataloged by filename are skipped, so
    /// repeated scans of an unchanged folder add nothing.
    pub(crate) fn scan_local_folder_sync(&self, folder: &Path) -> Result<usize> {
        if !folder.is_dir() {
            warn!("Folder does not exist: {}", folder.display());
            return Ok(0);
        }

        let mut added = 0usize;
        for entry in std::fs::read_dir(folder)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Unreadable directory entry: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let filename = entry.file_name().to_string_lossy().to_string();
            if !media::is_supported(&filename) {
                continue;
            }
            if self.store.find_photo_by_filename("local", &filename)?.is_some() {
                continue;
            }

            let data = match std::fs::read(&path) {
                Ok(data) => data,
                Err(e) => {
                    warn!("Failed to read {}: {e}", path.display());
                    continue;
                }
            };
            match self.add_photo_sync(&data, &filename, "local", None) {
                Ok(_) => added += 1,
                Err(e) => warn!("Failed to add {}: {e}", path.display()),
            }
        }

        self.mark_source_synced("local");
        info!("Scanned {}, added {added} photos", folder.display());
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{encoded_png, test_hub};
    use crate::error::Error;
    use crate::types::PhotoOrder;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            for (name, data) in entries {
                if name.ends_with('/') {
                    writer.add_directory(name.trim_end_matches('/'), options).unwrap();
                } else {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(data).unwrap();
                }
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    /// Flips bytes of `needle` inside a stored (uncompressed) archive so
    /// the entry's CRC check fails on extraction.
    fn corrupt_entry(zip: &mut [u8], needle: &[u8]) {
        let pos = zip
            .windows(needle.len())
            .position(|w| w == needle)
            .expect("payload present in stored archive");
        for b in &mut zip[pos..pos + needle.len()] {
            *b ^= 0xFF;
        }
    }

    #[tokio::test]
    async fn test_import_zip_partial_success() {
        let (_temp, hub) = test_hub().await;

        let png = encoded_png(20, 20);
        let marker = b"CORRUPT-ME-PAYLOAD-1234567890";
        let mut zip = build_zip(&[
            ("a.png", png.as_slice()),
            ("nested/b.png", png.as_slice()),
            ("c.png", png.as_slice()),
            ("readme.txt", b"skip me"),
            ("broken.jpg", marker.as_slice()),
        ]);
        corrupt_entry(&mut zip, marker);

        let summary = hub.import_zip(zip).await.unwrap();

        assert_eq!(summary.imported, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].file, "broken.jpg");
        assert_eq!(summary.photo_ids.len(), 3);
        assert_eq!(hub.count_photos(Some("imported".into())).await.unwrap(), 3);

        // Nested entry was flattened to its base filename
        let photos = hub
            .list_photos(Some("imported".into()), 10, 0, PhotoOrder::Newest)
            .await
            .unwrap();
        assert!(photos.iter().any(|p| p.filename == "b.png"));
        assert!(photos.iter().all(|p| !p.filename.contains('/')));
    }

    #[tokio::test]
    async fn test_import_zip_skips_directories_silently() {
        let (_temp, hub) = test_hub().await;

        let png = encoded_png(10, 10);
        let zip = build_zip(&[("album/", b"".as_slice()), ("album/one.png", png.as_slice())]);

        let summary = hub.import_zip(zip).await.unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 0);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn test_import_empty_zip() {
        let (_temp, hub) = test_hub().await;

        let zip = build_zip(&[]);
        let summary = hub.import_zip(zip).await.unwrap();
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.skipped, 0);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn test_import_unreadable_archive_is_top_level_error() {
        let (_temp, hub) = test_hub().await;

        let result = hub.import_zip(b"PK\x03\x04 but nonsense".to_vec()).await;
        assert!(matches!(result, Err(Error::ArchiveCorrupt(_))));
    }

    #[tokio::test]
    async fn test_rescan_is_idempotent() {
        let (temp, hub) = test_hub().await;

        let folder = temp.path().join("inbox");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("one.png"), encoded_png(12, 12)).unwrap();
        std::fs::write(folder.join("two.png"), encoded_png(16, 16)).unwrap();
        std::fs::write(folder.join("ignore.txt"), b"text").unwrap();

        assert_eq!(hub.scan_local_folder(folder.clone()).await.unwrap(), 2);
        assert_eq!(hub.scan_local_folder(folder.clone()).await.unwrap(), 0);
        assert_eq!(hub.count_photos(Some("local".into())).await.unwrap(), 2);

        // New file picked up on the next pass
        std::fs::write(folder.join("three.png"), encoded_png(8, 8)).unwrap();
        assert_eq!(hub.scan_local_folder(folder).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_scan_missing_folder_adds_nothing() {
        let (temp, hub) = test_hub().await;
        let missing = temp.path().join("nope");
        assert_eq!(hub.scan_local_folder(missing).await.unwrap(), 0);
    }
}
