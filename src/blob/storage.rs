use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Maps photo identity to filesystem location. All reads and writes are
/// confined to the originals root and the thumbnails root; nothing outside
/// this type constructs absolute paths into either tree.
pub struct BlobStore {
    originals_root: PathBuf,
    thumbnails_root: PathBuf,
}

impl BlobStore {
    pub fn new(originals_root: PathBuf, thumbnails_root: PathBuf) -> Self {
        Self {
            originals_root,
            thumbnails_root,
        }
    }

    /// Creates the root directories. Called once during hub initialization.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.originals_root)?;
        fs::create_dir_all(self.originals_root.join(".tmp"))?;
        fs::create_dir_all(&self.thumbnails_root)?;
        Ok(())
    }

    /// Writes original bytes under `<originals root>/<source_id>/` and
    /// returns the stored relative path plus the content's sha256 hex.
    ///
    /// The stored name is the sanitized filename prefixed with the first
    /// 8 chars of the photo id, so identically-named uploads never collide.
    /// The write goes to a temp file first and is renamed into place, so a
    /// concurrent reader never observes a partial file.
    pub fn write_original(
        &self,
        source_id: &str,
        photo_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<(String, String)> {
        let safe_source = sanitize_filename(source_id);
        let safe_name = sanitize_filename(filename);
        let prefix = &photo_id[..photo_id.len().min(8)];
        let local_name = format!("{prefix}_{safe_name}");

        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hex::encode(hasher.finalize());

        let dir = self.originals_root.join(&safe_source);
        fs::create_dir_all(&dir)?;

        let temp_path = self
            .originals_root
            .join(".tmp")
            .join(Uuid::new_v4().to_string());
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&temp_path, data)?;
        fs::rename(&temp_path, dir.join(&local_name))?;

        Ok((format!("{safe_source}/{local_name}"), digest))
    }

    /// Resolves a stored relative path to an absolute one, verifying the
    /// result stays inside the originals root. Containment failures are
    /// reported as NotFound so callers leak nothing about the filesystem.
    pub fn resolve_original(&self, relative_path: &str) -> Result<PathBuf> {
        let candidate = self.originals_root.join(relative_path);

        let resolved = match candidate.canonicalize() {
            Ok(p) => p,
            Err(_) => return Err(Error::NotFound),
        };
        let root = self
            .originals_root
            .canonicalize()
            .map_err(|_| Error::NotFound)?;

        if !resolved.starts_with(&root) {
            warn!("Rejected path escaping originals root: {relative_path}");
            return Err(Error::NotFound);
        }
        if !resolved.is_file() {
            return Err(Error::NotFound);
        }

        Ok(resolved)
    }

    /// Thumbnail location for a photo. The name is derived from the photo
    /// id, never from request input, so there is no traversal risk.
    #[must_use]
    pub fn thumbnail_path(&self, photo_id: &str) -> PathBuf {
        self.thumbnails_root.join(format!("{photo_id}_thumb.jpg"))
    }

    pub fn delete_original(&self, relative_path: &str) -> Result<bool> {
        let path = match self.resolve_original(relative_path) {
            Ok(p) => p,
            Err(Error::NotFound) => return Ok(false),
            Err(e) => return Err(e),
        };
        remove_if_present(&path)
    }

    pub fn delete_thumbnail(&self, photo_id: &str) -> Result<bool> {
        remove_if_present(&self.thumbnail_path(photo_id))
    }
}

fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Strips path separators and anything outside alphanumerics and `._- `.
/// An emptied name falls back to "unnamed".
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .filter(|c| c.is_alphanumeric() || "._- ".contains(*c))
        .collect();

    let safe = safe.trim_matches(['.', ' ']).to_string();
    if safe.is_empty() {
        "unnamed".to_string()
    } else {
        safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_blob() -> (TempDir, BlobStore) {
        let temp = TempDir::new().unwrap();
        let blob = BlobStore::new(
            temp.path().join("photos"),
            temp.path().join("thumbnails"),
        );
        blob.ensure_dirs().unwrap();
        (temp, blob)
    }

    #[test]
    fn test_write_and_resolve_roundtrip() {
        let (_temp, blob) = test_blob();

        let (rel, digest) = blob
            .write_original("imported", "0a1b2c3d-rest", "cat.jpg", b"jpegbytes")
            .unwrap();
        assert_eq!(rel, "imported/0a1b2c3d_cat.jpg");
        assert_eq!(digest.len(), 64);

        let abs = blob.resolve_original(&rel).unwrap();
        assert_eq!(fs::read(abs).unwrap(), b"jpegbytes");
    }

    #[test]
    fn test_identical_filenames_do_not_collide() {
        let (_temp, blob) = test_blob();

        let (rel_a, _) = blob
            .write_original("imported", "aaaaaaaa-1", "pic.jpg", b"first")
            .unwrap();
        let (rel_b, _) = blob
            .write_original("imported", "bbbbbbbb-2", "pic.jpg", b"second")
            .unwrap();

        assert_ne!(rel_a, rel_b);
        assert_eq!(fs::read(blob.resolve_original(&rel_a).unwrap()).unwrap(), b"first");
        assert_eq!(fs::read(blob.resolve_original(&rel_b).unwrap()).unwrap(), b"second");
    }

    #[test]
    fn test_traversal_is_not_found() {
        let (temp, blob) = test_blob();

        // A real file outside the originals root
        fs::write(temp.path().join("secret.txt"), b"secret").unwrap();

        let result = blob.resolve_original("../secret.txt");
        assert!(matches!(result, Err(Error::NotFound)));

        let result = blob.resolve_original("imported/../../secret.txt");
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let (_temp, blob) = test_blob();
        assert!(matches!(
            blob.resolve_original("imported/nope.jpg"),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_delete_is_best_effort() {
        let (_temp, blob) = test_blob();

        let (rel, _) = blob
            .write_original("local", "cccccccc-3", "dog.png", b"png")
            .unwrap();
        assert!(blob.delete_original(&rel).unwrap());
        assert!(!blob.delete_original(&rel).unwrap());

        assert!(!blob.delete_thumbnail("no-such-photo").unwrap());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("holiday 2024.jpg"), "holiday 2024.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("a/b\\c.png"), "abc.png");
        assert_eq!(sanitize_filename("///"), "unnamed");
        assert_eq!(sanitize_filename(""), "unnamed");
    }
}
