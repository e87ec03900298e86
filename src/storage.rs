//! Gallery storage: mount check, atomic image writes, and the janitor.
//!
//! The gallery is one flat directory on the removable media holding at most
//! two images in steady state: the settled one and the one being prepared.
//! There is no durable bookkeeping across restarts; the directory is wiped
//! at startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Gallery storage unavailable at {path}: {source}")]
    Mount {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handle to the gallery directory
pub struct GalleryStore {
    dir: PathBuf,
}

impl GalleryStore {
    /// Open the gallery directory, creating it if needed and verifying the
    /// media is actually writable with a probe file.
    ///
    /// Failure here means the slideshow cannot run at all; the caller
    /// treats it as fatal.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();

        fs::create_dir_all(&dir).map_err(|source| StorageError::Mount {
            path: dir.clone(),
            source,
        })?;

        let probe = dir.join(".mount_probe");
        fs::write(&probe, b"ok")
            .and_then(|_| fs::remove_file(&probe))
            .map_err(|source| StorageError::Mount {
                path: dir.clone(),
                source,
            })?;

        tracing::info!("Gallery storage ready at {}", dir.display());
        Ok(Self { dir })
    }

    #[allow(dead_code)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist image bytes under `file_name` atomically.
    ///
    /// Write-to-temp-then-rename: a duplicate filename (stalled clock nonce)
    /// overwrites the older file in one step, so a renderer reading the old
    /// file never observes a partial write.
    pub fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let path = self.dir.join(file_name);
        let tmp = self.dir.join(format!("{file_name}.tmp"));

        fs::write(&tmp, bytes).map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })?;

        fs::rename(&tmp, &path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            StorageError::Write {
                path: path.clone(),
                source,
            }
        })?;

        tracing::info!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Delete every entry in the gallery directory.
    ///
    /// Used once at startup to discard images from a previous run. An empty
    /// or missing directory is a no-op; individual delete failures are
    /// logged and skipped. Returns the number of entries removed.
    pub fn clear_all(&self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!("Could not list gallery {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!("Deleted {}", path.display());
                    removed += 1;
                }
                Err(e) => tracing::warn!("Could not delete {}: {}", path.display(), e),
            }
        }

        if removed > 0 {
            tracing::info!("Cleared {} stale image(s) from gallery", removed);
        }
        removed
    }

    /// Best-effort single-file delete.
    ///
    /// A stale file left behind is acceptable collateral, not a crash
    /// condition.
    pub fn delete_one(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!("Deleted {}", path.display()),
            Err(e) => tracing::warn!("Could not delete {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = dir.path().join("gallery");
        let store = GalleryStore::open(&gallery).unwrap();
        assert!(gallery.is_dir());
        assert_eq!(store.dir(), gallery);
    }

    #[test]
    fn save_writes_bytes_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = GalleryStore::open(dir.path().join("gallery")).unwrap();

        let path = store.save("a_1.jpg", b"image-bytes").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"image-bytes");

        let names: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn duplicate_name_overwrites_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = GalleryStore::open(dir.path().join("gallery")).unwrap();

        store.save("same_7.jpg", b"old").unwrap();
        let path = store.save("same_7.jpg", b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn clear_all_empties_the_gallery() {
        let dir = tempfile::tempdir().unwrap();
        let store = GalleryStore::open(dir.path().join("gallery")).unwrap();
        store.save("a_1.jpg", b"x").unwrap();
        store.save("b_2.jpg", b"y").unwrap();

        assert_eq!(store.clear_all(), 2);
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 0);
    }

    #[test]
    fn clear_all_is_idempotent_on_empty_and_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = GalleryStore::open(dir.path().join("gallery")).unwrap();

        assert_eq!(store.clear_all(), 0);
        assert_eq!(store.clear_all(), 0);

        fs::remove_dir(store.dir()).unwrap();
        assert_eq!(store.clear_all(), 0);
    }

    #[test]
    fn delete_one_tolerates_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = GalleryStore::open(dir.path().join("gallery")).unwrap();
        store.delete_one(&store.dir().join("never_existed.jpg"));
    }

    #[test]
    fn open_fails_on_unwritable_media() {
        // A file where the directory should be makes create_dir_all fail
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("gallery");
        fs::write(&blocker, b"file, not dir").unwrap();

        assert!(matches!(
            GalleryStore::open(&blocker),
            Err(StorageError::Mount { .. })
        ));
    }
}
