//! Image blob storage, injected into the importer as a capability.

use crate::error::{ImportError, Result};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stores recipe images under a filename derived from the owning recipe.
pub trait ImageStore {
    /// Persists `bytes` for `owner_id` and returns the filename to record.
    fn store(&self, owner_id: &str, bytes: &[u8]) -> Result<String>;

    /// Returns the bytes for `filename`, or `None` if nothing is stored there.
    fn load(&self, filename: &str) -> Result<Option<Vec<u8>>>;

    /// Deletes `filename`; removing a missing image is not an error.
    fn remove(&self, filename: &str) -> Result<()>;
}

/// Picks a file extension from the image's magic bytes.
pub fn image_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "png"
    } else if bytes.starts_with(b"GIF8") {
        "gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else {
        "jpg"
    }
}

fn image_filename(owner_id: &str, bytes: &[u8]) -> String {
    format!("{owner_id}.{}", image_extension(bytes))
}

/// Keeps images as files in one directory.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    /// Creates the directory if it does not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf> {
        // filenames are generated by `store`; refuse anything that could escape the root
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(ImportError::ImageStoreError(format!(
                "invalid image filename '{filename}'"
            )));
        }
        Ok(self.root.join(filename))
    }
}

impl ImageStore for FsImageStore {
    fn store(&self, owner_id: &str, bytes: &[u8]) -> Result<String> {
        let filename = image_filename(owner_id, bytes);
        let path = self.path_for(&filename)?;
        fs::write(&path, bytes).map_err(|e| {
            ImportError::ImageStoreError(format!("failed to write {}: {e}", path.display()))
        })?;
        debug!("FsImageStore: Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(filename)
    }

    fn load(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(filename)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ImportError::ImageStoreError(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn remove(&self, filename: &str) -> Result<()> {
        let path = self.path_for(filename)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("FsImageStore: Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ImportError::ImageStoreError(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

/// Keeps images in memory; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.images.lock().map(|images| images.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageStore for MemoryImageStore {
    fn store(&self, owner_id: &str, bytes: &[u8]) -> Result<String> {
        let filename = image_filename(owner_id, bytes);
        let mut images = self
            .images
            .lock()
            .map_err(|_| ImportError::ImageStoreError("image store lock poisoned".to_string()))?;
        images.insert(filename.clone(), bytes.to_vec());
        Ok(filename)
    }

    fn load(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        let images = self
            .images
            .lock()
            .map_err(|_| ImportError::ImageStoreError("image store lock poisoned".to_string()))?;
        Ok(images.get(filename).cloned())
    }

    fn remove(&self, filename: &str) -> Result<()> {
        let mut images = self
            .images
            .lock()
            .map_err(|_| ImportError::ImageStoreError("image store lock poisoned".to_string()))?;
        images.remove(filename);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(b"\x89PNG\r\n\x1a\nrest"), "png");
        assert_eq!(image_extension(b"GIF89a"), "gif");
        assert_eq!(image_extension(b"RIFF\0\0\0\0WEBPVP8 "), "webp");
        assert_eq!(image_extension(&[0xff, 0xd8, 0xff]), "jpg");
    }

    #[test]
    fn test_fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path().join("images")).unwrap();

        let filename = store.store("recipe-1", b"GIF89a...").unwrap();
        assert_eq!(filename, "recipe-1.gif");
        assert_eq!(store.load(&filename).unwrap().as_deref(), Some(&b"GIF89a..."[..]));
        assert_eq!(store.load("missing.jpg").unwrap(), None);

        store.remove(&filename).unwrap();
        assert_eq!(store.load(&filename).unwrap(), None);
        assert!(!dir.path().join("images").join(&filename).exists());
        store.remove(&filename).unwrap();
    }

    #[test]
    fn test_fs_store_rejects_path_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path()).unwrap();
        assert!(store.load("../secret").is_err());
        assert!(store.load("").is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryImageStore::new();
        assert!(store.is_empty());
        let filename = store.store("abc", &[0xff, 0xd8]).unwrap();
        assert_eq!(filename, "abc.jpg");
        assert_eq!(store.len(), 1);
        assert_eq!(store.load("abc.jpg").unwrap(), Some(vec![0xff, 0xd8]));
        store.remove("abc.jpg").unwrap();
        assert!(store.is_empty());
    }
}
