use std::fs;
use std::path::PathBuf;

use tracing::debug;

use flexdata_core::FileRef;
use flexdata_core::clock::physical_now;
use flexdata_core::file_ref::object_path;

use crate::error::StorageError;

/// Blob storage for uploaded files. Stored objects are addressed by a
/// public URL.
pub trait ObjectStore {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<FileRef, StorageError>;

    /// Store an upload under `{timestamp_ms}_{file_name}`.
    fn upload(&self, original_name: &str, bytes: &[u8]) -> Result<FileRef, StorageError> {
        let path = object_path(physical_now()?, original_name);
        self.put(&path, bytes)
    }
}

/// Object store backed by a local directory served under `public_base`.
#[derive(Debug, Clone)]
pub struct DirObjectStore {
    root: PathBuf,
    public_base: String,
}

impl DirObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }
}

impl ObjectStore for DirObjectStore {
    fn put(&self, path: &str, bytes: &[u8]) -> Result<FileRef, StorageError> {
        if path.is_empty() || path.contains(['/', '\\']) || path == ".." {
            return Err(StorageError::ConstraintViolation(format!(
                "invalid object path: {path}"
            )));
        }
        fs::write(self.root.join(path), bytes)?;
        debug!(path, size = bytes.len(), "stored object");
        Ok(FileRef::new(format!("{}/{path}", self.public_base)))
    }
}
