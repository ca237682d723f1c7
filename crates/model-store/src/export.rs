//! File export/import target

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::StoreError;

/// Where exported documents go and where imported ones come from
pub trait DocumentStore: Send + Sync {
    /// Write `bytes` under `filename`, returning the full path
    fn export_document(&self, bytes: &[u8], filename: &str) -> Result<PathBuf, StoreError>;

    /// Read a previously exported (or user supplied) document
    fn import_document(&self, path: &Path) -> Result<Vec<u8>, StoreError>;
}

/// Documents stored as files under one directory
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf, StoreError> {
        let name = Path::new(filename);
        let plain = name.file_name().is_some_and(|f| f == name.as_os_str());
        if filename.is_empty() || !plain {
            warn!("Rejected export filename {:?}", filename);
            return Err(StoreError::Io(format!("invalid file name {:?}", filename)));
        }
        Ok(self.root.join(name))
    }
}

impl DocumentStore for FsDocumentStore {
    fn export_document(&self, bytes: &[u8], filename: &str) -> Result<PathBuf, StoreError> {
        let path = self.resolve(filename)?;
        fs::create_dir_all(&self.root)?;

        // readers never observe a partially written document
        let partial = path.with_extension("partial");
        fs::write(&partial, bytes)?;
        fs::rename(&partial, &path)?;

        info!("Exported {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    fn import_document(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let bytes = fs::read(&path)?;
        info!("Imported {} bytes from {}", bytes.len(), path.display());
        Ok(bytes)
    }
}
