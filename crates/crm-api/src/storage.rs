//! Local file storage for email attachments.
//!
//! Stored paths are relative to the configured root. Paths that would leave
//! the root (absolute paths, `..` components) are refused.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
  #[error("path {0:?} escapes the storage root")]
  OutsideRoot(String),

  #[error("file {0:?} not found")]
  Missing(String),

  #[error("storage io error: {0}")]
  Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
  root: PathBuf,
}

impl LocalStorage {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  /// Read the whole file stored under `path`.
  pub async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
    let full = self.resolve(path)?;
    match tokio::fs::read(&full).await {
      Ok(bytes) => Ok(bytes),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        Err(StorageError::Missing(path.to_owned()))
      }
      Err(e) => Err(e.into()),
    }
  }

  fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
    let relative = Path::new(path);
    let contained = relative
      .components()
      .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !contained || path.is_empty() {
      return Err(StorageError::OutsideRoot(path.to_owned()));
    }
    Ok(self.root.join(relative))
  }
}
