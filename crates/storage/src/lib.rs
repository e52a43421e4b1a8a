//! Storage layer: per-stage inventory snapshots.
//!
//! Every pipeline stage persists its inventory as `<n>_file_inventory.json`
//! under the data directory. A stage only ever writes its own file, so the
//! snapshots of earlier stages stay untouched.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("snapshot not found: {0}")]
    MissingSnapshot(PathBuf),
    #[error("unexpected layout in {0}: expected an array or an object with a `files` array")]
    Layout(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scanned,
    Classified,
}

impl Stage {
    pub fn number(self) -> u8 {
        match self {
            Stage::Scanned => 1,
            Stage::Classified => 2,
        }
    }

    pub fn file_name(self) -> String {
        format!("{}_file_inventory.json", self.number())
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, stage: Stage) -> PathBuf {
        self.root.join(stage.file_name())
    }

    pub fn exists(&self, stage: Stage) -> bool {
        self.path_for(stage).is_file()
    }

    /// Raw JSON elements of a stage snapshot, in file order.
    pub fn read(&self, stage: Stage) -> Result<Vec<Value>, StorageError> {
        read_records(&self.path_for(stage))
    }

    pub fn write<T: Serialize>(
        &self,
        stage: Stage,
        records: &[T],
    ) -> Result<PathBuf, StorageError> {
        let path = self.path_for(stage);
        let body = serde_json::to_vec_pretty(records).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &body)?;
        debug!(path = %path.display(), records = records.len(), "snapshot written");
        Ok(path)
    }
}

/// Reads an inventory file. Accepts a bare array of records or the scanner
/// envelope `{ "files": [...] }`.
pub fn read_records(path: &Path) -> Result<Vec<Value>, StorageError> {
    if !path.exists() {
        return Err(StorageError::MissingSnapshot(path.to_path_buf()));
    }
    let raw = fs::read(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_slice(&raw).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("files") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(StorageError::Layout(path.to_path_buf())),
        },
        _ => Err(StorageError::Layout(path.to_path_buf())),
    }
}

/// Writes to a temp sibling, then renames over the target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
