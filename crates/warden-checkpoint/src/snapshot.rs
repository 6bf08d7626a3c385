//! Pre-mutation file snapshots.
//!
//! A [`FileSnapshot`] is captured immediately before a write and is never
//! modified afterwards. A snapshot of a file that did not exist carries empty
//! content and `existed == false`; restoring it deletes the file.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;
use warden_core::{ContentHash, Timestamp};

use crate::error::{CheckpointError, CheckpointResult};

/// Opaque identifier of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotId(pub Uuid);

impl SnapshotId {
    /// Create a new random snapshot ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "snap:{}", self.0)
    }
}

/// The prior state of one file.
#[derive(Clone)]
pub struct FileSnapshot {
    /// Identifier.
    pub id: SnapshotId,
    /// Absolute path the snapshot was taken of.
    pub path: PathBuf,
    /// File bytes at capture time; empty when the file did not exist.
    pub content: Vec<u8>,
    /// Whether the file existed at capture time.
    pub existed: bool,
    /// BLAKE3 hash of `content`.
    pub hash: ContentHash,
    /// Length of `content` in bytes.
    pub size: u64,
    /// When the snapshot was captured.
    pub timestamp: Timestamp,
}

impl FileSnapshot {
    /// Capture the current state of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Io`] if the file exists but cannot be read.
    pub fn capture(path: &Path) -> CheckpointResult<Self> {
        match std::fs::read(path) {
            Ok(content) => Ok(Self::from_content(path, content, true)),
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                Ok(Self::from_content(path, Vec::new(), false))
            },
            Err(source) => Err(CheckpointError::Io {
                context: "failed to snapshot",
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// A snapshot of a file that does not exist.
    #[must_use]
    pub fn absent(path: &Path) -> Self {
        Self::from_content(path, Vec::new(), false)
    }

    fn from_content(path: &Path, content: Vec<u8>, existed: bool) -> Self {
        Self {
            id: SnapshotId::new(),
            path: path.to_path_buf(),
            hash: ContentHash::hash(&content),
            size: content.len() as u64,
            content,
            existed,
            timestamp: Timestamp::now(),
        }
    }

    /// Whether `content` still matches `hash`.
    #[must_use]
    pub fn verify(&self) -> bool {
        self.hash.verify(&self.content)
    }

    /// Metadata without content.
    #[must_use]
    pub fn info(&self) -> SnapshotInfo {
        SnapshotInfo {
            id: self.id,
            path: self.path.clone(),
            existed: self.existed,
            hash: self.hash.to_hex(),
            size: self.size,
            timestamp: self.timestamp,
        }
    }
}

impl fmt::Debug for FileSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSnapshot")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("existed", &self.existed)
            .field("size", &self.size)
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

/// Serializable snapshot metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    /// Identifier.
    pub id: SnapshotId,
    /// Path the snapshot was taken of.
    pub path: PathBuf,
    /// Whether the file existed.
    pub existed: bool,
    /// Hex BLAKE3 hash.
    pub hash: String,
    /// Content size in bytes.
    pub size: u64,
    /// Capture time.
    pub timestamp: Timestamp,
}

/// The live snapshot store.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshots: RwLock<HashMap<SnapshotId, Arc<FileSnapshot>>>,
}

impl SnapshotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SnapshotId, Arc<FileSnapshot>>> {
        self.snapshots.read().unwrap_or_else(|e| {
            warn!("SnapshotStore lock poisoned, recovering");
            PoisonError::into_inner(e)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SnapshotId, Arc<FileSnapshot>>> {
        self.snapshots.write().unwrap_or_else(|e| {
            warn!("SnapshotStore lock poisoned, recovering");
            PoisonError::into_inner(e)
        })
    }

    /// Capture `path` and store the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Io`] if the file exists but cannot be read.
    pub fn capture(&self, path: &Path) -> CheckpointResult<Arc<FileSnapshot>> {
        let snapshot = FileSnapshot::capture(path)?;
        debug!(
            snapshot = %snapshot.id,
            path = %path.display(),
            existed = snapshot.existed,
            size = snapshot.size,
            "captured snapshot"
        );
        Ok(self.insert(snapshot))
    }

    /// Store an already captured snapshot.
    pub fn insert(&self, snapshot: FileSnapshot) -> Arc<FileSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.write().insert(snapshot.id, Arc::clone(&snapshot));
        snapshot
    }

    /// Look up a snapshot.
    #[must_use]
    pub fn get(&self, id: &SnapshotId) -> Option<Arc<FileSnapshot>> {
        self.read().get(id).cloned()
    }

    /// Remove a snapshot, returning it if it was live.
    pub fn remove(&self, id: &SnapshotId) -> Option<Arc<FileSnapshot>> {
        self.write().remove(id)
    }

    /// Whether a snapshot is live.
    #[must_use]
    pub fn contains(&self, id: &SnapshotId) -> bool {
        self.read().contains_key(id)
    }

    /// Number of live snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capture_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"before").unwrap();

        let snap = FileSnapshot::capture(&path).unwrap();
        assert!(snap.existed);
        assert_eq!(snap.content, b"before");
        assert_eq!(snap.size, 6);
        assert!(snap.verify());
    }

    #[test]
    fn test_capture_missing_file_is_absent_sentinel() {
        let dir = TempDir::new().unwrap();
        let snap = FileSnapshot::capture(&dir.path().join("missing.txt")).unwrap();
        assert!(!snap.existed);
        assert!(snap.content.is_empty());
        assert_eq!(snap.size, 0);
    }

    #[test]
    fn test_empty_existing_file_is_not_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, b"").unwrap();
        assert!(FileSnapshot::capture(&path).unwrap().existed);
    }

    #[test]
    fn test_store_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new();
        let snap = store.capture(&dir.path().join("x")).unwrap();

        assert!(store.contains(&snap.id));
        assert_eq!(store.len(), 1);
        assert!(store.remove(&snap.id).is_some());
        assert!(store.remove(&snap.id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_info_omits_content() {
        let snap = FileSnapshot::absent(Path::new("/tmp/x"));
        let json = serde_json::to_value(snap.info()).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["existed"], false);
        assert!(snap.id.to_string().starts_with("snap:"));
    }
}
