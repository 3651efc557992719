//! Pluggable persistence backends.
//!
//! Records are whole JSON documents keyed by `(namespace, id)`. The process
//! entry point owns the backend lifecycle and injects it into the entity
//! stores, so tests can swap in [`MemoryBackend`] without touching the disk.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

/// Keyed document storage.
///
/// `namespace` groups records of one entity kind ("chats", "users"); `id`
/// identifies one record within it. Payloads are opaque strings, JSON
/// documents in practice.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Fetch a record, or `None` if absent.
    async fn read(&self, namespace: &str, id: &str) -> Result<Option<String>>;

    /// Create or atomically replace a record.
    async fn write(&self, namespace: &str, id: &str, payload: &str) -> Result<()>;

    /// Delete a record. Returns `false` if it did not exist.
    async fn remove(&self, namespace: &str, id: &str) -> Result<bool>;

    /// List record ids present in a namespace, in unspecified order.
    async fn list(&self, namespace: &str) -> Result<Vec<String>>;
}

// =============================================================================
// File backend
// =============================================================================

/// One JSON file per record at `<root>/<namespace>/<id>.json`.
///
/// Writes land in a `.tmp` sibling first and are renamed into place, so a
/// crash mid-write never leaves a half-written record visible.
pub struct JsonFileBackend {
    root: PathBuf,
}

impl JsonFileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, namespace: &str, id: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{}.json", id))
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    async fn read(&self, namespace: &str, id: &str) -> Result<Option<String>> {
        let path = self.record_path(namespace, id);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, namespace: &str, id: &str, payload: &str) -> Result<()> {
        let path = self.record_path(namespace, id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, namespace: &str, id: &str) -> Result<bool> {
        let path = self.record_path(namespace, id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>> {
        let dir = self.root.join(namespace);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        Ok(ids)
    }
}

// =============================================================================
// In-memory backend
// =============================================================================

/// In-memory backend for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<(String, String), String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn read(&self, namespace: &str, id: &str) -> Result<Option<String>> {
        let records = self.records.read().await;
        Ok(records.get(&(namespace.to_string(), id.to_string())).cloned())
    }

    async fn write(&self, namespace: &str, id: &str, payload: &str) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(
            (namespace.to_string(), id.to_string()),
            payload.to_string(),
        );
        Ok(())
    }

    async fn remove(&self, namespace: &str, id: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        Ok(records
            .remove(&(namespace.to_string(), id.to_string()))
            .is_some())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>> {
        let records = self.records.read().await;
        Ok(records
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, id)| id.clone())
            .collect())
    }
}
