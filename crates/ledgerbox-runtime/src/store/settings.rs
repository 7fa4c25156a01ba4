//! JSON-file port assignment table.

use async_trait::async_trait;
use ledgerbox_core::{PortSettings, StoreError};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::write_json;

/// Port settings persisting the assignment table as one JSON document.
pub struct FilePortSettings {
    path: PathBuf,
}

impl FilePortSettings {
    /// Create a store backed by the document at `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl PortSettings for FilePortSettings {
    async fn get(&self) -> Result<BTreeMap<String, u16>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StoreError::Storage(e.to_string())),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn update(&self, assignments: BTreeMap<String, u16>) -> Result<(), StoreError> {
        let mut table = self.get().await?;
        table.extend(assignments);
        write_json(&self.path, &table).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_store_reads_empty_table() {
        let temp = TempDir::new().unwrap();
        let store = FilePortSettings::new(temp.path().join("ports.json"));
        assert!(store.get().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_assignments() {
        let temp = TempDir::new().unwrap();
        let store = FilePortSettings::new(temp.path().join("ports.json"));

        store
            .update(BTreeMap::from([("alpha".to_string(), 17050)]))
            .await
            .unwrap();
        store
            .update(BTreeMap::from([("beta".to_string(), 17070)]))
            .await
            .unwrap();

        let table = store.get().await.unwrap();
        assert_eq!(table.get("alpha"), Some(&17050));
        assert_eq!(table.get("beta"), Some(&17070));
    }

    #[tokio::test]
    async fn test_update_overwrites_existing_entry() {
        let temp = TempDir::new().unwrap();
        let store = FilePortSettings::new(temp.path().join("ports.json"));

        store
            .update(BTreeMap::from([("alpha".to_string(), 17050)]))
            .await
            .unwrap();
        store
            .update(BTreeMap::from([("alpha".to_string(), 17090)]))
            .await
            .unwrap();

        let table = store.get().await.unwrap();
        assert_eq!(table.get("alpha"), Some(&17090));
        assert_eq!(table.len(), 1);
    }
}
