//! JSON-file environment registry.

use async_trait::async_trait;
use ledgerbox_core::{EnvironmentDescriptor, EnvironmentRegistry, StoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::write_json;

/// Environment registry persisting one JSON document per environment.
pub struct FileEnvironmentRegistry {
    root: PathBuf,
}

impl FileEnvironmentRegistry {
    /// Create a registry rooted at `root`. The directory is created on
    /// first write.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

#[async_trait]
impl EnvironmentRegistry for FileEnvironmentRegistry {
    async fn get(&self, name: &str) -> Result<EnvironmentDescriptor, StoreError> {
        let path = self.entry_path(name);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound(name.to_string())
            } else {
                StoreError::Storage(e.to_string())
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn add(&self, descriptor: EnvironmentDescriptor) -> Result<(), StoreError> {
        let path = self.entry_path(&descriptor.name);
        write_json(&path, &descriptor).await
    }

    async fn delete(&self, name: &str, silent: bool) -> Result<(), StoreError> {
        let path = self.entry_path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if silent {
                    Ok(())
                } else {
                    Err(StoreError::NotFound(name.to_string()))
                }
            }
            Err(e) => Err(StoreError::Storage(e.to_string())),
        }
    }

    async fn list(&self) -> Result<Vec<EnvironmentDescriptor>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Storage(e.to_string())),
        };

        let mut descriptors = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_descriptor(&path).await {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(error) => {
                    // A corrupt entry must not take the whole registry down
                    warn!(path = %path.display(), %error, "Skipping unreadable registry entry");
                }
            }
        }

        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(descriptors)
    }
}

async fn read_descriptor(path: &Path) -> Result<EnvironmentDescriptor, StoreError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn descriptor(name: &str, port: u16) -> EnvironmentDescriptor {
        EnvironmentDescriptor::new(name, port, 1, PathBuf::from("/tmp").join(name))
    }

    #[tokio::test]
    async fn test_add_get_roundtrip() {
        let temp = TempDir::new().unwrap();
        let registry = FileEnvironmentRegistry::new(temp.path().to_path_buf());

        registry.add(descriptor("demo", 17050)).await.unwrap();
        let loaded = registry.get("demo").await.unwrap();
        assert_eq!(loaded.name, "demo");
        assert_eq!(loaded.port, 17050);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let registry = FileEnvironmentRegistry::new(temp.path().to_path_buf());
        assert!(matches!(
            registry.get("ghost").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_silent_tolerates_missing() {
        let temp = TempDir::new().unwrap();
        let registry = FileEnvironmentRegistry::new(temp.path().to_path_buf());

        registry.delete("ghost", true).await.unwrap();
        assert!(matches!(
            registry.delete("ghost", false).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_entries() {
        let temp = TempDir::new().unwrap();
        let registry = FileEnvironmentRegistry::new(temp.path().to_path_buf());

        registry.add(descriptor("beta", 17070)).await.unwrap();
        registry.add(descriptor("alpha", 17050)).await.unwrap();
        std::fs::write(temp.path().join("broken.json"), b"not json").unwrap();

        let names: Vec<String> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);
    }
}
