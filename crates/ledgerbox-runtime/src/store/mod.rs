//! File-backed implementations of the persistence ports.
//!
//! Descriptors live as one JSON document per environment; the port
//! assignment table is a single JSON document. Writes go through a
//! temporary file followed by a rename so a crash cannot leave a torn
//! document behind.

mod registry;
mod settings;

pub use registry::FileEnvironmentRegistry;
pub use settings::FilePortSettings;

use ledgerbox_core::StoreError;
use std::path::Path;

/// Serialize `value` and persist it at `path` via write-then-rename.
async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;
    }

    let json =
        serde_json::to_vec_pretty(value).map_err(|e| StoreError::Serialization(e.to_string()))?;

    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, &json)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::Storage(e.to_string()))?;

    Ok(())
}
