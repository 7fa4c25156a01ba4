//! Port-assignment settings trait definition.
//!
//! The settings store owns the flat `name -> port` assignment table.
//! Implementations handle serialization and storage internally.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::StoreError;

/// Store for the persisted port assignment table.
///
/// Invariant maintained by callers: all assigned ports are pairwise
/// distinct, and a freshly allocated port is strictly greater than every
/// currently assigned port.
#[async_trait]
pub trait PortSettings: Send + Sync {
    /// Load the full assignment table.
    ///
    /// Returns an empty table if nothing is stored.
    async fn get(&self) -> Result<BTreeMap<String, u16>, StoreError>;

    /// Merge `assignments` into the persisted table.
    ///
    /// Existing entries for other names are preserved.
    async fn update(&self, assignments: BTreeMap<String, u16>) -> Result<(), StoreError>;
}
