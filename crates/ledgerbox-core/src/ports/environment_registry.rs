//! Environment registry trait definition.
//!
//! This port defines the interface for persisting environment
//! descriptors. Implementations handle all storage details internally.

use async_trait::async_trait;

use super::StoreError;
use crate::environment::EnvironmentDescriptor;

/// Repository for persisted environment descriptors.
#[async_trait]
pub trait EnvironmentRegistry: Send + Sync {
    /// Look up the descriptor for `name`.
    ///
    /// Returns `Err(StoreError::NotFound)` if no descriptor is persisted.
    async fn get(&self, name: &str) -> Result<EnvironmentDescriptor, StoreError>;

    /// Persist a descriptor, replacing any existing entry for its name.
    async fn add(&self, descriptor: EnvironmentDescriptor) -> Result<(), StoreError>;

    /// Delete the descriptor for `name`.
    ///
    /// With `silent`, a missing entry is not an error.
    async fn delete(&self, name: &str, silent: bool) -> Result<(), StoreError>;

    /// List all persisted descriptors.
    ///
    /// Used to rehydrate runtime controllers at process start.
    async fn list(&self) -> Result<Vec<EnvironmentDescriptor>, StoreError>;
}
