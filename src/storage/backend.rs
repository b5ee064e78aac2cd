use async_trait::async_trait;

use super::types::StorageError;

/// Page-lifetime key-value storage.
///
/// The persistence layer only needs string get/set/remove. Backends may fail
/// at any time (quota, locked database); callers decide whether that matters.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
