use async_trait::async_trait;

use concierge_core::domain::memory::MemoryRecord;

use crate::ServiceError;

/// Namespaced external semantic store for guest-specific recall. The store
/// owns record lifecycle and ranking; the engine only searches and puts.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn search(
        &self,
        namespace: &str,
        query: &str,
    ) -> Result<Vec<MemoryRecord>, ServiceError>;

    async fn put(&self, namespace: &str, id: &str, text: &str) -> Result<(), ServiceError>;
}
