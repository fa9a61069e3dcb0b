use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use concierge_core::domain::memory::RecalledMemory;
use concierge_services::MemoryStore;

/// Bridges the run loop to the cross-session memory store. Recall and
/// capture are both best-effort: a broken store degrades the answer, it
/// never aborts the run.
pub struct MemoryAdapter {
    store: Arc<dyn MemoryStore>,
    directive: String,
}

impl MemoryAdapter {
    pub fn new(store: Arc<dyn MemoryStore>, directive: impl Into<String>) -> Self {
        Self { store, directive: directive.into() }
    }

    pub async fn recall(&self, namespace: &str, query: &str) -> Vec<RecalledMemory> {
        match self.store.search(namespace, query).await {
            Ok(records) => records.into_iter().map(RecalledMemory::from).collect(),
            Err(error) => {
                warn!(
                    event_name = "memory.recall_failed",
                    namespace,
                    error = %error,
                );
                Vec::new()
            }
        }
    }

    /// Whether the guest asked us to keep something for later. Matching is
    /// case-insensitive on the configured directive word.
    pub fn wants_capture(&self, message: &str) -> bool {
        message.to_lowercase().contains(&self.directive.to_lowercase())
    }

    /// Stores the guest's message verbatim under a fresh id. The write is
    /// awaited so the record is durable before the run completes, but a
    /// store failure is logged and swallowed.
    pub async fn capture_directive(&self, namespace: &str, message: &str) {
        let id = Uuid::new_v4().to_string();
        match self.store.put(namespace, &id, message).await {
            Ok(()) => {
                debug!(event_name = "memory.captured", namespace, memory_id = %id);
            }
            Err(error) => {
                warn!(
                    event_name = "memory.capture_failed",
                    namespace,
                    error = %error,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use concierge_services::{FailingMemoryStore, InMemoryMemoryStore, MemoryStore};

    use super::MemoryAdapter;

    #[tokio::test]
    async fn recall_maps_records_and_drops_store_internals() {
        let store = Arc::new(InMemoryMemoryStore::new());
        store.put("t1:p1:guest-1", "m-1", "prefers a feather-free room").await.expect("put");

        let adapter = MemoryAdapter::new(store, "remember");
        let recalled = adapter.recall("t1:p1:guest-1", "feather room").await;
        assert_eq!(recalled.len(), 1);
        assert_eq!(recalled[0].text, "prefers a feather-free room");
    }

    #[tokio::test]
    async fn recall_failure_degrades_to_empty() {
        let adapter = MemoryAdapter::new(Arc::new(FailingMemoryStore), "remember");
        assert!(adapter.recall("t1:p1:guest-1", "anything").await.is_empty());
    }

    #[tokio::test]
    async fn directive_matching_is_case_insensitive() {
        let adapter = MemoryAdapter::new(Arc::new(InMemoryMemoryStore::new()), "remember");
        assert!(adapter.wants_capture("Please REMEMBER that I am allergic to nuts"));
        assert!(!adapter.wants_capture("What time does the pool open?"));
    }

    #[tokio::test]
    async fn capture_stores_the_message_verbatim() {
        let store = Arc::new(InMemoryMemoryStore::new());
        let adapter = MemoryAdapter::new(store.clone(), "remember");

        let message = "Remember that I always want a late checkout";
        adapter.capture_directive("t1:p1:guest-1", message).await;

        let records = store.records_in("t1:p1:guest-1").await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, message);
    }

    #[tokio::test]
    async fn capture_failure_is_swallowed() {
        let adapter = MemoryAdapter::new(Arc::new(FailingMemoryStore), "remember");
        adapter.capture_directive("t1:p1:guest-1", "remember my birthday").await;
    }
}
