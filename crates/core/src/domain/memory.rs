use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A durable, guest-specific snippet recalled across sessions. The external
/// memory store owns its lifecycle; the engine only reads and writes through
/// the adapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub owner_namespace: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// The slice of a memory record the engine folds into system priming.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalledMemory {
    pub id: String,
    pub text: String,
}

impl From<MemoryRecord> for RecalledMemory {
    fn from(record: MemoryRecord) -> Self {
        Self { id: record.id, text: record.text }
    }
}
