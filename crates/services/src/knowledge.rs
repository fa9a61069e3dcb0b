use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ServiceError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    pub title: String,
    pub score: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeAnswer {
    pub answer_text: String,
    pub sources: Vec<KnowledgeSource>,
}

/// Property-scoped retrieval over the guest-facing knowledge base.
/// Chunking, embedding and ranking are the implementation's own business.
#[async_trait]
pub trait KnowledgeRetrieval: Send + Sync {
    async fn answer(&self, question: &str, property_id: &str)
        -> Result<KnowledgeAnswer, ServiceError>;
}
