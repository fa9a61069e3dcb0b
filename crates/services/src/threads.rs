use async_trait::async_trait;

use concierge_core::domain::turn::ConversationTurn;

use crate::ServiceError;

/// Hosting-owned persistence seam for conversation threads. The engine
/// loads a thread at the start of a run and saves it once the run reaches
/// its terminal state; it never owns thread lifecycle or ordering across
/// concurrent runs.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<Vec<ConversationTurn>>, ServiceError>;

    async fn save(
        &self,
        session_id: &str,
        turns: Vec<ConversationTurn>,
    ) -> Result<(), ServiceError>;
}
