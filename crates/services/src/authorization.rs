use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use concierge_core::domain::authorization::AuthorizationStatus;

use crate::ServiceError;

/// Answer to a consent request. `Completed` means the tool may run now;
/// `Pending` carries the human-facing URL the guest must visit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationTicket {
    pub request_id: String,
    pub status: AuthorizationStatus,
    pub authorization_url: Option<String>,
}

#[async_trait]
pub trait AuthorizationService: Send + Sync {
    async fn request_authorization(
        &self,
        tool_name: &str,
        user_id: &str,
    ) -> Result<AuthorizationTicket, ServiceError>;

    async fn poll(&self, request_id: &str) -> Result<AuthorizationStatus, ServiceError>;
}
