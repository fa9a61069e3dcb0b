use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Pending,
    Completed,
    Failed,
}

impl AuthorizationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One human-consent request for a gated tool call. Pending may move to
/// completed or failed exactly once; there is no implicit retry. A fresh
/// attempt requires a new guest-initiated turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub tool_name: String,
    pub request_id: String,
    pub status: AuthorizationStatus,
    pub authorization_url: Option<String>,
}

impl AuthorizationRequest {
    pub fn pending(
        tool_name: impl Into<String>,
        request_id: impl Into<String>,
        authorization_url: Option<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            request_id: request_id.into(),
            status: AuthorizationStatus::Pending,
            authorization_url,
        }
    }

    pub fn resolve(&mut self, status: AuthorizationStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthorizationRequest, AuthorizationStatus};

    #[test]
    fn pending_resolves_once_then_refuses_changes() {
        let mut request =
            AuthorizationRequest::pending("create_booking", "auth-1", Some("https://a".into()));
        assert!(request.resolve(AuthorizationStatus::Completed));
        assert!(!request.resolve(AuthorizationStatus::Failed));
        assert_eq!(request.status, AuthorizationStatus::Completed);
    }

    #[test]
    fn resolving_to_pending_is_rejected() {
        let mut request = AuthorizationRequest::pending("place_order", "auth-2", None);
        assert!(!request.resolve(AuthorizationStatus::Pending));
        assert_eq!(request.status, AuthorizationStatus::Pending);
    }
}
