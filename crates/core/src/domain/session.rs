use serde::{Deserialize, Serialize};

use crate::domain::authorization::AuthorizationRequest;
use crate::domain::intent::IntentLabel;
use crate::domain::memory::RecalledMemory;
use crate::domain::turn::ConversationTurn;

/// Tenant- and property-specific priming folded into every generation call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyContext {
    pub tenant_id: String,
    pub property_id: String,
    pub property_name: String,
    pub personality_summary: String,
}

impl PropertyContext {
    pub fn new(
        tenant_id: impl Into<String>,
        property_id: impl Into<String>,
        property_name: impl Into<String>,
        personality_summary: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            property_id: property_id.into(),
            property_name: property_name.into(),
            personality_summary: personality_summary.into(),
        }
    }
}

/// One incoming guest message, addressed to a session that may or may not
/// already exist. The hosting layer owns session-id issuance for new runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuestRequest {
    pub message: String,
    pub user_id: String,
    pub session_id: Option<String>,
}

impl GuestRequest {
    pub fn new(message: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self { message: message.into(), user_id: user_id.into(), session_id: None }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Mutable context of one run. Exclusively owned by the run processing it;
/// concurrent runs for the same session id are serialized by the hosting
/// layer, not here.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub session_id: String,
    pub user_id: String,
    pub property: PropertyContext,
    pub messages: Vec<ConversationTurn>,
    pub classified_intent: Option<IntentLabel>,
    pub memories: Vec<RecalledMemory>,
    pub pending_authorizations: Vec<AuthorizationRequest>,
    pub response: Option<String>,
    pub requires_human: bool,
    pub confidence_score: f32,
}

impl SessionState {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        property: PropertyContext,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            property,
            messages: Vec::new(),
            classified_intent: None,
            memories: Vec::new(),
            pending_authorizations: Vec::new(),
            response: None,
            requires_human: false,
            confidence_score: 0.0,
        }
    }

    pub fn push_turn(&mut self, turn: ConversationTurn) {
        self.messages.push(turn);
    }

    pub fn latest_guest_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|turn| turn.role == crate::domain::turn::Role::Guest)
            .map(|turn| turn.content.as_str())
    }

    /// Namespace under which this guest's memories live in the external store.
    pub fn memory_namespace(&self) -> String {
        format!("{}:{}:{}", self.property.tenant_id, self.property.property_id, self.user_id)
    }
}

/// The record handed back to the hosting layer once a run reaches END.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub response: String,
    pub confidence_score: f32,
    pub requires_human: bool,
    pub intent: IntentLabel,
    pub session_id: String,
}

impl RunOutcome {
    /// Finalizes a session into the outward record, clamping confidence into
    /// [0, 1] so the contract holds even if a step misbehaved.
    pub fn from_session(session: &SessionState) -> Self {
        Self {
            response: session.response.clone().unwrap_or_default(),
            confidence_score: session.confidence_score.clamp(0.0, 1.0),
            requires_human: session.requires_human,
            intent: session.classified_intent.unwrap_or(IntentLabel::Other),
            session_id: session.session_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::intent::IntentLabel;
    use crate::domain::turn::ConversationTurn;

    use super::{PropertyContext, RunOutcome, SessionState};

    fn session_fixture() -> SessionState {
        SessionState::new(
            "sess-1",
            "guest-7",
            PropertyContext::new("tenant-1", "prop-9", "Harbor Grand", "warm, concise"),
        )
    }

    #[test]
    fn latest_guest_message_skips_assistant_turns() {
        let mut session = session_fixture();
        session.push_turn(ConversationTurn::guest("first"));
        session.push_turn(ConversationTurn::assistant("reply"));
        session.push_turn(ConversationTurn::guest("second"));
        assert_eq!(session.latest_guest_message(), Some("second"));
    }

    #[test]
    fn memory_namespace_is_tenant_property_user_scoped() {
        let session = session_fixture();
        assert_eq!(session.memory_namespace(), "tenant-1:prop-9:guest-7");
    }

    #[test]
    fn outcome_clamps_confidence_and_defaults_intent() {
        let mut session = session_fixture();
        session.confidence_score = 1.7;
        let outcome = RunOutcome::from_session(&session);
        assert_eq!(outcome.confidence_score, 1.0);
        assert_eq!(outcome.intent, IntentLabel::Other);
        assert!(!outcome.requires_human);
    }
}
