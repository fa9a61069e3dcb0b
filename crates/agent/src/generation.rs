use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use concierge_core::domain::turn::{ConversationTurn, ProposedToolCall};

use crate::llm::{ChatModel, ModelEvent};
use crate::stream::Emitter;

/// Fixed guest-facing text used when the model call fails outright.
pub const FALLBACK_RESPONSE: &str =
    "I'm sorry, I'm having trouble responding right now. A member of our team will follow up with you shortly.";

/// Confidence attached to the fallback turn. Below the default escalation
/// threshold so degraded turns always reach a human.
pub const FALLBACK_CONFIDENCE: f32 = 0.3;

/// One fully collected generation turn.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationTurn {
    pub text: String,
    pub proposals: Vec<ProposedToolCall>,
    /// True when the underlying model call failed and the fixed fallback
    /// was substituted. A degraded turn never carries proposals.
    pub degraded: bool,
}

/// Wraps a `ChatModel` behind a producer/consumer channel, forwarding
/// fragments to the run emitter as they arrive. This is the orchestrator's
/// principal suspension point: no other session state mutates while a call
/// is in flight.
pub struct GenerationEngine {
    model: Arc<dyn ChatModel>,
}

impl GenerationEngine {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub async fn generate(
        &self,
        history: &[ConversationTurn],
        system_prompt: &str,
        emitter: &Emitter,
    ) -> GenerationTurn {
        let (tx, mut rx) = mpsc::channel::<ModelEvent>(32);

        let mut text = String::new();
        let mut proposals: Vec<ProposedToolCall> = Vec::new();

        let collect = async {
            while let Some(event) = rx.recv().await {
                match event {
                    ModelEvent::Fragment(fragment) => {
                        emitter.fragment(&fragment).await;
                        text.push_str(&fragment);
                    }
                    ModelEvent::ToolCall(mut call) => {
                        if call.has_executable_name() {
                            // Results are matched back by call_id, so ids
                            // within one turn must be unique.
                            if proposals.iter().any(|p| p.call_id == call.call_id) {
                                let base = call.call_id.clone();
                                let mut suffix = 2;
                                while proposals
                                    .iter()
                                    .any(|p| p.call_id == format!("{base}-{suffix}"))
                                {
                                    suffix += 1;
                                }
                                debug!(
                                    event_name = "generation.duplicate_call_id_renamed",
                                    call_id = %base,
                                    "model reused a call id within one turn"
                                );
                                call.call_id = format!("{base}-{suffix}");
                            }
                            proposals.push(call);
                        } else {
                            debug!(
                                event_name = "generation.blank_tool_name_dropped",
                                call_id = %call.call_id,
                                "dropping proposal with blank tool name"
                            );
                        }
                    }
                    ModelEvent::Done => break,
                }
            }
        };

        let (model_result, ()) =
            tokio::join!(self.model.stream_turn(history, system_prompt, tx), collect);

        match model_result {
            Ok(()) => GenerationTurn { text, proposals, degraded: false },
            Err(error) => {
                warn!(
                    event_name = "generation.model_failed",
                    error = %error,
                    "model call failed, substituting fixed fallback"
                );
                GenerationTurn {
                    text: FALLBACK_RESPONSE.to_string(),
                    proposals: Vec::new(),
                    degraded: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::sync::mpsc;

    use concierge_core::domain::turn::ProposedToolCall;

    use crate::llm::{FailingChatModel, ScriptedChatModel, ScriptedTurn};
    use crate::stream::{Emitter, RunEvent};

    use super::{GenerationEngine, FALLBACK_RESPONSE};

    #[tokio::test]
    async fn collects_fragments_and_proposals() {
        let model = ScriptedChatModel::new(vec![ScriptedTurn {
            fragments: vec!["Let me ".to_string(), "check that.".to_string()],
            tool_calls: vec![ProposedToolCall::new(
                "check_availability",
                json!({"service_type": "spa", "date": "2026-09-01", "time": "15:00:00"}),
                "call-1",
            )],
        }]);
        let engine = GenerationEngine::new(Arc::new(model));

        let turn = engine.generate(&[], "system", &Emitter::disabled()).await;
        assert_eq!(turn.text, "Let me check that.");
        assert_eq!(turn.proposals.len(), 1);
        assert!(!turn.degraded);
    }

    #[tokio::test]
    async fn blank_named_proposals_are_silently_dropped() {
        let model = ScriptedChatModel::new(vec![ScriptedTurn {
            fragments: vec!["Working on it.".to_string()],
            tool_calls: vec![
                ProposedToolCall::new("  ", json!({}), "call-blank"),
                ProposedToolCall::new("place_order", json!({}), "call-kept"),
            ],
        }]);
        let engine = GenerationEngine::new(Arc::new(model));

        let turn = engine.generate(&[], "system", &Emitter::disabled()).await;
        assert_eq!(turn.proposals.len(), 1);
        assert_eq!(turn.proposals[0].call_id, "call-kept");
    }

    #[tokio::test]
    async fn duplicate_call_ids_within_a_turn_are_made_unique() {
        let model = ScriptedChatModel::new(vec![ScriptedTurn {
            fragments: vec!["Doing both.".to_string()],
            tool_calls: vec![
                ProposedToolCall::new("check_availability", json!({}), "call-1"),
                ProposedToolCall::new("lookup_service_info", json!({}), "call-1"),
                ProposedToolCall::new("calculate_price", json!({}), "call-1"),
            ],
        }]);
        let engine = GenerationEngine::new(Arc::new(model));

        let turn = engine.generate(&[], "system", &Emitter::disabled()).await;
        let ids: Vec<&str> = turn.proposals.iter().map(|p| p.call_id.as_str()).collect();
        assert_eq!(ids, vec!["call-1", "call-1-2", "call-1-3"]);
    }

    #[tokio::test]
    async fn model_failure_yields_fixed_fallback_with_zero_proposals() {
        let engine = GenerationEngine::new(Arc::new(FailingChatModel));
        let turn = engine.generate(&[], "system", &Emitter::disabled()).await;
        assert_eq!(turn.text, FALLBACK_RESPONSE);
        assert!(turn.proposals.is_empty());
        assert!(turn.degraded);
    }

    #[tokio::test]
    async fn fragments_are_forwarded_to_the_emitter_as_they_arrive() {
        let model = ScriptedChatModel::new(vec![ScriptedTurn {
            fragments: vec!["one".to_string(), "two".to_string()],
            tool_calls: Vec::new(),
        }]);
        let engine = GenerationEngine::new(Arc::new(model));

        let (tx, mut rx) = mpsc::channel(8);
        let emitter = Emitter::new(tx);
        let turn = engine.generate(&[], "system", &emitter).await;
        assert_eq!(turn.text, "onetwo");
        assert_eq!(rx.recv().await, Some(RunEvent::Fragment("one".to_string())));
        assert_eq!(rx.recv().await, Some(RunEvent::Fragment("two".to_string())));
    }
}
