use std::collections::VecDeque;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use concierge_core::domain::turn::{ConversationTurn, ProposedToolCall};

/// One unit of model output on the producer/consumer channel.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelEvent {
    Fragment(String),
    ToolCall(ProposedToolCall),
    Done,
}

/// Pluggable language-model transport. Implementations stream narrative
/// fragments and tool proposals onto the channel and finish with `Done`;
/// the generation engine owns interpretation, fallback, and filtering.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn stream_turn(
        &self,
        history: &[ConversationTurn],
        system_prompt: &str,
        events: mpsc::Sender<ModelEvent>,
    ) -> Result<()>;
}

/// A scripted turn: fragments first, then tool proposals.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTurn {
    pub fragments: Vec<String>,
    pub tool_calls: Vec<ProposedToolCall>,
}

impl ScriptedTurn {
    pub fn text(content: &str) -> Self {
        Self { fragments: vec![content.to_string()], tool_calls: Vec::new() }
    }

    pub fn with_calls(content: &str, tool_calls: Vec<ProposedToolCall>) -> Self {
        Self { fragments: vec![content.to_string()], tool_calls }
    }
}

/// Deterministic model used by tests and demos: pops one scripted turn per
/// call. Once the script runs out it closes politely with no proposals,
/// which terminates the agent loop.
#[derive(Default)]
pub struct ScriptedChatModel {
    turns: Mutex<VecDeque<ScriptedTurn>>,
}

impl ScriptedChatModel {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self { turns: Mutex::new(turns.into()) }
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn stream_turn(
        &self,
        _history: &[ConversationTurn],
        _system_prompt: &str,
        events: mpsc::Sender<ModelEvent>,
    ) -> Result<()> {
        let turn = {
            let mut turns = self.turns.lock().await;
            turns.pop_front().unwrap_or_else(|| ScriptedTurn::text("Is there anything else I can help with?"))
        };

        for fragment in turn.fragments {
            events.send(ModelEvent::Fragment(fragment)).await?;
        }
        for call in turn.tool_calls {
            events.send(ModelEvent::ToolCall(call)).await?;
        }
        events.send(ModelEvent::Done).await?;
        Ok(())
    }
}

/// A model whose every call fails; exercises the fixed-fallback policy.
#[derive(Clone, Debug, Default)]
pub struct FailingChatModel;

#[async_trait]
impl ChatModel for FailingChatModel {
    async fn stream_turn(
        &self,
        _history: &[ConversationTurn],
        _system_prompt: &str,
        _events: mpsc::Sender<ModelEvent>,
    ) -> Result<()> {
        anyhow::bail!("model endpoint unreachable")
    }
}
