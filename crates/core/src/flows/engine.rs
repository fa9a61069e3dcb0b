use thiserror::Error;

use crate::flows::states::{TransitionOutcome, WorkflowAction, WorkflowEvent, WorkflowState};

/// A workflow topology: which states exist and which events move between
/// them. Implementations must be pure so runs replay deterministically.
pub trait WorkflowDefinition {
    fn initial_state(&self) -> WorkflowState;
    fn transition(
        &self,
        current: &WorkflowState,
        event: &WorkflowEvent,
    ) -> Result<TransitionOutcome, WorkflowTransitionError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: WorkflowState, event: WorkflowEvent },
    #[error("run already terminal; no events accepted after END")]
    AlreadyTerminal,
}

/// The guest-support run topology:
///
/// START -> ClassifyMessage -> {RagQuery | CallAgent};
/// RagQuery -> VoiceResponse -> END;
/// CallAgent -> {END | Authorization | ToolExecution};
/// Authorization -> ToolExecution;
/// ToolExecution -> CallAgent (the agent loop).
///
/// Cancellation short-circuits any non-terminal state to END.
#[derive(Clone, Debug, Default)]
pub struct GuestSupportFlow;

impl WorkflowDefinition for GuestSupportFlow {
    fn initial_state(&self) -> WorkflowState {
        WorkflowState::Start
    }

    fn transition(
        &self,
        current: &WorkflowState,
        event: &WorkflowEvent,
    ) -> Result<TransitionOutcome, WorkflowTransitionError> {
        use WorkflowAction::{
            ClassifyIntent, ComposeResponse, ExecuteTools, GenerateTurn, PersistThread,
            QueryKnowledgeBase, RecallMemories, RequestAuthorization, WriteBackMemory,
        };
        use WorkflowEvent::{
            AuthorizationResolved, KnowledgeAnswered, MessageReceived, ResponseComposed,
            RoutedToGeneration, RoutedToKnowledge, RunCancelled, ToolCallsProposed, ToolsExecuted,
            TurnCompleted,
        };
        use WorkflowState::{
            Authorization, CallAgent, ClassifyMessage, End, RagQuery, Start, ToolExecution,
            VoiceResponse,
        };

        if current.is_terminal() {
            return Err(WorkflowTransitionError::AlreadyTerminal);
        }

        let (to, actions) = match (current, event) {
            (Start, MessageReceived) => (ClassifyMessage, vec![ClassifyIntent]),
            (ClassifyMessage, RoutedToKnowledge) => (RagQuery, vec![QueryKnowledgeBase]),
            (ClassifyMessage, RoutedToGeneration) => {
                (CallAgent, vec![RecallMemories, GenerateTurn])
            }
            (RagQuery, KnowledgeAnswered) => (VoiceResponse, vec![ComposeResponse]),
            (VoiceResponse, ResponseComposed) => (End, vec![WriteBackMemory, PersistThread]),
            (CallAgent, TurnCompleted) => (End, vec![WriteBackMemory, PersistThread]),
            (CallAgent, ToolCallsProposed { requires_authorization: true }) => {
                (Authorization, vec![RequestAuthorization])
            }
            (CallAgent, ToolCallsProposed { requires_authorization: false }) => {
                (ToolExecution, vec![ExecuteTools])
            }
            (Authorization, AuthorizationResolved) => (ToolExecution, vec![ExecuteTools]),
            (ToolExecution, ToolsExecuted) => (CallAgent, vec![RecallMemories, GenerateTurn]),
            (_, RunCancelled) => (End, Vec::new()),
            _ => {
                return Err(WorkflowTransitionError::InvalidTransition {
                    state: current.clone(),
                    event: event.clone(),
                });
            }
        };

        Ok(TransitionOutcome { from: current.clone(), to, event: event.clone(), actions })
    }
}

pub struct WorkflowEngine<F> {
    flow: F,
}

impl<F> WorkflowEngine<F>
where
    F: WorkflowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> WorkflowState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &WorkflowState,
        event: &WorkflowEvent,
    ) -> Result<TransitionOutcome, WorkflowTransitionError> {
        self.flow.transition(current, event)
    }
}

impl Default for WorkflowEngine<GuestSupportFlow> {
    fn default() -> Self {
        Self::new(GuestSupportFlow)
    }
}

#[cfg(test)]
mod tests {
    use crate::flows::engine::{GuestSupportFlow, WorkflowEngine, WorkflowTransitionError};
    use crate::flows::states::{WorkflowAction, WorkflowEvent, WorkflowState};

    fn engine() -> WorkflowEngine<GuestSupportFlow> {
        WorkflowEngine::default()
    }

    fn apply_sequence(events: &[WorkflowEvent]) -> (WorkflowState, Vec<Vec<WorkflowAction>>) {
        let engine = engine();
        let mut state = engine.initial_state();
        let mut actions = Vec::new();
        for event in events {
            let outcome = engine.apply(&state, event).expect("legal sequence");
            actions.push(outcome.actions);
            state = outcome.to;
        }
        (state, actions)
    }

    #[test]
    fn knowledge_path_runs_start_to_end() {
        let (state, actions) = apply_sequence(&[
            WorkflowEvent::MessageReceived,
            WorkflowEvent::RoutedToKnowledge,
            WorkflowEvent::KnowledgeAnswered,
            WorkflowEvent::ResponseComposed,
        ]);
        assert_eq!(state, WorkflowState::End);
        assert!(actions.last().expect("actions").contains(&WorkflowAction::PersistThread));
    }

    #[test]
    fn generation_path_without_tools_ends_after_one_turn() {
        let (state, _) = apply_sequence(&[
            WorkflowEvent::MessageReceived,
            WorkflowEvent::RoutedToGeneration,
            WorkflowEvent::TurnCompleted,
        ]);
        assert_eq!(state, WorkflowState::End);
    }

    #[test]
    fn gated_tool_batch_passes_through_authorization() {
        let (state, actions) = apply_sequence(&[
            WorkflowEvent::MessageReceived,
            WorkflowEvent::RoutedToGeneration,
            WorkflowEvent::ToolCallsProposed { requires_authorization: true },
        ]);
        assert_eq!(state, WorkflowState::Authorization);
        assert_eq!(actions.last().expect("actions"), &vec![WorkflowAction::RequestAuthorization]);

        let next = engine()
            .apply(&state, &WorkflowEvent::AuthorizationResolved)
            .expect("authorization -> tool execution");
        assert_eq!(next.to, WorkflowState::ToolExecution);
    }

    #[test]
    fn ungated_tool_batch_skips_authorization() {
        let (state, _) = apply_sequence(&[
            WorkflowEvent::MessageReceived,
            WorkflowEvent::RoutedToGeneration,
            WorkflowEvent::ToolCallsProposed { requires_authorization: false },
        ]);
        assert_eq!(state, WorkflowState::ToolExecution);
    }

    #[test]
    fn tool_execution_always_loops_back_to_generation() {
        let outcome = engine()
            .apply(&WorkflowState::ToolExecution, &WorkflowEvent::ToolsExecuted)
            .expect("loop edge");
        assert_eq!(outcome.to, WorkflowState::CallAgent);
        assert!(outcome.actions.contains(&WorkflowAction::GenerateTurn));
    }

    #[test]
    fn cancellation_short_circuits_any_state_to_end() {
        for state in [
            WorkflowState::Start,
            WorkflowState::ClassifyMessage,
            WorkflowState::CallAgent,
            WorkflowState::Authorization,
            WorkflowState::ToolExecution,
        ] {
            let outcome =
                engine().apply(&state, &WorkflowEvent::RunCancelled).expect("cancel edge");
            assert_eq!(outcome.to, WorkflowState::End);
            assert!(outcome.actions.is_empty());
        }
    }

    #[test]
    fn illegal_edges_are_rejected() {
        let error = engine()
            .apply(&WorkflowState::Start, &WorkflowEvent::ToolsExecuted)
            .expect_err("start cannot execute tools");
        assert!(matches!(error, WorkflowTransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn terminal_state_accepts_no_further_events() {
        let error = engine()
            .apply(&WorkflowState::End, &WorkflowEvent::MessageReceived)
            .expect_err("end is terminal");
        assert_eq!(error, WorkflowTransitionError::AlreadyTerminal);
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let events = [
            WorkflowEvent::MessageReceived,
            WorkflowEvent::RoutedToGeneration,
            WorkflowEvent::ToolCallsProposed { requires_authorization: true },
            WorkflowEvent::AuthorizationResolved,
            WorkflowEvent::ToolsExecuted,
            WorkflowEvent::TurnCompleted,
        ];
        let first = apply_sequence(&events);
        let second = apply_sequence(&events);
        assert_eq!(first, second);
        assert_eq!(first.0, WorkflowState::End);
    }
}
