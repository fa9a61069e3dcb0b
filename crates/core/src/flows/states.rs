use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    Start,
    ClassifyMessage,
    RagQuery,
    VoiceResponse,
    CallAgent,
    Authorization,
    ToolExecution,
    End,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowEvent {
    MessageReceived,
    RoutedToKnowledge,
    RoutedToGeneration,
    KnowledgeAnswered,
    ResponseComposed,
    /// The latest generation turn proposed zero tool calls.
    TurnCompleted,
    /// The latest generation turn proposed at least one tool call.
    ToolCallsProposed { requires_authorization: bool },
    AuthorizationResolved,
    ToolsExecuted,
    RunCancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowAction {
    ClassifyIntent,
    QueryKnowledgeBase,
    RecallMemories,
    GenerateTurn,
    RequestAuthorization,
    ExecuteTools,
    ComposeResponse,
    WriteBackMemory,
    PersistThread,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub event: WorkflowEvent,
    pub actions: Vec<WorkflowAction>,
}
