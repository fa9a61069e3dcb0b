use thiserror::Error;

use crate::flows::engine::WorkflowTransitionError;

/// Failures a single orchestrator step can raise. Policy per variant:
/// everything here is recovered inside the run; the guest-facing channel
/// always receives a well-formed outcome.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("classification failed: {0}")]
    Classification(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("knowledge retrieval failed: {0}")]
    Knowledge(String),
    #[error("authorization for {tool_name} failed: {reason}")]
    Authorization { tool_name: String, reason: String },
    #[error("tool {tool_name} failed: {reason}")]
    ToolExecution { tool_name: String, reason: String },
    #[error("memory store failed: {0}")]
    MemoryStore(String),
    #[error(transparent)]
    Workflow(#[from] WorkflowTransitionError),
    #[error("run cancelled by caller")]
    Cancelled,
}

impl StepError {
    /// Whether the run can keep going after this error. Only a workflow
    /// fault (a bug in the engine itself) aborts the remaining steps, and
    /// even that is folded into a hand-off outcome rather than raised.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Workflow(_) | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use crate::flows::engine::WorkflowTransitionError;
    use crate::flows::states::{WorkflowEvent, WorkflowState};

    use super::StepError;

    #[test]
    fn service_level_failures_are_recoverable() {
        let errors = [
            StepError::Classification("tokenizer panic".into()),
            StepError::Generation("model unreachable".into()),
            StepError::Knowledge("index offline".into()),
            StepError::Authorization {
                tool_name: "create_booking".into(),
                reason: "timed out".into(),
            },
            StepError::ToolExecution { tool_name: "place_order".into(), reason: "rejected".into() },
            StepError::MemoryStore("search unavailable".into()),
        ];
        for error in errors {
            assert!(error.is_recoverable(), "{error}");
        }
    }

    #[test]
    fn workflow_faults_and_cancellation_are_not() {
        let workflow = StepError::from(WorkflowTransitionError::InvalidTransition {
            state: WorkflowState::Start,
            event: WorkflowEvent::ToolsExecuted,
        });
        assert!(!workflow.is_recoverable());
        assert!(!StepError::Cancelled.is_recoverable());
    }

    #[test]
    fn display_includes_tool_name_for_gated_failures() {
        let error = StepError::Authorization {
            tool_name: "create_booking".into(),
            reason: "human declined".into(),
        };
        let rendered = error.to_string();
        assert!(rendered.contains("create_booking"));
        assert!(rendered.contains("human declined"));
    }
}
