pub mod engine;
pub mod states;

pub use engine::{GuestSupportFlow, WorkflowDefinition, WorkflowEngine, WorkflowTransitionError};
pub use states::{TransitionOutcome, WorkflowAction, WorkflowEvent, WorkflowState};
