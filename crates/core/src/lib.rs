//! Concierge Core - domain model and deterministic decision logic
//!
//! This crate holds everything about the guest-support engine that can be
//! expressed without I/O:
//! - The conversation data model (`domain`) - turns, sessions, tool calls
//! - Intent classification (`classifier`) - closed-label keyword scoring
//! - Conversation routing (`router`) - intent -> knowledge vs. generation
//! - The workflow state machine (`flows`) - the legal run topology
//! - Configuration (`config`) and the error taxonomy (`errors`)
//!
//! # Safety Principle
//!
//! The language model is strictly a narrator and tool proposer. It NEVER
//! executes a tool, grants an authorization, or decides routing. Those are
//! deterministic decisions made here and enforced by the agent runtime.

pub mod classifier;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod router;

pub use classifier::{Classification, MessageClassifier};
pub use config::{ConfigError, ConfigOverrides, EngineConfig, LoadOptions};
pub use domain::authorization::{AuthorizationRequest, AuthorizationStatus};
pub use domain::intent::IntentLabel;
pub use domain::memory::{MemoryRecord, RecalledMemory};
pub use domain::session::{GuestRequest, PropertyContext, RunOutcome, SessionState};
pub use domain::turn::{ConversationTurn, ProposedToolCall, Role, ToolCallResult};
pub use errors::StepError;
pub use flows::{
    GuestSupportFlow, TransitionOutcome, WorkflowDefinition, WorkflowEngine, WorkflowEvent,
    WorkflowState, WorkflowTransitionError,
};
pub use router::{route, RoutePath, RoutePolicy};
