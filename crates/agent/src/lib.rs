//! Concierge Agent - the conversational orchestration runtime
//!
//! This crate sequences one guest message through the full support
//! pipeline: classify, route, retrieve or generate, gate and execute tool
//! calls, recall and capture memories, and stream the response back.
//!
//! # Architecture
//!
//! 1. **Generation** (`generation`, `llm`) - streams narrative fragments
//!    and tool proposals from a pluggable `ChatModel`
//! 2. **Authorization** (`authorization`) - human-consent gate with a
//!    bounded wait for gated tools
//! 3. **Execution** (`tools`) - closed dispatch table over the front-desk
//!    collaborators; no business logic of its own
//! 4. **Memory** (`memory`) - namespaced recall and verbatim capture
//! 5. **Orchestration** (`orchestrator`) - drives the workflow state
//!    machine from START to END and always answers
//!
//! # Safety Principle
//!
//! The model only proposes. Every side effect passes through the
//! deterministic registry, gate, and executor in this crate.

pub mod authorization;
pub mod cache;
pub mod generation;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod stream;
pub mod tools;

pub use authorization::{AuthorizationGate, GateOutcome};
pub use cache::EngineCache;
pub use generation::{GenerationEngine, GenerationTurn, FALLBACK_RESPONSE};
pub use llm::{ChatModel, FailingChatModel, ModelEvent, ScriptedChatModel, ScriptedTurn};
pub use memory::MemoryAdapter;
pub use orchestrator::{Collaborators, Orchestrator};
pub use stream::{Emitter, RunEvent};
pub use tools::{ToolExecutor, ToolName, ToolRegistry};
