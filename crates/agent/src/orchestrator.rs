use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use concierge_core::classifier::MessageClassifier;
use concierge_core::config::EngineConfig;
use concierge_core::domain::session::{GuestRequest, PropertyContext, RunOutcome, SessionState};
use concierge_core::domain::turn::{ConversationTurn, ProposedToolCall, ToolCallResult};
use concierge_core::errors::StepError;
use concierge_core::flows::engine::{GuestSupportFlow, WorkflowEngine};
use concierge_core::flows::states::{WorkflowEvent, WorkflowState};
use concierge_core::router::{RoutePath, RoutePolicy};
use concierge_services::{
    AuthorizationService, AvailabilityService, BookingService, ConfirmationService,
    KnowledgeRetrieval, MemoryStore, OrderingService, PricingService, ServiceInfoLookup,
    ThreadStore,
};

use crate::authorization::{AuthorizationGate, GateOutcome};
use crate::generation::{GenerationEngine, FALLBACK_CONFIDENCE, FALLBACK_RESPONSE};
use crate::llm::ChatModel;
use crate::memory::MemoryAdapter;
use crate::stream::{Emitter, RunEvent};
use crate::tools::{ToolExecutor, ToolRegistry};

/// The external services one engine talks to. Every field is a trait
/// object so hosts wire real integrations and tests wire the in-memory
/// fakes from `concierge-services`.
#[derive(Clone)]
pub struct Collaborators {
    pub knowledge: Arc<dyn KnowledgeRetrieval>,
    pub memory: Arc<dyn MemoryStore>,
    pub authorization: Arc<dyn AuthorizationService>,
    pub threads: Arc<dyn ThreadStore>,
    pub booking: Arc<dyn BookingService>,
    pub ordering: Arc<dyn OrderingService>,
    pub pricing: Arc<dyn PricingService>,
    pub availability: Arc<dyn AvailabilityService>,
    pub service_info: Arc<dyn ServiceInfoLookup>,
    pub confirmation: Arc<dyn ConfirmationService>,
}

/// Drives one guest message from START to END through the workflow
/// topology. Produces a `RunOutcome` for every input; failures inside a
/// run degrade the outcome and flag a human instead of erroring outward.
pub struct Orchestrator {
    config: EngineConfig,
    property: PropertyContext,
    classifier: MessageClassifier,
    policy: RoutePolicy,
    workflow: WorkflowEngine<GuestSupportFlow>,
    generation: GenerationEngine,
    gate: AuthorizationGate,
    executor: ToolExecutor,
    memory: MemoryAdapter,
    knowledge: Arc<dyn KnowledgeRetrieval>,
    threads: Arc<dyn ThreadStore>,
}

impl Orchestrator {
    pub fn new(
        config: EngineConfig,
        property: PropertyContext,
        model: Arc<dyn ChatModel>,
        collaborators: Collaborators,
    ) -> Self {
        let gate = AuthorizationGate::new(
            ToolRegistry::default(),
            Arc::clone(&collaborators.authorization),
            config.authorization.clone(),
        );
        let executor = ToolExecutor::new(
            Arc::clone(&collaborators.booking),
            Arc::clone(&collaborators.ordering),
            Arc::clone(&collaborators.pricing),
            Arc::clone(&collaborators.availability),
            Arc::clone(&collaborators.service_info),
            Arc::clone(&collaborators.confirmation),
        );
        let memory = MemoryAdapter::new(
            Arc::clone(&collaborators.memory),
            config.engine.memory_directive.clone(),
        );

        Self {
            config,
            property,
            classifier: MessageClassifier::new(),
            policy: RoutePolicy::default(),
            workflow: WorkflowEngine::default(),
            generation: GenerationEngine::new(model),
            gate,
            executor,
            memory,
            knowledge: collaborators.knowledge,
            threads: collaborators.threads,
        }
    }

    /// Synchronous entry point: the full response is available only once
    /// the run reaches END.
    pub async fn run(&self, request: GuestRequest) -> RunOutcome {
        self.run_with_emitter(request, &Emitter::disabled()).await
    }

    /// Streaming entry point: narrative fragments arrive on `tx` as they
    /// are generated, followed by a final `Completed` event. Dropping the
    /// receiver cancels the run at the next step boundary.
    pub async fn run_streaming(
        &self,
        request: GuestRequest,
        tx: mpsc::Sender<RunEvent>,
    ) -> RunOutcome {
        let emitter = Emitter::new(tx);
        let outcome = self.run_with_emitter(request, &emitter).await;
        emitter.completed(outcome.clone()).await;
        outcome
    }

    async fn run_with_emitter(&self, request: GuestRequest, emitter: &Emitter) -> RunOutcome {
        let session_id =
            request.session_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut session =
            SessionState::new(session_id, request.user_id.clone(), self.property.clone());

        match self.threads.load(&session.session_id).await {
            Ok(Some(turns)) => session.messages = turns,
            Ok(None) => {}
            Err(error) => {
                warn!(
                    event_name = "thread.load_failed",
                    session_id = %session.session_id,
                    error = %error,
                );
            }
        }
        session.push_turn(ConversationTurn::guest(request.message.clone()));

        info!(
            event_name = "run.started",
            session_id = %session.session_id,
            user_id = %request.user_id,
            property_id = %self.property.property_id,
        );

        match self.drive(&mut session, emitter).await {
            Ok(()) => {
                if self.memory.wants_capture(&request.message) {
                    self.memory
                        .capture_directive(&session.memory_namespace(), &request.message)
                        .await;
                }
                if session.confidence_score < self.config.engine.confidence_threshold {
                    session.requires_human = true;
                }
                if let Err(error) =
                    self.threads.save(&session.session_id, session.messages.clone()).await
                {
                    warn!(
                        event_name = "thread.save_failed",
                        session_id = %session.session_id,
                        error = %error,
                    );
                }
            }
            Err(StepError::Cancelled) => {
                info!(event_name = "run.cancelled", session_id = %session.session_id);
            }
            Err(error) => {
                warn!(
                    event_name = "run.step_failed",
                    session_id = %session.session_id,
                    error = %error,
                );
                session.requires_human = true;
                if session.response.is_none() {
                    session.response = Some(FALLBACK_RESPONSE.to_string());
                    session.confidence_score = FALLBACK_CONFIDENCE;
                }
            }
        }

        let outcome = RunOutcome::from_session(&session);
        info!(
            event_name = "run.completed",
            session_id = %outcome.session_id,
            intent = %outcome.intent,
            confidence = outcome.confidence_score,
            requires_human = outcome.requires_human,
        );
        outcome
    }

    /// Applies the workflow topology step by step. Every state change goes
    /// through the engine so an impossible edge surfaces as a workflow
    /// fault instead of silently corrupting the run.
    async fn drive(&self, session: &mut SessionState, emitter: &Emitter) -> Result<(), StepError> {
        let mut state = self.workflow.initial_state();
        state = self.advance(state, &WorkflowEvent::MessageReceived)?;

        let message =
            session.latest_guest_message().unwrap_or_default().to_string();
        let classification = self.classifier.classify(&message);
        session.classified_intent = Some(classification.intent);
        session.confidence_score = classification.confidence;
        info!(
            event_name = "intent.classified",
            intent = %classification.intent,
            confidence = classification.confidence,
        );

        match self.policy.route(classification.intent) {
            RoutePath::Knowledge => {
                state = self.advance(state, &WorkflowEvent::RoutedToKnowledge)?;
                self.answer_from_knowledge(session, &message, emitter).await;
                state = self.advance(state, &WorkflowEvent::KnowledgeAnswered)?;
                state = self.advance(state, &WorkflowEvent::ResponseComposed)?;
            }
            RoutePath::Generation => {
                state = self.advance(state, &WorkflowEvent::RoutedToGeneration)?;
                state = self.generation_loop(session, &message, emitter, state).await?;
            }
        }

        debug_assert!(state.is_terminal());
        Ok(())
    }

    /// Retrieval never fails the run: an unavailable knowledge service
    /// degrades to the fallback response with a human flagged.
    async fn answer_from_knowledge(
        &self,
        session: &mut SessionState,
        question: &str,
        emitter: &Emitter,
    ) {
        match self.knowledge.answer(question, &self.property.property_id).await {
            Ok(answer) => {
                let mut response = answer.answer_text;
                if !answer.sources.is_empty() {
                    let titles: Vec<&str> =
                        answer.sources.iter().map(|s| s.title.as_str()).collect();
                    response.push_str(&format!("\n\nBased on: {}", titles.join(", ")));
                }
                emitter.fragment(&response).await;
                session.push_turn(ConversationTurn::assistant(response.clone()));
                session.response = Some(response);
            }
            Err(error) => {
                warn!(event_name = "knowledge.answer_failed", error = %error);
                emitter.fragment(FALLBACK_RESPONSE).await;
                session.push_turn(ConversationTurn::assistant(FALLBACK_RESPONSE));
                session.response = Some(FALLBACK_RESPONSE.to_string());
                session.requires_human = true;
            }
        }
    }

    /// The agent loop: generate, gate, execute, feed results back, repeat.
    /// Bounded by `max_agent_iterations` tool rounds per run.
    async fn generation_loop(
        &self,
        session: &mut SessionState,
        message: &str,
        emitter: &Emitter,
        mut state: WorkflowState,
    ) -> Result<WorkflowState, StepError> {
        let namespace = session.memory_namespace();
        let mut tool_rounds = 0u32;

        loop {
            if emitter.is_cancelled() {
                return Err(self.cancel(state));
            }

            session.memories = self.memory.recall(&namespace, message).await;
            let prompt = self.system_prompt(session);
            let turn = self.generation.generate(&session.messages, &prompt, emitter).await;

            if emitter.is_cancelled() {
                return Err(self.cancel(state));
            }

            if turn.degraded {
                session.push_turn(ConversationTurn::assistant(turn.text.clone()));
                session.response = Some(turn.text);
                session.confidence_score = FALLBACK_CONFIDENCE;
                session.requires_human = true;
                return self.advance(state, &WorkflowEvent::TurnCompleted);
            }

            if turn.proposals.is_empty() {
                session.push_turn(ConversationTurn::assistant(turn.text.clone()));
                session.response = Some(turn.text);
                return self.advance(state, &WorkflowEvent::TurnCompleted);
            }

            tool_rounds += 1;
            if tool_rounds > self.config.engine.max_agent_iterations {
                // The capped batch is discarded before it enters history, so
                // every persisted proposal still has a matching result.
                warn!(
                    event_name = "agent.iteration_cap_reached",
                    rounds = tool_rounds,
                );
                let handoff = "I wasn't able to finish that request on my own. A member of \
                               our team will pick this up for you."
                    .to_string();
                emitter.fragment(&handoff).await;
                session.push_turn(ConversationTurn::assistant(handoff.clone()));
                session.response = Some(handoff);
                session.requires_human = true;
                return self.advance(state, &WorkflowEvent::TurnCompleted);
            }

            session.push_turn(ConversationTurn::assistant_with_calls(
                turn.text.clone(),
                turn.proposals.clone(),
            ));

            let requires_authorization = self.gate.requires_any(&turn.proposals);
            state = self.advance(
                state,
                &WorkflowEvent::ToolCallsProposed { requires_authorization },
            )?;

            let gate_outcome = if requires_authorization {
                let outcome = self
                    .gate
                    .resolve_batch(&turn.proposals, &session.user_id, emitter)
                    .await;
                if outcome.cancelled {
                    return Err(self.cancel(state));
                }
                session.pending_authorizations.extend(outcome.requests.iter().cloned());
                if outcome.any_failed() {
                    session.requires_human = true;
                }
                state = self.advance(state, &WorkflowEvent::AuthorizationResolved)?;
                outcome
            } else {
                GateOutcome::pass_through(turn.proposals.clone())
            };

            let executed = self.executor.execute_batch(&gate_outcome.approved).await;
            let results = merge_results(&turn.proposals, gate_outcome.failures, executed);
            debug!(
                event_name = "tools.batch_resolved",
                requested = turn.proposals.len(),
                failed = results.iter().filter(|r| !r.success).count(),
            );
            session.push_turn(ConversationTurn::tool_results(&results));

            state = self.advance(state, &WorkflowEvent::ToolsExecuted)?;
        }
    }

    fn system_prompt(&self, session: &SessionState) -> String {
        let mut prompt = format!(
            "You are the guest concierge for {}. {}",
            self.property.property_name, self.property.personality_summary
        );
        if !session.memories.is_empty() {
            prompt.push_str("\nKnown guest preferences:");
            for memory in &session.memories {
                prompt.push_str("\n- ");
                prompt.push_str(&memory.text);
            }
        }
        prompt
    }

    fn advance(
        &self,
        state: WorkflowState,
        event: &WorkflowEvent,
    ) -> Result<WorkflowState, StepError> {
        let outcome = self.workflow.apply(&state, event)?;
        debug!(
            event_name = "workflow.transition",
            from = ?outcome.from,
            to = ?outcome.to,
        );
        Ok(outcome.to)
    }

    fn cancel(&self, state: WorkflowState) -> StepError {
        // The cancel edge is legal from every non-terminal state.
        let _ = self.workflow.apply(&state, &WorkflowEvent::RunCancelled);
        StepError::Cancelled
    }
}

/// Restores original proposal order over the union of gate failures and
/// execution results. Every proposal gets exactly one result.
fn merge_results(
    proposals: &[ProposedToolCall],
    failures: Vec<ToolCallResult>,
    executed: Vec<ToolCallResult>,
) -> Vec<ToolCallResult> {
    let mut by_id: std::collections::HashMap<String, ToolCallResult> = failures
        .into_iter()
        .chain(executed)
        .map(|result| (result.call_id.clone(), result))
        .collect();

    proposals
        .iter()
        .filter_map(|proposal| by_id.remove(&proposal.call_id))
        .collect()
}
