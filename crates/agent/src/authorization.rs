use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use concierge_core::config::AuthorizationSettings;
use concierge_core::domain::authorization::{AuthorizationRequest, AuthorizationStatus};
use concierge_core::domain::turn::{ProposedToolCall, ToolCallResult};
use concierge_services::authorization::AuthorizationService;

use crate::stream::Emitter;
use crate::tools::ToolRegistry;

/// What became of one gated batch. Approved calls go on to execution;
/// failures already carry their per-call results; requests record the
/// terminal consent state for the session.
#[derive(Clone, Debug, Default)]
pub struct GateOutcome {
    pub approved: Vec<ProposedToolCall>,
    pub failures: Vec<ToolCallResult>,
    pub requests: Vec<AuthorizationRequest>,
    pub cancelled: bool,
}

impl GateOutcome {
    pub fn any_failed(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Batch where nothing was gated: everything passes straight through.
    pub fn pass_through(calls: Vec<ProposedToolCall>) -> Self {
        Self { approved: calls, ..Self::default() }
    }
}

/// Determines which proposed calls need human consent and blocks until
/// each consent resolves, bounded by the configured timeout. Failure or
/// timeout fails only that call; the rest of the turn proceeds.
pub struct AuthorizationGate {
    registry: ToolRegistry,
    service: Arc<dyn AuthorizationService>,
    settings: AuthorizationSettings,
}

impl AuthorizationGate {
    pub fn new(
        registry: ToolRegistry,
        service: Arc<dyn AuthorizationService>,
        settings: AuthorizationSettings,
    ) -> Self {
        Self { registry, service, settings }
    }

    pub fn requires_any(&self, calls: &[ProposedToolCall]) -> bool {
        calls.iter().any(|call| self.registry.requires_authorization(&call.name))
    }

    pub async fn resolve_batch(
        &self,
        calls: &[ProposedToolCall],
        user_id: &str,
        emitter: &Emitter,
    ) -> GateOutcome {
        let mut outcome = GateOutcome::default();

        for call in calls {
            if outcome.cancelled {
                break;
            }
            if !self.registry.requires_authorization(&call.name) {
                outcome.approved.push(call.clone());
                continue;
            }
            self.resolve_gated(call, user_id, emitter, &mut outcome).await;
        }

        outcome
    }

    async fn resolve_gated(
        &self,
        call: &ProposedToolCall,
        user_id: &str,
        emitter: &Emitter,
        outcome: &mut GateOutcome,
    ) {
        let ticket = match self.service.request_authorization(&call.name, user_id).await {
            Ok(ticket) => ticket,
            Err(error) => {
                warn!(
                    event_name = "authorization.request_failed",
                    tool = %call.name,
                    error = %error,
                );
                outcome.failures.push(ToolCallResult::failed(
                    call.call_id.clone(),
                    format!("authorization for `{}` could not be requested: {error}", call.name),
                ));
                return;
            }
        };

        let mut request = AuthorizationRequest {
            tool_name: call.name.clone(),
            request_id: ticket.request_id.clone(),
            status: ticket.status,
            authorization_url: ticket.authorization_url.clone(),
        };

        match ticket.status {
            AuthorizationStatus::Completed => {
                outcome.approved.push(call.clone());
                outcome.requests.push(request);
            }
            AuthorizationStatus::Failed => {
                outcome.failures.push(ToolCallResult::failed(
                    call.call_id.clone(),
                    format!("authorization for `{}` was declined", call.name),
                ));
                outcome.requests.push(request);
            }
            AuthorizationStatus::Pending => {
                if let Some(url) = &ticket.authorization_url {
                    emitter
                        .fragment(&format!(
                            "Before I can run `{}` I need your approval. Please confirm here: {url}\n",
                            call.name
                        ))
                        .await;
                }
                let resolved = self.await_completion(&ticket.request_id, emitter).await;
                match resolved {
                    WaitResult::Completed => {
                        request.resolve(AuthorizationStatus::Completed);
                        outcome.approved.push(call.clone());
                    }
                    WaitResult::Failed(reason) => {
                        request.resolve(AuthorizationStatus::Failed);
                        outcome.failures.push(ToolCallResult::failed(
                            call.call_id.clone(),
                            format!("authorization for `{}` failed: {reason}", call.name),
                        ));
                    }
                    WaitResult::TimedOut => {
                        request.resolve(AuthorizationStatus::Failed);
                        outcome.failures.push(ToolCallResult::failed(
                            call.call_id.clone(),
                            format!(
                                "authorization for `{}` timed out after {}s",
                                call.name, self.settings.wait_timeout_secs
                            ),
                        ));
                    }
                    WaitResult::Cancelled => {
                        outcome.cancelled = true;
                    }
                }
                outcome.requests.push(request);
            }
        }
    }

    /// Polls the authorization service until the request turns terminal or
    /// the configured deadline passes. A cancelled stream aborts the wait
    /// without executing anything.
    async fn await_completion(&self, request_id: &str, emitter: &Emitter) -> WaitResult {
        let deadline = Instant::now() + Duration::from_secs(self.settings.wait_timeout_secs);
        let interval = Duration::from_millis(self.settings.poll_interval_ms);

        loop {
            if emitter.is_cancelled() {
                return WaitResult::Cancelled;
            }
            if Instant::now() >= deadline {
                info!(event_name = "authorization.wait_timed_out", request_id);
                return WaitResult::TimedOut;
            }

            sleep(interval).await;

            match self.service.poll(request_id).await {
                Ok(AuthorizationStatus::Completed) => return WaitResult::Completed,
                Ok(AuthorizationStatus::Failed) => {
                    return WaitResult::Failed("human declined the request".to_string());
                }
                Ok(AuthorizationStatus::Pending) => {}
                Err(error) => return WaitResult::Failed(error.to_string()),
            }
        }
    }
}

enum WaitResult {
    Completed,
    Failed(String),
    TimedOut,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use concierge_core::config::AuthorizationSettings;
    use concierge_core::domain::authorization::AuthorizationStatus;
    use concierge_core::domain::turn::ProposedToolCall;
    use concierge_services::{AuthorizationScript, ScriptedAuthorizationService};

    use crate::stream::{Emitter, RunEvent};
    use crate::tools::ToolRegistry;

    use super::AuthorizationGate;

    fn settings() -> AuthorizationSettings {
        AuthorizationSettings { wait_timeout_secs: 2, poll_interval_ms: 100 }
    }

    fn gated_call(call_id: &str) -> ProposedToolCall {
        ProposedToolCall::new("create_booking", json!({}), call_id)
    }

    fn ungated_call(call_id: &str) -> ProposedToolCall {
        ProposedToolCall::new("check_availability", json!({}), call_id)
    }

    async fn gate_with(script: AuthorizationScript) -> AuthorizationGate {
        let service = ScriptedAuthorizationService::new();
        service.script_tool("create_booking", script).await;
        AuthorizationGate::new(ToolRegistry::default(), Arc::new(service), settings())
    }

    #[tokio::test]
    async fn ungated_calls_pass_through_immediately() {
        let gate = gate_with(AuthorizationScript::ApproveImmediately).await;
        let calls = vec![ungated_call("call-1")];
        assert!(!gate.requires_any(&calls));

        let outcome = gate.resolve_batch(&calls, "guest-1", &Emitter::disabled()).await;
        assert_eq!(outcome.approved.len(), 1);
        assert!(outcome.failures.is_empty());
        assert!(outcome.requests.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pending_request_surfaces_url_then_completes() {
        let gate = gate_with(AuthorizationScript::PendingThenComplete { polls: 2 }).await;
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let emitter = Emitter::new(tx);

        let outcome = gate.resolve_batch(&[gated_call("call-1")], "guest-1", &emitter).await;
        assert_eq!(outcome.approved.len(), 1);
        assert!(!outcome.any_failed());
        assert_eq!(outcome.requests[0].status, AuthorizationStatus::Completed);

        let RunEvent::Fragment(text) = rx.recv().await.expect("url fragment") else {
            panic!("expected fragment");
        };
        assert!(text.contains("https://consent.example/"));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_forever_times_out_and_fails_only_that_call() {
        let gate = gate_with(AuthorizationScript::PendingForever).await;
        let calls = vec![gated_call("call-1"), ungated_call("call-2")];

        let outcome = gate.resolve_batch(&calls, "guest-1", &Emitter::disabled()).await;
        assert_eq!(outcome.approved.len(), 1);
        assert_eq!(outcome.approved[0].call_id, "call-2");
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0]
            .error_message
            .as_deref()
            .expect("error")
            .contains("timed out"));
        assert_eq!(outcome.requests[0].status, AuthorizationStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn declined_request_fails_with_descriptive_error() {
        let gate = gate_with(AuthorizationScript::PendingThenFail).await;
        let outcome =
            gate.resolve_batch(&[gated_call("call-1")], "guest-1", &Emitter::disabled()).await;
        assert!(outcome.approved.is_empty());
        assert!(outcome.failures[0]
            .error_message
            .as_deref()
            .expect("error")
            .contains("declined"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_stream_aborts_the_wait_without_approving() {
        let gate = gate_with(AuthorizationScript::PendingForever).await;
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let emitter = Emitter::new(tx);
        drop(rx);

        let outcome = gate.resolve_batch(&[gated_call("call-1")], "guest-1", &emitter).await;
        assert!(outcome.cancelled);
        assert!(outcome.approved.is_empty());
    }
}
