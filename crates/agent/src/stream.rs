use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

use concierge_core::domain::session::RunOutcome;

/// Events delivered to a streaming consumer: response fragments as they
/// are produced, then one final summary record.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    Fragment(String),
    Completed(RunOutcome),
}

/// Producer half of the run's streaming surface. A disabled emitter (the
/// non-streaming `run` entry point) swallows fragments; a live one feeds
/// the caller's channel. Dropping the consumer's receiver marks the run
/// cancelled, which the orchestrator checks at every suspension point.
pub struct Emitter {
    tx: Option<mpsc::Sender<RunEvent>>,
    cancelled: AtomicBool,
}

impl Emitter {
    pub fn disabled() -> Self {
        Self { tx: None, cancelled: AtomicBool::new(false) }
    }

    pub fn new(tx: mpsc::Sender<RunEvent>) -> Self {
        Self { tx: Some(tx), cancelled: AtomicBool::new(false) }
    }

    pub async fn fragment(&self, text: &str) {
        let Some(tx) = &self.tx else { return };
        if tx.send(RunEvent::Fragment(text.to_string())).await.is_err() {
            debug!(event_name = "stream.consumer_gone", "fragment dropped, marking cancelled");
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    pub async fn completed(&self, outcome: RunOutcome) {
        let Some(tx) = &self.tx else { return };
        let _ = tx.send(RunEvent::Completed(outcome)).await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.tx.as_ref().is_some_and(|tx| tx.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::{Emitter, RunEvent};

    #[tokio::test]
    async fn disabled_emitter_is_never_cancelled() {
        let emitter = Emitter::disabled();
        emitter.fragment("ignored").await;
        assert!(!emitter.is_cancelled());
    }

    #[tokio::test]
    async fn live_emitter_delivers_fragments_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let emitter = Emitter::new(tx);
        emitter.fragment("first").await;
        emitter.fragment("second").await;
        assert_eq!(rx.recv().await, Some(RunEvent::Fragment("first".to_string())));
        assert_eq!(rx.recv().await, Some(RunEvent::Fragment("second".to_string())));
    }

    #[tokio::test]
    async fn dropped_receiver_marks_the_run_cancelled() {
        let (tx, rx) = mpsc::channel(8);
        let emitter = Emitter::new(tx);
        drop(rx);
        emitter.fragment("never seen").await;
        assert!(emitter.is_cancelled());
    }
}
