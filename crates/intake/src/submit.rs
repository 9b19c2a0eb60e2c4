//! Submission state machine.
//!
//! ```text
//! Idle ──try_begin──▶ Submitting ──ok──▶ Succeeded
//!                          │                │
//!                          └──err──▶ Failed ┴──try_begin──▶ Submitting
//! ```
//!
//! The transition into `Submitting` is a compare-and-set on the status
//! channel, so two submits racing each other dispatch exactly once.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value as JsonValue;
use tokio::sync::watch;

use crate::dispatch::{DispatchError, DispatchReceipt, Dispatcher};
use crate::store::FormStore;

pub const SUCCESS_MESSAGE: &str =
    "Form submitted successfully. You will receive a confirmation email shortly.";
pub const REJECTED_MESSAGE: &str = "Failed to submit form. Please try again.";
pub const TRANSPORT_MESSAGE: &str = "An error occurred. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed {
        reason: String,
    },
}

impl SubmissionStatus {
    pub fn is_submitting(&self) -> bool {
        matches!(self, SubmissionStatus::Submitting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

/// User-facing result of the last submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    fn success() -> Self {
        Self {
            kind: StatusKind::Success,
            text: SUCCESS_MESSAGE.to_string(),
        }
    }

    fn error(text: &str) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// A submission was already in flight.
    Ignored,
    Succeeded(DispatchReceipt),
    Failed,
}

#[derive(Clone)]
pub struct SubmissionPipeline {
    dispatcher: Arc<dyn Dispatcher>,
    status: Arc<watch::Sender<SubmissionStatus>>,
    message: Arc<Mutex<Option<StatusMessage>>>,
}

impl std::fmt::Debug for SubmissionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionPipeline")
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl SubmissionPipeline {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        let (status, _) = watch::channel(SubmissionStatus::Idle);
        Self {
            dispatcher,
            status: Arc::new(status),
            message: Arc::new(Mutex::new(None)),
        }
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionStatus> {
        self.status.subscribe()
    }

    pub fn message(&self) -> Option<StatusMessage> {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_message(&self, message: Option<StatusMessage>) {
        *self.message.lock().unwrap_or_else(PoisonError::into_inner) = message;
    }

    /// Enter `Submitting` unless a submission is already in flight.
    pub fn try_begin(&self) -> bool {
        let began = self.status.send_if_modified(|status| {
            if status.is_submitting() {
                false
            } else {
                *status = SubmissionStatus::Submitting;
                true
            }
        });
        if began {
            self.set_message(None);
            tracing::info!("submission started");
        } else {
            tracing::debug!("submission already in flight; ignoring");
        }
        began
    }

    /// Hand a snapshot to the dispatcher and record the result.
    /// Expects [`try_begin`](Self::try_begin) to have succeeded.
    pub async fn dispatch(&self, snapshot: JsonValue) -> SubmitOutcome {
        match self.dispatcher.dispatch(&snapshot).await {
            Ok(receipt) => {
                tracing::info!(status = receipt.status, "submission succeeded");
                self.set_message(Some(StatusMessage::success()));
                self.status.send_replace(SubmissionStatus::Succeeded);
                SubmitOutcome::Succeeded(receipt)
            }
            Err(err) => {
                tracing::error!(error = %err, "submission failed");
                let text = match err {
                    DispatchError::Rejected { .. } => REJECTED_MESSAGE,
                    DispatchError::Transport(_) | DispatchError::Encode(_) => TRANSPORT_MESSAGE,
                };
                self.set_message(Some(StatusMessage::error(text)));
                self.status.send_replace(SubmissionStatus::Failed {
                    reason: err.to_string(),
                });
                SubmitOutcome::Failed
            }
        }
    }

    /// Snapshot `store` and dispatch it. Ignored while another submission runs.
    pub async fn submit(&self, store: &FormStore) -> SubmitOutcome {
        if !self.try_begin() {
            return SubmitOutcome::Ignored;
        }
        let snapshot = store.snapshot();
        self.dispatch(snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Slow {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Dispatcher for Slow {
        async fn dispatch(&self, _: &JsonValue) -> Result<DispatchReceipt, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(DispatchReceipt {
                status: 200,
                body: String::new(),
            })
        }
    }

    struct Rejecting;

    #[async_trait]
    impl Dispatcher for Rejecting {
        async fn dispatch(&self, _: &JsonValue) -> Result<DispatchReceipt, DispatchError> {
            Err(DispatchError::Rejected {
                status: 500,
                body: "boom".into(),
            })
        }
    }

    #[tokio::test]
    async fn concurrent_submits_dispatch_once() {
        let slow = Arc::new(Slow {
            calls: AtomicUsize::new(0),
        });
        let pipeline = SubmissionPipeline::new(slow.clone());
        let store = FormStore::new();
        let (a, b) = tokio::join!(pipeline.submit(&store), pipeline.submit(&store));
        let ignored = [&a, &b]
            .iter()
            .filter(|o| matches!(o, SubmitOutcome::Ignored))
            .count();
        assert_eq!(ignored, 1);
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.status(), SubmissionStatus::Succeeded);
        assert_eq!(pipeline.message().map(|m| m.kind), Some(StatusKind::Success));
    }

    #[tokio::test]
    async fn rejection_sets_generic_message() {
        let pipeline = SubmissionPipeline::new(Arc::new(Rejecting));
        let outcome = pipeline.submit(&FormStore::new()).await;
        assert!(matches!(outcome, SubmitOutcome::Failed));
        let message = pipeline.message().unwrap();
        assert_eq!(message.kind, StatusKind::Error);
        assert_eq!(message.text, REJECTED_MESSAGE);
        assert!(!message.text.contains("boom"));
        assert!(matches!(pipeline.status(), SubmissionStatus::Failed { .. }));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn rejection_cause_is_logged_not_shown() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let pipeline = SubmissionPipeline::new(Arc::new(Rejecting));
        pipeline.submit(&FormStore::new()).await;

        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("submission failed"), "{log}");
        assert!(log.contains("status 500: boom"), "{log}");
        let message = pipeline.message().unwrap();
        assert_eq!(message.text, REJECTED_MESSAGE);
        assert!(!message.text.contains("boom"));
    }

    #[tokio::test]
    async fn failed_pipeline_accepts_retry_and_clears_message() {
        let pipeline = SubmissionPipeline::new(Arc::new(Rejecting));
        pipeline.submit(&FormStore::new()).await;
        let mut rx = pipeline.subscribe();
        assert!(pipeline.try_begin());
        assert_eq!(*rx.borrow_and_update(), SubmissionStatus::Submitting);
        assert!(pipeline.message().is_none());
        assert!(!pipeline.try_begin());
    }
}
