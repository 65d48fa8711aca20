//! User confirmation for bindings marked `confirm`.
//!
//! The gate brackets every prompt with a `ConfirmationBegin` and a
//! `ConfirmationEnd` notification. The prompt itself is a blocking
//! collaborator (a dialog, a yes/no grammar, a console line) and runs on the
//! blocking pool so only the dispatch task waiting on it is suspended.

use std::sync::Arc;
use std::time::Duration;

use vocalis_core::{Notification, NotificationBus};

use crate::error::ConfirmationError;

/// Asks the user whether to run a phrase.
///
/// `ask` blocks until the user answers. It receives the gate's timeout so it
/// can stop waiting on its own; the gate resolves "no" at the deadline
/// whether or not the prompt has returned.
pub trait ConfirmationPrompt: Send + Sync {
    fn ask(&self, phrase: &str, timeout: Duration) -> Result<bool, ConfirmationError>;
}

/// Prompt with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticPrompt(pub bool);

impl ConfirmationPrompt for StaticPrompt {
    fn ask(&self, _phrase: &str, _timeout: Duration) -> Result<bool, ConfirmationError> {
        Ok(self.0)
    }
}

/// Publishes `ConfirmationEnd` when dropped, so the end notification fires
/// on every exit path including cancellation of the waiting task.
struct EndNotice<'a> {
    bus: &'a NotificationBus,
    phrase: &'a str,
    confirmed: bool,
}

impl Drop for EndNotice<'_> {
    fn drop(&mut self) {
        self.bus
            .publish(Notification::confirmation_end(self.phrase, self.confirmed));
    }
}

/// Begin-notify, block with timeout, resolve, end-notify.
#[derive(Clone)]
pub struct ConfirmationGate {
    prompt: Arc<dyn ConfirmationPrompt>,
    bus: NotificationBus,
    timeout: Duration,
}

impl ConfirmationGate {
    pub fn new(
        prompt: Arc<dyn ConfirmationPrompt>,
        bus: NotificationBus,
        timeout: Duration,
    ) -> Self {
        Self {
            prompt,
            bus,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask the user to confirm `phrase`.
    ///
    /// A denial, a timeout, a prompt error and a panicking prompt all
    /// resolve to `false`.
    pub async fn confirm(&self, phrase: &str) -> bool {
        self.bus.publish(Notification::confirmation_begin(phrase));
        let mut notice = EndNotice {
            bus: &self.bus,
            phrase,
            confirmed: false,
        };

        let prompt = Arc::clone(&self.prompt);
        let asked = phrase.to_string();
        let timeout = self.timeout;
        let answer = tokio::task::spawn_blocking(move || prompt.ask(&asked, timeout));

        notice.confirmed = match tokio::time::timeout(self.timeout, answer).await {
            Ok(Ok(Ok(confirmed))) => confirmed,
            Ok(Ok(Err(e))) => {
                tracing::warn!(phrase = %phrase, error = %e, "Confirmation prompt failed");
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(phrase = %phrase, error = %e, "Confirmation prompt panicked");
                false
            }
            Err(_) => {
                tracing::info!(
                    phrase = %phrase,
                    timeout_ms = timeout.as_millis() as u64,
                    "Confirmation timed out"
                );
                false
            }
        };

        tracing::debug!(phrase = %phrase, confirmed = notice.confirmed, "Confirmation resolved");
        notice.confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast;

    struct SlowPrompt(Duration);

    impl ConfirmationPrompt for SlowPrompt {
        fn ask(&self, _phrase: &str, _timeout: Duration) -> Result<bool, ConfirmationError> {
            std::thread::sleep(self.0);
            Ok(true)
        }
    }

    struct FailingPrompt;

    impl ConfirmationPrompt for FailingPrompt {
        fn ask(&self, _phrase: &str, _timeout: Duration) -> Result<bool, ConfirmationError> {
            Err(ConfirmationError::Prompt("dialog closed".into()))
        }
    }

    struct PanickingPrompt;

    impl ConfirmationPrompt for PanickingPrompt {
        fn ask(&self, _phrase: &str, _timeout: Duration) -> Result<bool, ConfirmationError> {
            panic!("prompt exploded");
        }
    }

    fn gate(
        prompt: Arc<dyn ConfirmationPrompt>,
        timeout: Duration,
    ) -> (ConfirmationGate, broadcast::Receiver<Notification>) {
        let bus = NotificationBus::default();
        let rx = bus.subscribe();
        (ConfirmationGate::new(prompt, bus, timeout), rx)
    }

    fn expect_pair(rx: &mut broadcast::Receiver<Notification>, phrase: &str, confirmed: bool) {
        match rx.try_recv().unwrap() {
            Notification::ConfirmationBegin { phrase: p, .. } => assert_eq!(p, phrase),
            other => panic!("expected begin, got {:?}", other),
        }
        match rx.try_recv().unwrap() {
            Notification::ConfirmationEnd {
                phrase: p,
                confirmed: c,
                ..
            } => {
                assert_eq!(p, phrase);
                assert_eq!(c, confirmed);
            }
            other => panic!("expected end, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_confirm_yes() {
        let (gate, mut rx) = gate(Arc::new(StaticPrompt(true)), Duration::from_secs(5));
        assert!(gate.confirm("shut down").await);
        expect_pair(&mut rx, "shut down", true);
    }

    #[tokio::test]
    async fn test_confirm_no() {
        let (gate, mut rx) = gate(Arc::new(StaticPrompt(false)), Duration::from_secs(5));
        assert!(!gate.confirm("shut down").await);
        expect_pair(&mut rx, "shut down", false);
    }

    #[tokio::test]
    async fn test_prompt_error_is_denial() {
        let (gate, mut rx) = gate(Arc::new(FailingPrompt), Duration::from_secs(5));
        assert!(!gate.confirm("shut down").await);
        expect_pair(&mut rx, "shut down", false);
    }

    #[tokio::test]
    async fn test_prompt_panic_is_denial() {
        let (gate, mut rx) = gate(Arc::new(PanickingPrompt), Duration::from_secs(5));
        assert!(!gate.confirm("shut down").await);
        expect_pair(&mut rx, "shut down", false);
    }

    #[tokio::test]
    async fn test_timeout_is_denial() {
        let (gate, mut rx) = gate(
            Arc::new(SlowPrompt(Duration::from_millis(300))),
            Duration::from_millis(20),
        );
        let started = std::time::Instant::now();
        assert!(!gate.confirm("shut down").await);
        assert!(started.elapsed() < Duration::from_millis(300));
        expect_pair(&mut rx, "shut down", false);
    }

    #[tokio::test]
    async fn test_end_fires_when_cancelled() {
        let (gate, mut rx) = gate(
            Arc::new(SlowPrompt(Duration::from_millis(200))),
            Duration::from_secs(5),
        );
        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), gate.confirm("shut down")).await;
        assert!(cancelled.is_err());
        expect_pair(&mut rx, "shut down", false);
    }
}
