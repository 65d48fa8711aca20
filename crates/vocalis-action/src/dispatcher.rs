//! Phrase dispatch: lookup, policy, confirmation and action invocation.
//!
//! `submit` does the lookups synchronously and returns as soon as the rest of
//! the pipeline is spawned. Every dispatch is an independent task. Nothing
//! serializes two dispatches of the same phrase; both run to completion.

use std::sync::{Arc, RwLock};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;
use vocalis_core::{ActionBinding, Notification, NotificationBus, RestrictionPolicy};

use crate::confirmation::{ConfirmationGate, ConfirmationPrompt};
use crate::error::SubmitError;
use crate::handler::{Action, ActionRegistry};
use crate::phrase::{phrase_key, PhraseIndex};
use crate::restriction::RestrictionChecker;
use crate::types::{DispatchConfig, DispatchOutcome, PolicyVeto};

/// Routes recognized phrases to their actions.
///
/// Cheap to clone; clones share the same index and registry.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    index: RwLock<Arc<PhraseIndex>>,
    restrictions: RwLock<Arc<RestrictionChecker>>,
    registry: ActionRegistry,
    gate: ConfirmationGate,
    bus: NotificationBus,
    config: DispatchConfig,
    runtime: Handle,
}

impl Dispatcher {
    /// Create a dispatcher bound to the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(
        config: DispatchConfig,
        index: PhraseIndex,
        registry: ActionRegistry,
        restrictions: RestrictionChecker,
        prompt: Arc<dyn ConfirmationPrompt>,
        bus: NotificationBus,
    ) -> Self {
        let gate = ConfirmationGate::new(prompt, bus.clone(), config.confirmation_timeout);
        tracing::info!(
            phrases = index.len(),
            actions = registry.len(),
            "Dispatcher ready"
        );
        Self {
            inner: Arc::new(Inner {
                index: RwLock::new(Arc::new(index)),
                restrictions: RwLock::new(Arc::new(restrictions)),
                registry,
                gate,
                bus,
                config,
                runtime: Handle::current(),
            }),
        }
    }

    /// Look up `verb noun` and spawn its dispatch.
    ///
    /// Returns at once; the handle resolves when the dispatch has finished.
    /// May be called from any thread. Unknown phrases and unregistered
    /// actions are logged once and reported as [`SubmitError`].
    pub fn submit(
        &self,
        verb: &str,
        noun: &str,
    ) -> Result<JoinHandle<DispatchOutcome>, SubmitError> {
        let phrase = phrase_key(verb, noun);

        let binding = match self.index().lookup_phrase(&phrase) {
            Some(binding) => Arc::clone(binding),
            None => {
                tracing::info!(phrase = %phrase, "Unknown phrase");
                return Err(SubmitError::UnknownPhrase(phrase));
            }
        };

        let action = match self.inner.registry.resolve(&binding.action) {
            Some(action) => action,
            None => {
                tracing::warn!(phrase = %phrase, action = %binding.action, "Action not found");
                return Err(SubmitError::ActionNotFound {
                    phrase,
                    action: binding.action.clone(),
                });
            }
        };

        let dispatch_id = Uuid::new_v4();
        tracing::debug!(
            %dispatch_id,
            phrase = %phrase,
            action = %binding.action,
            "Dispatch scheduled"
        );

        let inner = Arc::clone(&self.inner);
        Ok(self
            .inner
            .runtime
            .spawn(async move { inner.dispatch(dispatch_id, phrase, binding, action).await }))
    }

    /// [`submit`](Self::submit) gated on recognition confidence.
    pub fn submit_recognized(
        &self,
        verb: &str,
        noun: &str,
        confidence: f64,
    ) -> Result<JoinHandle<DispatchOutcome>, SubmitError> {
        if let Some(threshold) = self.inner.config.min_confidence {
            if confidence < threshold {
                let phrase = phrase_key(verb, noun);
                tracing::info!(
                    phrase = %phrase,
                    confidence,
                    threshold,
                    "Recognition below confidence threshold, discarded"
                );
                return Err(SubmitError::LowConfidence {
                    phrase,
                    confidence,
                    threshold,
                });
            }
        }
        self.submit(verb, noun)
    }

    /// Swap in a rebuilt index. Dispatches already spawned keep their binding.
    pub fn replace_index(&self, index: PhraseIndex) {
        tracing::info!(phrases = index.len(), "Phrase index replaced");
        *self.inner.index.write().expect("index lock poisoned") = Arc::new(index);
    }

    /// Swap in a new restriction policy, keeping the process probe.
    pub fn replace_restrictions(&self, policy: RestrictionPolicy) {
        let mut guard = self.inner.restrictions.write().expect("restriction lock poisoned");
        *guard = Arc::new(guard.with_policy(policy));
    }

    pub fn index(&self) -> Arc<PhraseIndex> {
        Arc::clone(&self.inner.index.read().expect("index lock poisoned"))
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.inner.registry
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.inner.bus
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }
}

impl Inner {
    fn restrictions(&self) -> Arc<RestrictionChecker> {
        Arc::clone(&self.restrictions.read().expect("restriction lock poisoned"))
    }

    async fn dispatch(
        &self,
        dispatch_id: Uuid,
        phrase: String,
        binding: Arc<ActionBinding>,
        action: Arc<dyn Action>,
    ) -> DispatchOutcome {
        if binding.disabled {
            tracing::info!(%dispatch_id, phrase = %phrase, "Binding disabled, skipping");
            return DispatchOutcome::Vetoed(PolicyVeto::Disabled);
        }

        if binding.restricted {
            let checker = self.restrictions();
            match tokio::task::spawn_blocking(move || checker.blocking_process()).await {
                Ok(Some(process)) => {
                    tracing::info!(
                        %dispatch_id,
                        phrase = %phrase,
                        process = %process,
                        "Restricted process running, skipping"
                    );
                    return DispatchOutcome::Vetoed(PolicyVeto::Restricted { process });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        %dispatch_id,
                        phrase = %phrase,
                        error = %e,
                        "Restriction check failed"
                    );
                }
            }
        }

        if binding.requires_confirmation && !self.gate.confirm(&phrase).await {
            tracing::info!(%dispatch_id, phrase = %phrase, "Not confirmed, skipping");
            return DispatchOutcome::Denied;
        }

        tracing::info!(
            %dispatch_id,
            phrase = %phrase,
            action = %binding.action,
            description = %action.describe(binding.arguments.as_ref()),
            "Running action"
        );

        // A panicking action must not take the dispatch task down with it.
        let arguments = binding.arguments.clone();
        let performer = Arc::clone(&action);
        let run = tokio::spawn(async move { performer.perform(arguments.as_ref()).await });

        match run.await {
            Ok(Ok(result)) => {
                tracing::info!(
                    %dispatch_id,
                    phrase = %phrase,
                    message = %result.message,
                    "Action completed"
                );
                DispatchOutcome::Completed(result)
            }
            Ok(Err(e)) => self.failed(dispatch_id, &phrase, e.to_string()),
            Err(e) => self.failed(dispatch_id, &phrase, format!("action panicked: {}", e)),
        }
    }

    fn failed(&self, dispatch_id: Uuid, phrase: &str, message: String) -> DispatchOutcome {
        tracing::error!(%dispatch_id, phrase = %phrase, error = %message, "Action failed");
        if self.config.display_errors {
            self.bus
                .publish(Notification::error_raised(format!("{}: {}", phrase, message)));
        }
        DispatchOutcome::Failed(message)
    }
}
