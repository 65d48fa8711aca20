//! Listening supervisor: a two-state machine around the recognition channel.
//!
//! Transitions:
//! - `resume`: Paused -> Listening (no-op when listening)
//! - `pause`: Listening -> Paused (no-op when paused)
//! - `restart`: pause then resume, whatever the current state
//!
//! All transitions go through one async mutex, so at most one start/stop
//! sequence is in flight against the listener. The watchdog restarts the
//! channel every `restart_every` ticks, or at once when the state says
//! Listening but the listener has silently stopped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use vocalis_core::{ListeningState, Notification, NotificationBus, RecognitionChoice};

use crate::error::ListenError;
use crate::listener::Listener;
use crate::session::{SessionEvent, SessionResponse};

/// Watchdog timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Time between watchdog ticks.
    pub tick: Duration,
    /// Force a restart every this many ticks. Zero disables periodic restarts.
    pub restart_every: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(60),
            restart_every: 20,
        }
    }
}

/// Why the watchdog restarted the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// State was Listening but the listener was not.
    Anomaly,
    Periodic,
}

/// Result of one watchdog tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Restarted(RestartReason),
    RestartFailed(RestartReason),
}

/// Owns the listener and every transition applied to it.
pub struct ListeningSupervisor {
    listener: Arc<dyn Listener>,
    bus: NotificationBus,
    config: SupervisorConfig,
    phrases: RwLock<Arc<Vec<RecognitionChoice>>>,
    transition: Mutex<()>,
    state: watch::Sender<ListeningState>,
    ticks: AtomicU64,
    shutdown: watch::Sender<bool>,
}

/// Resolves once shutdown has been requested.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

impl ListeningSupervisor {
    /// Create a supervisor in the Paused state. Nothing starts until
    /// [`resume`](Self::resume).
    pub fn new(
        listener: Arc<dyn Listener>,
        phrases: Vec<RecognitionChoice>,
        bus: NotificationBus,
        config: SupervisorConfig,
    ) -> Self {
        let (state, _) = watch::channel(ListeningState::Paused);
        let (shutdown, _) = watch::channel(false);
        Self {
            listener,
            bus,
            config,
            phrases: RwLock::new(Arc::new(phrases)),
            transition: Mutex::new(()),
            state,
            ticks: AtomicU64::new(0),
            shutdown,
        }
    }

    pub fn state(&self) -> ListeningState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<ListeningState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Phrases loaded into the listener on the next start.
    pub fn replace_phrases(&self, phrases: Vec<RecognitionChoice>) {
        *self.phrases.write().expect("phrases lock poisoned") = Arc::new(phrases);
    }

    /// Paused -> Listening. Returns whether the state changed.
    ///
    /// If the listener fails to start, the state still becomes Listening so
    /// the watchdog sees the anomaly and retries.
    pub async fn resume(&self) -> Result<bool, ListenError> {
        let _transition = self.transition.lock().await;
        self.resume_locked().await
    }

    /// Listening -> Paused. Returns whether the state changed.
    pub async fn pause(&self) -> Result<bool, ListenError> {
        let _transition = self.transition.lock().await;
        self.pause_locked().await
    }

    /// Pause then resume as one transition.
    pub async fn restart(&self) -> Result<(), ListenError> {
        let _transition = self.transition.lock().await;
        self.restart_locked().await
    }

    /// Resume when paused, pause otherwise. Returns the new state.
    pub async fn toggle(&self) -> Result<ListeningState, ListenError> {
        let _transition = self.transition.lock().await;
        match self.state() {
            ListeningState::Paused => self.resume_locked().await?,
            ListeningState::Listening => self.pause_locked().await?,
        };
        Ok(self.state())
    }

    pub async fn on_session_event(&self, event: SessionEvent) -> Result<(), ListenError> {
        tracing::info!(event = %event, "Session switch");
        match event.response() {
            SessionResponse::Pause => self.pause().await.map(|_| ()),
            SessionResponse::Resume => self.resume().await.map(|_| ()),
            SessionResponse::Ignore => Ok(()),
        }
    }

    /// One watchdog step.
    ///
    /// A periodic restart only happens while Listening, so a user's pause is
    /// never undone by the timer. An anomaly and a periodic restart on the
    /// same tick restart once.
    pub async fn tick(&self) -> TickOutcome {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        let _transition = self.transition.lock().await;

        if self.state() != ListeningState::Listening {
            return TickOutcome::Idle;
        }

        let reason = if !self.listener.is_listening() {
            tracing::warn!(tick, "Listening state anomaly: listening but the listener is not");
            RestartReason::Anomaly
        } else if self.config.restart_every > 0
            && tick % u64::from(self.config.restart_every) == 0
        {
            RestartReason::Periodic
        } else {
            return TickOutcome::Idle;
        };

        tracing::info!(tick, reason = ?reason, "Watchdog restarting listener");
        match self.restart_locked().await {
            Ok(()) => TickOutcome::Restarted(reason),
            Err(e) => {
                tracing::error!(error = %e, "Watchdog restart failed");
                TickOutcome::RestartFailed(reason)
            }
        }
    }

    /// Run [`tick`](Self::tick) every `config.tick` until shutdown.
    pub async fn run_watchdog(&self) {
        let mut stop = self.shutdown.subscribe();
        if *stop.borrow() {
            return;
        }
        tracing::info!(
            tick_secs = self.config.tick.as_secs_f64(),
            restart_every = self.config.restart_every,
            "Watchdog started"
        );

        let start = tokio::time::Instant::now() + self.config.tick;
        let mut interval = tokio::time::interval_at(start, self.config.tick);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = stopped(&mut stop) => {
                    tracing::info!("Watchdog stopped");
                    return;
                }
            }
        }
    }

    /// Pause for the duration of confirmation prompts.
    ///
    /// Overlapping prompts are counted; listening resumes after the last one
    /// ends, and only if it was on when the first one began.
    pub async fn watch_confirmations(&self, mut notifications: broadcast::Receiver<Notification>) {
        let mut stop = self.shutdown.subscribe();
        if *stop.borrow() {
            return;
        }
        let mut outstanding = 0usize;
        let mut resume_after = false;

        loop {
            let notification = tokio::select! {
                received = notifications.recv() => received,
                _ = stopped(&mut stop) => return,
            };

            match notification {
                Ok(Notification::ConfirmationBegin { phrase, .. }) => {
                    outstanding += 1;
                    if outstanding == 1 {
                        resume_after = self.state() == ListeningState::Listening;
                        tracing::info!(phrase = %phrase, "Pausing recognition during confirmation");
                        if let Err(e) = self.pause().await {
                            tracing::warn!(error = %e, "Pause for confirmation failed");
                        }
                    }
                }
                Ok(Notification::ConfirmationEnd { phrase, .. }) => {
                    if outstanding == 0 {
                        continue;
                    }
                    outstanding -= 1;
                    if outstanding == 0 && resume_after {
                        tracing::info!(phrase = %phrase, "Resuming recognition after confirmation");
                        if let Err(e) = self.resume().await {
                            tracing::warn!(error = %e, "Resume after confirmation failed");
                        }
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // A missed End would keep recognition paused for good.
                    tracing::warn!(skipped, outstanding, "Confirmation watcher lagged, resetting");
                    outstanding = 0;
                    if std::mem::take(&mut resume_after) {
                        if let Err(e) = self.resume().await {
                            tracing::warn!(error = %e, "Resume after lag failed");
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    /// Stop the background loops and pause the listener.
    pub async fn shutdown(&self) -> Result<(), ListenError> {
        self.shutdown.send_replace(true);
        self.pause().await.map(|_| ())
    }

    async fn resume_locked(&self) -> Result<bool, ListenError> {
        if self.state() == ListeningState::Listening {
            return Ok(false);
        }
        let phrases = Arc::clone(&self.phrases.read().expect("phrases lock poisoned"));
        let started = self.listener.start(&phrases).await;
        self.set_state(ListeningState::Listening);
        match started {
            Ok(()) => {
                tracing::info!(verbs = phrases.len(), "Listening");
                Ok(true)
            }
            Err(e) => {
                tracing::error!(error = %e, "Listener failed to start");
                Err(e)
            }
        }
    }

    async fn pause_locked(&self) -> Result<bool, ListenError> {
        if self.state() == ListeningState::Paused {
            return Ok(false);
        }
        let stopped = self.listener.stop().await;
        self.set_state(ListeningState::Paused);
        match stopped {
            Ok(()) => {
                tracing::info!("Recognition paused");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Listener failed to stop cleanly");
                Err(e)
            }
        }
    }

    async fn restart_locked(&self) -> Result<(), ListenError> {
        if let Err(e) = self.pause_locked().await {
            tracing::debug!(error = %e, "Ignoring stop failure during restart");
        }
        self.resume_locked().await.map(|_| ())
    }

    fn set_state(&self, state: ListeningState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!("Listening state: {} -> {}", previous, state);
            self.bus.publish(Notification::listening_state_changed(state));
        }
    }
}
