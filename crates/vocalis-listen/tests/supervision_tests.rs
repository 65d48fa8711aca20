//! Supervisor and dispatcher wired together the way the app wires them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;

use vocalis_action::{
    Action, ActionError, ActionRegistry, ActionResult, ConfirmationError, ConfirmationPrompt,
    DispatchConfig, Dispatcher, PhraseIndex, ProcessProbe, RestrictionChecker,
};
use vocalis_core::{
    Arguments, CommandConfig, ListeningState, NotificationBus, RecognitionChoice,
};
use vocalis_listen::{
    route_utterances, ListenError, Listener, ListeningSupervisor, RecognitionFilter,
    SupervisorConfig, Utterance,
};

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct FakeListener {
    listening: AtomicBool,
    loaded_verbs: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl Listener for FakeListener {
    async fn start(&self, phrases: &[RecognitionChoice]) -> Result<(), ListenError> {
        *self.loaded_verbs.lock().unwrap() = phrases.iter().map(|c| c.verb.clone()).collect();
        self.listening.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ListenError> {
        self.listening.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Counter {
    calls: AtomicUsize,
}

#[async_trait]
impl Action for Counter {
    fn name(&self) -> &str {
        "count"
    }

    async fn perform(&self, _args: Option<&Arguments>) -> Result<ActionResult, ActionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ActionResult::message("counted"))
    }
}

/// Answers yes once it has seen the listener go quiet, or after a second.
struct ObservingPrompt {
    listener: Arc<FakeListener>,
    saw_paused: AtomicBool,
}

impl ConfirmationPrompt for ObservingPrompt {
    fn ask(&self, _phrase: &str, _timeout: Duration) -> Result<bool, ConfirmationError> {
        let deadline = Instant::now() + Duration::from_secs(1);
        while Instant::now() < deadline {
            if !self.listener.is_listening() {
                self.saw_paused.store(true, Ordering::SeqCst);
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(true)
    }
}

struct NoProcesses;

impl ProcessProbe for NoProcesses {
    fn running_executables(&self) -> std::io::Result<Vec<std::path::PathBuf>> {
        Ok(Vec::new())
    }
}

// =============================================================================
// Helpers
// =============================================================================

const COMMANDS: &str = r#"{
    "assistant": { "name": "computer", "enable_name": true, "min_confidence": 0.5 },
    "actions": {
        "press": {
            "button": { "action": "count" },
            "alarm":  { "action": "count", "confirm": true }
        },
        "idle": {}
    }
}"#;

struct Rig {
    config: CommandConfig,
    bus: NotificationBus,
    listener: Arc<FakeListener>,
    supervisor: Arc<ListeningSupervisor>,
    counter: Arc<Counter>,
}

fn rig() -> Rig {
    let config = CommandConfig::from_json_str(COMMANDS).unwrap();
    let bus = NotificationBus::default();
    let listener = Arc::new(FakeListener::default());
    let supervisor = Arc::new(ListeningSupervisor::new(
        listener.clone(),
        config
            .grammar
            .recognition_phrases(config.assistant.verb_prefix()),
        bus.clone(),
        SupervisorConfig::default(),
    ));
    Rig {
        config,
        bus,
        listener,
        supervisor,
        counter: Arc::new(Counter::default()),
    }
}

fn dispatcher(rig: &Rig, prompt: Arc<dyn ConfirmationPrompt>) -> Dispatcher {
    let mut registry = ActionRegistry::new();
    registry.register(rig.counter.clone()).unwrap();
    Dispatcher::new(
        DispatchConfig {
            min_confidence: rig.config.assistant.min_confidence,
            ..DispatchConfig::default()
        },
        PhraseIndex::build(&rig.config.grammar),
        registry,
        RestrictionChecker::new(rig.config.restrictions.clone(), Arc::new(NoProcesses)),
        prompt,
        rig.bus.clone(),
    )
}

async fn wait_for_calls(counter: &Counter, n: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while counter.calls.load(Ordering::SeqCst) < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("action was not invoked");
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_listener_receives_prefixed_phrases() {
    let rig = rig();
    rig.supervisor.resume().await.unwrap();
    assert_eq!(
        rig.listener.loaded_verbs.lock().unwrap().as_slice(),
        ["computer press"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_confirmation_pauses_and_resumes_listening() {
    let rig = rig();
    rig.supervisor.resume().await.unwrap();

    let watcher = tokio::spawn({
        let supervisor = Arc::clone(&rig.supervisor);
        let notifications = rig.bus.subscribe();
        async move { supervisor.watch_confirmations(notifications).await }
    });

    let prompt = Arc::new(ObservingPrompt {
        listener: rig.listener.clone(),
        saw_paused: AtomicBool::new(false),
    });
    let dispatcher = dispatcher(&rig, prompt.clone());

    let outcome = dispatcher.submit("press", "alarm").unwrap().await.unwrap();
    assert!(outcome.is_completed());
    assert!(prompt.saw_paused.load(Ordering::SeqCst));

    let mut state = rig.supervisor.subscribe_state();
    tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| *s == ListeningState::Listening),
    )
    .await
    .expect("listening did not resume")
    .unwrap();
    assert!(rig.listener.is_listening());

    rig.supervisor.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), watcher)
        .await
        .expect("watcher did not stop")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_confirmation_does_not_resume_a_paused_supervisor() {
    let rig = rig();

    let watcher = tokio::spawn({
        let supervisor = Arc::clone(&rig.supervisor);
        let notifications = rig.bus.subscribe();
        async move { supervisor.watch_confirmations(notifications).await }
    });

    let dispatcher = dispatcher(&rig, Arc::new(vocalis_action::StaticPrompt(true)));
    dispatcher.submit("press", "alarm").unwrap().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(rig.supervisor.state(), ListeningState::Paused);

    rig.supervisor.shutdown().await.unwrap();
    watcher.await.unwrap();
}

#[tokio::test]
async fn test_utterances_are_routed_to_actions() {
    let rig = rig();
    let dispatcher = dispatcher(&rig, Arc::new(vocalis_action::StaticPrompt(true)));
    let filter = RecognitionFilter::new(&rig.config.assistant);

    let (tx, rx) = mpsc::channel(8);
    tx.send(Utterance::from_text("computer press button", 0.9)).await.unwrap();
    tx.send(Utterance::from_text("computer press", 0.9)).await.unwrap();
    tx.send(Utterance::from_text("computer press button", 0.2)).await.unwrap();
    tx.send(Utterance::from_text("computer press nothing", 0.9)).await.unwrap();
    drop(tx);

    route_utterances(rx, filter, dispatcher).await;
    wait_for_calls(&rig.counter, 1).await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(rig.counter.calls.load(Ordering::SeqCst), 1);
}
