//! Vocalis application binary - composition root.
//!
//! Ties the crates together into a single executable:
//! 1. Load the command file (a failure here is fatal; nothing listens)
//! 2. Register the built-in actions and build the phrase index
//! 3. Start the dispatcher, the listening supervisor and its watchdog
//! 4. Read recognitions and control commands from the console

mod cli;
mod console;

use std::io::BufRead;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::{broadcast, mpsc};

use vocalis_action::{
    ActionRegistry, DispatchConfig, Dispatcher, PhraseIndex, RestrictionChecker,
};
use vocalis_core::{CommandConfig, ConfigStore, ListeningState, Notification, NotificationBus};
use vocalis_listen::{
    route_utterances, Listener, ListeningSupervisor, RecognitionFilter, Utterance,
};

use crate::cli::CliArgs;
use crate::console::{parse_line, ConsoleCommand, ConsoleInput, ConsoleListener, ConsolePrompt};

/// The command file minus bindings whose action is not registered.
fn registered_config(config: &CommandConfig, registry: &ActionRegistry) -> CommandConfig {
    let mut config = config.clone();
    config.retain_registered(|name| registry.contains(name));
    config
}

/// Print notifications meant for the user.
async fn report_notifications(mut notifications: broadcast::Receiver<Notification>) {
    loop {
        match notifications.recv().await {
            Ok(Notification::ErrorRaised { message, .. }) => eprintln!("error: {}", message),
            Ok(Notification::ListeningStateChanged { state, .. }) => eprintln!("[{}]", state),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Notification reporter lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Read stdin on a plain thread. Answers to a pending confirmation are
/// consumed here; everything else is forwarded.
fn spawn_stdin_reader(prompt: Arc<ConsolePrompt>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(32);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read stdin");
                    break;
                }
            };
            if prompt.answer(&line) {
                continue;
            }
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Re-read the command file and push it into the running components.
async fn reload(store: &ConfigStore, dispatcher: &Dispatcher, supervisor: &ListeningSupervisor) {
    let config = match store.reload() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Reload failed, keeping the previous command file");
            return;
        }
    };
    let active = registered_config(&config, dispatcher.registry());
    dispatcher.replace_index(PhraseIndex::build(&active.grammar));
    dispatcher.replace_restrictions(active.restrictions.clone());
    supervisor.replace_phrases(
        active
            .grammar
            .recognition_phrases(config.assistant.verb_prefix()),
    );
    if supervisor.state() == ListeningState::Listening {
        if let Err(e) = supervisor.restart().await {
            tracing::error!(error = %e, "Restart after reload failed");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.resolve_log_level())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting vocalis v{}", env!("CARGO_PKG_VERSION"));

    // Command file.
    let config_path = args.resolve_config_path();
    let store = match ConfigStore::open(&config_path) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(
                path = %config_path.display(),
                error = %e,
                "Cannot load command file, not listening"
            );
            return Err(e.into());
        }
    };
    let config = store.current();

    // Actions.
    let registry = ActionRegistry::with_builtins()?;
    let active = registered_config(&config, &registry);

    // Dispatch.
    let bus = NotificationBus::default();
    let prompt = Arc::new(ConsolePrompt::default());
    let dispatch_config = DispatchConfig {
        min_confidence: config.assistant.min_confidence,
        display_errors: config.display_errors,
        confirmation_timeout: args
            .resolve_confirmation_timeout(DispatchConfig::default().confirmation_timeout),
    };
    let dispatcher = Dispatcher::new(
        dispatch_config,
        PhraseIndex::build(&active.grammar),
        registry,
        RestrictionChecker::with_system_probe(active.restrictions.clone()),
        prompt.clone(),
        bus.clone(),
    );

    // Listening.
    let listener = Arc::new(ConsoleListener::default());
    let supervisor = Arc::new(ListeningSupervisor::new(
        listener.clone(),
        active
            .grammar
            .recognition_phrases(config.assistant.verb_prefix()),
        bus.clone(),
        args.resolve_supervisor_config(),
    ));

    // === Background tasks ===

    tokio::spawn(report_notifications(bus.subscribe()));

    let confirmations = bus.subscribe();
    tokio::spawn({
        let supervisor = Arc::clone(&supervisor);
        async move { supervisor.watch_confirmations(confirmations).await }
    });

    tokio::spawn({
        let supervisor = Arc::clone(&supervisor);
        async move { supervisor.run_watchdog().await }
    });

    let (utterance_tx, utterance_rx) = mpsc::channel::<Utterance>(32);
    tokio::spawn(route_utterances(
        utterance_rx,
        RecognitionFilter::new(&config.assistant),
        dispatcher.clone(),
    ));

    if args.paused {
        tracing::info!("Starting paused");
    } else if let Err(e) = supervisor.resume().await {
        tracing::error!(error = %e, "Initial resume failed, the watchdog will retry");
    }

    // === Console loop ===

    let mut lines = spawn_stdin_reader(prompt);
    loop {
        let line = tokio::select! {
            line = lines.recv() => match line {
                Some(line) => line,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };

        match parse_line(&line) {
            None => {}
            Some(ConsoleInput::Speech(utterance)) => {
                if !listener.is_listening() {
                    tracing::debug!("Not listening, ignoring input");
                    continue;
                }
                if utterance_tx.send(utterance).await.is_err() {
                    tracing::error!("Recognition router stopped");
                    break;
                }
            }
            Some(ConsoleInput::Command(command)) => {
                let result = match command {
                    ConsoleCommand::Pause => supervisor.pause().await.map(|_| ()),
                    ConsoleCommand::Resume => supervisor.resume().await.map(|_| ()),
                    ConsoleCommand::Toggle => supervisor.toggle().await.map(|_| ()),
                    ConsoleCommand::Session(event) => supervisor.on_session_event(event).await,
                    ConsoleCommand::Reload => {
                        reload(&store, &dispatcher, &supervisor).await;
                        Ok(())
                    }
                    ConsoleCommand::Phrases => {
                        for phrase in listener.spoken_phrases() {
                            println!("{}", phrase);
                        }
                        Ok(())
                    }
                    ConsoleCommand::Quit => break,
                };
                if let Err(e) = result {
                    tracing::error!(command = ?command, error = %e, "Command failed");
                }
            }
            Some(ConsoleInput::Unknown(text)) => {
                eprintln!("unrecognized input: {}", text);
            }
        }
    }

    tracing::info!("Shutting down");
    supervisor.shutdown().await?;
    Ok(())
}
