//! Console stand-ins for the speech engine and the confirmation dialog.
//!
//! Each stdin line is either a `:command`, an answer to a pending
//! confirmation, or a spoken phrase with an optional `@confidence` suffix:
//!
//! ```text
//! computer open browser @0.82
//! :pause
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vocalis_action::{ConfirmationError, ConfirmationPrompt};
use vocalis_core::RecognitionChoice;
use vocalis_listen::{ListenError, Listener, SessionEvent, Utterance};

/// Control commands typed at the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Pause,
    Resume,
    Toggle,
    Session(SessionEvent),
    Reload,
    Phrases,
    Quit,
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Command(ConsoleCommand),
    Speech(Utterance),
    Unknown(String),
}

/// Parse a console line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<ConsoleInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(command) = line.strip_prefix(':') {
        let parsed = match command.trim().to_lowercase().as_str() {
            "pause" => ConsoleCommand::Pause,
            "resume" => ConsoleCommand::Resume,
            "toggle" => ConsoleCommand::Toggle,
            "lock" => ConsoleCommand::Session(SessionEvent::Lock),
            "unlock" => ConsoleCommand::Session(SessionEvent::Unlock),
            "remote-connect" => ConsoleCommand::Session(SessionEvent::RemoteConnect),
            "remote-disconnect" => ConsoleCommand::Session(SessionEvent::RemoteDisconnect),
            "reload" => ConsoleCommand::Reload,
            "phrases" => ConsoleCommand::Phrases,
            "quit" | "exit" => ConsoleCommand::Quit,
            _ => return Some(ConsoleInput::Unknown(line.to_string())),
        };
        return Some(ConsoleInput::Command(parsed));
    }

    let mut words: Vec<&str> = line.split_whitespace().collect();
    let mut confidence = 1.0;
    if let Some(last) = words.last() {
        if let Some(value) = last.strip_prefix('@') {
            match value.parse::<f64>() {
                Ok(c) if (0.0..=1.0).contains(&c) => {
                    confidence = c;
                    words.pop();
                }
                _ => return Some(ConsoleInput::Unknown(line.to_string())),
            }
        }
    }
    Some(ConsoleInput::Speech(Utterance::new(
        words.into_iter().map(str::to_string).collect(),
        confidence,
    )))
}

/// Console "recognizer". It only gates whether typed phrases count.
#[derive(Default)]
pub struct ConsoleListener {
    listening: AtomicBool,
    phrases: Mutex<Vec<RecognitionChoice>>,
}

impl ConsoleListener {
    /// Spoken forms the recognizer would accept, one per verb/noun pair.
    pub fn spoken_phrases(&self) -> Vec<String> {
        let phrases = self.phrases.lock().expect("phrases mutex poisoned");
        phrases
            .iter()
            .flat_map(|choice| {
                choice
                    .nouns
                    .iter()
                    .map(move |noun| format!("{} {}", choice.verb, noun))
            })
            .collect()
    }
}

#[async_trait]
impl Listener for ConsoleListener {
    async fn start(&self, phrases: &[RecognitionChoice]) -> Result<(), ListenError> {
        *self.phrases.lock().expect("phrases mutex poisoned") = phrases.to_vec();
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

/// Confirmation prompt answered by a `yes`/`no` console line.
#[derive(Default)]
pub struct ConsolePrompt {
    waiting: Mutex<Option<std_mpsc::SyncSender<bool>>>,
}

impl ConsolePrompt {
    /// Deliver `line` to a pending prompt.
    ///
    /// Returns `true` if a prompt was waiting and `line` was a yes/no answer.
    pub fn answer(&self, line: &str) -> bool {
        let answer = match line.trim().to_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => return false,
        };
        let waiting = self.waiting.lock().expect("prompt mutex poisoned");
        match waiting.as_ref() {
            Some(tx) => tx.try_send(answer).is_ok(),
            None => false,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.lock().expect("prompt mutex poisoned").is_some()
    }
}

impl ConfirmationPrompt for ConsolePrompt {
    fn ask(&self, phrase: &str, timeout: Duration) -> Result<bool, ConfirmationError> {
        let (tx, rx) = std_mpsc::sync_channel(1);
        {
            let mut waiting = self.waiting.lock().expect("prompt mutex poisoned");
            if waiting.is_some() {
                return Err(ConfirmationError::Prompt(
                    "another confirmation is already pending".into(),
                ));
            }
            *waiting = Some(tx);
        }

        eprintln!("Run \"{}\"? [yes/no] ({}s)", phrase, timeout.as_secs());
        let answer = rx.recv_timeout(timeout);
        *self.waiting.lock().expect("prompt mutex poisoned") = None;

        match answer {
            Ok(confirmed) => Ok(confirmed),
            Err(std_mpsc::RecvTimeoutError::Timeout) => Ok(false),
            Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                Err(ConfirmationError::Prompt("prompt channel closed".into()))
            }
        }
    }
}
