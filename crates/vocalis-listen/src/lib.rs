//! Listening supervision for vocalis.
//!
//! Keeps the external recognition engine in the state the user asked for,
//! pauses it around confirmation prompts and session locks, and restarts it
//! when it stops delivering recognitions.

pub mod error;
pub mod listener;
pub mod recognition;
pub mod session;
pub mod supervisor;

pub use error::ListenError;
pub use listener::Listener;
pub use recognition::{route_utterances, Recognition, RecognitionFilter, Utterance};
pub use session::{SessionEvent, SessionResponse};
pub use supervisor::{ListeningSupervisor, RestartReason, SupervisorConfig, TickOutcome};
