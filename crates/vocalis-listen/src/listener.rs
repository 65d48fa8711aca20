//! Contract for the external recognition engine.

use async_trait::async_trait;
use vocalis_core::RecognitionChoice;

use crate::error::ListenError;

/// A recognition channel the supervisor can start and stop.
///
/// Implementations deliver recognized word sequences on their own (usually
/// as [`Utterance`](crate::recognition::Utterance)s over a channel). The
/// supervisor never calls `start` and `stop` concurrently.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Load `phrases` and begin delivering recognitions.
    async fn start(&self, phrases: &[RecognitionChoice]) -> Result<(), ListenError>;

    /// Stop delivering recognitions and release the engine.
    async fn stop(&self) -> Result<(), ListenError>;

    /// Whether the engine is actually capturing audio right now.
    ///
    /// May turn false on its own when the engine dies silently.
    fn is_listening(&self) -> bool;
}
