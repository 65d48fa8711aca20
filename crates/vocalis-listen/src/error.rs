//! Errors from the recognition channel.

/// A listener failed to start or stop.
///
/// Never fatal: the supervisor logs it and the watchdog retries.
#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error("Failed to start listening: {0}")]
    Start(String),
    #[error("Failed to stop listening: {0}")]
    Stop(String),
    #[error("Listener I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_error_display() {
        assert_eq!(
            ListenError::Start("no audio device".into()).to_string(),
            "Failed to start listening: no audio device"
        );
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        assert!(ListenError::from(io).to_string().contains("pipe closed"));
    }
}
