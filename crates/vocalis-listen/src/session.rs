//! Desktop session switches that pause and resume listening.

use std::fmt;

/// A change of the interactive session, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    Lock,
    Unlock,
    RemoteConnect,
    RemoteDisconnect,
}

/// What the supervisor does in response to a [`SessionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionResponse {
    Pause,
    Resume,
    Ignore,
}

impl SessionEvent {
    pub fn response(self) -> SessionResponse {
        match self {
            SessionEvent::Lock | SessionEvent::RemoteConnect => SessionResponse::Pause,
            SessionEvent::Unlock => SessionResponse::Resume,
            SessionEvent::RemoteDisconnect => SessionResponse::Ignore,
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Lock => write!(f, "lock"),
            SessionEvent::Unlock => write!(f, "unlock"),
            SessionEvent::RemoteConnect => write!(f, "remote connect"),
            SessionEvent::RemoteDisconnect => write!(f, "remote disconnect"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_responses() {
        assert_eq!(SessionEvent::Lock.response(), SessionResponse::Pause);
        assert_eq!(SessionEvent::RemoteConnect.response(), SessionResponse::Pause);
        assert_eq!(SessionEvent::Unlock.response(), SessionResponse::Resume);
        assert_eq!(SessionEvent::RemoteDisconnect.response(), SessionResponse::Ignore);
    }

    #[test]
    fn test_session_display() {
        assert_eq!(SessionEvent::RemoteConnect.to_string(), "remote connect");
    }
}
