//! Authentication state for one client instance.
//!
//! Two states, no intermediates: `NotLogged` and `Logged`. A logged session
//! always holds the credentials it was established with, so the command
//! channel can silently re-login after the server-side idle timeout or after
//! a dropped connection.

use std::time::Duration;

use tokio::time::Instant;

/// Login credentials kept for transparent re-authentication.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotLogged,
    Logged,
}

/// Session state machine.
///
/// Invariant: `Logged` implies credentials are present.
#[derive(Debug)]
pub struct Session {
    status: SessionStatus,
    credentials: Option<Credentials>,
    stream_session_id: Option<String>,
    last_request: Option<Instant>,
    timeout: Duration,
}

impl Session {
    /// A fresh, not-logged session with the given idle timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            status: SessionStatus::NotLogged,
            credentials: None,
            stream_session_id: None,
            last_request: None,
            timeout,
        }
    }

    pub fn is_logged(&self) -> bool {
        self.status == SessionStatus::Logged
    }

    /// Whether the session sat idle past the server timeout and must be
    /// re-established before the next authenticated command.
    pub fn idle_expired(&self) -> bool {
        match self.last_request {
            Some(last) => last.elapsed() >= self.timeout,
            None => false,
        }
    }

    /// Record a completed exchange (any command counts as activity).
    pub fn touch(&mut self) {
        self.last_request = Some(Instant::now());
    }

    /// Transition to `Logged` with the credentials that succeeded.
    pub fn set_logged(&mut self, credentials: Credentials, stream_session_id: Option<String>) {
        self.credentials = Some(credentials);
        self.stream_session_id = stream_session_id;
        self.status = SessionStatus::Logged;
    }

    /// Transition back to `NotLogged` (logout). Credentials are dropped.
    pub fn set_logged_out(&mut self) {
        self.status = SessionStatus::NotLogged;
        self.credentials = None;
        self.stream_session_id = None;
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// The `streamSessionId` returned by the last successful login.
    pub fn stream_session_id(&self) -> Option<&str> {
        self.stream_session_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            user_id: "1001".into(),
            password: "pw".into(),
        }
    }

    #[tokio::test]
    async fn starts_not_logged() {
        let session = Session::new(Duration::from_secs(600));
        assert!(!session.is_logged());
        assert!(session.credentials().is_none());
        assert!(!session.idle_expired());
    }

    #[tokio::test]
    async fn login_stores_credentials_and_session_id() {
        let mut session = Session::new(Duration::from_secs(600));
        session.set_logged(credentials(), Some("abc123".into()));
        assert!(session.is_logged());
        assert_eq!(session.stream_session_id(), Some("abc123"));
        assert_eq!(session.credentials().unwrap().user_id, "1001");
    }

    #[tokio::test]
    async fn logout_resets_to_not_logged() {
        let mut session = Session::new(Duration::from_secs(600));
        session.set_logged(credentials(), None);
        session.set_logged_out();
        assert!(!session.is_logged());
        assert!(session.stream_session_id().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_expires_after_the_timeout() {
        let mut session = Session::new(Duration::from_secs(600));
        session.set_logged(credentials(), None);
        session.touch();
        assert!(!session.idle_expired());

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(!session.idle_expired());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(session.idle_expired());

        session.touch();
        assert!(!session.idle_expired());
    }
}
