//! The serialized command channel: one atomic send+receive per command.
//!
//! The wire protocol has no request-correlation id, so a response belongs to
//! whichever request was sent immediately before it. The channel therefore
//! owns the transport behind a mutex and holds the lock for the full
//! exchange; a second command cannot start until the prior response is
//! consumed. The rate limiter, session book-keeping, and the one-shot
//! reconnect+re-login+retry all live inside that critical section.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use xapi_core::codec::{self, Request, Response};
use xapi_core::config::XapiConfig;
use xapi_core::error::{Result, XapiError};

use crate::rate_limit::RateLimiter;
use crate::session::{Credentials, Session};
use crate::transport::Transport;

/// Sole owner of the transport; serializes all command exchanges.
pub struct CommandChannel<T: Transport> {
    inner: Mutex<ChannelInner<T>>,
    request_timeout: Duration,
}

pub(crate) struct ChannelInner<T: Transport> {
    pub(crate) transport: T,
    limiter: RateLimiter,
    session: Session,
}

impl<T: Transport> CommandChannel<T> {
    /// Wrap a transport (not yet connected; `login` opens it).
    pub fn new(transport: T, config: &XapiConfig) -> Self {
        Self {
            inner: Mutex::new(ChannelInner {
                transport,
                limiter: RateLimiter::new(config.rate_limit()),
                session: Session::new(config.session_timeout()),
            }),
            request_timeout: config.request_timeout(),
        }
    }

    /// Open the transport (if needed), send `login`, and transition the
    /// session to logged. Returns the `streamSessionId`.
    ///
    /// A `status=false` reply maps to [`XapiError::Authentication`].
    pub async fn login(&self, user_id: &str, password: &str) -> Result<String> {
        let mut inner = self.inner.lock().await;
        if !inner.transport.is_open() {
            inner.transport.open().await?;
        }
        let credentials = Credentials {
            user_id: user_id.to_string(),
            password: password.to_string(),
        };
        let session_id = self.do_login(&mut inner, &credentials).await?;
        info!(user_id, "logged in");
        Ok(session_id)
    }

    /// Send `logout` and reset the session to not-logged.
    pub async fn logout(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let request = Request::new("logout");
        self.round_trip(&mut inner, &request).await?;
        inner.session.set_logged_out();
        info!("logged out");
        Ok(())
    }

    /// Execute a command without a session check.
    pub async fn execute(&self, request: Request) -> Result<Option<Value>> {
        let mut inner = self.inner.lock().await;
        let response = self.round_trip(&mut inner, &request).await?;
        Ok(response.return_data)
    }

    /// Execute a command after verifying (and if needed, refreshing) the
    /// session.
    ///
    /// If the transport drops mid-exchange, the channel reconnects,
    /// re-logs-in with the stored credentials, and retries the command
    /// exactly once. A second failure propagates.
    pub async fn execute_authenticated(&self, request: Request) -> Result<Option<Value>> {
        let mut inner = self.inner.lock().await;
        self.ensure_authenticated(&mut inner).await?;

        match self.round_trip(&mut inner, &request).await {
            Ok(response) => Ok(response.return_data),
            Err(XapiError::ConnectionLost(reason)) => {
                warn!(%reason, command = %request.command, "connection lost, retrying once");
                self.reconnect(&mut inner).await?;
                let response = self.round_trip(&mut inner, &request).await?;
                Ok(response.return_data)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the session is currently logged in.
    pub async fn is_logged(&self) -> bool {
        self.inner.lock().await.session.is_logged()
    }

    /// The `streamSessionId` from the last successful login, if any.
    pub async fn stream_session_id(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.session.stream_session_id().map(str::to_string)
    }

    /// Close the transport. The session is left not-logged.
    pub async fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.session.set_logged_out();
        inner.transport.close().await
    }

    /// Scripted-transport access for tests.
    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Mutex<ChannelInner<T>> {
        &self.inner
    }

    /// Fail fast when not logged; silently re-login when the session sat
    /// idle past the server timeout.
    async fn ensure_authenticated(&self, inner: &mut ChannelInner<T>) -> Result<()> {
        if !inner.session.is_logged() {
            return Err(XapiError::NotAuthenticated);
        }
        if inner.session.idle_expired() {
            info!("session idle past timeout, re-authenticating");
            let credentials = self.stored_credentials(inner)?;
            self.do_login(inner, &credentials).await?;
        }
        Ok(())
    }

    /// Re-open the transport and re-establish the session.
    async fn reconnect(&self, inner: &mut ChannelInner<T>) -> Result<()> {
        let credentials = self.stored_credentials(inner)?;
        inner.transport.open().await?;
        self.do_login(inner, &credentials).await?;
        Ok(())
    }

    fn stored_credentials(&self, inner: &ChannelInner<T>) -> Result<Credentials> {
        inner
            .session
            .credentials()
            .cloned()
            .ok_or(XapiError::NotAuthenticated)
    }

    /// Send the login command and record the resulting session state.
    async fn do_login(
        &self,
        inner: &mut ChannelInner<T>,
        credentials: &Credentials,
    ) -> Result<String> {
        let request = Request::with_arguments(
            "login",
            json!({
                "userId": credentials.user_id,
                "password": credentials.password,
            }),
        );
        let response = match self.round_trip(inner, &request).await {
            Ok(response) => response,
            Err(XapiError::CommandFailed { code, description }) => {
                return Err(XapiError::Authentication(format!("{code}: {description}")));
            }
            Err(e) => return Err(e),
        };
        let session_id = response.stream_session_id.unwrap_or_default();
        inner
            .session
            .set_logged(credentials.clone(), Some(session_id.clone()));
        Ok(session_id)
    }

    /// One rate-limited exchange: send a frame, wait for exactly one
    /// response frame, decode and classify it.
    ///
    /// The limiter and session are stamped even when the exchange fails; a
    /// failed round trip still consumed a request slot.
    async fn round_trip(
        &self,
        inner: &mut ChannelInner<T>,
        request: &Request,
    ) -> Result<Response> {
        inner.limiter.acquire().await;
        let frame = request.to_frame()?;
        debug!(command = %request.command, "sending command");

        let result = Self::exchange(&mut inner.transport, &frame, self.request_timeout).await;
        inner.limiter.stamp();
        inner.session.touch();

        let response = codec::decode(&result?)?;
        response.check()?;
        Ok(response)
    }

    async fn exchange(transport: &mut T, frame: &str, timeout: Duration) -> Result<String> {
        transport.send(frame).await?;
        match tokio::time::timeout(timeout, transport.receive()).await {
            Ok(result) => result,
            Err(_) => Err(XapiError::ConnectionLost("receive timed out".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::time::{Duration, Instant, advance};

    use super::*;
    use crate::testing::{MockTransport, Scripted};

    fn channel(transport: MockTransport) -> CommandChannel<MockTransport> {
        CommandChannel::new(transport, &XapiConfig::new("wss://example.invalid"))
    }

    async fn logged_in_channel(mut transport: MockTransport) -> CommandChannel<MockTransport> {
        transport.script.push_front(Scripted::Frame(
            json!({"status": true, "streamSessionId": "abc123"}).to_string(),
        ));
        let channel = channel(transport);
        channel.login("1001", "pw").await.unwrap();
        channel
    }

    #[tokio::test]
    async fn authenticated_command_before_login_fails() {
        let channel = channel(MockTransport::new());
        let err = channel
            .execute_authenticated(Request::new("getCalendar"))
            .await
            .unwrap_err();
        assert!(matches!(err, XapiError::NotAuthenticated));
    }

    #[tokio::test]
    async fn login_opens_transport_and_stores_session_id() {
        let mut transport = MockTransport::new();
        transport.push_login_ok("abc123");
        let channel = channel(transport);

        let session_id = channel.login("1001", "pw").await.unwrap();
        assert_eq!(session_id, "abc123");
        assert!(channel.is_logged().await);
        assert_eq!(channel.stream_session_id().await.as_deref(), Some("abc123"));

        let inner = channel.inner.lock().await;
        assert_eq!(inner.transport.open_count, 1);
        let frame = inner.transport.sent_json(0);
        assert_eq!(frame["command"], "login");
        assert_eq!(frame["arguments"]["userId"], "1001");
        assert_eq!(frame["arguments"]["password"], "pw");
    }

    #[tokio::test]
    async fn rejected_login_maps_to_authentication_error() {
        let mut transport = MockTransport::new();
        transport.push_fail("BE005", "Invalid login or password");
        let channel = channel(transport);

        let err = channel.login("1001", "bad").await.unwrap_err();
        assert!(matches!(err, XapiError::Authentication(_)));
        assert!(!channel.is_logged().await);
    }

    #[tokio::test]
    async fn logged_in_command_does_not_relogin() {
        let mut transport = MockTransport::new();
        transport.push_ok(json!([]));
        let channel = logged_in_channel(transport).await;

        channel
            .execute_authenticated(Request::new("getCalendar"))
            .await
            .unwrap();

        let inner = channel.inner.lock().await;
        assert_eq!(inner.transport.sent_commands(), vec!["login", "getCalendar"]);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_session_triggers_exactly_one_relogin() {
        let mut transport = MockTransport::new();
        transport.push_login_ok("abc124"); // silent re-login
        transport.push_ok(json!([]));
        let channel = logged_in_channel(transport).await;

        advance(Duration::from_secs(600)).await;
        channel
            .execute_authenticated(Request::new("getCalendar"))
            .await
            .unwrap();

        let inner = channel.inner.lock().await;
        assert_eq!(
            inner.transport.sent_commands(),
            vec!["login", "login", "getCalendar"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn active_session_does_not_relogin_early() {
        let mut transport = MockTransport::new();
        transport.push_ok(json!([]));
        let channel = logged_in_channel(transport).await;

        advance(Duration::from_secs(599)).await;
        channel
            .execute_authenticated(Request::new("getCalendar"))
            .await
            .unwrap();

        let inner = channel.inner.lock().await;
        assert_eq!(inner.transport.sent_commands(), vec!["login", "getCalendar"]);
    }

    #[tokio::test]
    async fn connection_lost_reconnects_relogs_and_retries_once() {
        let mut transport = MockTransport::new();
        transport.push_drop(); // the command's receive fails
        transport.push_login_ok("abc125"); // re-login on the new connection
        transport.push_ok(json!({"version": "2.5.0"})); // retried command
        let channel = logged_in_channel(transport).await;

        let data = channel
            .execute_authenticated(Request::new("getVersion"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data["version"], "2.5.0");

        let inner = channel.inner.lock().await;
        assert_eq!(inner.transport.open_count, 2);
        assert_eq!(
            inner.transport.sent_commands(),
            vec!["login", "getVersion", "login", "getVersion"]
        );
    }

    #[tokio::test]
    async fn second_connection_loss_is_fatal() {
        let mut transport = MockTransport::new();
        transport.push_drop();
        transport.push_login_ok("abc126");
        transport.push_drop(); // retried command fails again
        let channel = logged_in_channel(transport).await;

        let err = channel
            .execute_authenticated(Request::new("getVersion"))
            .await
            .unwrap_err();
        assert!(matches!(err, XapiError::ConnectionLost(_)));
    }

    #[tokio::test]
    async fn application_rejection_surfaces_as_command_failed() {
        let mut transport = MockTransport::new();
        transport.push_fail("BE115", "symbol not found");
        let channel = logged_in_channel(transport).await;

        let err = channel
            .execute_authenticated(Request::with_arguments(
                "getSymbol",
                json!({"symbol": "NOPE"}),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.command_error_code(), Some("BE115"));
    }

    #[tokio::test]
    async fn malformed_response_is_a_protocol_error() {
        let mut transport = MockTransport::new();
        transport.push_raw("{not json".into());
        let channel = logged_in_channel(transport).await;

        let err = channel
            .execute_authenticated(Request::new("getCalendar"))
            .await
            .unwrap_err();
        assert!(matches!(err, XapiError::Protocol(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_commands_are_spaced_by_the_rate_limit() {
        let mut transport = MockTransport::new();
        transport.push_ok_empty();
        transport.push_ok_empty();
        let channel = logged_in_channel(transport).await;

        channel
            .execute_authenticated(Request::new("ping"))
            .await
            .unwrap();
        let before = Instant::now();
        channel
            .execute_authenticated(Request::new("ping"))
            .await
            .unwrap();
        assert!(before.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_server_times_out_as_connection_lost() {
        let mut transport = MockTransport::new();
        transport.push_hang();
        transport.open().await.unwrap();
        let channel = channel(transport);

        let err = channel.execute(Request::new("ping")).await.unwrap_err();
        match err {
            XapiError::ConnectionLost(reason) => assert!(reason.contains("timed out")),
            other => panic!("expected ConnectionLost, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn logout_resets_the_session() {
        let mut transport = MockTransport::new();
        transport.push_ok_empty(); // logout reply carries no returnData
        let channel = logged_in_channel(transport).await;

        channel.logout().await.unwrap();
        assert!(!channel.is_logged().await);

        let err = channel
            .execute_authenticated(Request::new("getCalendar"))
            .await
            .unwrap_err();
        assert!(matches!(err, XapiError::NotAuthenticated));
    }
}
