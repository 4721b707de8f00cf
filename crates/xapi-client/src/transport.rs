//! Transport seam: a duplex text channel that can be told "send this frame,
//! then wait for exactly one response frame, in order."
//!
//! [`WsTransport`] is the production implementation over `tokio-tungstenite`.
//! The stream is not split: the command channel never interleaves sends and
//! receives, so one owner drives both halves. Control frames (pings) are
//! answered inline; only text frames count as responses.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use xapi_core::error::{Result, XapiError};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A duplex text channel over a persistent connection.
#[async_trait]
pub trait Transport: Send {
    /// (Re-)establish the connection. Any previous stream is discarded.
    async fn open(&mut self) -> Result<()>;

    /// Send one text frame.
    async fn send(&mut self, frame: &str) -> Result<()>;

    /// Wait for the next text frame.
    async fn receive(&mut self) -> Result<String>;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// WebSocket transport over TLS.
pub struct WsTransport {
    url: String,
    stream: Option<WsStream>,
}

impl WsTransport {
    /// Create a transport for `url` (not yet connected).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
        }
    }

    fn stream_mut(&mut self) -> Result<&mut WsStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| XapiError::ConnectionLost("transport not connected".into()))
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&mut self) -> Result<()> {
        info!("connecting to {}", self.url);
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| XapiError::ConnectionLost(format!("connect failed: {e}")))?;
        self.stream = Some(stream);
        info!("connected");
        Ok(())
    }

    async fn send(&mut self, frame: &str) -> Result<()> {
        let stream = self.stream_mut()?;
        stream
            .send(Message::Text(frame.to_string().into()))
            .await
            .map_err(|e| XapiError::ConnectionLost(format!("send failed: {e}")))
    }

    async fn receive(&mut self) -> Result<String> {
        let stream = self.stream_mut()?;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Ping(data))) => {
                    let _ = stream.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) => {
                    warn!("received close frame");
                    self.stream = None;
                    return Err(XapiError::ConnectionLost("server closed connection".into()));
                }
                Some(Ok(other)) => {
                    debug!("ignoring non-text frame: {other:?}");
                }
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(XapiError::ConnectionLost(format!("read error: {e}")));
                }
                None => {
                    self.stream = None;
                    return Err(XapiError::ConnectionLost("stream ended".into()));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}
