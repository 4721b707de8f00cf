//! Scripted transport for tests.
//!
//! `MockTransport` replays a fixed sequence of response frames and records
//! every frame sent, so tests can assert on exchange ordering without a live
//! socket.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::{Value, json};
use xapi_core::error::{Result, XapiError};

use crate::transport::Transport;

/// One scripted reaction to a `receive()` call.
pub enum Scripted {
    /// Return this frame.
    Frame(String),
    /// Fail with `ConnectionLost`, simulating a dropped socket.
    Drop,
    /// Never resolve, simulating a server that stops responding.
    Hang,
}

#[derive(Default)]
pub struct MockTransport {
    /// Frames sent by the client, in order.
    pub sent: Vec<String>,
    /// How many times `open()` was called.
    pub open_count: usize,
    /// Remaining scripted reactions, consumed front to back.
    pub script: VecDeque<Scripted>,
    open: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful response with the given `returnData`.
    pub fn push_ok(&mut self, return_data: Value) {
        self.push_raw(json!({"status": true, "returnData": return_data}).to_string());
    }

    /// Script a successful response with no payload (`logout`, `ping`).
    pub fn push_ok_empty(&mut self) {
        self.push_raw(json!({"status": true}).to_string());
    }

    /// Script a successful login response.
    pub fn push_login_ok(&mut self, stream_session_id: &str) {
        self.push_raw(
            json!({"status": true, "streamSessionId": stream_session_id}).to_string(),
        );
    }

    /// Script an application-level rejection.
    pub fn push_fail(&mut self, code: &str, descr: &str) {
        self.push_raw(
            json!({"status": false, "errorCode": code, "errorDescr": descr}).to_string(),
        );
    }

    /// Script a raw text frame.
    pub fn push_raw(&mut self, frame: String) {
        self.script.push_back(Scripted::Frame(frame));
    }

    /// Script a connection drop on the next receive.
    pub fn push_drop(&mut self) {
        self.script.push_back(Scripted::Drop);
    }

    /// Script a receive that never completes.
    pub fn push_hang(&mut self) {
        self.script.push_back(Scripted::Hang);
    }

    /// The parsed command names of every sent frame, in order.
    pub fn sent_commands(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|frame| {
                serde_json::from_str::<Value>(frame).unwrap()["command"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect()
    }

    /// Parsed JSON of the `index`-th sent frame.
    pub fn sent_json(&self, index: usize) -> Value {
        serde_json::from_str(&self.sent[index]).unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&mut self) -> Result<()> {
        self.open = true;
        self.open_count += 1;
        Ok(())
    }

    async fn send(&mut self, frame: &str) -> Result<()> {
        if !self.open {
            return Err(XapiError::ConnectionLost("transport not connected".into()));
        }
        self.sent.push(frame.to_string());
        Ok(())
    }

    async fn receive(&mut self) -> Result<String> {
        match self.script.pop_front() {
            Some(Scripted::Frame(frame)) => Ok(frame),
            Some(Scripted::Drop) => {
                self.open = false;
                Err(XapiError::ConnectionLost("scripted drop".into()))
            }
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(XapiError::ConnectionLost("script exhausted".into())),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
