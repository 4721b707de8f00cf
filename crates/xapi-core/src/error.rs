//! Typed error definitions for the xAPI client.
//!
//! Provides [`XapiError`] covering the full failure taxonomy of the command
//! channel and trade workflow. All variants implement `std::error::Error` via
//! `thiserror`, so they integrate seamlessly with `anyhow::Result` at binary
//! boundaries.
//!
//! Only one failure is ever retried internally: a `ConnectionLost` during an
//! authenticated command triggers a single reconnect + re-login + retry inside
//! the command channel. Everything else propagates to the caller.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, XapiError>;

/// Domain-specific errors for the xAPI client.
#[derive(Debug, Error)]
pub enum XapiError {
    /// The `login` command was rejected by the server.
    #[error("login rejected: {0}")]
    Authentication(String),

    /// An authenticated command was attempted before login.
    #[error("not logged in")]
    NotAuthenticated,

    /// The transport dropped mid-exchange (socket closed, read error, or
    /// receive timeout).
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The server sent a malformed response (not JSON, or missing `status`).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Application-level rejection: `status=false` with the server's error
    /// code and description surfaced verbatim.
    #[error("command failed: {code}: {description}")]
    CommandFailed { code: String, description: String },

    /// A raw trade command code outside the known table, or a direction
    /// that is not BUY/SELL where a market entry is required.
    #[error("invalid trade command code: {0}")]
    InvalidMode(i64),

    /// Non-positive trade volume.
    #[error("invalid volume: {0}")]
    InvalidVolume(f64),

    /// A chart period (in minutes) outside the known table.
    #[error("invalid period: {0} minutes")]
    InvalidPeriod(i64),

    /// A trade transaction was submitted but the confirmation status was not
    /// ACCEPTED (3). Carries the broker's raw status code.
    #[error("transaction rejected with status {0}")]
    TransactionRejected(i64),

    /// Order id not present in the transaction registry at last refresh.
    #[error("unknown transaction: order {0}")]
    UnknownTransaction(u64),
}

impl XapiError {
    /// Returns the server error code if this is a `CommandFailed`.
    pub fn command_error_code(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { code, .. } => Some(code),
            _ => None,
        }
    }
}
