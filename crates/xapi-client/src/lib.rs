//! # xapi-client
//!
//! Session-managed command channel and trade workflow for the xAPI trading
//! WebSocket protocol.
//!
//! The protocol carries no request-correlation id, so request and response
//! are paired strictly by send-then-receive ordering over one persistent
//! socket. [`CommandChannel`] is the sole owner of the transport and
//! serializes every exchange; [`Client`] layers the trade workflow (open,
//! close, close-all with idempotent already-closed handling) on top.
//!
//! ## Lifecycle
//!
//! 1. Construct via [`Client::connect`] (or [`Client::new`] with a custom
//!    [`Transport`]).
//! 2. Call [`Client::login`] to authenticate.
//! 3. Issue queries and trade operations; an idle session re-authenticates
//!    transparently, and a dropped connection is re-established and retried
//!    exactly once.
//! 4. Call [`Client::logout`].

pub mod channel;
pub mod client;
pub mod rate_limit;
pub mod registry;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::CommandChannel;
pub use client::Client;
pub use transport::{Transport, WsTransport};
