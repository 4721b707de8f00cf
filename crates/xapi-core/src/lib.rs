//! # xapi-core
//!
//! Core crate for the xAPI trading client, providing:
//!
//! - **Types** (`types`) — protocol enums and data records (trades, symbols,
//!   transaction parameters)
//! - **Codec** (`codec`) — request/response envelope encoding and decoding
//! - **Error types** (`error`) — domain-specific `XapiError` via thiserror
//! - **Configuration** (`config`) — JSON config deserialization
//! - **Logging** (`logging`) — tracing-based structured logging
//!
//! No network code lives here; the transport and session machinery is in
//! `xapi-client`.

pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export types at crate root for convenience.
pub use error::{Result, XapiError};
pub use types::*;
