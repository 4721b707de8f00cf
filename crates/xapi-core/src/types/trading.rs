//! Trading data records — open positions, quotes, and trade-transaction
//! parameters.
//!
//! Field names follow the wire format of the `getTrades`, `getSymbol`,
//! `tradeTransaction`, and `tradeTransactionStatus` payloads.

use serde::{Deserialize, Serialize};

use super::enums::{RequestStatus, TradeCmd, TransactionType};

// ---------------------------------------------------------------------------
// Open position snapshot
// ---------------------------------------------------------------------------

/// One open position from a `getTrades` snapshot.
///
/// Transactions are point-in-time snapshots, not live references: the registry
/// that holds them is rebuilt wholesale on every refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    /// Broker-assigned order id.
    #[serde(rename = "order")]
    pub order_id: u64,

    /// Symbol, e.g. `"EURUSD"`.
    pub symbol: String,

    /// Position volume in lots.
    pub volume: f64,

    /// Direction/kind of the position.
    pub cmd: TradeCmd,

    /// Price at which the position was opened.
    #[serde(default)]
    pub open_price: f64,

    /// Current price at which the position would close.
    pub close_price: f64,

    /// Unrealized profit at snapshot time.
    #[serde(default)]
    pub profit: f64,

    /// Whether the broker already marked this position closed.
    #[serde(default)]
    pub closed: bool,
}

/// Either a cached [`Transaction`] or a raw order id.
///
/// Resolved once at the workflow boundary; everything downstream works in
/// order ids.
#[derive(Debug, Clone)]
pub enum TransactionRef {
    ById(u64),
    ByValue(Transaction),
}

impl TransactionRef {
    pub fn order_id(&self) -> u64 {
        match self {
            Self::ById(id) => *id,
            Self::ByValue(transaction) => transaction.order_id,
        }
    }
}

impl From<u64> for TransactionRef {
    fn from(order_id: u64) -> Self {
        Self::ById(order_id)
    }
}

impl From<Transaction> for TransactionRef {
    fn from(transaction: Transaction) -> Self {
        Self::ByValue(transaction)
    }
}

// ---------------------------------------------------------------------------
// Trade transaction parameters
// ---------------------------------------------------------------------------

/// The `tradeTransInfo` argument of a `tradeTransaction` command.
///
/// Optional fields default to absent and are kept off the wire.
#[derive(Debug, Clone, Serialize)]
pub struct TradeTransInfo {
    pub cmd: TradeCmd,

    #[serde(rename = "type")]
    pub trans_type: TransactionType,

    pub symbol: String,

    pub volume: f64,

    pub price: f64,

    /// Order id of the position being closed/modified/deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u64>,

    /// Pending order expiration (ms since epoch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,

    #[serde(rename = "customComment", skip_serializing_if = "Option::is_none")]
    pub custom_comment: Option<String>,

    /// Trailing offset in points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    /// Stop loss price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl: Option<f64>,

    /// Take profit price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tp: Option<f64>,
}

impl TradeTransInfo {
    /// Parameters for an immediate market open.
    pub fn open(cmd: TradeCmd, symbol: impl Into<String>, volume: f64, price: f64) -> Self {
        Self {
            cmd,
            trans_type: TransactionType::Open,
            symbol: symbol.into(),
            volume,
            price,
            order: None,
            expiration: None,
            custom_comment: None,
            offset: None,
            sl: None,
            tp: None,
        }
    }

    /// Parameters for closing an existing position at its cached price.
    pub fn close(transaction: &Transaction) -> Self {
        Self {
            cmd: transaction.cmd,
            trans_type: TransactionType::Close,
            symbol: transaction.symbol.clone(),
            volume: transaction.volume,
            price: transaction.close_price,
            order: Some(transaction.order_id),
            expiration: None,
            custom_comment: None,
            offset: None,
            sl: None,
            tp: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Quote and confirmation records
// ---------------------------------------------------------------------------

/// Quote snapshot from `getSymbol`.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolRecord {
    pub symbol: String,
    pub ask: f64,
    pub bid: f64,

    #[serde(default)]
    pub description: Option<String>,

    /// Quote timestamp (ms since epoch).
    #[serde(default)]
    pub time: Option<i64>,
}

/// Confirmation record from `tradeTransactionStatus`.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeStatus {
    pub order: u64,

    #[serde(rename = "requestStatus")]
    pub request_status: RequestStatus,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(rename = "customComment", default)]
    pub custom_comment: Option<String>,
}

/// Outcome of a close operation.
///
/// Closing a position the broker already closed (`BE51`) is a successful
/// no-op, reported distinctly rather than raised as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Close transaction submitted and accepted; carries the close order id.
    Closed { order: u64 },
    /// The position was already closed on the broker side.
    AlreadyClosed,
}
