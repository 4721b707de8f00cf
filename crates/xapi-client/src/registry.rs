//! Client-local cache of open positions, keyed by order id.
//!
//! The registry is rebuilt wholesale from each `getTrades` snapshot, never
//! merged: a position modified or closed on the broker side between refreshes
//! is invisible until the next rebuild. Iteration is in ascending order-id
//! order.

use std::collections::BTreeMap;

use xapi_core::error::{Result, XapiError};
use xapi_core::types::Transaction;

/// In-memory snapshot of open positions.
#[derive(Debug, Default)]
pub struct TransactionRegistry {
    trades: BTreeMap<u64, Transaction>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole registry with a fresh snapshot.
    ///
    /// Rows the broker already marked closed are dropped.
    pub fn rebuild(&mut self, rows: Vec<Transaction>) {
        self.trades.clear();
        for row in rows {
            if !row.closed {
                self.trades.insert(row.order_id, row);
            }
        }
    }

    /// Look up a cached position.
    pub fn get(&self, order_id: u64) -> Result<&Transaction> {
        self.trades
            .get(&order_id)
            .ok_or(XapiError::UnknownTransaction(order_id))
    }

    /// Order ids of all cached positions, ascending.
    pub fn order_ids(&self) -> Vec<u64> {
        self.trades.keys().copied().collect()
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.trades.values()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}
