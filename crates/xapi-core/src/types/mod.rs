//! Protocol types shared across the workspace.

pub mod enums;
pub mod trading;

pub use enums::{Period, RequestStatus, TradeCmd, TransactionType};
pub use trading::{
    CloseOutcome, SymbolRecord, TradeStatus, TradeTransInfo, Transaction, TransactionRef,
};
