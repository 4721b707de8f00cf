//! Protocol enumerations with their wire discriminants.
//!
//! The server speaks raw integer codes; these enums pin the known tables at
//! compile time. Discriminant values are part of the wire format and must not
//! change. Conversions from raw codes are fallible at the boundary
//! ([`TradeCmd::from_code`], [`Period::from_minutes`]) so that validation is a
//! type-system guarantee everywhere else.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::XapiError;

// ---------------------------------------------------------------------------
// Trade command (direction / order kind)
// ---------------------------------------------------------------------------

/// The `cmd` field of a trade transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum TradeCmd {
    Buy = 0,
    Sell = 1,
    BuyLimit = 2,
    SellLimit = 3,
    BuyStop = 4,
    SellStop = 5,
    Balance = 6,
    Credit = 7,
}

impl TradeCmd {
    /// Wire code for this command.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Parse a raw wire code.
    pub fn from_code(code: i64) -> Result<Self, XapiError> {
        match code {
            0 => Ok(Self::Buy),
            1 => Ok(Self::Sell),
            2 => Ok(Self::BuyLimit),
            3 => Ok(Self::SellLimit),
            4 => Ok(Self::BuyStop),
            5 => Ok(Self::SellStop),
            6 => Ok(Self::Balance),
            7 => Ok(Self::Credit),
            other => Err(XapiError::InvalidMode(other)),
        }
    }

    /// Whether this is an immediate market entry (BUY or SELL).
    pub fn is_market_entry(self) -> bool {
        matches!(self, Self::Buy | Self::Sell)
    }
}

impl Serialize for TradeCmd {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for TradeCmd {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i64::deserialize(deserializer)?;
        Self::from_code(code).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Transaction type
// ---------------------------------------------------------------------------

/// The `type` field of a trade transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum TransactionType {
    Open = 0,
    Pending = 1,
    Close = 2,
    Modify = 3,
    Delete = 4,
}

impl TransactionType {
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl Serialize for TransactionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

// ---------------------------------------------------------------------------
// Trade transaction confirmation status
// ---------------------------------------------------------------------------

/// Confirmation status returned by `tradeTransactionStatus`.
///
/// Only [`Accepted`](RequestStatus::Accepted) (3) means the transaction went
/// through; every other code is a broker-defined rejection or pending state
/// and is surfaced verbatim in [`XapiError::TransactionRejected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Error,
    Pending,
    Accepted,
    Rejected,
    /// A code outside the documented table, carried verbatim.
    Other(i64),
}

impl RequestStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Error,
            1 => Self::Pending,
            3 => Self::Accepted,
            4 => Self::Rejected,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Error => 0,
            Self::Pending => 1,
            Self::Accepted => 3,
            Self::Rejected => 4,
            Self::Other(code) => code,
        }
    }

    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl<'de> Deserialize<'de> for RequestStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_code(i64::deserialize(deserializer)?))
    }
}

// ---------------------------------------------------------------------------
// Chart period
// ---------------------------------------------------------------------------

/// Chart candle period, encoded on the wire in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum Period {
    M1 = 1,
    M5 = 5,
    M15 = 15,
    M30 = 30,
    H1 = 60,
    H4 = 240,
    D1 = 1440,
    W1 = 10_080,
    Mn1 = 43_200,
}

impl Period {
    pub fn minutes(self) -> i64 {
        self as i64
    }

    /// Parse a raw minute count.
    pub fn from_minutes(minutes: i64) -> Result<Self, XapiError> {
        match minutes {
            1 => Ok(Self::M1),
            5 => Ok(Self::M5),
            15 => Ok(Self::M15),
            30 => Ok(Self::M30),
            60 => Ok(Self::H1),
            240 => Ok(Self::H4),
            1440 => Ok(Self::D1),
            10_080 => Ok(Self::W1),
            43_200 => Ok(Self::Mn1),
            other => Err(XapiError::InvalidPeriod(other)),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.minutes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_cmd_round_trips_through_codes() {
        for code in 0..=7 {
            assert_eq!(TradeCmd::from_code(code).unwrap().code(), code);
        }
        assert!(matches!(
            TradeCmd::from_code(8),
            Err(XapiError::InvalidMode(8))
        ));
    }

    #[test]
    fn only_buy_and_sell_are_market_entries() {
        assert!(TradeCmd::Buy.is_market_entry());
        assert!(TradeCmd::Sell.is_market_entry());
        assert!(!TradeCmd::BuyLimit.is_market_entry());
        assert!(!TradeCmd::Balance.is_market_entry());
    }

    #[test]
    fn request_status_three_means_accepted() {
        assert!(RequestStatus::from_code(3).is_accepted());
        assert!(!RequestStatus::from_code(1).is_accepted());
        // Undocumented codes are preserved verbatim.
        assert_eq!(RequestStatus::from_code(7), RequestStatus::Other(7));
        assert_eq!(RequestStatus::Other(7).code(), 7);
    }

    #[test]
    fn period_minute_table() {
        assert_eq!(Period::from_minutes(240).unwrap(), Period::H4);
        assert!(matches!(
            Period::from_minutes(7),
            Err(XapiError::InvalidPeriod(7))
        ));
    }

    #[test]
    fn enums_serialize_as_wire_integers() {
        assert_eq!(serde_json::to_string(&TradeCmd::Sell).unwrap(), "1");
        assert_eq!(serde_json::to_string(&TransactionType::Close).unwrap(), "2");
        assert_eq!(serde_json::to_string(&Period::D1).unwrap(), "1440");
    }
}
