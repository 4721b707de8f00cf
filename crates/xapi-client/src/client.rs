//! High-level trading client: account/market queries plus the trade
//! workflow layered on the command channel.
//!
//! Trade operations reconcile an asynchronous order submission with a polled
//! confirmation: submit `tradeTransaction`, then check
//! `tradeTransactionStatus` for the returned order id. Only status 3
//! (ACCEPTED) counts as success. Closing a position the broker already
//! closed (`BE51`) is a successful no-op, not an error.

use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};
use xapi_core::codec::Request;
use xapi_core::config::XapiConfig;
use xapi_core::error::{Result, XapiError};
use xapi_core::types::{
    CloseOutcome, Period, SymbolRecord, TradeCmd, TradeStatus, TradeTransInfo, Transaction,
    TransactionRef,
};

use crate::channel::CommandChannel;
use crate::registry::TransactionRegistry;
use crate::transport::{Transport, WsTransport};

/// Server code for "order already closed".
const ORDER_ALREADY_CLOSED: &str = "BE51";

/// Trading client for one xAPI connection.
///
/// All methods take `&self`; the command channel serializes transport access
/// and the registry sits behind its own lock.
pub struct Client<T: Transport> {
    channel: CommandChannel<T>,
    registry: Mutex<TransactionRegistry>,
}

impl Client<WsTransport> {
    /// Client over a WebSocket transport for the configured endpoint.
    ///
    /// The socket is opened by [`login`](Self::login), not here.
    pub fn connect(config: &XapiConfig) -> Self {
        Self::new(WsTransport::new(&config.url), config)
    }
}

impl<T: Transport> Client<T> {
    /// Client over a custom transport.
    pub fn new(transport: T, config: &XapiConfig) -> Self {
        Self {
            channel: CommandChannel::new(transport, config),
            registry: Mutex::new(TransactionRegistry::new()),
        }
    }

    pub fn channel(&self) -> &CommandChannel<T> {
        &self.channel
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Log in. Returns the `streamSessionId`.
    pub async fn login(&self, user_id: &str, password: &str) -> Result<String> {
        self.channel.login(user_id, password).await
    }

    /// Log out and reset the session.
    pub async fn logout(&self) -> Result<()> {
        self.channel.logout().await
    }

    /// Keep-alive; returns no payload.
    pub async fn ping(&self) -> Result<()> {
        self.channel.execute_authenticated(Request::new("ping")).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Market and account queries (pass-through)
    // -----------------------------------------------------------------------

    pub async fn get_all_symbols(&self) -> Result<Value> {
        self.query(Request::new("getAllSymbols")).await
    }

    pub async fn get_calendar(&self) -> Result<Value> {
        self.query(Request::new("getCalendar")).await
    }

    /// Chart candles from `start` (ms since epoch) to now.
    pub async fn get_chart_last_request(
        &self,
        symbol: &str,
        period: Period,
        start: i64,
    ) -> Result<Value> {
        self.query(Request::with_arguments(
            "getChartLastRequest",
            json!({"info": {"period": period, "start": start, "symbol": symbol}}),
        ))
        .await
    }

    /// Chart candles for a bounded window. `start` and `end` are ms since
    /// epoch; a non-zero `ticks` asks for that many candles relative to
    /// `start` instead of honoring `end`.
    pub async fn get_chart_range_request(
        &self,
        symbol: &str,
        period: Period,
        start: i64,
        end: i64,
        ticks: i64,
    ) -> Result<Value> {
        self.query(Request::with_arguments(
            "getChartRangeRequest",
            json!({"info": {
                "end": end,
                "period": period,
                "start": start,
                "symbol": symbol,
                "ticks": ticks,
            }}),
        ))
        .await
    }

    pub async fn get_commission(&self, symbol: &str, volume: f64) -> Result<Value> {
        self.query(Request::with_arguments(
            "getCommissionDef",
            json!({"symbol": symbol, "volume": volume}),
        ))
        .await
    }

    pub async fn get_margin_level(&self) -> Result<Value> {
        self.query(Request::new("getMarginLevel")).await
    }

    pub async fn get_margin_trade(&self, symbol: &str, volume: f64) -> Result<Value> {
        self.query(Request::with_arguments(
            "getMarginTrade",
            json!({"symbol": symbol, "volume": volume}),
        ))
        .await
    }

    pub async fn get_profit_calculation(
        &self,
        symbol: &str,
        cmd: TradeCmd,
        volume: f64,
        open_price: f64,
        close_price: f64,
    ) -> Result<Value> {
        self.query(Request::with_arguments(
            "getProfitCalculation",
            json!({
                "closePrice": close_price,
                "cmd": cmd,
                "openPrice": open_price,
                "symbol": symbol,
                "volume": volume,
            }),
        ))
        .await
    }

    pub async fn get_server_time(&self) -> Result<Value> {
        self.query(Request::new("getServerTime")).await
    }

    /// Current quote and symbol details.
    pub async fn get_symbol(&self, symbol: &str) -> Result<SymbolRecord> {
        let data = self
            .query(Request::with_arguments(
                "getSymbol",
                json!({"symbol": symbol}),
            ))
            .await?;
        serde_json::from_value(data).map_err(|e| XapiError::Protocol(e.to_string()))
    }

    pub async fn get_tick_prices(
        &self,
        symbols: &[&str],
        timestamp: i64,
        level: i64,
    ) -> Result<Value> {
        self.query(Request::with_arguments(
            "getTickPrices",
            json!({"level": level, "symbols": symbols, "timestamp": timestamp}),
        ))
        .await
    }

    /// Trade records for specific order ids, open or closed.
    pub async fn get_trade_records(&self, orders: &[u64]) -> Result<Value> {
        self.query(Request::with_arguments(
            "getTradeRecords",
            json!({"orders": orders}),
        ))
        .await
    }

    pub async fn get_trades_history(&self, start: i64, end: i64) -> Result<Value> {
        self.query(Request::with_arguments(
            "getTradesHistory",
            json!({"end": end, "start": start}),
        ))
        .await
    }

    pub async fn get_trading_hours(&self, symbols: &[&str]) -> Result<Value> {
        self.query(Request::with_arguments(
            "getTradingHours",
            json!({"symbols": symbols}),
        ))
        .await
    }

    pub async fn get_user_data(&self) -> Result<Value> {
        self.query(Request::new("getCurrentUserData")).await
    }

    pub async fn get_version(&self) -> Result<String> {
        let data = self.query(Request::new("getVersion")).await?;
        data["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| XapiError::Protocol("getVersion: missing version".into()))
    }

    // -----------------------------------------------------------------------
    // Open positions
    // -----------------------------------------------------------------------

    /// Refresh the transaction registry from a fresh `getTrades` snapshot.
    ///
    /// The registry is cleared and rebuilt, not merged; the returned
    /// transactions are a point-in-time snapshot.
    pub async fn update_trades(&self) -> Result<Vec<Transaction>> {
        let data = self
            .query(Request::with_arguments(
                "getTrades",
                json!({"openedOnly": true}),
            ))
            .await?;
        let rows: Vec<Transaction> =
            serde_json::from_value(data).map_err(|e| XapiError::Protocol(e.to_string()))?;

        let mut registry = self.registry.lock().await;
        registry.rebuild(rows);
        debug!(open_trades = registry.len(), "registry refreshed");
        Ok(registry.transactions().cloned().collect())
    }

    /// Current profit of an open position (refreshes the registry first).
    pub async fn get_trade_profit(&self, order_id: u64) -> Result<f64> {
        self.update_trades().await?;
        let registry = self.registry.lock().await;
        Ok(registry.get(order_id)?.profit)
    }

    // -----------------------------------------------------------------------
    // Trade transactions
    // -----------------------------------------------------------------------

    /// Submit a trade transaction; returns the broker-assigned order id.
    pub async fn trade_transaction(&self, info: &TradeTransInfo) -> Result<u64> {
        let arguments = json!({
            "tradeTransInfo":
                serde_json::to_value(info).map_err(|e| XapiError::Protocol(e.to_string()))?
        });
        let data = self
            .query(Request::with_arguments("tradeTransaction", arguments))
            .await?;
        data["order"]
            .as_u64()
            .ok_or_else(|| XapiError::Protocol("tradeTransaction: missing order".into()))
    }

    /// Poll the confirmation status of a submitted trade transaction.
    pub async fn trade_transaction_status(&self, order: u64) -> Result<TradeStatus> {
        let data = self
            .query(Request::with_arguments(
                "tradeTransactionStatus",
                json!({"order": order}),
            ))
            .await?;
        serde_json::from_value(data).map_err(|e| XapiError::Protocol(e.to_string()))
    }

    /// Open a market position.
    ///
    /// `cmd` must be BUY or SELL. The quote is fetched once immediately
    /// before submission (BUY fills at ask, SELL at bid); market movement
    /// between quote and submission is an accepted limitation, not retried.
    ///
    /// Returns the order id after the broker confirms status ACCEPTED;
    /// any other confirmation status fails with
    /// [`XapiError::TransactionRejected`].
    pub async fn open_trade(&self, cmd: TradeCmd, symbol: &str, volume: f64) -> Result<u64> {
        if !cmd.is_market_entry() {
            return Err(XapiError::InvalidMode(cmd.code()));
        }
        if volume <= 0.0 {
            return Err(XapiError::InvalidVolume(volume));
        }

        let quote = self.get_symbol(symbol).await?;
        let price = match cmd {
            TradeCmd::Buy => quote.ask,
            _ => quote.bid,
        };
        info!(symbol, ?cmd, volume, price, "opening trade");

        let info = TradeTransInfo::open(cmd, symbol, volume, price);
        let order = self.trade_transaction(&info).await?;
        self.update_trades().await?;

        let status = self.trade_transaction_status(order).await?;
        if !status.request_status.is_accepted() {
            return Err(XapiError::TransactionRejected(status.request_status.code()));
        }
        info!(order, "trade opened");
        Ok(order)
    }

    /// Close a position given either a cached [`Transaction`] or a raw order
    /// id. Refreshes the registry first so the close uses current
    /// volume/price, then delegates to [`close_trade_only`](Self::close_trade_only).
    pub async fn close_trade(&self, reference: impl Into<TransactionRef>) -> Result<CloseOutcome> {
        let order_id = reference.into().order_id();
        self.update_trades().await?;
        self.close_trade_only(order_id).await
    }

    /// Close a position using the cached snapshot, without refreshing.
    ///
    /// Idempotent: a `BE51` (order already closed) rejection from the broker
    /// is reported as [`CloseOutcome::AlreadyClosed`], not an error. Fails
    /// with [`XapiError::UnknownTransaction`] if the registry holds no
    /// snapshot for this order id.
    pub async fn close_trade_only(&self, order_id: u64) -> Result<CloseOutcome> {
        let close_info = {
            let registry = self.registry.lock().await;
            TradeTransInfo::close(registry.get(order_id)?)
        };
        info!(order_id, symbol = %close_info.symbol, "closing trade");

        let order = match self.trade_transaction(&close_info).await {
            Ok(order) => order,
            Err(ref e) if e.command_error_code() == Some(ORDER_ALREADY_CLOSED) => {
                info!(order_id, "position already closed on broker side");
                return Ok(CloseOutcome::AlreadyClosed);
            }
            Err(e) => return Err(e),
        };

        let status = self.trade_transaction_status(order).await?;
        if !status.request_status.is_accepted() {
            return Err(XapiError::TransactionRejected(status.request_status.code()));
        }
        info!(order_id, close_order = order, "trade closed");
        Ok(CloseOutcome::Closed { order })
    }

    /// Close every cached open position, in ascending order-id order.
    ///
    /// Refreshes the registry once, then closes sequentially. The first
    /// rejection or failure aborts the remaining closures and propagates;
    /// there is no partial-failure isolation.
    pub async fn close_all_trades(&self) -> Result<Vec<(u64, CloseOutcome)>> {
        self.update_trades().await?;
        let order_ids = self.registry.lock().await.order_ids();
        info!(count = order_ids.len(), "closing all trades");

        let mut outcomes = Vec::with_capacity(order_ids.len());
        for order_id in order_ids {
            let outcome = self.close_trade_only(order_id).await?;
            outcomes.push((order_id, outcome));
        }
        Ok(outcomes)
    }

    /// One authenticated exchange that must return a payload.
    async fn query(&self, request: Request) -> Result<Value> {
        let command = request.command.clone();
        self.channel
            .execute_authenticated(request)
            .await?
            .ok_or_else(|| XapiError::Protocol(format!("{command}: missing returnData")))
    }
}
