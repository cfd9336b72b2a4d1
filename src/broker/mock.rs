//! In-process scripted gateway.
//!
//! Answers market-data and historical requests from a fixed table of stock
//! quotes, option quotes and daily bars, and records every request it
//! receives. Used by the test suites and for dry runs without a live gateway.

use super::connector::GatewayConnector;
use super::sanitizer::RawComputation;
use gateway_client::{
    Bar, Contract, DEFAULT_CHANNEL_CAPACITY, GatewayClient, GatewayEvent, GatewayRequest, Right,
    SecType, tick,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Gateway code for an unknown contract.
pub const NO_SECURITY_DEFINITION: i32 = 200;

/// How long the in-process connector holds back greeks scripted as late.
pub const LATE_GREEKS_DELAY: Duration = Duration::from_millis(250);

/// Scripted underlying quote.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StockScript {
    /// Bid price.
    pub bid: Option<f64>,
    /// Ask price.
    pub ask: Option<f64>,
    /// Last trade price.
    pub last: Option<f64>,
    /// Session high.
    pub high: Option<f64>,
}

impl StockScript {
    /// A stock trading at `last` with a one cent market around it.
    #[must_use]
    pub fn at(last: f64) -> Self {
        Self {
            bid: Some(last - 0.01),
            ask: Some(last + 0.01),
            last: Some(last),
            high: Some(last),
        }
    }
}

/// Scripted option quote.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptionScript {
    /// Bid price.
    pub bid: Option<f64>,
    /// Ask price.
    pub ask: Option<f64>,
    /// Last trade price.
    pub last: Option<f64>,
    /// Daily volume.
    pub volume: Option<f64>,
    /// Open interest.
    pub open_interest: Option<f64>,
    /// Raw model computation, sent before any price tick.
    pub computation: Option<RawComputation>,
    /// Deliver the computation after the prices and snapshot end instead.
    pub late_greeks: bool,
}

impl OptionScript {
    /// A liquid call with healthy greeks around the given delta and IV.
    #[must_use]
    pub fn liquid(bid: f64, ask: f64, delta: f64, implied_vol: f64) -> Self {
        Self {
            bid: Some(bid),
            ask: Some(ask),
            last: Some((bid + ask) / 2.0),
            volume: Some(3500.0),
            open_interest: Some(15000.0),
            computation: Some(RawComputation {
                implied_vol: Some(implied_vol),
                delta: Some(delta),
                opt_price: Some((bid + ask) / 2.0),
                gamma: Some(0.02),
                vega: Some(0.15),
                theta: Some(-0.03),
                und_price: None,
            }),
            late_greeks: false,
        }
    }

    /// Sets the underlying price carried by the computation.
    #[must_use]
    pub fn with_underlying(mut self, und_price: f64) -> Self {
        if let Some(computation) = self.computation.as_mut() {
            computation.und_price = Some(und_price);
        }
        self
    }

    /// Holds the computation back until after the price ticks.
    #[must_use]
    pub fn with_late_greeks(mut self) -> Self {
        self.late_greeks = true;
        self
    }

    /// Replaces the computation.
    #[must_use]
    pub fn with_computation(mut self, computation: RawComputation) -> Self {
        self.computation = Some(computation);
        self
    }
}

#[derive(Default)]
struct MockState {
    stocks: Mutex<HashMap<String, StockScript>>,
    options: Mutex<HashMap<String, OptionScript>>,
    notices: Mutex<Vec<(i32, String)>>,
    requests: Mutex<Vec<GatewayRequest>>,
    connections: AtomicUsize,
    histories: Mutex<HashMap<String, Vec<Bar>>>,
    delayed: AtomicBool,
    silent: AtomicBool,
    refuse: AtomicBool,
}

/// Scripted gateway. Cloning shares the script and the request log.
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<MockState>,
}

impl MockGateway {
    /// Creates an empty gateway that knows no contracts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an underlying quote.
    #[must_use]
    pub fn with_stock(self, symbol: &str, script: StockScript) -> Self {
        self.state
            .stocks
            .lock()
            .insert(Contract::stock(symbol).key(), script);
        self
    }

    /// Adds an option quote.
    #[must_use]
    pub fn with_option(
        self,
        symbol: &str,
        expiration: &str,
        strike: f64,
        right: Right,
        script: OptionScript,
    ) -> Self {
        self.state.options.lock().insert(
            Contract::option(symbol, expiration, strike, right).key(),
            script,
        );
        self
    }

    /// Adds daily bars served to historical requests for `symbol`.
    #[must_use]
    pub fn with_history(self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.state
            .histories
            .lock()
            .insert(Contract::stock(symbol).key(), bars);
        self
    }

    /// Emits a connection-level notice right after the handshake.
    #[must_use]
    pub fn with_connection_notice(self, code: i32, message: &str) -> Self {
        self.state.notices.lock().push((code, message.to_string()));
        self
    }

    /// Reports prices with delayed-feed tick codes.
    #[must_use]
    pub fn delayed_feed(self) -> Self {
        self.state.delayed.store(true, Ordering::SeqCst);
        self
    }

    /// Never answers the handshake.
    #[must_use]
    pub fn silent(self) -> Self {
        self.state.silent.store(true, Ordering::SeqCst);
        self
    }

    /// Refuses every connection attempt.
    #[must_use]
    pub fn refusing(self) -> Self {
        self.state.refuse.store(true, Ordering::SeqCst);
        self
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.state.requests.lock().clone()
    }

    /// Contracts of every market-data request received so far.
    #[must_use]
    pub fn market_data_contracts(&self) -> Vec<Contract> {
        self.state
            .requests
            .lock()
            .iter()
            .filter_map(|r| match r {
                GatewayRequest::ReqMktData { contract, .. } => Some(contract.clone()),
                _ => None,
            })
            .collect()
    }

    /// Strikes of every option request received so far.
    #[must_use]
    pub fn option_strikes_requested(&self) -> Vec<f64> {
        self.market_data_contracts()
            .into_iter()
            .filter(|c| c.sec_type == SecType::Option)
            .filter_map(|c| c.strike)
            .collect()
    }

    /// Number of connection attempts.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Records `request` and returns the events the gateway answers with.
    #[must_use]
    pub fn respond(&self, request: &GatewayRequest) -> Vec<GatewayEvent> {
        self.respond_scheduled(request)
            .into_iter()
            .map(|(event, _)| event)
            .collect()
    }

    /// Like [`respond`](Self::respond), pairing each event with the delay
    /// the in-process connector waits before delivering it.
    fn respond_scheduled(&self, request: &GatewayRequest) -> Vec<(GatewayEvent, Duration)> {
        self.state.requests.lock().push(request.clone());

        let immediate = |events: Vec<GatewayEvent>| {
            events
                .into_iter()
                .map(|e| (e, Duration::ZERO))
                .collect::<Vec<_>>()
        };

        match request {
            GatewayRequest::StartApi { .. } => {
                if self.state.silent.load(Ordering::SeqCst) {
                    return Vec::new();
                }
                let mut events = vec![GatewayEvent::NextValidId { order_id: 1 }];
                events.extend(self.state.notices.lock().iter().map(|(code, message)| {
                    GatewayEvent::Error {
                        req_id: -1,
                        code: *code,
                        message: message.clone(),
                    }
                }));
                immediate(events)
            }
            GatewayRequest::ReqMktData {
                req_id,
                contract,
                snapshot,
                ..
            } => self.market_data(*req_id, contract, *snapshot),
            GatewayRequest::ReqHistoricalData {
                req_id, contract, ..
            } => immediate(self.historical_data(*req_id, contract)),
            GatewayRequest::MarketDataType { .. } | GatewayRequest::CancelMktData { .. } => {
                Vec::new()
            }
        }
    }

    fn historical_data(&self, req_id: i64, contract: &Contract) -> Vec<GatewayEvent> {
        let key = contract.key();
        let histories = self.state.histories.lock();
        let Some(bars) = histories.get(&key) else {
            return vec![unknown_contract(req_id, &key)];
        };

        let mut events: Vec<GatewayEvent> = bars
            .iter()
            .map(|bar| GatewayEvent::HistoricalData {
                req_id,
                bar: bar.clone(),
            })
            .collect();
        events.push(GatewayEvent::HistoricalDataEnd {
            req_id,
            start: bars.first().map(|b| b.date.clone()).unwrap_or_default(),
            end: bars.last().map(|b| b.date.clone()).unwrap_or_default(),
        });
        events
    }

    fn market_data(
        &self,
        req_id: i64,
        contract: &Contract,
        snapshot: bool,
    ) -> Vec<(GatewayEvent, Duration)> {
        let delayed = self.state.delayed.load(Ordering::SeqCst);
        let price_code = |live: i32, late: i32| if delayed { late } else { live };
        let key = contract.key();
        let mut events = Vec::new();
        let mut late = Vec::new();

        let prices = match contract.sec_type {
            SecType::Stock => match self.state.stocks.lock().get(&key) {
                Some(s) => vec![
                    (price_code(tick::BID, tick::DELAYED_BID), s.bid),
                    (price_code(tick::ASK, tick::DELAYED_ASK), s.ask),
                    (price_code(tick::LAST, tick::DELAYED_LAST), s.last),
                    (price_code(tick::HIGH, tick::DELAYED_HIGH), s.high),
                ],
                None => return vec![(unknown_contract(req_id, &key), Duration::ZERO)],
            },
            SecType::Option => match self.state.options.lock().get(&key) {
                Some(o) => {
                    if let Some(c) = o.computation {
                        let computation = GatewayEvent::TickOptionComputation {
                            req_id,
                            tick_type: tick::MODEL_OPTION,
                            implied_vol: c.implied_vol,
                            delta: c.delta,
                            opt_price: c.opt_price,
                            pv_dividend: Some(0.0),
                            gamma: c.gamma,
                            vega: c.vega,
                            theta: c.theta,
                            und_price: c.und_price,
                        };
                        if o.late_greeks {
                            late.push((computation, LATE_GREEKS_DELAY));
                        } else {
                            events.push((computation, Duration::ZERO));
                        }
                    }
                    for (tick_type, size) in
                        [(tick::VOLUME, o.volume), (tick::OPEN_INTEREST, o.open_interest)]
                    {
                        if let Some(size) = size {
                            events.push((
                                GatewayEvent::TickSize {
                                    req_id,
                                    tick_type,
                                    size,
                                },
                                Duration::ZERO,
                            ));
                        }
                    }
                    vec![
                        (price_code(tick::BID, tick::DELAYED_BID), o.bid),
                        (price_code(tick::ASK, tick::DELAYED_ASK), o.ask),
                        (price_code(tick::LAST, tick::DELAYED_LAST), o.last),
                    ]
                }
                None => return vec![(unknown_contract(req_id, &key), Duration::ZERO)],
            },
        };

        events.extend(prices.into_iter().filter_map(|(tick_type, price)| {
            price.map(|price| {
                (
                    GatewayEvent::TickPrice {
                        req_id,
                        tick_type,
                        price,
                    },
                    Duration::ZERO,
                )
            })
        }));
        if snapshot {
            events.push((GatewayEvent::TickSnapshotEnd { req_id }, Duration::ZERO));
        }
        events.extend(late);
        events
    }
}

/// Consecutive daily bars closing at `closes`, oldest first.
#[must_use]
pub fn daily_bars(closes: &[f64]) -> Vec<Bar> {
    let start = chrono::NaiveDate::default();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: start
                .checked_add_days(chrono::Days::new(i as u64))
                .map(|d| d.format("%Y%m%d").to_string())
                .unwrap_or_default(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000_000.0,
            wap: close,
            bar_count: 1,
        })
        .collect()
}

fn unknown_contract(req_id: i64, key: &str) -> GatewayEvent {
    GatewayEvent::Error {
        req_id,
        code: NO_SECURITY_DEFINITION,
        message: format!("No security definition has been found for the request: {}", key),
    }
}

impl GatewayConnector for MockGateway {
    async fn connect(&self) -> Result<GatewayClient, gateway_client::Error> {
        self.state.connections.fetch_add(1, Ordering::SeqCst);
        if self.state.refuse.load(Ordering::SeqCst) {
            return Err(gateway_client::Error::ConnectionClosed);
        }

        let (request_tx, mut request_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let gateway = self.clone();

        tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                for (event, delay) in gateway.respond_scheduled(&request) {
                    if delay.is_zero() {
                        if event_tx.send(event).await.is_err() {
                            return;
                        }
                        continue;
                    }
                    let tx = event_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(event).await;
                    });
                }
            }
        });

        Ok(GatewayClient::from_channels(request_tx, event_rx))
    }

    fn endpoint(&self) -> String {
        "mock://gateway".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_and_notices() {
        let gateway = MockGateway::new().with_connection_notice(2104, "farm connection is OK");
        let events = gateway.respond(&GatewayRequest::start_api(7, ""));

        assert_eq!(events[0], GatewayEvent::NextValidId { order_id: 1 });
        assert!(matches!(events[1], GatewayEvent::Error { req_id: -1, code: 2104, .. }));
    }

    #[test]
    fn test_silent_skips_handshake() {
        let gateway = MockGateway::new().silent();
        assert!(gateway.respond(&GatewayRequest::start_api(7, "")).is_empty());
    }

    #[test]
    fn test_stock_snapshot_events() {
        let gateway = MockGateway::new().with_stock("SPY", StockScript::at(500.0));
        let events = gateway.respond(&GatewayRequest::req_mkt_data(
            1,
            Contract::stock("SPY"),
            "",
            true,
        ));

        assert_eq!(events.len(), 5);
        assert!(matches!(events[2], GatewayEvent::TickPrice { tick_type: 4, price, .. } if price == 500.0));
        assert_eq!(events[4], GatewayEvent::TickSnapshotEnd { req_id: 1 });
    }

    #[test]
    fn test_option_greeks_precede_prices() {
        let gateway = MockGateway::new().delayed_feed().with_option(
            "SPY",
            "2026-02-20",
            500.0,
            Right::Call,
            OptionScript::liquid(9.5, 9.7, 0.52, 0.18),
        );
        let events = gateway.respond(&GatewayRequest::req_mkt_data(
            2,
            Contract::option("SPY", "2026-02-20", 500.0, Right::Call),
            "106",
            false,
        ));

        assert!(matches!(events[0], GatewayEvent::TickOptionComputation { .. }));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GatewayEvent::TickPrice { tick_type: 66, .. }))
        );
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, GatewayEvent::TickSnapshotEnd { .. }))
        );
    }

    #[test]
    fn test_late_greeks_follow_snapshot_end() {
        let gateway = MockGateway::new().with_option(
            "SPY",
            "2026-02-20",
            500.0,
            Right::Call,
            OptionScript::liquid(9.5, 9.7, 0.52, 0.18).with_late_greeks(),
        );
        let scheduled = gateway.respond_scheduled(&GatewayRequest::req_mkt_data(
            2,
            Contract::option("SPY", "2026-02-20", 500.0, Right::Call),
            "106",
            true,
        ));

        let (last, delay) = scheduled.last().unwrap();
        assert!(matches!(last, GatewayEvent::TickOptionComputation { .. }));
        assert_eq!(*delay, LATE_GREEKS_DELAY);
        assert!(matches!(
            scheduled[scheduled.len() - 2].0,
            GatewayEvent::TickSnapshotEnd { req_id: 2 }
        ));
        assert!(scheduled[..scheduled.len() - 1].iter().all(|(_, d)| d.is_zero()));
    }

    #[test]
    fn test_history_bars_then_end() {
        let gateway = MockGateway::new().with_history("SPY", daily_bars(&[1.0, 2.0, 3.0]));
        let events = gateway.respond(&GatewayRequest::req_historical_data(
            4,
            Contract::stock("SPY"),
            210,
        ));

        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], GatewayEvent::HistoricalData { req_id: 4, bar } if bar.close == 1.0));
        assert_eq!(
            events[3],
            GatewayEvent::HistoricalDataEnd {
                req_id: 4,
                start: "19700101".to_string(),
                end: "19700103".to_string(),
            }
        );
    }

    #[test]
    fn test_history_unknown_symbol_has_no_end() {
        let gateway = MockGateway::new();
        let events = gateway.respond(&GatewayRequest::req_historical_data(
            5,
            Contract::stock("NOPE"),
            210,
        ));

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            GatewayEvent::Error { req_id: 5, code: NO_SECURITY_DEFINITION, .. }
        ));
    }

    #[test]
    fn test_unknown_contract_reports_error() {
        let gateway = MockGateway::new();
        let events = gateway.respond(&GatewayRequest::req_mkt_data(
            3,
            Contract::stock("NOPE"),
            "",
            true,
        ));

        assert!(matches!(
            &events[0],
            GatewayEvent::Error { req_id: 3, code: NO_SECURITY_DEFINITION, .. }
        ));
    }

    #[test]
    fn test_requests_recorded() {
        let gateway = MockGateway::new();
        let _ = gateway.respond(&GatewayRequest::market_data_type(4));
        let _ = gateway.respond(&GatewayRequest::req_mkt_data(
            1,
            Contract::option("SPY", "2026-02-20", 510.0, Right::Call),
            "106",
            false,
        ));

        assert_eq!(gateway.requests().len(), 2);
        assert_eq!(gateway.option_strikes_requested(), vec![510.0]);
    }

    #[tokio::test]
    async fn test_refusing_connector() {
        let gateway = MockGateway::new().refusing();
        assert!(gateway.connect().await.is_err());
        assert_eq!(gateway.connections(), 1);
    }

    #[tokio::test]
    async fn test_connector_round_trip() {
        let gateway = MockGateway::new();
        let mut client = gateway.connect().await.unwrap();

        client.send(GatewayRequest::start_api(7, "")).await.unwrap();
        assert_eq!(
            client.recv().await,
            Some(GatewayEvent::NextValidId { order_id: 1 })
        );
    }
}
