//! Broker session.
//!
//! Owns one gateway connection. A single background task drains the event
//! stream into per-request accumulators and raises per-request completion
//! signals; callers issue requests and await those signals under a deadline.

use super::accumulator::{MarketTicks, TickAccumulator};
use super::connector::GatewayConnector;
use super::sanitizer::{RawComputation, Sanitizer};
use crate::config::{BrokerConfig, SanitizerConfig};
use crate::error::GateError;
use dashmap::DashMap;
use gateway_client::{
    Bar, Contract, ErrorReport, GatewayEvent, GatewayRequest, GatewaySender, RequestId, tick,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};


/// Link state as seen by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Connecting,
    Ready,
    Closed,
}

/// Outcome of one market-data request.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataReply {
    /// Identifier the request was issued under.
    pub request_id: RequestId,
    /// Whatever was accumulated by completion or deadline.
    pub ticks: MarketTicks,
    /// True when the deadline elapsed before a completion signal.
    pub timed_out: bool,
}

struct SessionShared {
    accumulators: DashMap<RequestId, TickAccumulator>,
    bars: DashMap<RequestId, Vec<Bar>>,
    completions: DashMap<RequestId, watch::Sender<bool>>,
    errors: Mutex<Vec<ErrorReport>>,
    link: watch::Sender<LinkState>,
    sanitizer: Sanitizer,
}

impl SessionShared {
    fn complete(&self, req_id: RequestId) {
        if let Some(signal) = self.completions.get(&req_id) {
            signal.send_replace(true);
        }
    }

    fn dispatch(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::NextValidId { order_id } => {
                debug!("Gateway ready, next valid id {}", order_id);
                self.link.send_replace(LinkState::Ready);
            }
            GatewayEvent::TickPrice {
                req_id,
                tick_type,
                price,
            } => {
                self.accumulators
                    .entry(req_id)
                    .or_default()
                    .apply_price(tick_type, price);
                if tick::is_primary(tick_type) {
                    self.complete(req_id);
                }
            }
            GatewayEvent::TickSize {
                req_id,
                tick_type,
                size,
            } => {
                self.accumulators
                    .entry(req_id)
                    .or_default()
                    .apply_size(tick_type, size);
            }
            GatewayEvent::TickOptionComputation {
                req_id,
                implied_vol,
                delta,
                opt_price,
                gamma,
                vega,
                theta,
                und_price,
                ..
            } => {
                let greeks = self.sanitizer.clean(&RawComputation {
                    implied_vol,
                    delta,
                    opt_price,
                    gamma,
                    vega,
                    theta,
                    und_price,
                });
                self.accumulators
                    .entry(req_id)
                    .or_default()
                    .apply_greeks(greeks);
            }
            GatewayEvent::TickSnapshotEnd { req_id } => self.complete(req_id),
            GatewayEvent::HistoricalData { req_id, bar } => {
                if let Some(mut bars) = self.bars.get_mut(&req_id) {
                    bars.push(bar);
                }
            }
            GatewayEvent::HistoricalDataEnd { req_id, start, end } => {
                debug!("Historical request {} done ({} to {})", req_id, start, end);
                self.complete(req_id);
            }
            GatewayEvent::Error {
                req_id,
                code,
                message,
            } => {
                debug!("Gateway notice {} for request {}: {}", code, req_id, message);
                self.errors.lock().push(ErrorReport {
                    req_id,
                    code,
                    message,
                });
            }
        }
    }
}

async fn run_dispatcher(shared: Arc<SessionShared>, mut events: mpsc::Receiver<GatewayEvent>) {
    while let Some(event) = events.recv().await {
        shared.dispatch(event);
    }
    shared.link.send_replace(LinkState::Closed);
    debug!("Gateway event stream closed");
}

/// One connection to the market-data gateway.
pub struct BrokerSession {
    sender: Option<GatewaySender>,
    shared: Arc<SessionShared>,
    dispatcher: Option<JoinHandle<()>>,
    next_id: AtomicI64,
    market_data_type: u8,
    request_timeout: Duration,
}

impl BrokerSession {
    /// Opens a connection and waits for the readiness handshake.
    ///
    /// # Arguments
    /// * `connector` - Source of the gateway connection
    /// * `broker` - Identity, feed type and timeouts
    /// * `sanitizer` - Plausible ranges for greeks
    ///
    /// # Errors
    /// Returns `ConnectionFailed` if the socket cannot be opened or closes
    /// before the handshake, `ConnectionTimeout` if no handshake arrives in time.
    pub async fn connect<C: GatewayConnector>(
        connector: &C,
        broker: &BrokerConfig,
        sanitizer: &SanitizerConfig,
    ) -> Result<Self, GateError> {
        let client = connector.connect().await.map_err(|e| {
            GateError::ConnectionFailed(format!("{}: {}", connector.endpoint(), e))
        })?;
        let (sender, events) = client.into_parts();

        let (link, mut link_rx) = watch::channel(LinkState::Connecting);
        let shared = Arc::new(SessionShared {
            accumulators: DashMap::new(),
            bars: DashMap::new(),
            completions: DashMap::new(),
            errors: Mutex::new(Vec::new()),
            link,
            sanitizer: Sanitizer::new(sanitizer.clone()),
        });
        let dispatcher = tokio::spawn(run_dispatcher(Arc::clone(&shared), events));

        let mut session = Self {
            sender: Some(sender),
            shared,
            dispatcher: Some(dispatcher),
            next_id: AtomicI64::new(1),
            market_data_type: broker.market_data_type,
            request_timeout: broker.request_timeout(),
        };

        if let Err(e) = session
            .send(GatewayRequest::start_api(broker.client_id, &broker.account))
            .await
        {
            session.disconnect();
            return Err(GateError::ConnectionFailed(e.to_string()));
        }

        let connect_timeout = broker.connect_timeout();
        let handshake = timeout(
            connect_timeout,
            link_rx.wait_for(|state| *state != LinkState::Connecting),
        )
        .await
        .map(|state| state.map(|s| *s));

        match handshake {
            Ok(Ok(LinkState::Ready)) => {
                info!("Connected to gateway at {}", connector.endpoint());
                Ok(session)
            }
            Ok(_) => {
                session.disconnect();
                Err(GateError::ConnectionFailed(format!(
                    "{} closed before handshake",
                    connector.endpoint()
                )))
            }
            Err(_) => {
                session.disconnect();
                Err(GateError::ConnectionTimeout(connect_timeout.as_secs_f64()))
            }
        }
    }

    /// Allocates the next request identifier.
    pub fn next_request_id(&self) -> RequestId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Configured per-request deadline.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    async fn send(&self, request: GatewayRequest) -> Result<(), GateError> {
        match &self.sender {
            Some(sender) => Ok(sender.send(request).await?),
            None => Err(GateError::Transport(gateway_client::Error::ConnectionClosed)),
        }
    }

    /// Requests market data and waits for completion or the deadline.
    ///
    /// A streaming request is cancelled once awaited. A timed out request is
    /// not an error: the reply carries whatever arrived with `timed_out` set.
    ///
    /// # Errors
    /// Returns `Transport` if the request cannot be sent.
    pub async fn fetch(
        &self,
        contract: Contract,
        generic_ticks: &str,
        snapshot: bool,
        deadline: Option<Duration>,
    ) -> Result<MarketDataReply, GateError> {
        let request_id = self.next_request_id();
        let (signal, mut done) = watch::channel(false);
        self.shared.completions.insert(request_id, signal);
        self.shared
            .accumulators
            .insert(request_id, TickAccumulator::default());

        debug!("Request {} for {}", request_id, contract.key());
        self.send(GatewayRequest::market_data_type(self.market_data_type))
            .await?;
        self.send(GatewayRequest::req_mkt_data(
            request_id,
            contract,
            generic_ticks,
            snapshot,
        ))
        .await?;

        let wait = deadline.unwrap_or(self.request_timeout);
        let completed = matches!(timeout(wait, done.wait_for(|d| *d)).await, Ok(Ok(_)));
        if !completed {
            debug!("Request {} timed out after {:?}", request_id, wait);
        }

        if !snapshot
            && let Err(e) = self
                .send(GatewayRequest::cancel_mkt_data(request_id))
                .await
        {
            debug!("Cancel for request {} not sent: {}", request_id, e);
        }
        self.shared.completions.remove(&request_id);

        let ticks = self
            .shared
            .accumulators
            .get(&request_id)
            .map(|acc| acc.snapshot())
            .unwrap_or_default();

        Ok(MarketDataReply {
            request_id,
            ticks,
            timed_out: !completed,
        })
    }

    /// Requests `days` of daily bars and waits for the end marker.
    ///
    /// Unlike quotes, a historical request that misses its deadline is an
    /// error; partial bar sets are discarded.
    ///
    /// # Errors
    /// Returns `HistoricalTimeout` when the end marker does not arrive in
    /// time, `Transport` if the request cannot be sent.
    pub async fn fetch_historical(
        &self,
        contract: Contract,
        days: u32,
        deadline: Option<Duration>,
    ) -> Result<Vec<Bar>, GateError> {
        let request_id = self.next_request_id();
        let (signal, mut done) = watch::channel(false);
        self.shared.completions.insert(request_id, signal);
        self.shared.bars.insert(request_id, Vec::new());

        debug!("Historical request {} for {} ({} days)", request_id, contract.key(), days);
        let sent = self
            .send(GatewayRequest::req_historical_data(request_id, contract, days))
            .await;
        if let Err(e) = sent {
            self.shared.completions.remove(&request_id);
            self.shared.bars.remove(&request_id);
            return Err(e);
        }

        let wait = deadline.unwrap_or(self.request_timeout);
        let completed = matches!(timeout(wait, done.wait_for(|d| *d)).await, Ok(Ok(_)));
        self.shared.completions.remove(&request_id);
        let bars = self
            .shared
            .bars
            .remove(&request_id)
            .map(|(_, bars)| bars)
            .unwrap_or_default();

        if !completed {
            warn!(
                "Historical request {} timed out after {:?} with {} bars",
                request_id,
                wait,
                bars.len()
            );
            return Err(GateError::HistoricalTimeout(wait.as_secs_f64()));
        }
        Ok(bars)
    }

    /// Accumulated ticks for a request.
    #[must_use]
    pub fn ticks(&self, request_id: RequestId) -> Option<MarketTicks> {
        self.shared
            .accumulators
            .get(&request_id)
            .map(|acc| acc.snapshot())
    }

    /// Gateway notices collected so far.
    #[must_use]
    pub fn errors(&self) -> Vec<ErrorReport> {
        self.shared.errors.lock().clone()
    }

    /// Whether the session still has a live transport.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.sender.is_some() && *self.shared.link.borrow() == LinkState::Ready
    }

    /// Releases the transport and stops the dispatcher. Idempotent.
    pub fn disconnect(&mut self) {
        if self.sender.take().is_some() {
            debug!("Disconnecting from gateway");
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.abort();
        }
        if *self.shared.link.borrow() == LinkState::Ready {
            self.shared.link.send_replace(LinkState::Closed);
        }
    }
}

impl Drop for BrokerSession {
    fn drop(&mut self) {
        if self.dispatcher.is_some() {
            warn!("Broker session dropped without disconnect");
        }
        self.disconnect();
    }
}
