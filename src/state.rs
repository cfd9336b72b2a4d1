//! Application state management.

use crate::broker::{GatewayConnector, WsConnector};
use crate::config::Config;
use crate::quality::{CircuitBreaker, Journal, QualityGate};
use std::sync::Arc;
use tracing::{info, warn};

/// Process-wide state built once at startup.
pub struct AppState<C: GatewayConnector = WsConnector> {
    /// Loaded configuration.
    pub config: Config,
    /// Shared circuit breaker.
    pub breaker: Arc<CircuitBreaker>,
    /// Quality gate over the configured gateway.
    pub gate: Arc<QualityGate<C>>,
}

impl AppState<WsConnector> {
    /// Creates the state for the configured WebSocket gateway.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        let connector = WsConnector::new(&config.broker.host, config.broker.port);
        Self::with_connector(config, connector)
    }
}

impl<C: GatewayConnector> AppState<C> {
    /// Creates the state over an explicit connector.
    #[must_use]
    pub fn with_connector(config: Config, connector: C) -> Self {
        let journal = Journal::new(config.journal.clone());
        let breaker = Arc::new(CircuitBreaker::new(
            config.circuit_breaker.clone(),
            journal,
        ));
        if breaker.is_tripped() {
            warn!("Options trading is halted until the circuit breaker is reset");
        }

        let gate = Arc::new(QualityGate::new(connector, &config, Arc::clone(&breaker)));
        info!(
            "Gateway {}:{} (client id {}), breaker threshold {}",
            config.broker.host,
            config.broker.port,
            config.broker.client_id,
            breaker.threshold()
        );

        Self {
            config,
            breaker,
            gate,
        }
    }
}
