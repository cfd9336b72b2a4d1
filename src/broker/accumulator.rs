//! Per-request tick accumulation.

use crate::models::{DataSource, Greeks};
use gateway_client::tick;
use serde::Serialize;
use std::collections::HashMap;

/// Mutable tick state for one in-flight request.
#[derive(Debug, Clone, Default)]
pub struct TickAccumulator {
    prices: HashMap<i32, f64>,
    sizes: HashMap<i32, f64>,
    greeks: Greeks,
}

impl TickAccumulator {
    /// Records a price tick; last write wins.
    pub fn apply_price(&mut self, tick_type: i32, price: f64) {
        self.prices.insert(tick_type, price);
    }

    /// Records a size tick; last write wins.
    pub fn apply_size(&mut self, tick_type: i32, size: f64) {
        self.sizes.insert(tick_type, size);
    }

    /// Replaces the greeks bundle with a freshly cleaned computation.
    pub fn apply_greeks(&mut self, greeks: Greeks) {
        self.greeks = greeks;
    }

    /// Feed family the primary ticks came from.
    #[must_use]
    pub fn data_source(&self) -> DataSource {
        let has_live = tick::LIVE_PRIMARY.iter().any(|t| self.prices.contains_key(t));
        let has_delayed = tick::DELAYED_PRIMARY
            .iter()
            .any(|t| self.prices.contains_key(t));

        if has_live {
            DataSource::RealTime
        } else if has_delayed {
            DataSource::Delayed
        } else {
            DataSource::Unknown
        }
    }

    /// Live value when positive, otherwise the delayed value.
    fn price(&self, live: i32, delayed: i32) -> Option<f64> {
        self.prices
            .get(&live)
            .copied()
            .filter(|p| *p > 0.0)
            .or_else(|| self.prices.get(&delayed).copied())
    }

    /// Resolved view of the accumulated ticks.
    #[must_use]
    pub fn snapshot(&self) -> MarketTicks {
        MarketTicks {
            bid: self.price(tick::BID, tick::DELAYED_BID),
            ask: self.price(tick::ASK, tick::DELAYED_ASK),
            last: self.price(tick::LAST, tick::DELAYED_LAST),
            high: self.price(tick::HIGH, tick::DELAYED_HIGH),
            volume: self.sizes.get(&tick::VOLUME).copied(),
            open_interest: self.sizes.get(&tick::OPEN_INTEREST).copied(),
            greeks: self.greeks,
            source: self.data_source(),
        }
    }
}

/// Quote fields resolved from one request, live values preferred.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MarketTicks {
    /// Bid price.
    pub bid: Option<f64>,
    /// Ask price.
    pub ask: Option<f64>,
    /// Last trade price.
    pub last: Option<f64>,
    /// Session high.
    pub high: Option<f64>,
    /// Daily volume.
    pub volume: Option<f64>,
    /// Open interest.
    pub open_interest: Option<f64>,
    /// Cleaned greeks.
    pub greeks: Greeks,
    /// Feed classification.
    pub source: DataSource,
}

impl MarketTicks {
    /// Midpoint when both bid and ask are strictly positive.
    #[must_use]
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) if bid > 0.0 && ask > 0.0 => Some((bid + ask) / 2.0),
            _ => None,
        }
    }

    /// Last trade, falling back to the midpoint.
    #[must_use]
    pub fn reference_price(&self) -> Option<f64> {
        self.last.or_else(|| self.mid())
    }
}
