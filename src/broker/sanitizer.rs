//! Sentinel and plausibility cleaning of raw greeks.

use crate::config::{Range, SanitizerConfig};
use crate::models::Greeks;

/// Reserved "value not available" markers used by the gateway.
pub const SENTINELS: [f64; 2] = [-1.0, -2.0];

/// Cleans a single raw value.
///
/// Returns `None` for a missing value, a sentinel, or a value outside the
/// inclusive `range`. Out-of-range values are logged.
#[must_use]
pub fn clean_value(raw: Option<f64>, name: &str, range: Range) -> Option<f64> {
    let value = raw?;
    if SENTINELS.contains(&value) || value.is_nan() {
        return None;
    }
    let (min, max) = range;
    if value < min || value > max {
        tracing::warn!("{}={:.4} outside range [{}, {}], discarded", name, value, min, max);
        return None;
    }
    Some(value)
}

/// Raw option computation fields as reported by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawComputation {
    /// Implied volatility.
    pub implied_vol: Option<f64>,
    /// Delta.
    pub delta: Option<f64>,
    /// Model option price.
    pub opt_price: Option<f64>,
    /// Gamma.
    pub gamma: Option<f64>,
    /// Vega.
    pub vega: Option<f64>,
    /// Theta.
    pub theta: Option<f64>,
    /// Underlying price.
    pub und_price: Option<f64>,
}

/// Applies the configured plausibility ranges to raw computations.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    config: SanitizerConfig,
}

impl Sanitizer {
    /// Creates a sanitizer over the given ranges.
    #[must_use]
    pub fn new(config: SanitizerConfig) -> Self {
        Self { config }
    }

    /// Cleans every field independently.
    #[must_use]
    pub fn clean(&self, raw: &RawComputation) -> Greeks {
        let c = &self.config;
        Greeks {
            implied_volatility: clean_value(raw.implied_vol, "IV", c.implied_volatility),
            delta: clean_value(raw.delta, "Delta", c.delta),
            gamma: clean_value(raw.gamma, "Gamma", c.gamma),
            vega: clean_value(raw.vega, "Vega", c.vega),
            theta: clean_value(raw.theta, "Theta", c.theta),
            option_price: clean_value(raw.opt_price, "OptPrice", c.option_price),
            underlying_price: clean_value(raw.und_price, "UndPrice", c.underlying_price),
        }
    }
}
