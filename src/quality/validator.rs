//! Stateless data-quality checks for option quotes.

use crate::config::DataQualityConfig;
use crate::models::Greeks;
use gateway_client::Right;
use serde::Serialize;


/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    /// The data passed.
    Pass,
    /// The data failed, with a reason.
    Fail(String),
    /// The data could not be judged automatically.
    RequiresManualReview(String),
}

impl Verdict {
    /// True only for [`Verdict::Pass`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Reason text; empty on pass.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Verdict::Pass => "",
            Verdict::Fail(reason) | Verdict::RequiresManualReview(reason) => reason,
        }
    }
}

/// Validator configured with data-quality thresholds.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: DataQualityConfig,
}

impl Validator {
    /// Creates a validator with the given thresholds.
    #[must_use]
    pub fn new(config: DataQualityConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use.
    #[must_use]
    pub fn config(&self) -> &DataQualityConfig {
        &self.config
    }

    /// Checks implied volatility against `iv_range`.
    #[must_use]
    pub fn validate_iv(&self, iv: f64) -> Verdict {
        let (min, max) = self.config.iv_range;
        if (min..=max).contains(&iv) {
            Verdict::Pass
        } else {
            Verdict::Fail(format!(
                "IV {:.1}% outside range [{:.0}%, {:.0}%]",
                iv * 100.0,
                min * 100.0,
                max * 100.0
            ))
        }
    }

    /// Checks greeks against the configured ranges.
    ///
    /// Delta and theta are only range-checked for calls. At least delta,
    /// theta and implied volatility must be present.
    #[must_use]
    pub fn validate_greeks(&self, greeks: &Greeks, right: Right) -> Verdict {
        let c = &self.config;

        if let Some(iv) = greeks.implied_volatility {
            let verdict = self.validate_iv(iv);
            if !verdict.is_valid() {
                return verdict;
            }
        }

        if right == Right::Call {
            if let Some(delta) = greeks.delta {
                let (min, max) = c.delta_range_calls;
                if !(min..=max).contains(&delta) {
                    return Verdict::Fail(format!(
                        "Delta {:.3} outside range [{:?}, {:?}]",
                        delta, min, max
                    ));
                }
            }

            if let Some(theta) = greeks.theta {
                if theta > 0.0 {
                    return Verdict::Fail(format!(
                        "Theta {:.3} is positive (expected negative for long calls)",
                        theta
                    ));
                }
                let (min, max) = c.theta_range_long;
                if !(min..=max).contains(&theta) {
                    return Verdict::Fail(format!(
                        "Theta {:.3} outside range [{:?}, {:?}]",
                        theta, min, max
                    ));
                }
            }
        }

        if let Some(gamma) = greeks.gamma {
            let (min, max) = c.gamma_range;
            if !(gamma > min && gamma <= max) {
                return Verdict::Fail(format!(
                    "Gamma {:.4} outside range ({:?}, {:?}]",
                    gamma, min, max
                ));
            }
        }

        if let Some(vega) = greeks.vega {
            let (min, max) = c.vega_range;
            if !(vega > min && vega <= max) {
                return Verdict::Fail(format!(
                    "Vega {:.4} outside range ({:?}, {:?}]",
                    vega, min, max
                ));
            }
        }

        let critical = [greeks.delta, greeks.theta, greeks.implied_volatility]
            .iter()
            .filter(|g| g.is_some())
            .count();
        if critical < 3 {
            return Verdict::Fail(format!(
                "Missing critical Greeks (have {}/3: delta, theta, IV)",
                critical
            ));
        }

        Verdict::Pass
    }

    /// Checks that bid and ask are present, positive, uncrossed and tight.
    #[must_use]
    pub fn validate_pricing(&self, bid: Option<f64>, ask: Option<f64>, _last: Option<f64>) -> Verdict {
        let c = &self.config;
        let (Some(bid), Some(ask)) = (bid, ask) else {
            return Verdict::Fail("Missing bid or ask price".to_string());
        };

        if bid <= 0.0 || ask <= 0.0 {
            return Verdict::Fail(format!(
                "Invalid prices: bid={:?}, ask={:?} (must be positive)",
                bid, ask
            ));
        }
        if bid < c.min_bid {
            return Verdict::Fail(format!("Bid {:.2} below minimum {:?}", bid, c.min_bid));
        }
        if ask < c.min_ask {
            return Verdict::Fail(format!("Ask {:.2} below minimum {:?}", ask, c.min_ask));
        }
        if bid > ask {
            return Verdict::Fail(format!("Crossed market: bid {:.2} > ask {:.2}", bid, ask));
        }

        let mid = (bid + ask) / 2.0;
        let spread_pct = (ask - bid) / mid;
        if spread_pct > c.max_spread_pct {
            return Verdict::Fail(format!(
                "Wide spread: {:.1}% (max {:.0}%)",
                spread_pct * 100.0,
                c.max_spread_pct * 100.0
            ));
        }

        Verdict::Pass
    }

    /// Checks open interest and volume. Never a data-quality failure.
    #[must_use]
    pub fn validate_liquidity(&self, open_interest: Option<f64>, volume: Option<f64>) -> Verdict {
        let c = &self.config;
        let Some(open_interest) = open_interest else {
            return Verdict::RequiresManualReview(format!(
                "Open interest unavailable (min {})",
                c.min_open_interest
            ));
        };

        if open_interest < c.min_open_interest as f64 {
            return Verdict::Fail(format!(
                "Low open interest: {:.0} (min {})",
                open_interest, c.min_open_interest
            ));
        }
        if let Some(volume) = volume
            && volume < c.min_volume as f64
        {
            return Verdict::Fail(format!(
                "Low volume: {:.0} (min {})",
                volume, c.min_volume
            ));
        }

        Verdict::Pass
    }
}
