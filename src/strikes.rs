//! Strike geometry.
//!
//! Maps an underlying price to the listed strike increment and snaps prices
//! onto that grid.

/// Returns the strike increment listed for an underlying at `price`.
///
/// Below 50 strikes are 2.5 apart, below 200 they are 5 apart, and 10 apart
/// above that.
#[must_use]
pub fn increment_for(price: f64) -> f64 {
    if price < 50.0 {
        2.5
    } else if price < 200.0 {
        5.0
    } else {
        10.0
    }
}

/// Rounds `price` to the nearest multiple of `increment`.
///
/// Halves round away from zero and the result is truncated to two decimals.
/// A non-positive increment returns `price` unchanged.
#[must_use]
pub fn round_to_increment(price: f64, increment: f64) -> f64 {
    if increment <= 0.0 {
        return price;
    }
    truncate_cents((price / increment).round() * increment)
}

/// Generates the seven ATM candidate strikes around `base`.
///
/// Order is `base, +1, -1, +2, -2, +3, -3` increments; non-positive strikes
/// are dropped.
#[must_use]
pub fn candidate_strikes(base: f64, increment: f64) -> Vec<f64> {
    let mut strikes = Vec::with_capacity(7);
    strikes.push(round_cents(base));
    for step in 1..=3 {
        let offset = f64::from(step) * increment;
        strikes.push(round_cents(base + offset));
        strikes.push(round_cents(base - offset));
    }
    strikes.retain(|s| *s > 0.0);
    strikes
}

fn truncate_cents(value: f64) -> f64 {
    (value * 100.0).trunc() / 100.0
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
