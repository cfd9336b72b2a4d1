//! Daily bar helpers.
//!
//! Bars come back from the gateway in arrival order; everything here sorts by
//! bar date before looking at the most recent closes.

use gateway_client::Bar;

/// Bars averaged by the long-term moving average.
pub const MA_200_WINDOW: usize = 200;

/// Default lookback requested for a moving-average run, in days.
pub const DEFAULT_HISTORY_DAYS: u32 = 210;

/// Returns `bars` ordered by date, oldest first.
#[must_use]
pub fn sorted_by_date(bars: &[Bar]) -> Vec<Bar> {
    let mut sorted = bars.to_vec();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));
    sorted
}

/// Simple moving average of the last `window` closes.
///
/// Negative and non-finite closes are ignored. Returns `None` when fewer than
/// `window` usable closes remain or `window` is zero.
#[must_use]
pub fn moving_average(bars: &[Bar], window: usize) -> Option<f64> {
    if window == 0 {
        return None;
    }
    let closes: Vec<f64> = sorted_by_date(bars)
        .into_iter()
        .map(|b| b.close)
        .filter(|c| c.is_finite() && *c >= 0.0)
        .collect();
    if closes.len() < window {
        return None;
    }
    let recent = &closes[closes.len() - window..];
    Some(recent.iter().sum::<f64>() / window as f64)
}

/// 200-bar moving average of the closes.
#[must_use]
pub fn ma_200(bars: &[Bar]) -> Option<f64> {
    moving_average(bars, MA_200_WINDOW)
}
