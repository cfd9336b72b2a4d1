//! Daily data-quality validation run.
//!
//! Fetches a validated ATM call, then checks its greeks ranges, bid-ask
//! spread and fetch latency. The report is appended to the daily log.

use super::gate::QualityGate;
use super::journal::JournalEvent;
use crate::broker::GatewayConnector;
use crate::models::{QuoteRequest, ValidatedQuote};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Maximum acceptable fetch latency.
pub const LATENCY_THRESHOLD: Duration = Duration::from_secs(5);

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// Check passed.
    Passed,
    /// Check failed.
    Failed,
}

/// One check of the run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Check name.
    pub name: String,
    /// Outcome.
    pub status: CheckStatus,
    /// Short note on pass, error text on failure.
    pub note: String,
    /// Values the check looked at.
    pub details: Value,
}

/// Full report of a run.
#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    /// Report date (`YYYY-MM-DD`).
    pub date: String,
    /// When the run started.
    pub timestamp: DateTime<Local>,
    /// Underlying exercised.
    pub ticker: String,
    /// Checks passed.
    pub tests_passed: usize,
    /// Checks failed.
    pub tests_failed: usize,
    /// Every check in run order.
    pub tests: Vec<CheckResult>,
}

impl DailyReport {
    fn new(ticker: &str) -> Self {
        let timestamp = Local::now();
        Self {
            date: timestamp.format("%Y-%m-%d").to_string(),
            timestamp,
            ticker: ticker.to_uppercase(),
            tests_passed: 0,
            tests_failed: 0,
            tests: Vec::new(),
        }
    }

    /// True when no check failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.tests_failed == 0
    }

    fn pass(&mut self, name: &str, note: String, details: Value) {
        info!("PASS {} {}", name, note);
        self.tests_passed += 1;
        self.tests.push(CheckResult {
            name: name.to_string(),
            status: CheckStatus::Passed,
            note,
            details,
        });
    }

    fn fail(&mut self, name: &str, error: String, details: Value) {
        warn!("FAIL {}: {}", name, error);
        self.tests_failed += 1;
        self.tests.push(CheckResult {
            name: name.to_string(),
            status: CheckStatus::Failed,
            note: error,
            details,
        });
    }
}

/// Runs the daily validation against `ticker` and journals the report.
pub async fn run_daily_validation<C: GatewayConnector>(
    gate: &QualityGate<C>,
    ticker: &str,
) -> DailyReport {
    let mut report = DailyReport::new(ticker);
    let request = QuoteRequest::new(ticker);

    let started = Instant::now();
    let fetched = gate.fetch_validated_option(&request).await;
    let elapsed = started.elapsed();

    let quote = match fetched {
        Ok(validated) => {
            report.pass(
                "option fetch",
                format!("({:.1}s)", elapsed.as_secs_f64()),
                json!({
                    "strike": validated.quote.strike,
                    "expiration": validated.quote.expiration,
                    "mid_price": validated.quote.mid_price,
                    "delta": validated.quote.delta,
                    "iv": validated.quote.implied_volatility,
                    "elapsed_seconds": elapsed.as_secs_f64(),
                }),
            );
            Some(validated)
        }
        Err(e) => {
            report.fail("option fetch", e.to_string(), json!({"code": e.code()}));
            None
        }
    };

    match &quote {
        Some(validated) => {
            check_greeks(gate, validated, &mut report);
            check_spread(gate, validated, &mut report);
        }
        None => {
            for name in ["greeks range", "bid-ask spread"] {
                report.fail(name, "No data from option fetch".to_string(), Value::Null);
            }
        }
    }

    let latency = json!({
        "elapsed_seconds": elapsed.as_secs_f64(),
        "threshold_seconds": LATENCY_THRESHOLD.as_secs_f64(),
    });
    if elapsed < LATENCY_THRESHOLD {
        report.pass("latency", format!("({:.1}s)", elapsed.as_secs_f64()), latency);
    } else {
        report.fail(
            "latency",
            format!("Latency too high: {:.1}s", elapsed.as_secs_f64()),
            latency,
        );
    }

    match serde_json::to_value(&report) {
        Ok(value) => {
            if let Err(e) = gate
                .breaker()
                .journal()
                .append_event(&JournalEvent::DailyValidation { report: value })
            {
                warn!("Failed to write daily validation report: {}", e);
            }
        }
        Err(e) => warn!("Failed to serialize daily validation report: {}", e),
    }

    report
}

fn check_greeks<C: GatewayConnector>(
    gate: &QualityGate<C>,
    validated: &ValidatedQuote,
    report: &mut DailyReport,
) {
    let config = gate.validator().config();
    let delta = validated.quote.delta;
    let iv = validated.quote.implied_volatility;
    let in_range = |value: Option<f64>, (min, max): (f64, f64)| {
        value.is_some_and(|v| (min..=max).contains(&v))
    };
    let delta_ok = in_range(delta, config.delta_range_calls);
    let iv_ok = in_range(iv, config.iv_range);

    if let (true, true, Some(delta), Some(iv)) = (delta_ok, iv_ok, delta, iv) {
        report.pass(
            "greeks range",
            format!("(delta={:.2}, IV={:.1}%)", delta, iv * 100.0),
            json!({
                "delta": delta,
                "delta_range": config.delta_range_calls,
                "iv": iv,
                "iv_range": config.iv_range,
            }),
        );
    } else {
        report.fail(
            "greeks range",
            "Greeks outside expected ranges".to_string(),
            json!({"delta": delta, "delta_ok": delta_ok, "iv": iv, "iv_ok": iv_ok}),
        );
    }
}

fn check_spread<C: GatewayConnector>(
    gate: &QualityGate<C>,
    validated: &ValidatedQuote,
    report: &mut DailyReport,
) {
    let max = gate.validator().config().max_spread_pct;
    let (Some(bid), Some(ask), Some(mid)) = (
        validated.quote.bid,
        validated.quote.ask,
        validated.quote.mid_price,
    ) else {
        report.fail("bid-ask spread", "Missing bid or ask".to_string(), Value::Null);
        return;
    };

    let spread_pct = (ask - bid) / mid;
    let details = json!({"bid": bid, "ask": ask, "mid": mid, "spread_pct": spread_pct});
    if spread_pct <= max {
        report.pass(
            "bid-ask spread",
            format!("({:.1}% of mid)", spread_pct * 100.0),
            details,
        );
    } else {
        report.fail(
            "bid-ask spread",
            format!("Wide spread: {:.1}%", spread_pct * 100.0),
            details,
        );
    }
}
