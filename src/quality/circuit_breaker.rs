//! Consecutive-failure circuit breaker for option data.
//!
//! Armed until the failure count reaches the threshold, then tripped until a
//! manual [`CircuitBreaker::reset`]. The trip is persisted through the halt
//! file so later processes start tripped.

use crate::config::CircuitBreakerConfig;
use crate::models::{Alert, BreakerStatus, FailureCategory, FailureRecord};
use crate::quality::journal::{HaltState, Journal, JournalEvent};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::collections::VecDeque;
use uuid::Uuid;


/// Failures kept in memory for alerts and status; older entries are dropped.
///
/// The consecutive count is tracked separately and is not capped.
pub const MAX_TRACKED_FAILURES: usize = 100;

/// Failures copied into a trip alert.
pub const ALERT_FAILURE_COUNT: usize = 10;

/// Note written to the daily log on manual reset.
pub const MANUAL_RESET_NOTE: &str = "Manual reset by user";

const ACTION_REQUIRED: &str = "Review logs/data_quality/ and manually reset circuit breaker";

/// What happened to a recorded failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureOutcome {
    /// Counted; the breaker did not transition.
    Recorded {
        /// Consecutive failures including this one.
        consecutive: usize,
    },
    /// This failure tripped the breaker.
    Tripped(Alert),
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive: usize,
    failures: VecDeque<FailureRecord>,
    tripped: bool,
    tripped_at: Option<DateTime<Local>>,
    reason: Option<String>,
}

/// Circuit breaker guarding every option-data request.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    journal: Journal,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Creates a breaker, restoring a persisted trip from the halt file.
    ///
    /// An unreadable halt file leaves the breaker tripped.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig, journal: Journal) -> Self {
        let mut state = BreakerState::default();
        match journal.load_halt() {
            Ok(Some(halt)) if halt.tripped => {
                tracing::warn!(
                    "Circuit breaker restored as tripped since {}: {}",
                    halt.tripped_at,
                    halt.reason
                );
                state.tripped = true;
                state.tripped_at = Some(halt.tripped_at);
                state.reason = Some(halt.reason);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Halt file unreadable, starting tripped: {}", e);
                state.tripped = true;
                state.reason = Some(format!("Halt file unreadable: {}", e));
            }
        }

        Self {
            config,
            journal,
            state: Mutex::new(state),
        }
    }

    /// Journal used for alerts and logs.
    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Failures that trip the breaker.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.config.consecutive_failures_threshold
    }

    /// Returns true while trading is halted.
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.state.lock().tripped
    }

    /// Trip reason, if tripped.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.state.lock().reason.clone()
    }

    /// Records a failure and trips the breaker when the threshold is reached.
    ///
    /// Only the transition into the tripped state writes an alert; failures
    /// recorded while already tripped are counted and logged only.
    pub fn record_failure(
        &self,
        category: FailureCategory,
        message: &str,
        ticker: Option<&str>,
    ) -> FailureOutcome {
        let now = Local::now();
        let mut state = self.state.lock();

        state.failures.push_back(FailureRecord {
            timestamp: now,
            category,
            message: message.to_string(),
            ticker: ticker.map(str::to_string),
        });
        while state.failures.len() > MAX_TRACKED_FAILURES {
            state.failures.pop_front();
        }
        state.consecutive += 1;
        let consecutive = state.consecutive;

        tracing::warn!(
            "Data quality failure {}/{} ({}): {}",
            consecutive,
            self.threshold(),
            category,
            message
        );
        self.journal_event(&JournalEvent::ValidationFailure {
            category,
            message: message.to_string(),
            ticker: ticker.map(str::to_string),
            consecutive_failures: consecutive,
        });

        if state.tripped || consecutive < self.threshold() {
            return FailureOutcome::Recorded { consecutive };
        }

        let reason = format!(
            "{} consecutive data quality failures. Latest: {}",
            consecutive, message
        );
        let alert = Alert {
            id: alert_id(now),
            timestamp: now,
            priority: "immediate".to_string(),
            alert_type: "circuit_breaker".to_string(),
            subsystem: "options_data_quality".to_string(),
            reason: reason.clone(),
            action_required: ACTION_REQUIRED.to_string(),
            acknowledged: false,
            failures: state
                .failures
                .iter()
                .skip(state.failures.len().saturating_sub(ALERT_FAILURE_COUNT))
                .cloned()
                .collect(),
        };

        state.tripped = true;
        state.tripped_at = Some(now);
        state.reason = Some(reason.clone());

        tracing::error!("CIRCUIT BREAKER TRIPPED: {}", reason);

        if let Err(e) = self.journal.append_alert(&alert) {
            tracing::warn!("Failed to write circuit breaker alert: {}", e);
        }
        let halt = HaltState {
            tripped: true,
            tripped_at: now,
            reason: reason.clone(),
            alert_id: alert.id.clone(),
        };
        if let Err(e) = self.journal.save_halt(&halt) {
            tracing::warn!("Failed to persist halt flag: {}", e);
        }
        self.journal_event(&JournalEvent::CircuitBreakerTriggered {
            reason,
            failures_count: consecutive,
        });

        FailureOutcome::Tripped(alert)
    }

    /// Clears the failure count after a successful validation.
    ///
    /// Does not affect the tripped flag.
    pub fn reset_failures(&self) {
        let mut state = self.state.lock();
        if state.consecutive > 0 {
            tracing::debug!("Clearing {} recorded failures", state.consecutive);
        }
        state.consecutive = 0;
        state.failures.clear();
    }

    /// Manual reset: clears the tripped flag, the failures and the halt file.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let was_tripped = state.tripped;
        *state = BreakerState::default();

        if let Err(e) = self.journal.clear_halt() {
            tracing::warn!("Failed to clear halt flag: {}", e);
        }
        self.journal_event(&JournalEvent::CircuitBreakerReset {
            note: MANUAL_RESET_NOTE.to_string(),
        });

        if was_tripped {
            tracing::info!("Circuit breaker manually reset, options trading resumed");
        } else {
            tracing::info!("Circuit breaker reset (was not tripped)");
        }
    }

    /// Snapshot for operators.
    #[must_use]
    pub fn status(&self) -> BreakerStatus {
        let state = self.state.lock();
        BreakerStatus {
            tripped: state.tripped,
            consecutive_failures: state.consecutive,
            threshold: self.threshold(),
            tripped_at: state.tripped_at,
            reason: state.reason.clone(),
            failures: state.failures.iter().cloned().collect(),
        }
    }

    fn journal_event(&self, event: &JournalEvent) {
        if let Err(e) = self.journal.append_event(event) {
            tracing::warn!("Failed to write data quality log: {}", e);
        }
    }
}

fn alert_id(now: DateTime<Local>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("alert-{}-{}", now.format("%Y%m%d-%H%M%S"), &suffix[..8])
}
