//! Durable records of data-quality incidents.
//!
//! Three files are maintained:
//! - the alert document (`{alerts, metadata}`), appended once per breaker trip
//! - one daily log per calendar day (`{date, events}`)
//! - the halt file, present while the breaker is tripped
//!
//! Alert and log files use read-merge-write so unrelated content survives.

use crate::config::JournalConfig;
use crate::models::{Alert, FailureCategory};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Version written into the alert document metadata.
pub const ALERTS_VERSION: &str = "1.0";

/// Journal error types.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Filesystem failure.
    #[error("journal I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// A journal file holds malformed JSON.
    #[error("journal file {path} is not valid JSON: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Metadata block of the alert document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMetadata {
    /// Document format version.
    pub version: String,
    /// Document description.
    pub description: String,
}

impl Default for AlertMetadata {
    fn default() -> Self {
        Self {
            version: ALERTS_VERSION.to_string(),
            description: "Active alerts requiring user action".to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AlertDocument {
    #[serde(default)]
    alerts: Vec<Value>,
    #[serde(default)]
    metadata: AlertMetadata,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DailyLog {
    date: String,
    #[serde(default)]
    events: Vec<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Event appended to the daily log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEvent {
    /// A failure counted by the breaker.
    ValidationFailure {
        /// Failure classification.
        category: FailureCategory,
        /// Failure reason.
        message: String,
        /// Ticker involved, if known.
        ticker: Option<String>,
        /// Consecutive failures after this one.
        consecutive_failures: usize,
    },
    /// The breaker tripped.
    CircuitBreakerTriggered {
        /// Trip reason.
        reason: String,
        /// Failures counted at trip time.
        failures_count: usize,
    },
    /// An operator reset the breaker.
    CircuitBreakerReset {
        /// Free-form note.
        note: String,
    },
    /// Result of a daily validation run.
    DailyValidation {
        /// The full report.
        report: Value,
    },
}

#[derive(Serialize)]
struct Entry<'a> {
    timestamp: DateTime<Local>,
    #[serde(flatten)]
    event: &'a JournalEvent,
}

/// Persisted halt flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaltState {
    /// Always true while the file exists.
    pub tripped: bool,
    /// When the breaker tripped.
    pub tripped_at: DateTime<Local>,
    /// Trip reason.
    pub reason: String,
    /// Identifier of the alert written on trip.
    pub alert_id: String,
}

/// Writer for alert, daily log and halt files.
#[derive(Debug, Clone)]
pub struct Journal {
    config: JournalConfig,
}

impl Journal {
    /// Creates a journal writing to the configured locations.
    #[must_use]
    pub fn new(config: JournalConfig) -> Self {
        Self { config }
    }

    /// Configured file locations.
    #[must_use]
    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Path of the daily log for `date`.
    #[must_use]
    pub fn daily_log_path(&self, date: NaiveDate) -> PathBuf {
        self.config
            .log_dir
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    /// Appends an alert to the alert document.
    ///
    /// # Errors
    /// Returns error if the document cannot be read, parsed or written.
    pub fn append_alert(&self, alert: &Alert) -> Result<(), JournalError> {
        let path = &self.config.alerts_file;
        let mut document: AlertDocument = read_json(path)?.unwrap_or_default();
        document.alerts.push(to_value(path, alert)?);
        write_json(path, &document)?;
        tracing::info!("Alert {} written to {}", alert.id, path.display());
        Ok(())
    }

    /// Alerts currently stored in the alert document.
    ///
    /// # Errors
    /// Returns error if the document cannot be read or parsed.
    pub fn alerts(&self) -> Result<Vec<Value>, JournalError> {
        let path = &self.config.alerts_file;
        Ok(read_json::<AlertDocument>(path)?
            .map(|d| d.alerts)
            .unwrap_or_default())
    }

    /// Appends an event to today's log.
    ///
    /// # Errors
    /// Returns error if the log cannot be read, parsed or written.
    pub fn append_event(&self, event: &JournalEvent) -> Result<PathBuf, JournalError> {
        let now = Local::now();
        self.append_event_at(now, event)
    }

    /// Appends an event stamped `timestamp` to that day's log.
    ///
    /// # Errors
    /// Returns error if the log cannot be read, parsed or written.
    pub fn append_event_at(
        &self,
        timestamp: DateTime<Local>,
        event: &JournalEvent,
    ) -> Result<PathBuf, JournalError> {
        let date = timestamp.date_naive();
        let path = self.daily_log_path(date);
        let mut log = read_json::<DailyLog>(&path)?.unwrap_or_else(|| DailyLog {
            date: date.format("%Y-%m-%d").to_string(),
            events: Vec::new(),
            extra: Map::new(),
        });
        log.events.push(to_value(&path, &Entry { timestamp, event })?);
        write_json(&path, &log)?;
        Ok(path)
    }

    /// Events recorded on `date`.
    ///
    /// # Errors
    /// Returns error if the log cannot be read or parsed.
    pub fn events(&self, date: NaiveDate) -> Result<Vec<Value>, JournalError> {
        let path = self.daily_log_path(date);
        Ok(read_json::<DailyLog>(&path)?
            .map(|log| log.events)
            .unwrap_or_default())
    }

    /// Writes the halt file.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn save_halt(&self, state: &HaltState) -> Result<(), JournalError> {
        write_json(&self.config.halt_file, state)
    }

    /// Reads the halt file, if present.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load_halt(&self) -> Result<Option<HaltState>, JournalError> {
        read_json(&self.config.halt_file)
    }

    /// Removes the halt file. A missing file is not an error.
    ///
    /// # Errors
    /// Returns error if the file exists and cannot be removed.
    pub fn clear_halt(&self) -> Result<(), JournalError> {
        let path = &self.config.halt_file;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(JournalError::Io {
                path: path.clone(),
                source,
            }),
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, JournalError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(JournalError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| JournalError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), JournalError> {
    let io_error = |source| JournalError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| JournalError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_error)
}

fn to_value<T: Serialize>(path: &Path, value: &T) -> Result<Value, JournalError> {
    serde_json::to_value(value).map_err(|source| JournalError::Json {
        path: path.to_path_buf(),
        source,
    })
}
