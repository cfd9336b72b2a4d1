//! Unit tests for journal module.

use super::*;
use tempfile::TempDir;

fn journal() -> (TempDir, Journal) {
    let dir = TempDir::new().unwrap();
    let journal = Journal::new(JournalConfig::rooted_at(dir.path()));
    (dir, journal)
}

fn alert(id: &str) -> Alert {
    Alert {
        id: id.to_string(),
        timestamp: Local::now(),
        priority: "immediate".to_string(),
        alert_type: "circuit_breaker".to_string(),
        subsystem: "options_data_quality".to_string(),
        reason: "3 consecutive data quality failures. Latest: boom".to_string(),
        action_required: "reset".to_string(),
        acknowledged: false,
        failures: vec![],
    }
}

// ============================================================================
// Alert Document Tests
// ============================================================================

#[test]
fn test_append_alert_creates_document() {
    let (_dir, journal) = journal();

    journal.append_alert(&alert("alert-1")).unwrap();

    let content = fs::read_to_string(&journal.config().alerts_file).unwrap();
    let document: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(document["alerts"].as_array().unwrap().len(), 1);
    assert_eq!(document["alerts"][0]["type"], "circuit_breaker");
    assert_eq!(document["metadata"]["version"], "1.0");
    assert_eq!(
        document["metadata"]["description"],
        "Active alerts requiring user action"
    );
}

#[test]
fn test_append_alert_preserves_existing_content() {
    let (_dir, journal) = journal();
    let existing = r#"{
        "alerts": [{"id": "manual-note", "acknowledged": true}],
        "metadata": {"version": "1.0", "description": "kept"},
        "owner": "ops"
    }"#;
    fs::write(&journal.config().alerts_file, existing).unwrap();

    journal.append_alert(&alert("alert-2")).unwrap();

    let alerts = journal.alerts().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["id"], "manual-note");
    assert_eq!(alerts[1]["id"], "alert-2");

    let document: Value =
        serde_json::from_str(&fs::read_to_string(&journal.config().alerts_file).unwrap()).unwrap();
    assert_eq!(document["owner"], "ops");
    assert_eq!(document["metadata"]["description"], "kept");
}

#[test]
fn test_append_alert_rejects_corrupt_document() {
    let (_dir, journal) = journal();
    fs::write(&journal.config().alerts_file, "{not json").unwrap();

    let result = journal.append_alert(&alert("alert-3"));
    assert!(matches!(result, Err(JournalError::Json { .. })));
}

#[test]
fn test_alerts_missing_file_is_empty() {
    let (_dir, journal) = journal();
    assert!(journal.alerts().unwrap().is_empty());
}

// ============================================================================
// Daily Log Tests
// ============================================================================

#[test]
fn test_append_event_creates_daily_log() {
    let (_dir, journal) = journal();
    let now = Local::now();

    let path = journal
        .append_event_at(
            now,
            &JournalEvent::ValidationFailure {
                category: FailureCategory::PricingValidation,
                message: "Crossed market: bid 5.50 > ask 5.00".to_string(),
                ticker: Some("SPY".to_string()),
                consecutive_failures: 1,
            },
        )
        .unwrap();

    let date = now.date_naive();
    assert_eq!(path, journal.daily_log_path(date));
    assert!(path.ends_with(format!("{}.json", date.format("%Y-%m-%d"))));

    let log: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(log["date"], date.format("%Y-%m-%d").to_string());
    assert_eq!(log["events"][0]["type"], "validation_failure");
    assert_eq!(log["events"][0]["category"], "pricing_validation");
    assert_eq!(log["events"][0]["ticker"], "SPY");
    assert!(log["events"][0]["timestamp"].is_string());
}

#[test]
fn test_append_event_accumulates_in_order() {
    let (_dir, journal) = journal();
    let now = Local::now();

    journal
        .append_event_at(
            now,
            &JournalEvent::CircuitBreakerTriggered {
                reason: "3 consecutive data quality failures. Latest: x".to_string(),
                failures_count: 3,
            },
        )
        .unwrap();
    journal
        .append_event_at(
            now,
            &JournalEvent::CircuitBreakerReset {
                note: "Manual reset by user".to_string(),
            },
        )
        .unwrap();

    let events = journal.events(now.date_naive()).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "circuit_breaker_triggered");
    assert_eq!(events[0]["failures_count"], 3);
    assert_eq!(events[1]["type"], "circuit_breaker_reset");
    assert_eq!(events[1]["note"], "Manual reset by user");
}

#[test]
fn test_daily_validation_event_carries_report() {
    let (_dir, journal) = journal();
    let now = Local::now();
    let report = serde_json::json!({"ticker": "SPY", "passed": true});

    journal
        .append_event_at(now, &JournalEvent::DailyValidation { report })
        .unwrap();

    let events = journal.events(now.date_naive()).unwrap();
    assert_eq!(events[0]["type"], "daily_validation");
    assert_eq!(events[0]["report"]["passed"], true);
}

#[test]
fn test_events_for_day_without_log() {
    let (_dir, journal) = journal();
    let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    assert!(journal.events(date).unwrap().is_empty());
}

// ============================================================================
// Halt File Tests
// ============================================================================

#[test]
fn test_halt_file_lifecycle() {
    let (_dir, journal) = journal();
    assert!(journal.load_halt().unwrap().is_none());

    let state = HaltState {
        tripped: true,
        tripped_at: Local::now(),
        reason: "3 consecutive data quality failures. Latest: x".to_string(),
        alert_id: "alert-20260220-101500-0a1b2c3d".to_string(),
    };
    journal.save_halt(&state).unwrap();

    let loaded = journal.load_halt().unwrap().unwrap();
    assert_eq!(loaded, state);

    journal.clear_halt().unwrap();
    assert!(journal.load_halt().unwrap().is_none());
}

#[test]
fn test_clear_halt_without_file() {
    let (_dir, journal) = journal();
    assert!(journal.clear_halt().is_ok());
}

#[test]
fn test_journal_error_display_names_path() {
    let (_dir, journal) = journal();
    fs::write(&journal.config().alerts_file, "[").unwrap();

    let error = journal.alerts().unwrap_err();
    assert!(error.to_string().contains("alerts.json"));
}
