//! Bounded audit log for gate decisions
//!
//! Every allowed or blocked action lands here as an immutable entry. The log
//! is capacity-bounded with batch eviction, summarizable, and exportable as
//! JSON. Recording never fails; only export surfaces I/O errors, since a
//! failed export has no safe default.

use crate::classifier::RiskLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

const TOP_ACTIONS: usize = 5;

/// One decided/executed action, never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Wall-clock epoch seconds
    pub timestamp: f64,
    pub action: String,
    pub params: serde_json::Map<String, Value>,
    pub result: String,
    pub risk_level: RiskLevel,
}

/// Per-tier tallies for `AuditLog::summary`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskCounts {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    pub session_id: String,
    pub total_actions: usize,
    pub duration_seconds: f64,
    pub risk_counts: RiskCounts,
    /// Five most frequent action names; ties keep first-encountered order
    pub top_actions: Vec<(String, usize)>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize audit log: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write audit log: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    session_id: &'a str,
    start_time: f64,
    entry_count: usize,
    entries: &'a [AuditEntry],
}

/// Session-scoped, internally synchronized audit log.
pub struct AuditLog {
    session_id: String,
    started_at: DateTime<Utc>,
    max_entries: usize,
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            max_entries,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append an entry, evicting the oldest 10% in one batch when full.
    /// Never returns an error: a decision must not depend on logging.
    pub fn record(
        &self,
        action: &str,
        params: serde_json::Map<String, Value>,
        result: &str,
        risk_level: RiskLevel,
    ) {
        let entry = AuditEntry {
            timestamp: epoch_seconds(Utc::now()),
            action: action.to_string(),
            params,
            result: result.to_string(),
            risk_level,
        };

        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= self.max_entries {
            // Integer division: capacities below 10 evict nothing
            let evict = self.max_entries / 10;
            let evict = evict.min(entries.len());
            entries.drain(0..evict);
        }
        entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of current entries, newest last
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn summary(&self) -> AuditSummary {
        let entries = self.entries.lock().unwrap();

        let mut risk_counts = RiskCounts::default();
        let mut tally: Vec<(String, usize)> = Vec::new();
        for entry in entries.iter() {
            match entry.risk_level {
                RiskLevel::Green => risk_counts.green += 1,
                RiskLevel::Yellow => risk_counts.yellow += 1,
                RiskLevel::Red => risk_counts.red += 1,
            }
            match tally.iter_mut().find(|(name, _)| name == &entry.action) {
                Some((_, count)) => *count += 1,
                None => tally.push((entry.action.clone(), 1)),
            }
        }
        // Stable sort keeps first-encountered order among equal counts
        tally.sort_by(|a, b| b.1.cmp(&a.1));
        tally.truncate(TOP_ACTIONS);

        AuditSummary {
            session_id: self.session_id.clone(),
            total_actions: entries.len(),
            duration_seconds: (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0,
            risk_counts,
            top_actions: tally,
        }
    }

    /// Serialize the log as pretty JSON, optionally writing it to `path`
    /// (parent directories are created). The in-memory log is untouched.
    pub fn export(&self, path: Option<&Path>) -> Result<String, ExportError> {
        let entries = self.entries.lock().unwrap();
        let document = ExportDocument {
            session_id: &self.session_id,
            start_time: epoch_seconds(self.started_at),
            entry_count: entries.len(),
            entries: entries.as_slice(),
        };
        let json = serde_json::to_string_pretty(&document)?;
        drop(entries);

        if let Some(path) = path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            tracing::debug!(path = %path.display(), "audit log exported");
        }
        Ok(json)
    }
}

fn epoch_seconds(t: DateTime<Utc>) -> f64 {
    t.timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn click_params(x: i64, y: i64) -> serde_json::Map<String, Value> {
        [("x".to_string(), json!(x)), ("y".to_string(), json!(y))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_batch_eviction_at_capacity() {
        let log = AuditLog::new(10);
        for i in 0..11 {
            log.record(&format!("action_{}", i), Default::default(), "allowed", RiskLevel::Green);
        }
        assert!(log.len() <= 10);
        let actions: Vec<String> = log.entries().into_iter().map(|e| e.action).collect();
        assert!(!actions.contains(&"action_0".to_string()));
        assert!(actions.contains(&"action_10".to_string()));
    }

    #[test]
    fn test_eviction_is_batched_not_per_entry() {
        let log = AuditLog::new(20);
        for i in 0..21 {
            log.record(&format!("a{}", i), Default::default(), "allowed", RiskLevel::Green);
        }
        // 21st record evicted 2 (20/10) before appending
        assert_eq!(log.len(), 19);
    }

    #[test]
    fn test_summary_counts_and_top_actions() {
        let log = AuditLog::new(100);
        for _ in 0..3 {
            log.record("click", click_params(1, 1), "allowed", RiskLevel::Yellow);
        }
        log.record("screenshot", Default::default(), "allowed", RiskLevel::Green);
        log.record("type", Default::default(), "blocked", RiskLevel::Red);

        let summary = log.summary();
        assert_eq!(summary.total_actions, 5);
        assert_eq!(
            summary.risk_counts,
            RiskCounts { green: 1, yellow: 3, red: 1 }
        );
        assert_eq!(summary.top_actions[0], ("click".to_string(), 3));
        // Tie between screenshot and type broken by first-encountered order
        assert_eq!(summary.top_actions[1].0, "screenshot");
        assert_eq!(summary.top_actions[2].0, "type");
        assert!(summary.duration_seconds >= 0.0);
    }

    #[test]
    fn test_export_round_trips() {
        let log = AuditLog::new(50);
        log.record("click", click_params(10, 20), "allowed", RiskLevel::Yellow);
        log.record("key", Default::default(), "blocked", RiskLevel::Red);

        let json = log.export(None).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["entry_count"], json!(2));
        assert_eq!(parsed["entries"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["session_id"], json!(log.session_id()));
        assert_eq!(parsed["entries"][0]["action"], json!("click"));
        assert_eq!(parsed["entries"][0]["params"]["x"], json!(10));
        assert_eq!(parsed["entries"][1]["risk_level"], json!("red"));
        assert!(parsed["start_time"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_export_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("audit.json");

        let log = AuditLog::new(10);
        log.record("wait", Default::default(), "allowed", RiskLevel::Green);
        log.export(Some(&target)).unwrap();

        let written = std::fs::read_to_string(&target).unwrap();
        let parsed: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["entry_count"], json!(1));
        // Export must not mutate the live log
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_entries_are_immutable_snapshots() {
        let log = AuditLog::new(10);
        log.record("click", Default::default(), "allowed", RiskLevel::Yellow);
        let mut snapshot = log.entries();
        snapshot[0].result = "tampered".to_string();
        assert_eq!(log.entries()[0].result, "allowed");
    }
}
