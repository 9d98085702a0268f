//! Action gate - composition point of the safety pipeline
//!
//! For each incoming action: rate limiter, then risk classifier, then the
//! directory guard for filesystem-touching parameters, then the audit log.
//! The first denial short-circuits the pipeline; audit recording never
//! influences the decision.

use crate::audit::{AuditLog, AuditSummary, ExportError};
use crate::classifier::{ActionClassifier, RiskLevel};
use crate::executor::SandboxedExecutor;
use crate::path_guard::{default_blocked_dirs, DirectoryGuard};
use crate::rate_limit::RateLimiter;
use crate::screen;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Gate configuration, constructed explicitly and persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub max_actions_per_second: usize,
    pub max_audit_entries: usize,
    pub blocked_dirs: Vec<String>,
    pub allowed_dirs: Vec<String>,
    pub command_timeout_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_actions_per_second: 10,
            max_audit_entries: 1000,
            blocked_dirs: default_blocked_dirs(),
            allowed_dirs: Vec::new(),
            command_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to serialize gate config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write gate config: {0}")]
    Io(#[from] std::io::Error),
}

impl GateConfig {
    /// Load config from a JSON file, falling back to defaults when the file
    /// is missing or malformed.
    pub fn load(path: &Path) -> Self {
        if let Ok(contents) = std::fs::read_to_string(path) {
            if let Ok(config) = serde_json::from_str(&contents) {
                return config;
            }
            tracing::warn!(path = %path.display(), "malformed gate config, using defaults");
        }
        Self::default()
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        tracing::debug!(path = %path.display(), "saved gate config");
        Ok(())
    }
}

/// Outcome of the per-action pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Action may proceed; yellow means the caller must confirm first
    Allowed { risk: RiskLevel },
    Denied { reason: String },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed { .. })
    }
}

/// The gate itself: one instance per agent session.
pub struct ActionGate {
    limiter: RateLimiter,
    classifier: ActionClassifier,
    guard: Arc<DirectoryGuard>,
    executor: SandboxedExecutor,
    audit: AuditLog,
}

impl Default for ActionGate {
    fn default() -> Self {
        Self::with_config(GateConfig::default())
    }
}

impl ActionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GateConfig) -> Self {
        let guard = Arc::new(DirectoryGuard::new(config.blocked_dirs, config.allowed_dirs));
        Self {
            limiter: RateLimiter::new(config.max_actions_per_second),
            classifier: ActionClassifier::new(),
            executor: SandboxedExecutor::with_guard(Arc::clone(&guard)),
            guard,
            audit: AuditLog::new(config.max_audit_entries),
        }
    }

    /// Run the full decision pipeline for one action and record the outcome.
    pub fn process(
        &self,
        action: &str,
        params: serde_json::Map<String, Value>,
    ) -> GateDecision {
        if !self.limiter.admit() {
            let reason = "rate limit exceeded".to_string();
            self.audit
                .record(action, params, "denied: rate limit exceeded", RiskLevel::Yellow);
            return GateDecision::Denied { reason };
        }

        let risk = self.classifier.classify(action, &params);
        if risk.is_high_risk() {
            self.audit
                .record(action, params, "denied: high-risk action", risk);
            return GateDecision::Denied {
                reason: "action classified as high risk".to_string(),
            };
        }

        if let Some(path) = params.get("path").and_then(|v| v.as_str()) {
            if let Err(blocked) = self.guard.check(path) {
                let result = format!("denied: {}", blocked);
                self.audit.record(action, params, &result, risk);
                return GateDecision::Denied {
                    reason: blocked.reason,
                };
            }
        }

        let result = match risk {
            RiskLevel::Yellow => "allowed: pending confirmation",
            _ => "allowed",
        };
        self.audit.record(action, params, result, risk);
        GateDecision::Allowed { risk }
    }

    // Flat gate API, consumed by the agent loop piecewise

    pub fn admit(&self) -> bool {
        self.limiter.admit()
    }

    pub fn classify(&self, action: &str, params: &serde_json::Map<String, Value>) -> RiskLevel {
        self.classifier.classify(action, params)
    }

    /// Denial reason for a path, or `None` when it may be touched
    pub fn guard_path(&self, path: &str) -> Option<String> {
        self.guard.check(path).err().map(|blocked| blocked.reason)
    }

    pub async fn run_sandboxed(
        &self,
        command: &str,
        cwd: &Path,
        timeout_secs: u64,
    ) -> (String, i32) {
        self.executor.run(command, cwd, timeout_secs).await
    }

    pub fn record(
        &self,
        action: &str,
        params: serde_json::Map<String, Value>,
        result: &str,
        risk: RiskLevel,
    ) {
        self.audit.record(action, params, result, risk);
    }

    pub fn region_at(&self, x: i32, y: i32, width: i32, height: i32) -> Option<&'static str> {
        screen::region_at(x, y, width, height)
    }

    pub fn summary(&self) -> AuditSummary {
        self.audit.summary()
    }

    pub fn export_audit(&self, path: Option<&Path>) -> Result<String, ExportError> {
        self.audit.export(path)
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Clear the rate window (session restart)
    pub fn reset_rate_limit(&self) {
        self.limiter.reset();
    }
}
