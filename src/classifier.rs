//! Heuristic risk classification for agent actions
//!
//! Maps an (action type, parameters) pair to a risk tier. Keyword and regex
//! based only; anything the rules do not recognize falls back to yellow so an
//! unknown action always needs confirmation before it runs.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Risk tier for actions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Safe, auto-allowed (e.g. screenshots)
    Green,
    /// Requires confirmation before execution
    Yellow,
    /// Blocked/high-risk
    Red,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Green => "green",
            RiskLevel::Yellow => "yellow",
            RiskLevel::Red => "red",
        }
    }

    /// Determine if this tier blocks execution outright
    pub fn is_high_risk(&self) -> bool {
        matches!(self, RiskLevel::Red)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static! {
    static ref DANGEROUS_COMMAND_PATTERNS: Vec<Regex> = vec![
        // Recursive force-delete
        Regex::new(r"(?i)rm\s+-[a-z]*r[a-z]*f").unwrap(),
        Regex::new(r"(?i)rm\s+-[a-z]*f[a-z]*r").unwrap(),
        // Disk format
        Regex::new(r"(?i)mkfs").unwrap(),
        Regex::new(r"(?i)format\s+[a-z]:").unwrap(),
        // Windows silent/quiet delete
        Regex::new(r"(?i)del\s+/[fqs]").unwrap(),
        // Power state
        Regex::new(r"(?i)\bshutdown\b").unwrap(),
        Regex::new(r"(?i)\breboot\b").unwrap(),
    ];
}

/// Key shortcuts that must never be injected (case-folded, spaces removed)
fn default_dangerous_shortcuts() -> HashSet<String> {
    ["alt+f4", "ctrl+alt+delete", "ctrl+alt+del", "win+l", "win+r"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Stateless classifier mapping actions to risk tiers.
///
/// Rule sets are injected at construction rather than read from globals, so a
/// gate instance can be tested with a custom vocabulary.
pub struct ActionClassifier {
    dangerous_shortcuts: HashSet<String>,
    dangerous_commands: Vec<Regex>,
}

impl Default for ActionClassifier {
    fn default() -> Self {
        Self {
            dangerous_shortcuts: default_dangerous_shortcuts(),
            dangerous_commands: DANGEROUS_COMMAND_PATTERNS.clone(),
        }
    }
}

impl ActionClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add extra shortcut combos to the red set (normalized like queries)
    pub fn with_shortcuts(mut self, shortcuts: impl IntoIterator<Item = String>) -> Self {
        self.dangerous_shortcuts
            .extend(shortcuts.into_iter().map(|s| normalize_shortcut(&s)));
        self
    }

    /// Add extra dangerous-command patterns to the red set
    pub fn with_command_patterns(mut self, patterns: impl IntoIterator<Item = Regex>) -> Self {
        self.dangerous_commands.extend(patterns);
        self
    }

    /// Classify an action. Pure and total: never fails, never suspends.
    pub fn classify(&self, action_type: &str, params: &serde_json::Map<String, Value>) -> RiskLevel {
        match action_type {
            "screenshot" | "wait" => RiskLevel::Green,
            "key" => {
                let text = text_param(params);
                if self.dangerous_shortcuts.contains(&normalize_shortcut(text)) {
                    RiskLevel::Red
                } else {
                    RiskLevel::Yellow
                }
            }
            "type" => {
                let text = text_param(params);
                if self.dangerous_commands.iter().any(|re| re.is_match(text)) {
                    RiskLevel::Red
                } else {
                    RiskLevel::Yellow
                }
            }
            _ => RiskLevel::Yellow,
        }
    }
}

fn text_param(params: &serde_json::Map<String, Value>) -> &str {
    params.get("text").and_then(|v| v.as_str()).unwrap_or("")
}

fn normalize_shortcut(text: &str) -> String {
    text.to_lowercase().replace(' ', "")
}
