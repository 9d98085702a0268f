//! safegate - action-safety gate for autonomous computer-use agents
//!
//! Mediates every simulated input action (mouse/keyboard/shell command)
//! before it reaches the operating system: rate limiting, risk
//! classification, path guarding, sandboxed shell execution, sensitive
//! screen-region detection, and a bounded audit trail. Policy denials are
//! return values, never panics; the gate cannot crash the calling agent.

pub mod audit;
pub mod classifier;
pub mod executor;
pub mod gate;
pub mod path_guard;
pub mod rate_limit;
pub mod screen;

pub use audit::{AuditEntry, AuditLog, AuditSummary, ExportError, RiskCounts};
pub use classifier::{ActionClassifier, RiskLevel};
pub use executor::{extract_paths, SandboxedExecutor, EXIT_ERROR, EXIT_TIMEOUT};
pub use gate::{ActionGate, ConfigError, GateConfig, GateDecision};
pub use path_guard::{default_blocked_dirs, DirectoryGuard, PathBlocked};
pub use rate_limit::RateLimiter;
pub use screen::{region_at, sensitive_regions, ScreenRegion};
