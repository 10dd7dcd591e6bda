//! Access control layer: path-based write permission checks with audit
//! logging.
//!
//! The controller decides whether a role may write to a path. Checks never
//! fail: denials are values carrying a structured reason, and every check,
//! allowed or denied, appends exactly one [`AuditLogEntry`].
//!
//! # Check order
//!
//! 1. Resolve the path lexically against the project root; a path that
//!    would escape the root is denied as `out_of_scope`.
//! 2. Test the relative path against the protected-asset patterns. Any
//!    match denies unconditionally as `governance_asset`; this overrides
//!    any scope the caller supplies, with no bypass.
//! 3. If the caller supplied an allow-list scope, require a match against
//!    at least one scope pattern; on failure the denial carries a
//!    "nearest allowed" hint.
//! 4. Otherwise allow.
//!
//! The controller owns its audit log; construct one instance per project
//! to keep audit streams isolated.

mod audit;
mod pattern;


use std::fmt;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use audit::{AuditFilter, AuditLogEntry, AuditSummary, TargetedAsset};
pub use pattern::matches as pattern_matches;

/// Classification of a denied write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ViolationType {
    /// The path is a protected governance asset; no role may write it.
    GovernanceAsset,

    /// The path escapes the project root or falls outside the caller's
    /// scope.
    OutOfScope,

    /// The path belongs to another team's area.
    CrossTeam,
}

impl ViolationType {
    /// Canonical string form, matching the serialized representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GovernanceAsset => "governance_asset",
            Self::OutOfScope => "out_of_scope",
            Self::CrossTeam => "cross_team",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a write-access check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct AccessDecision {
    /// Whether the write is allowed.
    pub allowed: bool,

    /// Structured reason; populated for allowed and denied checks alike.
    pub reason: String,

    /// The violation class when denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation_type: Option<ViolationType>,

    /// The protected pattern that matched, for governance-asset denials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,

    /// The nearest allowed pattern, for out-of-scope denials with a
    /// supplied scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_allowed: Option<String>,
}

/// Remediation-oriented report for a denied write.
///
/// This is the canonical shape an external session/runtime orchestrator
/// translates into its own enforcement primitive. The kernel computes the
/// verdict but never enforces filesystem permissions itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct ViolationReport {
    /// The role that attempted the write.
    pub role: String,

    /// The path as supplied by the caller.
    pub path: String,

    /// The violation class.
    pub violation_type: ViolationType,

    /// Structured reason string.
    pub reason: String,

    /// The protected pattern that matched, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,

    /// The nearest allowed pattern, if a scope was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_allowed: Option<String>,
}

/// Result of batch-validating one path against the protected-asset
/// patterns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct PathValidation {
    /// The path as supplied.
    pub path: String,

    /// Whether the path is a protected governance asset.
    pub protected: bool,

    /// The pattern that matched, when protected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
}

/// Path-based write permission checker with an owned audit log.
#[derive(Debug)]
pub struct AccessController {
    project_root: PathBuf,
    protected_patterns: Vec<String>,
    audit_log: Vec<AuditLogEntry>,
}

impl AccessController {
    /// Creates a controller for one project root with the given
    /// protected-asset patterns.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>, protected_patterns: Vec<String>) -> Self {
        Self {
            project_root: project_root.into(),
            protected_patterns,
            audit_log: Vec::new(),
        }
    }

    /// Checks whether `role` may write `path`, optionally restricted to
    /// the `allowed_paths` scope.
    ///
    /// A protected-asset match denies regardless of scope. Every call
    /// appends exactly one audit entry.
    pub fn check_write_access(
        &mut self,
        role: &str,
        path: &str,
        allowed_paths: Option<&[String]>,
    ) -> AccessDecision {
        let decision = self.evaluate(role, path, allowed_paths);
        self.audit_log.push(AuditLogEntry {
            timestamp: Utc::now(),
            agent_role: role.to_string(),
            target_path: path.to_string(),
            allowed: decision.allowed,
            violation_type: decision.violation_type,
            reason: decision.reason.clone(),
            matched_pattern: decision.matched_pattern.clone(),
            agent_scope: allowed_paths.map(<[String]>::to_vec),
        });
        if decision.allowed {
            debug!(role, path, "write access allowed");
        } else {
            warn!(
                role,
                path,
                violation = decision.violation_type.map(ViolationType::as_str),
                "write access denied"
            );
        }
        decision
    }

    fn evaluate(&self, role: &str, path: &str, allowed_paths: Option<&[String]>) -> AccessDecision {
        let Some(relative) = self.resolve_relative(path) else {
            return AccessDecision {
                allowed: false,
                reason: format!(
                    "path {path:?} resolves outside the project root {}",
                    self.project_root.display()
                ),
                violation_type: Some(ViolationType::OutOfScope),
                matched_pattern: None,
                nearest_allowed: None,
            };
        };

        // Protected-asset patterns override any supplied scope.
        if let Some(matched) = self.match_protected(&relative) {
            return AccessDecision {
                allowed: false,
                reason: format!("{relative} is a protected governance asset (pattern {matched})"),
                violation_type: Some(ViolationType::GovernanceAsset),
                matched_pattern: Some(matched.to_string()),
                nearest_allowed: None,
            };
        }

        if let Some(scope) = allowed_paths {
            if !scope.iter().any(|p| pattern::matches(p, &relative)) {
                let nearest = pattern::nearest_allowed(scope, &relative).map(str::to_string);
                return AccessDecision {
                    allowed: false,
                    reason: format!("{relative} is outside the scope granted to {role}"),
                    violation_type: Some(ViolationType::OutOfScope),
                    matched_pattern: None,
                    nearest_allowed: nearest,
                };
            }
        }

        AccessDecision {
            allowed: true,
            reason: format!("{relative} is writable by {role}"),
            violation_type: None,
            matched_pattern: None,
            nearest_allowed: None,
        }
    }

    /// Checks one write and wraps any denial into a [`ViolationReport`].
    ///
    /// # Errors
    ///
    /// Returns the report describing the violation when the write is
    /// denied; the report is a value, not a fault.
    pub fn enforce_file_access(
        &mut self,
        role: &str,
        path: &str,
        allowed_paths: Option<&[String]>,
    ) -> Result<(), ViolationReport> {
        let decision = self.check_write_access(role, path, allowed_paths);
        if decision.allowed {
            return Ok(());
        }
        Err(ViolationReport {
            role: role.to_string(),
            path: path.to_string(),
            // Denied decisions always carry a violation type.
            violation_type: decision.violation_type.unwrap_or(ViolationType::OutOfScope),
            reason: decision.reason,
            matched_pattern: decision.matched_pattern,
            nearest_allowed: decision.nearest_allowed,
        })
    }

    /// Batch-checks paths against the protected-asset patterns only.
    ///
    /// No scope is consulted and no audit entries are written; this is a
    /// pure pre-submission validation (e.g., over a changeset's file
    /// list).
    #[must_use]
    pub fn validate_paths(&self, paths: &[String]) -> Vec<PathValidation> {
        paths
            .iter()
            .map(|path| {
                let matched = self
                    .resolve_relative(path)
                    .and_then(|relative| self.match_protected(&relative).map(str::to_string));
                PathValidation {
                    path: path.clone(),
                    protected: matched.is_some(),
                    matched_pattern: matched,
                }
            })
            .collect()
    }

    /// Queries the audit log with conjunctive filters, newest first.
    #[must_use]
    pub fn query_audit_log(&self, filter: &AuditFilter) -> Vec<AuditLogEntry> {
        let cap = filter.limit.unwrap_or(usize::MAX);
        self.audit_log
            .iter()
            .rev()
            .filter(|entry| filter.matches(entry))
            .take(cap)
            .cloned()
            .collect()
    }

    /// Aggregates denial counts by type and agent and ranks the most
    /// targeted protected paths.
    #[must_use]
    pub fn audit_summary(&self) -> AuditSummary {
        audit::summarize(&self.audit_log)
    }

    /// Exports the full audit log as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the log cannot be encoded.
    pub fn export_audit_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.audit_log)
    }

    /// Clears the audit log. Collaborators call this after exporting.
    pub fn clear_audit_log(&mut self) {
        self.audit_log.clear();
    }

    /// Number of entries currently in the audit log.
    #[must_use]
    pub fn audit_len(&self) -> usize {
        self.audit_log.len()
    }

    fn match_protected(&self, relative: &str) -> Option<&str> {
        self.protected_patterns
            .iter()
            .find(|p| pattern::matches(p, relative))
            .map(String::as_str)
    }

    /// Resolves `path` to a normalized `/`-separated path relative to the
    /// project root, purely lexically. Returns `None` when the path would
    /// escape the root.
    fn resolve_relative(&self, path: &str) -> Option<String> {
        let candidate = Path::new(path);
        let under_root = if candidate.is_absolute() {
            candidate.strip_prefix(&self.project_root).ok()?
        } else {
            candidate
        };

        let mut segments: Vec<String> = Vec::new();
        for component in under_root.components() {
            match component {
                Component::Normal(segment) => {
                    segments.push(segment.to_string_lossy().into_owned());
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    // Popping past the root means the path escapes it.
                    segments.pop()?;
                }
                Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(segments.join("/"))
    }
}
