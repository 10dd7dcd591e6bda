//! Gate verdict and phase state data model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum Verdict {
    /// The gate passed; advancement is permitted.
    Pass,

    /// The gate failed. Final for this attempt: recovery requires a new
    /// verdict for the same gate, never an override of the FAIL itself.
    Fail,

    /// The gate passed with conditions, optionally time-limited.
    Conditional,
}

impl Verdict {
    /// Canonical string form, matching the serialized representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Conditional => "CONDITIONAL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test and coverage metrics attached to a verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TestMetrics {
    /// Tests executed.
    pub tests_run: u32,

    /// Tests passed.
    pub tests_passed: u32,

    /// Line coverage percentage, when measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_percent: Option<f64>,
}

/// A recorded gate verdict. Belongs to exactly one (project, phase) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// The gate this verdict is for.
    pub gate_id: String,

    /// The verdict.
    pub verdict: Verdict,

    /// The role that issued it.
    pub issued_by: String,

    /// When it was issued.
    pub timestamp: DateTime<Utc>,

    /// Test and coverage metrics, when supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TestMetrics>,

    /// Issues that block advancement.
    #[serde(default)]
    pub blocking_issues: Vec<String>,

    /// Non-blocking warnings.
    #[serde(default)]
    pub warnings: Vec<String>,

    /// Conditions carried by a CONDITIONAL verdict.
    #[serde(default)]
    pub conditions: Vec<String>,

    /// Expiry for a CONDITIONAL verdict. An expired CONDITIONAL is a
    /// blocker, never a silent pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// The project the verdict belongs to.
    pub project: String,

    /// The phase the verdict was issued for.
    pub phase: u32,
}

/// Gating status of a project's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PhaseStatus {
    /// Work is underway; no verdict gates the phase yet.
    InProgress,

    /// The most recent verdict passed.
    GatedPass,

    /// The most recent verdict failed.
    GatedFail,

    /// The most recent verdict passed conditionally.
    GatedConditional,
}

impl PhaseStatus {
    /// Canonical string form, matching the serialized representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::GatedPass => "gated_pass",
            Self::GatedFail => "gated_fail",
            Self::GatedConditional => "gated_conditional",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-project phase state. Created lazily on first verdict; never
/// deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct PhaseState {
    /// The project.
    pub project: String,

    /// The current phase number.
    pub current_phase: u32,

    /// Human-readable name of the current phase.
    pub phase_name: String,

    /// Gating status of the current phase.
    pub status: PhaseStatus,

    /// When the state was created.
    pub started_at: DateTime<Utc>,

    /// When the state last changed.
    pub updated_at: DateTime<Utc>,

    /// Ordered verdict history, oldest first. Retained in full across
    /// phase advancement.
    #[serde(default)]
    pub verdict_history: Vec<GateVerdict>,
}
