//! Decision record data model.
//!
//! A [`DecisionRecord`] is immutable once assigned: it is never deleted,
//! only transitioned through [`DecisionStatus`] or superseded by a newer
//! record that declares a `supersedes` link back to it. Decisions form a
//! DAG: `supersedes` links walk backward through revisions, `dependencies`
//! declare one-hop prerequisites.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DecisionStatus {
    /// Recorded, awaiting challenger review.
    Proposed,

    /// At least one challenge round is open against it.
    Challenged,

    /// Resolved in favor; may be executed.
    Accepted,

    /// Handed off after the round limit; terminal, may be executed.
    Escalated,

    /// Replaced by a newer decision; terminal.
    Superseded,

    /// Resolved against; terminal.
    Rejected,
}

impl DecisionStatus {
    /// Canonical string form, matching the serialized representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Challenged => "challenged",
            Self::Accepted => "accepted",
            Self::Escalated => "escalated",
            Self::Superseded => "superseded",
            Self::Rejected => "rejected",
        }
    }

    /// Whether the status is terminal: no further challenge rounds may be
    /// processed against a decision in this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::Escalated | Self::Superseded | Self::Rejected
        )
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The action a challenger took in one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum RoundAction {
    /// The round objected to the decision.
    Challenged,

    /// The round accepted the decision.
    Accepted,

    /// The round rejected the decision.
    Rejected,

    /// The round escalated the decision.
    Escalated,
}

impl RoundAction {
    /// Canonical string form, matching the serialized representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Challenged => "challenged",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Escalated => "escalated",
        }
    }
}

impl fmt::Display for RoundAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a decision's ordered challenge history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct ChallengeRound {
    /// 1-indexed round number.
    pub round: u32,

    /// The role that acted.
    pub challenger: String,

    /// What the round did.
    pub action: RoundAction,

    /// The challenger's rationale.
    pub rationale: String,

    /// Free-text counter-proposal carried with the round, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_proposal: Option<String>,

    /// When the round was recorded.
    pub timestamp: DateTime<Utc>,
}

/// An append-only decision record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct DecisionRecord {
    /// Strictly increasing id, e.g. `DEC-0001`. Immutable once assigned.
    pub id: String,

    /// The role that proposed the decision.
    pub author: String,

    /// Decision type label (e.g. `strategic`, `technical`).
    pub decision_type: String,

    /// One-line summary.
    pub summary: String,

    /// Why the decision was proposed.
    pub rationale: String,

    /// Supporting evidence references.
    #[serde(default)]
    pub evidence: Vec<String>,

    /// The project this decision belongs to.
    pub project: String,

    /// The project phase the decision was proposed in.
    pub phase: u32,

    /// Current lifecycle status.
    pub status: DecisionStatus,

    /// Number of challenge rounds recorded. Monotonic non-decreasing.
    pub challenge_rounds: u32,

    /// Roles that have challenged this decision, in first-seen order.
    #[serde(default)]
    pub challenged_by: Vec<String>,

    /// Ordered challenge history.
    #[serde(default)]
    pub challenge_history: Vec<ChallengeRound>,

    /// Backward supersession link declared at creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,

    /// Forward supersession links, maintained by the ledger. May branch.
    #[serde(default)]
    pub superseded_by: Vec<String>,

    /// One-hop declared dependencies on earlier decisions.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// When the decision was proposed.
    pub created_at: DateTime<Utc>,

    /// When the decision last transitioned.
    pub updated_at: DateTime<Utc>,
}

/// Input for proposing a new decision. The ledger assigns the id, the
/// project, the status, and the timestamps.
#[derive(Debug, Clone, Default)]
pub struct ProposeDecision {
    /// The proposing role.
    pub author: String,

    /// Decision type label.
    pub decision_type: String,

    /// One-line summary.
    pub summary: String,

    /// Why the decision is proposed.
    pub rationale: String,

    /// Supporting evidence references.
    pub evidence: Vec<String>,

    /// The project phase the decision is proposed in.
    pub phase: u32,

    /// Id of the decision this one supersedes, if any.
    pub supersedes: Option<String>,

    /// One-hop dependencies on existing decisions.
    pub dependencies: Vec<String>,
}
