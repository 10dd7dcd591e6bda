//! Counter-proposal data model.
//!
//! A counter-proposal is a structured alternative attached to one
//! challenge round. Its id is derived from the parent decision and the
//! round that raised it (`CP-DEC-0001-2`), so at most one counter-proposal
//! exists per round.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a counter-proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum CounterProposalStatus {
    /// Awaiting resolution.
    Pending,

    /// Adopted.
    Accepted,

    /// Declined.
    Rejected,

    /// Withdrawn by its proposer.
    Withdrawn,

    /// Overtaken by the parent decision's resolution.
    Superseded,
}

impl CounterProposalStatus {
    /// Canonical string form, matching the serialized representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
            Self::Superseded => "superseded",
        }
    }
}

impl fmt::Display for CounterProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured counter-proposal raised during a challenge round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct CounterProposal {
    /// Derived id: `CP-{decision_id}-{round}`.
    pub id: String,

    /// The decision this counters.
    pub decision_id: String,

    /// The challenge round that raised it.
    pub round: u32,

    /// The challenger that proposed it.
    pub proposed_by: String,

    /// One-line summary of the alternative.
    pub summary: String,

    /// Why the alternative is preferable.
    pub rationale: String,

    /// Anticipated impact items.
    #[serde(default)]
    pub impact: Vec<String>,

    /// Current status. Resolution is only possible from `pending`.
    pub status: CounterProposalStatus,

    /// When the counter-proposal was raised.
    pub created_at: DateTime<Utc>,

    /// When it was resolved, if it has been.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,

    /// Notes recorded at resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
}

/// Structured payload for raising a counter-proposal with a challenge.
#[derive(Debug, Clone, Default)]
pub struct CounterProposalInput {
    /// One-line summary of the alternative.
    pub summary: String,

    /// Why the alternative is preferable.
    pub rationale: String,

    /// Anticipated impact items.
    pub impact: Vec<String>,
}
