//! Challenge audit trail: joined review history with aggregate statistics.
//!
//! The trail joins each ever-challenged decision with its full challenge
//! history and counter-proposals, computing resolution latency (first
//! proposal to last challenge event) for resolved decisions. Exports are
//! whole serialized data objects; collaborators never reach into the
//! engine's internal stores.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::counter_proposal::CounterProposal;
use super::engine::ChallengeEngine;
use super::error::ChallengeError;
use crate::ledger::{DecisionFilter, DecisionLedger, DecisionRecord};

/// One decision's joined review history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct DecisionTrail {
    /// The decision, including its ordered challenge history.
    pub decision: DecisionRecord,

    /// Counter-proposals raised against it, in round order.
    pub counter_proposals: Vec<CounterProposal>,

    /// Seconds from proposal to the last challenge event, for resolved
    /// decisions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_latency_secs: Option<i64>,
}

/// Aggregate statistics over a trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrailStats {
    /// Number of challenged decisions in the trail.
    pub decisions: usize,

    /// How many of them escalated.
    pub escalated: usize,

    /// Escalated fraction of the trail, 0.0 when empty.
    pub escalation_rate: f64,

    /// Mean challenge rounds per decision, 0.0 when empty.
    pub average_rounds: f64,

    /// Total counter-proposals raised.
    pub counter_proposals: usize,
}

/// A trail plus its statistics, the JSON export shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrailExport {
    /// Joined per-decision trails.
    pub trails: Vec<DecisionTrail>,

    /// Aggregate statistics.
    pub stats: TrailStats,
}

impl ChallengeEngine {
    /// Joins each ever-challenged decision matching `filter` with its
    /// history and counter-proposals.
    #[must_use]
    pub fn audit_trail(
        &self,
        ledger: &DecisionLedger,
        filter: Option<&DecisionFilter>,
    ) -> Vec<DecisionTrail> {
        let mut filter = filter.cloned().unwrap_or_default();
        // The trail covers challenged decisions only.
        filter.challenged = Some(true);
        ledger
            .query(&filter)
            .into_iter()
            .map(|decision| {
                let counter_proposals = self.counter_proposals_for(&decision.id);
                let resolution_latency_secs = resolution_latency(&decision);
                DecisionTrail {
                    decision,
                    counter_proposals,
                    resolution_latency_secs,
                }
            })
            .collect()
    }

    /// Computes aggregate statistics over a trail.
    #[must_use]
    pub fn trail_stats(trails: &[DecisionTrail]) -> TrailStats {
        let decisions = trails.len();
        let escalated = trails
            .iter()
            .filter(|t| t.decision.status == crate::ledger::DecisionStatus::Escalated)
            .count();
        let total_rounds: u64 = trails
            .iter()
            .map(|t| u64::from(t.decision.challenge_rounds))
            .sum();
        let counter_proposals = trails.iter().map(|t| t.counter_proposals.len()).sum();
        #[allow(clippy::cast_precision_loss)]
        let (escalation_rate, average_rounds) = if decisions == 0 {
            (0.0, 0.0)
        } else {
            (
                escalated as f64 / decisions as f64,
                total_rounds as f64 / decisions as f64,
            )
        };
        TrailStats {
            decisions,
            escalated,
            escalation_rate,
            average_rounds,
            counter_proposals,
        }
    }

    /// Renders the trail as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::Serialization`] if encoding fails.
    pub fn export_trail_json(
        &self,
        ledger: &DecisionLedger,
        filter: Option<&DecisionFilter>,
    ) -> Result<String, ChallengeError> {
        let trails = self.audit_trail(ledger, filter);
        let stats = Self::trail_stats(&trails);
        serde_json::to_string_pretty(&TrailExport { trails, stats }).map_err(|e| {
            ChallengeError::Serialization {
                detail: format!("cannot serialize challenge trail: {e}"),
            }
        })
    }

    /// Renders the trail as Markdown: round-by-round narrative per
    /// decision plus aggregate statistics.
    #[must_use]
    pub fn export_trail_markdown(
        &self,
        ledger: &DecisionLedger,
        filter: Option<&DecisionFilter>,
    ) -> String {
        let trails = self.audit_trail(ledger, filter);
        let stats = Self::trail_stats(&trails);

        let mut out = String::new();
        let _ = writeln!(out, "# Challenge Audit Trail: {}", ledger.project());
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} challenged decision(s), {} escalated ({:.0}%), {:.1} round(s) on average, \
             {} counter-proposal(s)",
            stats.decisions,
            stats.escalated,
            stats.escalation_rate * 100.0,
            stats.average_rounds,
            stats.counter_proposals
        );

        for trail in &trails {
            let decision = &trail.decision;
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "## {}: {} (status: {})",
                decision.id, decision.summary, decision.status
            );
            for round in &decision.challenge_history {
                let _ = writeln!(
                    out,
                    "- Round {}: **{}** by {}: {}",
                    round.round, round.action, round.challenger, round.rationale
                );
            }
            for proposal in &trail.counter_proposals {
                let _ = writeln!(
                    out,
                    "- Counter-proposal {} ({}): {}",
                    proposal.id, proposal.status, proposal.summary
                );
            }
            if let Some(latency) = trail.resolution_latency_secs {
                let _ = writeln!(out, "- Resolved in {latency}s");
            }
        }
        out
    }
}

/// Seconds from proposal to the last challenge event, when resolved.
fn resolution_latency(decision: &DecisionRecord) -> Option<i64> {
    if !decision.status.is_terminal() {
        return None;
    }
    let last = decision.challenge_history.last()?;
    Some((last.timestamp - decision.created_at).num_seconds())
}
