//! Challenge workflow engine: adversarial review with round limits.
//!
//! The engine is the only path from a proposed decision to an executable
//! outcome. Every collaborator must consult [`ChallengeEngine::can_execute`]
//! before acting on a decision's outcome; there is no alternate "executed"
//! path.
//!
//! Rounds are 1-indexed. "At the limit" means `challenge_rounds >=
//! max_rounds`: the limit round is the last one permitted before forced
//! escalation. A challenge arriving at the limit escalates immediately
//! without recording a further round; a challenge that reaches the limit
//! escalates in the same call when auto-escalation is enabled.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::counter_proposal::{CounterProposal, CounterProposalInput, CounterProposalStatus};
use super::error::ChallengeError;
use crate::config::RoleId;
use crate::ledger::{DecisionLedger, DecisionRecord, DecisionStatus};

/// Round-limit policy for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengePolicy {
    /// Challenge rounds permitted before forced escalation.
    pub max_rounds: u32,

    /// Whether reaching the limit escalates in the same call.
    pub auto_escalate: bool,
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self {
            max_rounds: crate::config::DEFAULT_MAX_CHALLENGE_ROUNDS,
            auto_escalate: true,
        }
    }
}

/// What a challenger asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChallengeAction {
    /// Accept the decision, closing its review.
    Accept,

    /// Object to the decision, opening (or continuing) review.
    Challenge,
}

/// Terminal outcome of one `process_challenge` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ChallengeOutcome {
    /// The decision was accepted.
    Accepted,

    /// A challenge round was recorded; the author must revise.
    Challenged,

    /// The decision was escalated.
    Escalated,
}

/// Result of one `process_challenge` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ChallengeResult {
    /// The decision acted on.
    pub decision_id: String,

    /// The outcome of this call.
    pub outcome: ChallengeOutcome,

    /// Whether the author is expected to revise and resubmit.
    pub requires_revision: bool,

    /// The counter-proposal materialized by this call, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_proposal_id: Option<String>,

    /// The decision's status after this call.
    pub status: DecisionStatus,
}

/// Adversarial review state machine built on the decision ledger.
///
/// Owns the configured role -> challengers map and the counter-proposal
/// store. The ledger remains the durable record; counter-proposal status
/// here is process-scoped and reconstructable from challenge history.
#[derive(Debug)]
pub struct ChallengeEngine {
    challengers: BTreeMap<RoleId, Vec<RoleId>>,
    policy: ChallengePolicy,
    counter_proposals: BTreeMap<String, CounterProposal>,
}

impl ChallengeEngine {
    /// Creates an engine from a validated role -> challengers map and a
    /// round policy.
    #[must_use]
    pub fn new(challengers: BTreeMap<RoleId, Vec<RoleId>>, policy: ChallengePolicy) -> Self {
        Self {
            challengers,
            policy,
            counter_proposals: BTreeMap::new(),
        }
    }

    /// The engine's round policy.
    #[must_use]
    pub const fn policy(&self) -> ChallengePolicy {
        self.policy
    }

    /// Whether a decision's outcome may be acted on.
    ///
    /// True unconditionally when the author has no configured challenger;
    /// otherwise true iff the decision is accepted or escalated.
    #[must_use]
    pub fn can_execute(&self, decision: &DecisionRecord) -> bool {
        if self.challengers_for(&decision.author).is_empty() {
            return true;
        }
        matches!(
            decision.status,
            DecisionStatus::Accepted | DecisionStatus::Escalated
        )
    }

    /// Processes one challenger action against a decision.
    ///
    /// # Errors
    ///
    /// - [`ChallengeError::NotAuthorized`] when the challenger is outside
    ///   the configured set for the decision's author.
    /// - [`ChallengeError::AlreadyResolved`] when the decision is
    ///   terminal; resolved decisions cannot be reopened.
    /// - [`ChallengeError::Ledger`] for absent ids or persistence
    ///   failures.
    pub fn process_challenge(
        &mut self,
        ledger: &mut DecisionLedger,
        decision_id: &str,
        challenger: &str,
        action: ChallengeAction,
        rationale: &str,
        counter_proposal: Option<CounterProposalInput>,
    ) -> Result<ChallengeResult, ChallengeError> {
        let decision = ledger
            .get(decision_id)
            .ok_or_else(|| ChallengeError::Ledger(crate::ledger::LedgerError::NotFound {
                id: decision_id.to_string(),
            }))?
            .clone();

        if !self
            .challengers_for(&decision.author)
            .iter()
            .any(|c| c.as_str() == challenger)
        {
            return Err(ChallengeError::NotAuthorized {
                challenger: challenger.to_string(),
                author: decision.author,
            });
        }

        if decision.status.is_terminal() {
            return Err(ChallengeError::AlreadyResolved {
                id: decision.id,
                status: decision.status,
            });
        }

        match action {
            ChallengeAction::Accept => {
                let accepted = ledger.accept(decision_id, challenger, rationale)?;
                self.supersede_pending(decision_id, "Decision accepted");
                info!(decision_id, challenger, "decision accepted");
                Ok(ChallengeResult {
                    decision_id: decision_id.to_string(),
                    outcome: ChallengeOutcome::Accepted,
                    requires_revision: false,
                    counter_proposal_id: None,
                    status: accepted.status,
                })
            }
            ChallengeAction::Challenge => {
                self.process_objection(ledger, &decision, challenger, rationale, counter_proposal)
            }
        }
    }

    fn process_objection(
        &mut self,
        ledger: &mut DecisionLedger,
        decision: &DecisionRecord,
        challenger: &str,
        rationale: &str,
        counter_proposal: Option<CounterProposalInput>,
    ) -> Result<ChallengeResult, ChallengeError> {
        // Already at the limit: escalate without recording a further
        // round.
        if decision.challenge_rounds >= self.policy.max_rounds {
            let escalated = ledger.escalate(&decision.id)?;
            self.supersede_pending(&decision.id, "Auto-escalated at round limit");
            warn!(
                decision_id = %decision.id,
                rounds = decision.challenge_rounds,
                "challenge at round limit; escalation forced"
            );
            return Ok(ChallengeResult {
                decision_id: decision.id.clone(),
                outcome: ChallengeOutcome::Escalated,
                requires_revision: false,
                counter_proposal_id: None,
                status: escalated.status,
            });
        }

        let counter_text = counter_proposal.as_ref().map(|c| c.summary.clone());
        let updated = ledger.challenge(&decision.id, challenger, rationale, counter_text)?;

        let counter_proposal_id = counter_proposal.map(|input| {
            let id = format!("CP-{}-{}", decision.id, updated.challenge_rounds);
            self.counter_proposals.insert(
                id.clone(),
                CounterProposal {
                    id: id.clone(),
                    decision_id: decision.id.clone(),
                    round: updated.challenge_rounds,
                    proposed_by: challenger.to_string(),
                    summary: input.summary,
                    rationale: input.rationale,
                    impact: input.impact,
                    status: CounterProposalStatus::Pending,
                    created_at: Utc::now(),
                    resolved_at: None,
                    resolution_notes: None,
                },
            );
            id
        });

        if updated.challenge_rounds >= self.policy.max_rounds && self.policy.auto_escalate {
            let escalated = ledger.escalate(&decision.id)?;
            self.supersede_pending(&decision.id, "Auto-escalated at round limit");
            warn!(
                decision_id = %decision.id,
                rounds = updated.challenge_rounds,
                "round limit reached; auto-escalated"
            );
            return Ok(ChallengeResult {
                decision_id: decision.id.clone(),
                outcome: ChallengeOutcome::Escalated,
                requires_revision: false,
                counter_proposal_id,
                status: escalated.status,
            });
        }

        info!(
            decision_id = %decision.id,
            challenger,
            round = updated.challenge_rounds,
            "challenge recorded"
        );
        Ok(ChallengeResult {
            decision_id: decision.id.clone(),
            outcome: ChallengeOutcome::Challenged,
            requires_revision: true,
            counter_proposal_id,
            status: updated.status,
        })
    }

    /// Resolves a pending counter-proposal.
    ///
    /// # Errors
    ///
    /// - [`ChallengeError::CounterProposalNotFound`] for absent ids.
    /// - [`ChallengeError::InvalidResolution`] when the requested status
    ///   is `pending`.
    /// - [`ChallengeError::CounterProposalAlreadyResolved`] unless the
    ///   current status is `pending`.
    pub fn resolve_counter_proposal(
        &mut self,
        id: &str,
        status: CounterProposalStatus,
        notes: Option<String>,
    ) -> Result<CounterProposal, ChallengeError> {
        if status == CounterProposalStatus::Pending {
            return Err(ChallengeError::InvalidResolution {
                reason: "resolution status must be terminal, not pending".to_string(),
            });
        }
        let proposal = self.counter_proposals.get_mut(id).ok_or_else(|| {
            ChallengeError::CounterProposalNotFound { id: id.to_string() }
        })?;
        if proposal.status != CounterProposalStatus::Pending {
            return Err(ChallengeError::CounterProposalAlreadyResolved {
                id: id.to_string(),
                status: proposal.status,
            });
        }
        proposal.status = status;
        proposal.resolved_at = Some(Utc::now());
        proposal.resolution_notes = notes;
        Ok(proposal.clone())
    }

    /// Looks up a counter-proposal by id.
    #[must_use]
    pub fn counter_proposal(&self, id: &str) -> Option<&CounterProposal> {
        self.counter_proposals.get(id)
    }

    /// Returns all counter-proposals for one decision, in round order.
    #[must_use]
    pub fn counter_proposals_for(&self, decision_id: &str) -> Vec<CounterProposal> {
        let mut proposals: Vec<CounterProposal> = self
            .counter_proposals
            .values()
            .filter(|cp| cp.decision_id == decision_id)
            .cloned()
            .collect();
        proposals.sort_by_key(|cp| cp.round);
        proposals
    }

    fn challengers_for(&self, author: &str) -> &[RoleId] {
        self.challengers
            .iter()
            .find(|(role, _)| role.as_str() == author)
            .map_or(&[], |(_, challengers)| challengers.as_slice())
    }

    /// Supersedes every pending counter-proposal on a decision, recording
    /// the given note.
    fn supersede_pending(&mut self, decision_id: &str, note: &str) {
        let now = Utc::now();
        for proposal in self.counter_proposals.values_mut() {
            if proposal.decision_id == decision_id
                && proposal.status == CounterProposalStatus::Pending
            {
                proposal.status = CounterProposalStatus::Superseded;
                proposal.resolved_at = Some(now);
                proposal.resolution_notes = Some(note.to_string());
            }
        }
    }
}
