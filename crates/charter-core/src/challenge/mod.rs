//! Challenge workflow engine: adversarial review built on the ledger.
//!
//! A decision's configured challengers interact with it through this
//! engine until it is accepted or escalated. Challenge outcomes are
//! decisions in the same ledger shape; the engine adds authorization,
//! round limits with escalation, counter-proposal lifecycle, and the
//! joined audit trail.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//!
//! use charter_core::challenge::{ChallengeAction, ChallengeEngine, ChallengeOutcome, ChallengePolicy};
//! use charter_core::config::RoleId;
//! use charter_core::ledger::{DecisionLedger, ProposeDecision};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut roles = BTreeMap::new();
//! roles.insert(RoleId::parse("ceo")?, vec![RoleId::parse("cto")?]);
//! roles.insert(RoleId::parse("cto")?, vec![]);
//!
//! let mut ledger = DecisionLedger::in_memory("acme");
//! let mut engine = ChallengeEngine::new(roles, ChallengePolicy::default());
//!
//! let decision = ledger.propose(ProposeDecision {
//!     author: "ceo".into(),
//!     summary: "Restructure the team".into(),
//!     ..ProposeDecision::default()
//! })?;
//! assert!(!engine.can_execute(&decision));
//!
//! let result = engine.process_challenge(
//!     &mut ledger,
//!     &decision.id,
//!     "cto",
//!     ChallengeAction::Accept,
//!     "No objection",
//!     None,
//! )?;
//! assert_eq!(result.outcome, ChallengeOutcome::Accepted);
//! assert!(engine.can_execute(ledger.get(&decision.id).unwrap()));
//! # Ok(())
//! # }
//! ```

mod audit_trail;
mod counter_proposal;
mod engine;
mod error;

#[cfg(test)]
mod tests;

pub use audit_trail::{DecisionTrail, TrailExport, TrailStats};
pub use counter_proposal::{CounterProposal, CounterProposalInput, CounterProposalStatus};
pub use engine::{
    ChallengeAction, ChallengeEngine, ChallengeOutcome, ChallengePolicy, ChallengeResult,
};
pub use error::ChallengeError;
