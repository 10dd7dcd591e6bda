//! Charter governance kernel.
//!
//! This crate enforces structural governance over a committee of autonomous
//! and human-in-the-loop roles executing a long-running project. Decisions
//! are recorded, adversarially reviewed, and bound by phase gates before
//! work may proceed, and governance assets stay unmodifiable regardless of
//! which role is acting.
//!
//! # Architecture
//!
//! The kernel is four tightly coupled components, leaves first:
//!
//! - [`access`]: decides whether a role may write to a path and keeps an
//!   append-only audit log of every check.
//! - [`ledger`]: append-only store of decision records with lineage
//!   indices, query, and export.
//! - [`challenge`]: adversarial review state machine built on the ledger,
//!   with round limits and escalation.
//! - [`gate`]: per-project phase state machine consuming recorded
//!   verdicts.
//!
//! Control flow: a role proposes a decision into the ledger; its configured
//! challengers interact with it through the challenge engine until it is
//! accepted or escalated; [`challenge::ChallengeEngine::can_execute`] gates
//! whether the outcome may be acted on. Separately, verdict-issuing roles
//! record gate verdicts that the phase gate engine consumes to permit or
//! block phase advancement. Every file-level side effect of any role is
//! checked by the access control layer, which is consulted independently of
//! the other three.
//!
//! # Concurrency model
//!
//! One logical writer per project. Sequence-id assignment, index
//! maintenance, and phase transitions are not safe under concurrent
//! writers; mutations for one project must be serialized by the caller.
//! Every acknowledged mutation is durably persisted (temp file + atomic
//! rename) before the call returns. Reads are pure and may run
//! concurrently with each other.
//!
//! # Example
//!
//! ```rust
//! use charter_core::config::GovernanceConfig;
//! use charter_core::challenge::{ChallengeAction, ChallengeEngine};
//! use charter_core::ledger::{DecisionLedger, ProposeDecision};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GovernanceConfig::from_toml(
//!     r#"
//!     project_root = "/workspace/demo"
//!
//!     [roles.ceo]
//!     challengers = ["cto"]
//!     [roles.cto]
//!     challengers = []
//!     "#,
//! )?;
//!
//! let mut ledger = DecisionLedger::in_memory("demo");
//! let decision = ledger.propose(ProposeDecision {
//!     author: "ceo".into(),
//!     decision_type: "strategic".into(),
//!     summary: "Adopt the new review policy".into(),
//!     rationale: "Review load is unsustainable".into(),
//!     ..ProposeDecision::default()
//! })?;
//!
//! let mut engine = ChallengeEngine::new(config.challenger_map(), config.challenge_policy());
//! engine.process_challenge(
//!     &mut ledger,
//!     &decision.id,
//!     "cto",
//!     ChallengeAction::Accept,
//!     "No objection",
//!     None,
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod challenge;
pub mod config;
pub mod gate;
pub mod ledger;
mod persist;
