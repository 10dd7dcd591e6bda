//! Decision ledger: append-only decision records with lineage.
//!
//! The ledger assigns strictly increasing ids (`DEC-0001`, ...), records
//! every challenge round, and maintains the supersession and dependency
//! structure as an insertion-ordered arena plus incrementally maintained
//! adjacency indices. No record is ever deleted: resolution means a status
//! transition or a superseding record, never removal.
//!
//! Every mutating call persists the full project decision set atomically
//! (temp file + rename) before returning; no mutation is acknowledged
//! unless durable.
//!
//! # Example
//!
//! ```rust
//! use charter_core::ledger::{DecisionLedger, ProposeDecision};
//!
//! # fn example() -> Result<(), charter_core::ledger::LedgerError> {
//! let mut ledger = DecisionLedger::in_memory("acme");
//! let decision = ledger.propose(ProposeDecision {
//!     author: "ceo".into(),
//!     decision_type: "strategic".into(),
//!     summary: "Ship the beta this quarter".into(),
//!     rationale: "Early feedback beats polish".into(),
//!     ..ProposeDecision::default()
//! })?;
//! assert_eq!(decision.id, "DEC-0001");
//!
//! ledger.challenge(&decision.id, "cto", "Capacity is already committed", None)?;
//! ledger.accept(&decision.id, "cto", "Revised scope fits")?;
//! # Ok(())
//! # }
//! ```

mod error;
mod export;
mod record;
mod store;

#[cfg(test)]
mod tests;

pub use error::LedgerError;
pub use record::{ChallengeRound, DecisionRecord, DecisionStatus, ProposeDecision, RoundAction};
pub use store::{DecisionFilter, DecisionLedger, LEDGER_SNAPSHOT_SCHEMA, MAX_SNAPSHOT_SIZE};
