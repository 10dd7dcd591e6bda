//! Ledger module error types.

use thiserror::Error;

use super::record::DecisionStatus;

/// Errors that can occur during decision ledger operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// Referenced decision id is absent.
    #[error("decision not found: {id}")]
    NotFound {
        /// The decision id that was not found.
        id: String,
    },

    /// Attempted to transition a decision that is already terminal.
    #[error("decision {id} is already resolved (status {status})")]
    AlreadyResolved {
        /// The decision id.
        id: String,
        /// Its terminal status.
        status: DecisionStatus,
    },

    /// A declared dependency references an absent decision.
    #[error("decision dependency not found: {dependency}")]
    UnknownDependency {
        /// The missing dependency id.
        dependency: String,
    },

    /// A supersession link is structurally invalid.
    #[error("invalid supersession of {old_id} by {new_id}: {reason}")]
    InvalidSupersession {
        /// The decision being superseded.
        old_id: String,
        /// The superseding decision.
        new_id: String,
        /// Why the link was rejected.
        reason: String,
    },

    /// The supersession lineage contains a cycle.
    ///
    /// Ids are assigned fresh so a well-formed ledger cannot cycle; this
    /// guards against a corrupted snapshot.
    #[error("supersession lineage cycle detected at {id}")]
    LineageCycle {
        /// The decision id where the walk revisited a node.
        id: String,
    },

    /// The persisted snapshot could not be read or is malformed.
    #[error("snapshot load failed: {detail}")]
    SnapshotLoad {
        /// Details about the failure.
        detail: String,
    },

    /// Durable persistence failed; the mutation is not acknowledged.
    #[error("persistence failed: {detail}")]
    Persistence {
        /// Details about the failure.
        detail: String,
    },

    /// Serialization of the snapshot or an export failed.
    #[error("serialization failed: {detail}")]
    Serialization {
        /// Details about the failure.
        detail: String,
    },
}
