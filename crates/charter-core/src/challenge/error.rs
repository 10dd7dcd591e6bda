//! Challenge workflow error types.

use thiserror::Error;

use super::counter_proposal::CounterProposalStatus;
use crate::ledger::{DecisionStatus, LedgerError};

/// Errors that can occur while processing challenges.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChallengeError {
    /// Underlying ledger failure (not found, persistence, ...).
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The acting role is not a configured challenger for the decision's
    /// author. The caller must re-route to the correct role.
    #[error("{challenger} is not a configured challenger for decisions by {author}")]
    NotAuthorized {
        /// The role that attempted the action.
        challenger: String,
        /// The decision's author.
        author: String,
    },

    /// The decision is already resolved and cannot be reopened.
    ///
    /// Surfaced as a protocol violation, not a transient condition.
    #[error("decision {id} is already resolved (status {status})")]
    AlreadyResolved {
        /// The decision id.
        id: String,
        /// Its terminal status.
        status: DecisionStatus,
    },

    /// Referenced counter-proposal id is absent.
    #[error("counter-proposal not found: {id}")]
    CounterProposalNotFound {
        /// The counter-proposal id.
        id: String,
    },

    /// The counter-proposal is no longer pending.
    #[error("counter-proposal {id} is already resolved (status {status})")]
    CounterProposalAlreadyResolved {
        /// The counter-proposal id.
        id: String,
        /// Its current status.
        status: CounterProposalStatus,
    },

    /// The requested resolution is not a valid terminal status.
    #[error("invalid counter-proposal resolution: {reason}")]
    InvalidResolution {
        /// Why the resolution was rejected.
        reason: String,
    },

    /// Serialization of an export failed.
    #[error("serialization failed: {detail}")]
    Serialization {
        /// Details about the failure.
        detail: String,
    },
}
