//! Phase gate error types.

use thiserror::Error;

/// Errors that can occur during phase gate operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GateError {
    /// Attempted a non-adjacent phase transition. Phase skipping is
    /// structurally impossible.
    #[error("phase skip refused for {project}: {from_phase} -> {to_phase}")]
    PhaseSkip {
        /// The project.
        project: String,
        /// The transition's source phase.
        from_phase: u32,
        /// The transition's target phase.
        to_phase: u32,
    },

    /// The gate is not the configured gate for the declared transition.
    #[error(
        "gate {gate_id} does not guard transition {from_phase} -> {to_phase}{}",
        .expected.as_ref().map(|g| format!(" (expected {g})")).unwrap_or_default()
    )]
    UnconfiguredGate {
        /// The gate id supplied by the caller.
        gate_id: String,
        /// The transition's source phase.
        from_phase: u32,
        /// The transition's target phase.
        to_phase: u32,
        /// The gate actually configured for the transition, if any.
        expected: Option<String>,
    },

    /// A verdict failed structural validation.
    #[error("invalid verdict: {reason}")]
    InvalidVerdict {
        /// Why the verdict was rejected.
        reason: String,
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

    /// Serialization of the snapshot failed.
    #[error("serialization failed: {detail}")]
    Serialization {
        /// Details about the failure.
        detail: String,
    },
}
