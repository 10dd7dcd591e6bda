//! Configuration module error types.

use thiserror::Error;

/// Errors that can occur while loading or validating governance
/// configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A role identifier failed validation.
    #[error("invalid role id {value:?}: {reason}")]
    InvalidRoleId {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A challenger list references a role that is not configured.
    ///
    /// Rejected eagerly at load time so that dispatch never encounters an
    /// unknown role at call time.
    #[error("role {role} lists unknown challenger {challenger}")]
    UnknownChallenger {
        /// The role whose challenger list is invalid.
        role: String,
        /// The unconfigured challenger reference.
        challenger: String,
    },

    /// Two gate rules are configured for the same phase transition.
    #[error("duplicate gate rule for transition {from_phase} -> {to_phase}")]
    DuplicateGateRule {
        /// The transition's source phase.
        from_phase: u32,
        /// The transition's target phase.
        to_phase: u32,
    },

    /// A gate rule declares a non-adjacent transition.
    #[error(
        "gate rule {gate_id} declares transition {from_phase} -> {to_phase}; \
         gates may only guard single-step transitions"
    )]
    NonAdjacentGateRule {
        /// The offending gate id.
        gate_id: String,
        /// The transition's source phase.
        from_phase: u32,
        /// The transition's target phase.
        to_phase: u32,
    },

    /// A field holds a structurally invalid value.
    #[error("invalid configuration: {reason}")]
    Validation {
        /// Why the configuration was rejected.
        reason: String,
    },
}
