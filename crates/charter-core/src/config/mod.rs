//! Governance configuration parsing and validation.
//!
//! This module parses the `charter.toml` configuration that the kernel
//! consumes: the role map (role name -> challengers + metadata), the
//! project root for access checks, challenge round limits, the
//! protected-asset pattern list, and the gate rules binding a gate id to
//! each phase transition.
//!
//! Validation is eager and fail-closed: a challenger reference to a role
//! that is not itself configured is a [`ConfigError::UnknownChallenger`] at
//! load time, never a dispatch failure at call time.
//!
//! # Schema Overview
//!
//! ```toml
//! project_root = "/workspace/acme"
//! max_challenge_rounds = 3
//! auto_escalate = true
//!
//! [roles.ceo]
//! challengers = ["cto"]
//!
//! [roles.cto]
//! challengers = []
//!
//! [[gates]]
//! gate_id = "G1-design-review"
//! from_phase = 1
//! to_phase = 2
//! ```

mod error;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;

use crate::challenge::ChallengePolicy;

/// Maximum length of a role identifier.
pub const MAX_ROLE_ID_LENGTH: usize = 64;

/// Default number of challenge rounds before forced escalation.
pub const DEFAULT_MAX_CHALLENGE_ROUNDS: u32 = 3;

/// Protected-asset patterns applied when the configuration does not
/// override them. These cover the governance assets no role may modify.
pub const DEFAULT_PROTECTED_PATHS: &[&str] = &[
    "board.yaml",
    "charter.toml",
    "governance/**",
    "decisions/**",
    "gates/**",
    "audit/**",
    "roles/*.yaml",
];

/// A validated role identifier.
///
/// Role ids are lowercase `[a-z0-9_-]` names of bounded length. The type is
/// closed: a `RoleId` can only be obtained through [`RoleId::parse`], so any
/// value of this type is known-valid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleId(String);

impl RoleId {
    /// Parses and validates a role identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRoleId`] if the value is empty, longer
    /// than [`MAX_ROLE_ID_LENGTH`], or contains characters outside
    /// `[a-z0-9_-]`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        if value.is_empty() {
            return Err(ConfigError::InvalidRoleId {
                value: value.to_string(),
                reason: "role id must not be empty".to_string(),
            });
        }
        if value.len() > MAX_ROLE_ID_LENGTH {
            return Err(ConfigError::InvalidRoleId {
                value: value.to_string(),
                reason: format!("role id exceeds {MAX_ROLE_ID_LENGTH} bytes"),
            });
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(ConfigError::InvalidRoleId {
                value: value.to_string(),
                reason: "role id may only contain [a-z0-9_-]".to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the role id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoleId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoleId> for String {
    fn from(id: RoleId) -> Self {
        id.0
    }
}

/// Per-role configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct RoleConfig {
    /// The roles that must resolve this role's decisions. A role with an
    /// empty challenger list executes its decisions unconditionally.
    #[serde(default)]
    pub challengers: Vec<RoleId>,

    /// Free-form metadata carried for collaborators (titles, contact
    /// hints). The kernel never interprets it.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Binds a gate id to exactly one phase transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateRule {
    /// The gate identifier verdicts are recorded against.
    pub gate_id: String,

    /// The phase this gate's transition leaves.
    pub from_phase: u32,

    /// The phase this gate's transition enters. Must be
    /// `from_phase + 1`; phase skipping is structurally impossible.
    pub to_phase: u32,
}

/// Top-level governance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct GovernanceConfig {
    /// Root directory all access checks resolve against.
    pub project_root: PathBuf,

    /// The role map. Every challenger reference must name a key of this
    /// map.
    #[serde(default)]
    pub roles: BTreeMap<RoleId, RoleConfig>,

    /// Challenge rounds permitted before forced escalation.
    #[serde(default = "default_max_challenge_rounds")]
    pub max_challenge_rounds: u32,

    /// Whether reaching the round limit escalates in the same call.
    #[serde(default = "default_auto_escalate")]
    pub auto_escalate: bool,

    /// Protected-asset glob patterns. Role-independent; a match denies
    /// unconditionally.
    #[serde(default = "default_protected_paths")]
    pub protected_paths: Vec<String>,

    /// Gate rules, one per permitted phase transition.
    #[serde(default)]
    pub gates: Vec<GateRule>,
}

fn default_max_challenge_rounds() -> u32 {
    DEFAULT_MAX_CHALLENGE_ROUNDS
}

const fn default_auto_escalate() -> bool {
    true
}

fn default_protected_paths() -> Vec<String> {
    DEFAULT_PROTECTED_PATHS
        .iter()
        .map(|p| (*p).to_string())
        .collect()
}

impl GovernanceConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, fails to parse, or
    /// fails validation.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or validation fails; see
    /// [`GovernanceConfig::validate`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - any challenger references a role absent from the role map
    /// - two gate rules cover the same transition
    /// - a gate rule declares `to_phase != from_phase + 1`
    /// - `max_challenge_rounds` is zero
    /// - a protected pattern is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (role, role_config) in &self.roles {
            for challenger in &role_config.challengers {
                if !self.roles.contains_key(challenger) {
                    return Err(ConfigError::UnknownChallenger {
                        role: role.to_string(),
                        challenger: challenger.to_string(),
                    });
                }
            }
        }

        let mut seen_transitions = std::collections::BTreeSet::new();
        for rule in &self.gates {
            if rule.to_phase != rule.from_phase.saturating_add(1) {
                return Err(ConfigError::NonAdjacentGateRule {
                    gate_id: rule.gate_id.clone(),
                    from_phase: rule.from_phase,
                    to_phase: rule.to_phase,
                });
            }
            if !seen_transitions.insert((rule.from_phase, rule.to_phase)) {
                return Err(ConfigError::DuplicateGateRule {
                    from_phase: rule.from_phase,
                    to_phase: rule.to_phase,
                });
            }
        }

        if self.max_challenge_rounds == 0 {
            return Err(ConfigError::Validation {
                reason: "max_challenge_rounds must be at least 1".to_string(),
            });
        }

        if self.protected_paths.iter().any(String::is_empty) {
            return Err(ConfigError::Validation {
                reason: "protected_paths entries must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Returns the role -> challengers map consumed by the challenge
    /// engine.
    #[must_use]
    pub fn challenger_map(&self) -> BTreeMap<RoleId, Vec<RoleId>> {
        self.roles
            .iter()
            .map(|(role, cfg)| (role.clone(), cfg.challengers.clone()))
            .collect()
    }

    /// Returns the challenge round policy.
    #[must_use]
    pub const fn challenge_policy(&self) -> ChallengePolicy {
        ChallengePolicy {
            max_rounds: self.max_challenge_rounds,
            auto_escalate: self.auto_escalate,
        }
    }
}
