//! Audit log storage, querying, and aggregation.
//!
//! Every access check appends exactly one [`AuditLogEntry`], allowed or
//! denied. The log is append-only until a collaborator explicitly exports
//! and clears it; the kernel itself never prunes entries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ViolationType;

/// A single audit log entry, recorded on every access check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct AuditLogEntry {
    /// When the check ran.
    pub timestamp: DateTime<Utc>,

    /// The role that attempted the write.
    pub agent_role: String,

    /// The path the role attempted to write, as supplied by the caller.
    pub target_path: String,

    /// Whether the write was allowed.
    pub allowed: bool,

    /// The violation class when denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation_type: Option<ViolationType>,

    /// Structured reason string; never empty, even for allowed checks.
    pub reason: String,

    /// The protected pattern that matched, for governance-asset denials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,

    /// The scope the caller supplied, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_scope: Option<Vec<String>>,
}

/// Conjunctive filters for [`audit queries`](super::AccessController::query_audit_log).
///
/// All populated fields must match for an entry to be returned.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Match entries for this role.
    pub role: Option<String>,

    /// Match entries with this allow/deny outcome.
    pub allowed: Option<bool>,

    /// Match entries with this violation type.
    pub violation_type: Option<ViolationType>,

    /// Match entries at or after this instant.
    pub since: Option<DateTime<Utc>>,

    /// Match entries at or before this instant.
    pub until: Option<DateTime<Utc>>,

    /// Match entries whose target path contains this substring.
    pub path_contains: Option<String>,

    /// Cap the number of returned entries.
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub(super) fn matches(&self, entry: &AuditLogEntry) -> bool {
        if let Some(role) = &self.role {
            if entry.agent_role != *role {
                return false;
            }
        }
        if let Some(allowed) = self.allowed {
            if entry.allowed != allowed {
                return false;
            }
        }
        if let Some(violation) = self.violation_type {
            if entry.violation_type != Some(violation) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp > until {
                return false;
            }
        }
        if let Some(fragment) = &self.path_contains {
            if !entry.target_path.contains(fragment.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Aggregated view of the audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct AuditSummary {
    /// Total checks recorded.
    pub total_checks: u64,

    /// Total denials recorded.
    pub total_denials: u64,

    /// Denial counts keyed by violation type.
    pub denials_by_type: BTreeMap<String, u64>,

    /// Denial counts keyed by agent role.
    pub denials_by_agent: BTreeMap<String, u64>,

    /// Protected paths ranked by how often they were targeted, most
    /// targeted first. Ties break by path for deterministic output.
    pub most_targeted_assets: Vec<TargetedAsset>,
}

/// A protected path and how many denied writes targeted it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct TargetedAsset {
    /// The target path of the denied writes.
    pub path: String,

    /// How many governance-asset denials hit it.
    pub denials: u64,
}

pub(super) fn summarize(entries: &[AuditLogEntry]) -> AuditSummary {
    let mut denials_by_type: BTreeMap<String, u64> = BTreeMap::new();
    let mut denials_by_agent: BTreeMap<String, u64> = BTreeMap::new();
    let mut asset_hits: BTreeMap<String, u64> = BTreeMap::new();
    let mut total_denials = 0u64;

    for entry in entries {
        if entry.allowed {
            continue;
        }
        total_denials += 1;
        if let Some(violation) = entry.violation_type {
            *denials_by_type.entry(violation.to_string()).or_default() += 1;
            if violation == ViolationType::GovernanceAsset {
                *asset_hits.entry(entry.target_path.clone()).or_default() += 1;
            }
        }
        *denials_by_agent.entry(entry.agent_role.clone()).or_default() += 1;
    }

    let mut most_targeted_assets: Vec<TargetedAsset> = asset_hits
        .into_iter()
        .map(|(path, denials)| TargetedAsset { path, denials })
        .collect();
    most_targeted_assets.sort_by(|a, b| b.denials.cmp(&a.denials).then(a.path.cmp(&b.path)));

    AuditSummary {
        total_checks: entries.len() as u64,
        total_denials,
        denials_by_type,
        denials_by_agent,
        most_targeted_assets,
    }
}
