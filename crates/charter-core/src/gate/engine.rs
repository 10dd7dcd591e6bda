//! Phase gate engine: per-project phase state machine driven by verdicts.
//!
//! Each project's phase state is created lazily on the first verdict and
//! never deleted. Recording a verdict sets the phase's gating status;
//! advancement requires the most recent verdict for exactly the configured
//! gate to be PASS, or CONDITIONAL and unexpired. A FAIL is final for that
//! attempt: recovery requires a new verdict for the same gate, never an
//! override.
//!
//! There is no internal timer: CONDITIONAL expiry is evaluated lazily at
//! query time against the supplied clock, not by a background sweep.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::GateError;
use super::verdict::{GateVerdict, PhaseState, PhaseStatus, Verdict};
use crate::config::GateRule;
use crate::persist;

/// Schema identifier for the persisted snapshot.
pub const GATE_SNAPSHOT_SCHEMA: &str = "charter.gates.v1";

/// Maximum snapshot file size accepted on load.
pub const MAX_SNAPSHOT_SIZE: u64 = 64 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct GateSnapshot {
    schema: String,
    states: Vec<PhaseState>,
}

/// Outcome of an advancement eligibility check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct AdvanceCheck {
    /// Whether advancement is permitted.
    pub allowed: bool,

    /// Structured reasons blocking advancement, empty when allowed.
    pub blockers: Vec<String>,

    /// Whether permission rests on a CONDITIONAL verdict.
    pub conditional: bool,

    /// Conditions carried by the CONDITIONAL verdict, when applicable.
    pub conditions: Vec<String>,
}

/// Outcome of an advancement attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct AdvanceResult {
    /// Whether the phase advanced.
    pub advanced: bool,

    /// The project's current phase after the attempt.
    pub current_phase: u32,

    /// The project's current phase name after the attempt.
    pub phase_name: String,

    /// Blockers when the attempt was refused by verdict state.
    pub blockers: Vec<String>,
}

/// Conjunctive filters for [`PhaseGateEngine::query_history`].
#[derive(Debug, Clone, Default)]
pub struct VerdictFilter {
    /// Match verdicts for this project.
    pub project: Option<String>,

    /// Match verdicts issued for this phase.
    pub phase: Option<u32>,

    /// Match verdicts with this outcome.
    pub verdict: Option<Verdict>,

    /// Match verdicts issued by this role.
    pub issued_by: Option<String>,

    /// Match verdicts for this gate.
    pub gate_id: Option<String>,

    /// Match verdicts at or after this instant.
    pub since: Option<DateTime<Utc>>,

    /// Match verdicts at or before this instant.
    pub until: Option<DateTime<Utc>>,
}

impl VerdictFilter {
    fn matches(&self, verdict: &GateVerdict) -> bool {
        if let Some(project) = &self.project {
            if verdict.project != *project {
                return false;
            }
        }
        if let Some(phase) = self.phase {
            if verdict.phase != phase {
                return false;
            }
        }
        if let Some(expected) = self.verdict {
            if verdict.verdict != expected {
                return false;
            }
        }
        if let Some(issuer) = &self.issued_by {
            if verdict.issued_by != *issuer {
                return false;
            }
        }
        if let Some(gate_id) = &self.gate_id {
            if verdict.gate_id != *gate_id {
                return false;
            }
        }
        if let Some(since) = self.since {
            if verdict.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if verdict.timestamp > until {
                return false;
            }
        }
        true
    }
}

/// Per-project phase state machine consuming recorded verdicts.
#[derive(Debug)]
pub struct PhaseGateEngine {
    path: Option<PathBuf>,
    gates: Vec<GateRule>,
    states: BTreeMap<String, PhaseState>,
}

impl PhaseGateEngine {
    /// Creates an in-memory engine with no durable backing. Intended for
    /// tests and dry runs.
    #[must_use]
    pub fn in_memory(gates: Vec<GateRule>) -> Self {
        Self {
            path: None,
            gates,
            states: BTreeMap::new(),
        }
    }

    /// Opens a durable engine at `path`, loading the persisted snapshot
    /// if one exists. Gate rules come from configuration, not the
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::SnapshotLoad`] if the snapshot exists but
    /// cannot be read or carries the wrong schema.
    pub fn open(path: impl Into<PathBuf>, gates: Vec<GateRule>) -> Result<Self, GateError> {
        let path = path.into();
        let mut engine = Self {
            path: Some(path.clone()),
            gates,
            states: BTreeMap::new(),
        };
        if path.exists() {
            let snapshot: GateSnapshot = persist::load_bounded_json(&path, MAX_SNAPSHOT_SIZE)
                .map_err(|detail| GateError::SnapshotLoad { detail })?;
            if snapshot.schema != GATE_SNAPSHOT_SCHEMA {
                return Err(GateError::SnapshotLoad {
                    detail: format!("unexpected schema {:?}", snapshot.schema),
                });
            }
            for state in snapshot.states {
                engine.states.insert(state.project.clone(), state);
            }
            debug!(projects = engine.states.len(), "gate snapshot loaded");
        }
        Ok(engine)
    }

    /// Looks up a project's phase state.
    #[must_use]
    pub fn phase_state(&self, project: &str) -> Option<&PhaseState> {
        self.states.get(project)
    }

    /// Records a verdict, creating the project's phase state lazily.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidVerdict`] for structurally malformed
    /// verdicts and [`GateError::Persistence`] if the snapshot write
    /// fails (the mutation is rolled back).
    pub fn record_verdict(&mut self, verdict: GateVerdict) -> Result<PhaseState, GateError> {
        if verdict.gate_id.is_empty() {
            return Err(GateError::InvalidVerdict {
                reason: "gate_id must not be empty".to_string(),
            });
        }
        if verdict.project.is_empty() {
            return Err(GateError::InvalidVerdict {
                reason: "project must not be empty".to_string(),
            });
        }
        if verdict.verdict != Verdict::Conditional && verdict.expires_at.is_some() {
            return Err(GateError::InvalidVerdict {
                reason: format!("expires_at is only valid on CONDITIONAL, not {}", verdict.verdict),
            });
        }

        let now = Utc::now();
        let backup = self.states.get(&verdict.project).cloned();
        let state = self
            .states
            .entry(verdict.project.clone())
            .or_insert_with(|| PhaseState {
                project: verdict.project.clone(),
                current_phase: verdict.phase,
                phase_name: format!("phase-{}", verdict.phase),
                status: PhaseStatus::InProgress,
                started_at: now,
                updated_at: now,
                verdict_history: Vec::new(),
            });

        state.status = match verdict.verdict {
            Verdict::Pass => PhaseStatus::GatedPass,
            Verdict::Fail => PhaseStatus::GatedFail,
            Verdict::Conditional => PhaseStatus::GatedConditional,
        };
        state.updated_at = now;
        state.verdict_history.push(verdict.clone());

        if let Err(err) = self.persist() {
            match backup {
                Some(previous) => {
                    self.states.insert(verdict.project.clone(), previous);
                }
                None => {
                    self.states.remove(&verdict.project);
                }
            }
            return Err(err);
        }

        info!(
            project = %verdict.project,
            gate_id = %verdict.gate_id,
            verdict = %verdict.verdict,
            phase = verdict.phase,
            "verdict recorded"
        );
        Ok(self.states[&verdict.project].clone())
    }

    /// Checks advancement eligibility against the supplied clock.
    ///
    /// Blocked unless the most recent verdict for `gate_id` is PASS, or
    /// CONDITIONAL and not expired. An expired CONDITIONAL is a blocker,
    /// never a silent pass.
    #[must_use]
    pub fn can_advance_at(
        &self,
        project: &str,
        from_phase: u32,
        to_phase: u32,
        gate_id: &str,
        now: DateTime<Utc>,
    ) -> AdvanceCheck {
        let mut blockers = Vec::new();

        let Some(state) = self.states.get(project) else {
            blockers.push(format!("no phase state recorded for project {project}"));
            return AdvanceCheck {
                allowed: false,
                blockers,
                conditional: false,
                conditions: Vec::new(),
            };
        };
        if state.current_phase != from_phase {
            blockers.push(format!(
                "project {project} is in phase {}, not {from_phase}",
                state.current_phase
            ));
        }

        let latest = state
            .verdict_history
            .iter()
            .rev()
            .find(|v| v.gate_id == gate_id);
        let Some(latest) = latest else {
            blockers.push(format!(
                "no verdict recorded for gate {gate_id} (transition {from_phase} -> {to_phase})"
            ));
            return AdvanceCheck {
                allowed: false,
                blockers,
                conditional: false,
                conditions: Vec::new(),
            };
        };

        let mut conditional = false;
        let mut conditions = Vec::new();
        match latest.verdict {
            Verdict::Pass => {}
            Verdict::Fail => {
                blockers.push(format!(
                    "gate {gate_id} verdict is FAIL; a new verdict is required"
                ));
                blockers.extend(latest.blocking_issues.iter().cloned());
            }
            Verdict::Conditional => match latest.expires_at {
                Some(expires_at) if expires_at <= now => {
                    blockers.push(format!(
                        "gate {gate_id} CONDITIONAL verdict expired at {}",
                        expires_at.to_rfc3339()
                    ));
                }
                _ => {
                    conditional = true;
                    conditions = latest.conditions.clone();
                }
            },
        }

        AdvanceCheck {
            allowed: blockers.is_empty(),
            blockers,
            conditional,
            conditions,
        }
    }

    /// Checks advancement eligibility against the current clock.
    #[must_use]
    pub fn can_advance(
        &self,
        project: &str,
        from_phase: u32,
        to_phase: u32,
        gate_id: &str,
    ) -> AdvanceCheck {
        self.can_advance_at(project, from_phase, to_phase, gate_id, Utc::now())
    }

    /// Attempts to advance a project one phase.
    ///
    /// Structural misuse (phase skip, a gate that does not guard the
    /// transition) is an error. A verdict-blocked attempt is an `Ok`
    /// result with `advanced: false`.
    ///
    /// # Errors
    ///
    /// - [`GateError::PhaseSkip`] when `to_phase != from_phase + 1`.
    /// - [`GateError::UnconfiguredGate`] when `gate_id` is not the
    ///   configured gate for exactly this transition.
    /// - [`GateError::Persistence`] if the snapshot write fails (the
    ///   mutation is rolled back).
    pub fn advance_phase(
        &mut self,
        project: &str,
        gate_id: &str,
        from_phase: u32,
        to_phase: u32,
        new_phase_name: &str,
    ) -> Result<AdvanceResult, GateError> {
        if to_phase != from_phase.saturating_add(1) {
            return Err(GateError::PhaseSkip {
                project: project.to_string(),
                from_phase,
                to_phase,
            });
        }

        let configured = self
            .gates
            .iter()
            .find(|rule| rule.from_phase == from_phase && rule.to_phase == to_phase);
        match configured {
            Some(rule) if rule.gate_id == gate_id => {}
            other => {
                return Err(GateError::UnconfiguredGate {
                    gate_id: gate_id.to_string(),
                    from_phase,
                    to_phase,
                    expected: other.map(|rule| rule.gate_id.clone()),
                });
            }
        }

        let check = self.can_advance(project, from_phase, to_phase, gate_id);
        if !check.allowed {
            warn!(
                project,
                gate_id,
                from_phase,
                to_phase,
                blockers = check.blockers.len(),
                "phase advancement blocked"
            );
            let state = self.states.get(project);
            return Ok(AdvanceResult {
                advanced: false,
                current_phase: state.map_or(from_phase, |s| s.current_phase),
                phase_name: state.map_or_else(String::new, |s| s.phase_name.clone()),
                blockers: check.blockers,
            });
        }

        // can_advance verified the state exists.
        let backup = self.states.get(project).cloned();
        if let Some(state) = self.states.get_mut(project) {
            state.current_phase = to_phase;
            state.phase_name = new_phase_name.to_string();
            state.status = PhaseStatus::InProgress;
            state.updated_at = Utc::now();
        }

        if let Err(err) = self.persist() {
            if let Some(previous) = backup {
                self.states.insert(project.to_string(), previous);
            }
            return Err(err);
        }

        info!(project, gate_id, from_phase, to_phase, "phase advanced");
        Ok(AdvanceResult {
            advanced: true,
            current_phase: to_phase,
            phase_name: new_phase_name.to_string(),
            blockers: Vec::new(),
        })
    }

    /// Conjunctively filters all projects' verdicts, newest first.
    #[must_use]
    pub fn query_history(&self, filter: &VerdictFilter) -> Vec<GateVerdict> {
        let mut verdicts: Vec<GateVerdict> = self
            .states
            .values()
            .flat_map(|state| state.verdict_history.iter())
            .filter(|verdict| filter.matches(verdict))
            .cloned()
            .collect();
        verdicts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        verdicts
    }

    fn persist(&self) -> Result<(), GateError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = GateSnapshot {
            schema: GATE_SNAPSHOT_SCHEMA.to_string(),
            states: self.states.values().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot).map_err(|e| GateError::Serialization {
            detail: format!("cannot serialize gate snapshot: {e}"),
        })?;
        persist::atomic_write(path, &bytes).map_err(|detail| GateError::Persistence { detail })?;
        debug!(projects = self.states.len(), "gate state persisted");
        Ok(())
    }
}
