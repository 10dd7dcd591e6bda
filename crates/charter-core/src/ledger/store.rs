//! Decision ledger storage: arena, lineage indices, atomic persistence.
//!
//! The ledger is an insertion-ordered arena of [`DecisionRecord`]s keyed
//! by id, plus two incrementally maintained adjacency indices: forward
//! supersession (`superseded_by`) and reverse dependencies. Lineage
//! lookups never scan the full arena.
//!
//! Durability is synchronous: every mutating call serializes the full
//! project decision set and writes it via temp file + atomic rename
//! before returning. A mutation whose persistence fails is rolled back
//! and not acknowledged.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::persist;

use super::error::LedgerError;
use super::record::{
    ChallengeRound, DecisionRecord, DecisionStatus, ProposeDecision, RoundAction,
};

/// Schema identifier for the persisted snapshot.
pub const LEDGER_SNAPSHOT_SCHEMA: &str = "charter.ledger.v1";

/// Maximum snapshot file size accepted on load.
pub const MAX_SNAPSHOT_SIZE: u64 = 64 * 1024 * 1024;

/// Persisted ledger snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerSnapshot {
    schema: String,
    project: String,
    /// Next sequence number. Persisted explicitly so ids are never
    /// reused across restarts.
    next_seq: u64,
    decisions: Vec<DecisionRecord>,
}

/// Conjunctive filters for [`DecisionLedger::query`].
#[derive(Debug, Clone, Default)]
pub struct DecisionFilter {
    /// Match decisions by this author.
    pub author: Option<String>,

    /// Match decisions of this type.
    pub decision_type: Option<String>,

    /// Match decisions in this status.
    pub status: Option<DecisionStatus>,

    /// Match decisions for this project.
    pub project: Option<String>,

    /// Match decisions proposed in this phase.
    pub phase: Option<u32>,

    /// When `Some(true)`, match decisions with at least one challenge
    /// round; `Some(false)` matches never-challenged decisions.
    pub challenged: Option<bool>,

    /// Match decisions that declare this dependency.
    pub depends_on: Option<String>,

    /// Match decisions created at or after this instant.
    pub since: Option<DateTime<Utc>>,

    /// Match decisions created at or before this instant.
    pub until: Option<DateTime<Utc>>,
}

impl DecisionFilter {
    fn matches(&self, record: &DecisionRecord) -> bool {
        if let Some(author) = &self.author {
            if record.author != *author {
                return false;
            }
        }
        if let Some(decision_type) = &self.decision_type {
            if record.decision_type != *decision_type {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(project) = &self.project {
            if record.project != *project {
                return false;
            }
        }
        if let Some(phase) = self.phase {
            if record.phase != phase {
                return false;
            }
        }
        if let Some(challenged) = self.challenged {
            if (record.challenge_rounds > 0) != challenged {
                return false;
            }
        }
        if let Some(dependency) = &self.depends_on {
            if !record.dependencies.contains(dependency) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.created_at > until {
                return false;
            }
        }
        true
    }
}

/// Append-only store of decision records for one project.
#[derive(Debug)]
pub struct DecisionLedger {
    project: String,
    path: Option<PathBuf>,
    next_seq: u64,
    /// Insertion-ordered arena.
    arena: Vec<DecisionRecord>,
    /// Id -> arena slot.
    by_id: HashMap<String, usize>,
    /// Reverse dependency index: id -> ids that declared it as a
    /// dependency.
    dependents: HashMap<String, Vec<String>>,
}

impl DecisionLedger {
    /// Creates an in-memory ledger with no durable backing. Intended for
    /// tests and dry runs.
    #[must_use]
    pub fn in_memory(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            path: None,
            next_seq: 1,
            arena: Vec::new(),
            by_id: HashMap::new(),
            dependents: HashMap::new(),
        }
    }

    /// Opens a durable ledger at `path`, loading the persisted snapshot
    /// if one exists.
    ///
    /// The id counter is seeded from the snapshot's `next_seq`, so ids
    /// are never reused across process restarts.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SnapshotLoad`] if the snapshot exists but
    /// cannot be read, exceeds [`MAX_SNAPSHOT_SIZE`], carries the wrong
    /// schema, or belongs to a different project.
    pub fn open(path: impl Into<PathBuf>, project: impl Into<String>) -> Result<Self, LedgerError> {
        let path = path.into();
        let project = project.into();
        let mut ledger = Self {
            project: project.clone(),
            path: Some(path.clone()),
            next_seq: 1,
            arena: Vec::new(),
            by_id: HashMap::new(),
            dependents: HashMap::new(),
        };

        if path.exists() {
            let snapshot: LedgerSnapshot = persist::load_bounded_json(&path, MAX_SNAPSHOT_SIZE)
                .map_err(|detail| LedgerError::SnapshotLoad { detail })?;
            if snapshot.schema != LEDGER_SNAPSHOT_SCHEMA {
                return Err(LedgerError::SnapshotLoad {
                    detail: format!("unexpected schema {:?}", snapshot.schema),
                });
            }
            if snapshot.project != project {
                return Err(LedgerError::SnapshotLoad {
                    detail: format!(
                        "snapshot belongs to project {:?}, not {project:?}",
                        snapshot.project
                    ),
                });
            }
            ledger.next_seq = snapshot.next_seq.max(1);
            for record in snapshot.decisions {
                // Forward supersession links are persisted on the records;
                // only the reverse dependency index is rebuilt here.
                for dependency in &record.dependencies {
                    ledger
                        .dependents
                        .entry(dependency.clone())
                        .or_default()
                        .push(record.id.clone());
                }
                ledger.by_id.insert(record.id.clone(), ledger.arena.len());
                ledger.arena.push(record);
            }
            debug!(
                project = %ledger.project,
                decisions = ledger.arena.len(),
                "ledger snapshot loaded"
            );
        }

        Ok(ledger)
    }

    /// The project this ledger serves.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Number of decisions recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether the ledger holds no decisions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Looks up a decision by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DecisionRecord> {
        self.by_id.get(id).map(|&slot| &self.arena[slot])
    }

    /// Records a new decision with the next monotonic id.
    ///
    /// # Errors
    ///
    /// Returns an error if a declared dependency or supersession target
    /// is absent, or if persistence fails (the mutation is rolled back).
    pub fn propose(&mut self, input: ProposeDecision) -> Result<DecisionRecord, LedgerError> {
        for dependency in &input.dependencies {
            if !self.by_id.contains_key(dependency) {
                return Err(LedgerError::UnknownDependency {
                    dependency: dependency.clone(),
                });
            }
        }
        if let Some(old_id) = &input.supersedes {
            if !self.by_id.contains_key(old_id) {
                return Err(LedgerError::NotFound { id: old_id.clone() });
            }
        }

        let now = Utc::now();
        let id = format!("DEC-{:04}", self.next_seq);
        let record = DecisionRecord {
            id: id.clone(),
            author: input.author,
            decision_type: input.decision_type,
            summary: input.summary,
            rationale: input.rationale,
            evidence: input.evidence,
            project: self.project.clone(),
            phase: input.phase,
            status: DecisionStatus::Proposed,
            challenge_rounds: 0,
            challenged_by: Vec::new(),
            challenge_history: Vec::new(),
            supersedes: input.supersedes,
            superseded_by: Vec::new(),
            dependencies: input.dependencies,
            created_at: now,
            updated_at: now,
        };

        self.next_seq += 1;
        self.index_record(&record);
        self.by_id.insert(id.clone(), self.arena.len());
        self.arena.push(record);

        if let Err(err) = self.persist() {
            self.rollback_propose(&id);
            return Err(err);
        }

        let record = self.arena[self.by_id[&id]].clone();
        info!(decision_id = %id, author = %record.author, "decision proposed");
        Ok(record)
    }

    /// Records a challenge round against a decision.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the id is absent and
    /// [`LedgerError::AlreadyResolved`] if the decision is terminal.
    pub fn challenge(
        &mut self,
        id: &str,
        challenger: &str,
        rationale: &str,
        counter_proposal: Option<String>,
    ) -> Result<DecisionRecord, LedgerError> {
        self.transition(id, |record| {
            record.challenge_rounds += 1;
            record.status = DecisionStatus::Challenged;
            if !record.challenged_by.iter().any(|c| c == challenger) {
                record.challenged_by.push(challenger.to_string());
            }
            record.challenge_history.push(ChallengeRound {
                round: record.challenge_rounds,
                challenger: challenger.to_string(),
                action: RoundAction::Challenged,
                rationale: rationale.to_string(),
                counter_proposal,
                timestamp: Utc::now(),
            });
        })
    }

    /// Accepts a decision, closing its review.
    ///
    /// The history entry carries the round count it concluded at.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the id is absent and
    /// [`LedgerError::AlreadyResolved`] if the decision is terminal.
    pub fn accept(
        &mut self,
        id: &str,
        acceptor: &str,
        rationale: &str,
    ) -> Result<DecisionRecord, LedgerError> {
        self.transition(id, |record| {
            record.status = DecisionStatus::Accepted;
            record.challenge_history.push(ChallengeRound {
                round: record.challenge_rounds,
                challenger: acceptor.to_string(),
                action: RoundAction::Accepted,
                rationale: rationale.to_string(),
                counter_proposal: None,
                timestamp: Utc::now(),
            });
        })
    }

    /// Rejects a decision, closing its review against the author.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the id is absent and
    /// [`LedgerError::AlreadyResolved`] if the decision is terminal.
    pub fn reject(
        &mut self,
        id: &str,
        rejector: &str,
        rationale: &str,
    ) -> Result<DecisionRecord, LedgerError> {
        self.transition(id, |record| {
            record.status = DecisionStatus::Rejected;
            record.challenge_history.push(ChallengeRound {
                round: record.challenge_rounds,
                challenger: rejector.to_string(),
                action: RoundAction::Rejected,
                rationale: rationale.to_string(),
                counter_proposal: None,
                timestamp: Utc::now(),
            });
        })
    }

    /// Escalates a decision. Terminal: no further challenge rounds may be
    /// processed against it, and there is no path back to `proposed`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the id is absent and
    /// [`LedgerError::AlreadyResolved`] if the decision is terminal.
    pub fn escalate(&mut self, id: &str) -> Result<DecisionRecord, LedgerError> {
        let record = self.transition(id, |record| {
            record.status = DecisionStatus::Escalated;
        })?;
        info!(decision_id = %id, "decision escalated");
        Ok(record)
    }

    /// Marks `old_id` superseded by `new_id`.
    ///
    /// `new_id` must already declare `supersedes = old_id`; the backward
    /// link is established at creation, this call only flips the old
    /// record's status.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if either id is absent,
    /// [`LedgerError::InvalidSupersession`] if `new_id` does not declare
    /// the backward link, and [`LedgerError::AlreadyResolved`] if
    /// `old_id` is already superseded.
    pub fn supersede(&mut self, old_id: &str, new_id: &str) -> Result<DecisionRecord, LedgerError> {
        let new_record = self.get(new_id).ok_or_else(|| LedgerError::NotFound {
            id: new_id.to_string(),
        })?;
        if new_record.supersedes.as_deref() != Some(old_id) {
            return Err(LedgerError::InvalidSupersession {
                old_id: old_id.to_string(),
                new_id: new_id.to_string(),
                reason: format!("{new_id} does not declare supersedes={old_id}"),
            });
        }
        let old_record = self.get(old_id).ok_or_else(|| LedgerError::NotFound {
            id: old_id.to_string(),
        })?;
        if old_record.status == DecisionStatus::Superseded {
            return Err(LedgerError::AlreadyResolved {
                id: old_id.to_string(),
                status: DecisionStatus::Superseded,
            });
        }

        let record = self.transition_unchecked(old_id, |record| {
            record.status = DecisionStatus::Superseded;
        })?;
        info!(old_id = %old_id, new_id = %new_id, "decision superseded");
        Ok(record)
    }

    /// Walks `supersedes` links backward to the root revision.
    ///
    /// Returns the ordered chain root..`id`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the id is absent and
    /// [`LedgerError::LineageCycle`] if a corrupted snapshot produced a
    /// cycle.
    pub fn chain(&self, id: &str) -> Result<Vec<DecisionRecord>, LedgerError> {
        let mut chain = Vec::new();
        let mut visited = std::collections::HashSet::new();
        let mut cursor = Some(id.to_string());
        while let Some(current) = cursor {
            if !visited.insert(current.clone()) {
                return Err(LedgerError::LineageCycle { id: current });
            }
            let record = self
                .get(&current)
                .ok_or(LedgerError::NotFound { id: current })?;
            chain.push(record.clone());
            cursor = record.supersedes.clone();
        }
        chain.reverse();
        Ok(chain)
    }

    /// Walks the forward-supersession index from `id`. The walk may
    /// branch; records are returned in breadth-first order starting with
    /// `id` itself.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the id is absent.
    pub fn forward_chain(&self, id: &str) -> Result<Vec<DecisionRecord>, LedgerError> {
        if !self.by_id.contains_key(id) {
            return Err(LedgerError::NotFound { id: id.to_string() });
        }
        let mut out = Vec::new();
        let mut visited = std::collections::HashSet::new();
        let mut queue = std::collections::VecDeque::from([id.to_string()]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(record) = self.get(&current) {
                out.push(record.clone());
                queue.extend(record.superseded_by.iter().cloned());
            }
        }
        Ok(out)
    }

    /// Returns the one-hop declared dependencies of a decision.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the id is absent.
    pub fn dependency_graph(&self, id: &str) -> Result<Vec<DecisionRecord>, LedgerError> {
        let record = self
            .get(id)
            .ok_or_else(|| LedgerError::NotFound { id: id.to_string() })?;
        Ok(record
            .dependencies
            .iter()
            .filter_map(|dep| self.get(dep).cloned())
            .collect())
    }

    /// Returns the decisions that declared `id` as a dependency, via the
    /// incrementally maintained reverse index.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if the id is absent.
    pub fn dependents(&self, id: &str) -> Result<Vec<DecisionRecord>, LedgerError> {
        if !self.by_id.contains_key(id) {
            return Err(LedgerError::NotFound { id: id.to_string() });
        }
        Ok(self
            .dependents
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|dependent| self.get(dependent).cloned())
            .collect())
    }

    /// Conjunctively filters the decision set, in insertion order.
    #[must_use]
    pub fn query(&self, filter: &DecisionFilter) -> Vec<DecisionRecord> {
        self.arena
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect()
    }

    /// Applies a transition after the standard not-found / terminal
    /// guards, persists, and rolls back on persistence failure.
    fn transition(
        &mut self,
        id: &str,
        apply: impl FnOnce(&mut DecisionRecord),
    ) -> Result<DecisionRecord, LedgerError> {
        let slot = *self
            .by_id
            .get(id)
            .ok_or_else(|| LedgerError::NotFound { id: id.to_string() })?;
        let status = self.arena[slot].status;
        if status.is_terminal() {
            return Err(LedgerError::AlreadyResolved {
                id: id.to_string(),
                status,
            });
        }
        self.apply_persisted(slot, apply)
    }

    /// Applies a transition with only the not-found guard. Used by
    /// `supersede`, which legitimately transitions accepted records.
    fn transition_unchecked(
        &mut self,
        id: &str,
        apply: impl FnOnce(&mut DecisionRecord),
    ) -> Result<DecisionRecord, LedgerError> {
        let slot = *self
            .by_id
            .get(id)
            .ok_or_else(|| LedgerError::NotFound { id: id.to_string() })?;
        self.apply_persisted(slot, apply)
    }

    fn apply_persisted(
        &mut self,
        slot: usize,
        apply: impl FnOnce(&mut DecisionRecord),
    ) -> Result<DecisionRecord, LedgerError> {
        let backup = self.arena[slot].clone();
        apply(&mut self.arena[slot]);
        self.arena[slot].updated_at = Utc::now();
        if let Err(err) = self.persist() {
            self.arena[slot] = backup;
            return Err(err);
        }
        Ok(self.arena[slot].clone())
    }

    /// Maintains the forward indices for a record about to enter the
    /// arena. Amortized O(1) per mutation.
    fn index_record(&mut self, record: &DecisionRecord) {
        if let Some(old_id) = &record.supersedes {
            if let Some(&slot) = self.by_id.get(old_id) {
                self.arena[slot].superseded_by.push(record.id.clone());
            }
        }
        for dependency in &record.dependencies {
            self.dependents
                .entry(dependency.clone())
                .or_default()
                .push(record.id.clone());
        }
    }

    fn rollback_propose(&mut self, id: &str) {
        if let Some(slot) = self.by_id.remove(id) {
            let record = self.arena.remove(slot);
            if let Some(old_id) = &record.supersedes {
                if let Some(&old_slot) = self.by_id.get(old_id) {
                    self.arena[old_slot].superseded_by.retain(|s| s != id);
                }
            }
            for dependency in &record.dependencies {
                if let Some(dependents) = self.dependents.get_mut(dependency) {
                    dependents.retain(|d| d != id);
                }
            }
            self.next_seq -= 1;
        }
    }

    /// Serializes the full decision set and writes it atomically.
    fn persist(&self) -> Result<(), LedgerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = LedgerSnapshot {
            schema: LEDGER_SNAPSHOT_SCHEMA.to_string(),
            project: self.project.clone(),
            next_seq: self.next_seq,
            decisions: self.arena.clone(),
        };
        let bytes =
            serde_json::to_vec_pretty(&snapshot).map_err(|e| LedgerError::Serialization {
                detail: format!("cannot serialize ledger snapshot: {e}"),
            })?;
        persist::atomic_write(path, &bytes)
            .map_err(|detail| LedgerError::Persistence { detail })?;
        debug!(project = %self.project, decisions = self.arena.len(), "ledger persisted");
        Ok(())
    }
}
