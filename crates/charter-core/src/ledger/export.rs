//! Decision set export rendering.
//!
//! These are the canonical entry points for CLI/dashboard/record-keeping
//! collaborators: whole serialized data objects, never internal indices.

use std::fmt::Write;

use super::error::LedgerError;
use super::record::DecisionRecord;
use super::store::{DecisionFilter, DecisionLedger};

impl DecisionLedger {
    /// Renders the filtered decision set as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Serialization`] if encoding fails.
    pub fn export_json(&self, filter: &DecisionFilter) -> Result<String, LedgerError> {
        serde_json::to_string_pretty(&self.query(filter)).map_err(|e| {
            LedgerError::Serialization {
                detail: format!("cannot serialize decision export: {e}"),
            }
        })
    }

    /// Renders the filtered decision set as Markdown, including the full
    /// challenge history per decision.
    #[must_use]
    pub fn export_markdown(&self, filter: &DecisionFilter) -> String {
        let decisions = self.query(filter);
        let mut out = String::new();
        let _ = writeln!(out, "# Decision Ledger: {}", self.project());
        let _ = writeln!(out);
        let _ = writeln!(out, "{} decision(s)", decisions.len());
        for decision in &decisions {
            let _ = writeln!(out);
            render_decision(&mut out, decision);
        }
        out
    }
}

fn render_decision(out: &mut String, decision: &DecisionRecord) {
    let _ = writeln!(out, "## {}: {}", decision.id, decision.summary);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "- **Author**: {} | **Type**: {} | **Status**: {}",
        decision.author, decision.decision_type, decision.status
    );
    let _ = writeln!(
        out,
        "- **Project**: {} | **Phase**: {}",
        decision.project, decision.phase
    );
    let _ = writeln!(out, "- **Proposed**: {}", decision.created_at.to_rfc3339());
    let _ = writeln!(out, "- **Rationale**: {}", decision.rationale);
    if !decision.evidence.is_empty() {
        let _ = writeln!(out, "- **Evidence**: {}", decision.evidence.join(", "));
    }
    if let Some(supersedes) = &decision.supersedes {
        let _ = writeln!(out, "- **Supersedes**: {supersedes}");
    }
    if !decision.superseded_by.is_empty() {
        let _ = writeln!(
            out,
            "- **Superseded by**: {}",
            decision.superseded_by.join(", ")
        );
    }
    if !decision.dependencies.is_empty() {
        let _ = writeln!(
            out,
            "- **Depends on**: {}",
            decision.dependencies.join(", ")
        );
    }

    if decision.challenge_history.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "### Challenge history ({} round(s))",
        decision.challenge_rounds
    );
    for entry in &decision.challenge_history {
        let _ = writeln!(
            out,
            "- Round {}: **{}** by {}: {}",
            entry.round, entry.action, entry.challenger, entry.rationale
        );
        if let Some(counter) = &entry.counter_proposal {
            let _ = writeln!(out, "  - Counter-proposal: {counter}");
        }
    }
}
