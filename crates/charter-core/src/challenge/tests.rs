//! Tests for the challenge workflow engine.

use std::collections::BTreeMap;

use proptest::prelude::*;

use super::*;
use crate::config::RoleId;
use crate::ledger::{DecisionLedger, DecisionStatus, LedgerError, ProposeDecision};

fn roles() -> BTreeMap<RoleId, Vec<RoleId>> {
    let mut map = BTreeMap::new();
    map.insert(
        RoleId::parse("ceo").expect("role id"),
        vec![RoleId::parse("cto").expect("role id")],
    );
    map.insert(RoleId::parse("cto").expect("role id"), vec![]);
    map
}

fn engine(max_rounds: u32, auto_escalate: bool) -> ChallengeEngine {
    ChallengeEngine::new(
        roles(),
        ChallengePolicy {
            max_rounds,
            auto_escalate,
        },
    )
}

fn propose(ledger: &mut DecisionLedger, author: &str) -> String {
    ledger
        .propose(ProposeDecision {
            author: author.to_string(),
            decision_type: "strategic".to_string(),
            summary: "decision under test".to_string(),
            rationale: "because".to_string(),
            ..ProposeDecision::default()
        })
        .expect("propose")
        .id
}

fn counter_input(summary: &str) -> CounterProposalInput {
    CounterProposalInput {
        summary: summary.to_string(),
        rationale: "alternative rationale".to_string(),
        impact: vec!["scope shrinks".to_string()],
    }
}

#[test]
fn can_execute_tracks_status_when_author_has_challengers() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let mut engine = engine(3, true);
    let id = propose(&mut ledger, "ceo");

    assert!(!engine.can_execute(ledger.get(&id).expect("record")));

    engine
        .process_challenge(&mut ledger, &id, "cto", ChallengeAction::Accept, "fine", None)
        .expect("accept");
    assert!(engine.can_execute(ledger.get(&id).expect("record")));
}

#[test]
fn can_execute_unconditional_without_configured_challengers() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let engine = engine(3, true);
    // cto has an empty challenger list.
    let id = propose(&mut ledger, "cto");
    assert!(engine.can_execute(ledger.get(&id).expect("record")));
    // Unconfigured authors have no challengers either.
    let id = propose(&mut ledger, "freelancer");
    assert!(engine.can_execute(ledger.get(&id).expect("record")));
}

#[test]
fn unconfigured_challenger_is_not_authorized() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let mut engine = engine(3, true);
    let id = propose(&mut ledger, "ceo");

    let err = engine
        .process_challenge(&mut ledger, &id, "intern", ChallengeAction::Challenge, "no", None)
        .expect_err("must be rejected");
    assert!(matches!(err, ChallengeError::NotAuthorized { .. }));
}

#[test]
fn absent_decision_is_not_found() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let mut engine = engine(3, true);
    let err = engine
        .process_challenge(
            &mut ledger,
            "DEC-0404",
            "cto",
            ChallengeAction::Challenge,
            "no",
            None,
        )
        .expect_err("must be rejected");
    assert!(matches!(
        err,
        ChallengeError::Ledger(LedgerError::NotFound { .. })
    ));
}

#[test]
fn resolved_decision_cannot_be_reopened() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let mut engine = engine(3, true);
    let id = propose(&mut ledger, "ceo");
    engine
        .process_challenge(&mut ledger, &id, "cto", ChallengeAction::Accept, "fine", None)
        .expect("accept");

    let err = engine
        .process_challenge(&mut ledger, &id, "cto", ChallengeAction::Challenge, "wait", None)
        .expect_err("terminal decision must not reopen");
    assert!(matches!(
        err,
        ChallengeError::AlreadyResolved {
            status: DecisionStatus::Accepted,
            ..
        }
    ));
}

#[test]
fn challenge_materializes_counter_proposal() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let mut engine = engine(3, true);
    let id = propose(&mut ledger, "ceo");

    let result = engine
        .process_challenge(
            &mut ledger,
            &id,
            "cto",
            ChallengeAction::Challenge,
            "too broad",
            Some(counter_input("narrow the scope")),
        )
        .expect("challenge");

    assert_eq!(result.outcome, ChallengeOutcome::Challenged);
    assert!(result.requires_revision);
    let cp_id = result.counter_proposal_id.expect("counter-proposal id");
    assert_eq!(cp_id, format!("CP-{id}-1"));

    let proposal = engine.counter_proposal(&cp_id).expect("stored");
    assert_eq!(proposal.status, CounterProposalStatus::Pending);
    assert_eq!(proposal.round, 1);
    assert_eq!(proposal.proposed_by, "cto");
}

#[test]
fn accept_supersedes_pending_counter_proposals() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let mut engine = engine(3, true);
    let id = propose(&mut ledger, "ceo");

    let result = engine
        .process_challenge(
            &mut ledger,
            &id,
            "cto",
            ChallengeAction::Challenge,
            "too broad",
            Some(counter_input("narrow the scope")),
        )
        .expect("challenge");
    let cp_id = result.counter_proposal_id.expect("cp id");

    engine
        .process_challenge(&mut ledger, &id, "cto", ChallengeAction::Accept, "revised", None)
        .expect("accept");

    let proposal = engine.counter_proposal(&cp_id).expect("stored");
    assert_eq!(proposal.status, CounterProposalStatus::Superseded);
    assert_eq!(
        proposal.resolution_notes.as_deref(),
        Some("Decision accepted")
    );
}

#[test]
fn third_challenge_auto_escalates_at_limit() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let mut engine = engine(3, true);
    let id = propose(&mut ledger, "ceo");

    for round in 1..=2 {
        let result = engine
            .process_challenge(
                &mut ledger,
                &id,
                "cto",
                ChallengeAction::Challenge,
                &format!("objection {round}"),
                None,
            )
            .expect("challenge");
        assert_eq!(result.outcome, ChallengeOutcome::Challenged);
    }

    let result = engine
        .process_challenge(
            &mut ledger,
            &id,
            "cto",
            ChallengeAction::Challenge,
            "objection 3",
            None,
        )
        .expect("challenge");

    assert_eq!(result.outcome, ChallengeOutcome::Escalated);
    let record = ledger.get(&id).expect("record");
    assert_eq!(record.status, DecisionStatus::Escalated);
    assert_eq!(record.challenge_history.len(), 3);
    assert_eq!(record.challenge_rounds, 3);
}

#[test]
fn challenge_past_limit_forces_escalation_without_new_round() {
    let mut ledger = DecisionLedger::in_memory("acme");
    // Auto-escalation off: the limit round is recorded but does not
    // escalate.
    let mut engine = engine(2, false);
    let id = propose(&mut ledger, "ceo");

    for round in 1..=2 {
        let result = engine
            .process_challenge(
                &mut ledger,
                &id,
                "cto",
                ChallengeAction::Challenge,
                &format!("objection {round}"),
                None,
            )
            .expect("challenge");
        assert_eq!(result.outcome, ChallengeOutcome::Challenged);
    }
    assert_eq!(
        ledger.get(&id).expect("record").status,
        DecisionStatus::Challenged
    );

    let result = engine
        .process_challenge(
            &mut ledger,
            &id,
            "cto",
            ChallengeAction::Challenge,
            "one too many",
            None,
        )
        .expect("challenge");
    assert_eq!(result.outcome, ChallengeOutcome::Escalated);
    // Escalation past the limit records no further round.
    let record = ledger.get(&id).expect("record");
    assert_eq!(record.challenge_rounds, 2);
    assert_eq!(record.challenge_history.len(), 2);
}

#[test]
fn auto_escalation_supersedes_pending_counter_proposals() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let mut engine = engine(1, true);
    let id = propose(&mut ledger, "ceo");

    let result = engine
        .process_challenge(
            &mut ledger,
            &id,
            "cto",
            ChallengeAction::Challenge,
            "objection",
            Some(counter_input("alternative")),
        )
        .expect("challenge");
    assert_eq!(result.outcome, ChallengeOutcome::Escalated);

    let cp_id = result.counter_proposal_id.expect("cp id");
    let proposal = engine.counter_proposal(&cp_id).expect("stored");
    assert_eq!(proposal.status, CounterProposalStatus::Superseded);
    assert_eq!(
        proposal.resolution_notes.as_deref(),
        Some("Auto-escalated at round limit")
    );
}

#[test]
fn counter_proposal_resolution_is_pending_only() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let mut engine = engine(3, true);
    let id = propose(&mut ledger, "ceo");
    let cp_id = engine
        .process_challenge(
            &mut ledger,
            &id,
            "cto",
            ChallengeAction::Challenge,
            "objection",
            Some(counter_input("alternative")),
        )
        .expect("challenge")
        .counter_proposal_id
        .expect("cp id");

    let err = engine
        .resolve_counter_proposal(&cp_id, CounterProposalStatus::Pending, None)
        .expect_err("pending is not a resolution");
    assert!(matches!(err, ChallengeError::InvalidResolution { .. }));

    let resolved = engine
        .resolve_counter_proposal(
            &cp_id,
            CounterProposalStatus::Accepted,
            Some("adopted".to_string()),
        )
        .expect("resolve");
    assert_eq!(resolved.status, CounterProposalStatus::Accepted);
    assert!(resolved.resolved_at.is_some());

    let err = engine
        .resolve_counter_proposal(&cp_id, CounterProposalStatus::Rejected, None)
        .expect_err("already resolved");
    assert!(matches!(
        err,
        ChallengeError::CounterProposalAlreadyResolved { .. }
    ));

    let err = engine
        .resolve_counter_proposal("CP-DEC-0404-1", CounterProposalStatus::Rejected, None)
        .expect_err("absent id");
    assert!(matches!(err, ChallengeError::CounterProposalNotFound { .. }));
}

#[test]
fn audit_trail_joins_history_and_counter_proposals() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let mut engine = engine(3, true);

    let challenged = propose(&mut ledger, "ceo");
    engine
        .process_challenge(
            &mut ledger,
            &challenged,
            "cto",
            ChallengeAction::Challenge,
            "objection",
            Some(counter_input("alternative")),
        )
        .expect("challenge");
    engine
        .process_challenge(
            &mut ledger,
            &challenged,
            "cto",
            ChallengeAction::Accept,
            "revised",
            None,
        )
        .expect("accept");

    // Never-challenged decisions stay out of the trail.
    propose(&mut ledger, "ceo");

    let trails = engine.audit_trail(&ledger, None);
    assert_eq!(trails.len(), 1);
    let trail = &trails[0];
    assert_eq!(trail.decision.id, challenged);
    assert_eq!(trail.counter_proposals.len(), 1);
    assert!(trail.resolution_latency_secs.is_some());

    let stats = ChallengeEngine::trail_stats(&trails);
    assert_eq!(stats.decisions, 1);
    assert_eq!(stats.escalated, 0);
    assert!((stats.average_rounds - 1.0).abs() < f64::EPSILON);
    assert_eq!(stats.counter_proposals, 1);
}

#[test]
fn trail_exports_render() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let mut engine = engine(1, true);
    let id = propose(&mut ledger, "ceo");
    engine
        .process_challenge(
            &mut ledger,
            &id,
            "cto",
            ChallengeAction::Challenge,
            "objection",
            None,
        )
        .expect("challenge");

    let json = engine.export_trail_json(&ledger, None).expect("json");
    let export: TrailExport = serde_json::from_str(&json).expect("parse");
    assert_eq!(export.stats.escalated, 1);
    assert!((export.stats.escalation_rate - 1.0).abs() < f64::EPSILON);

    let markdown = engine.export_trail_markdown(&ledger, None);
    assert!(markdown.contains(&id));
    assert!(markdown.contains("Round 1"));
    assert!(markdown.contains("1 escalated"));
}

proptest! {
    /// Rounds never exceed the configured limit before escalation fires,
    /// and escalation is terminal.
    #[test]
    fn rounds_capped_by_limit(max_rounds in 1u32..6, attempts in 1u32..12) {
        let mut ledger = DecisionLedger::in_memory("acme");
        let mut engine = engine(max_rounds, true);
        let id = propose(&mut ledger, "ceo");

        for i in 0..attempts {
            let record = ledger.get(&id).expect("record").clone();
            let result = engine.process_challenge(
                &mut ledger,
                &id,
                "cto",
                ChallengeAction::Challenge,
                &format!("objection {i}"),
                None,
            );
            if record.status.is_terminal() {
                let already_resolved = matches!(result, Err(ChallengeError::AlreadyResolved { .. }));
                prop_assert!(already_resolved);
            } else {
                result.expect("challenge");
            }
            let rounds = ledger.get(&id).expect("record").challenge_rounds;
            prop_assert!(rounds <= max_rounds);
        }
    }
}
