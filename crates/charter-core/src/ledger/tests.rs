//! Tests for the decision ledger.

use proptest::prelude::*;
use tempfile::TempDir;

use super::*;

fn propose_input(author: &str, summary: &str) -> ProposeDecision {
    ProposeDecision {
        author: author.to_string(),
        decision_type: "strategic".to_string(),
        summary: summary.to_string(),
        rationale: "because".to_string(),
        phase: 1,
        ..ProposeDecision::default()
    }
}

#[test]
fn propose_assigns_monotonic_ids() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let first = ledger
        .propose(propose_input("ceo", "first"))
        .expect("propose must succeed");
    let second = ledger
        .propose(propose_input("cto", "second"))
        .expect("propose must succeed");
    assert_eq!(first.id, "DEC-0001");
    assert_eq!(second.id, "DEC-0002");
    assert_eq!(first.status, DecisionStatus::Proposed);
    assert_eq!(first.challenge_rounds, 0);
    assert_eq!(first.project, "acme");
}

#[test]
fn challenge_absent_decision_is_not_found() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let err = ledger
        .challenge("DEC-9999", "cto", "nope", None)
        .expect_err("absent id must fail");
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[test]
fn challenge_appends_history_and_tracks_challengers() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let decision = ledger.propose(propose_input("ceo", "d")).expect("propose");

    ledger
        .challenge(&decision.id, "cto", "too risky", Some("do less".to_string()))
        .expect("challenge");
    let updated = ledger
        .challenge(&decision.id, "cto", "still too risky", None)
        .expect("challenge");

    assert_eq!(updated.status, DecisionStatus::Challenged);
    assert_eq!(updated.challenge_rounds, 2);
    assert_eq!(updated.challenge_history.len(), 2);
    assert_eq!(updated.challenge_history[0].round, 1);
    assert_eq!(updated.challenge_history[1].round, 2);
    assert_eq!(
        updated.challenge_history[0].counter_proposal.as_deref(),
        Some("do less")
    );
    // Repeat challengers are recorded once.
    assert_eq!(updated.challenged_by, vec!["cto".to_string()]);
}

#[test]
fn accepted_decision_cannot_be_rechallenged() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let decision = ledger.propose(propose_input("ceo", "d")).expect("propose");
    let accepted = ledger
        .accept(&decision.id, "cto", "fine")
        .expect("accept must succeed");
    assert_eq!(accepted.status, DecisionStatus::Accepted);
    assert_eq!(
        accepted.challenge_history.last().map(|r| r.action),
        Some(RoundAction::Accepted)
    );

    let err = ledger
        .challenge(&decision.id, "cto", "wait", None)
        .expect_err("terminal decision must not reopen");
    assert!(matches!(
        err,
        LedgerError::AlreadyResolved {
            status: DecisionStatus::Accepted,
            ..
        }
    ));
}

#[test]
fn escalated_is_terminal_with_no_path_back() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let decision = ledger.propose(propose_input("ceo", "d")).expect("propose");
    ledger.escalate(&decision.id).expect("escalate");

    for result in [
        ledger.challenge(&decision.id, "cto", "r", None).err(),
        ledger.accept(&decision.id, "cto", "r").err(),
        ledger.reject(&decision.id, "cto", "r").err(),
        ledger.escalate(&decision.id).err(),
    ] {
        assert!(matches!(
            result,
            Some(LedgerError::AlreadyResolved {
                status: DecisionStatus::Escalated,
                ..
            })
        ));
    }
}

#[test]
fn reject_is_terminal() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let decision = ledger.propose(propose_input("ceo", "d")).expect("propose");
    let rejected = ledger
        .reject(&decision.id, "cto", "unsound")
        .expect("reject");
    assert_eq!(rejected.status, DecisionStatus::Rejected);
    assert!(ledger.accept(&decision.id, "cto", "r").is_err());
}

#[test]
fn supersede_requires_declared_backward_link() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let old = ledger.propose(propose_input("ceo", "v1")).expect("propose");
    let unrelated = ledger.propose(propose_input("ceo", "v2")).expect("propose");

    let err = ledger
        .supersede(&old.id, &unrelated.id)
        .expect_err("missing backward link must fail");
    assert!(matches!(err, LedgerError::InvalidSupersession { .. }));

    let replacement = ledger
        .propose(ProposeDecision {
            supersedes: Some(old.id.clone()),
            ..propose_input("ceo", "v1 revised")
        })
        .expect("propose");
    let superseded = ledger
        .supersede(&old.id, &replacement.id)
        .expect("supersede");
    assert_eq!(superseded.status, DecisionStatus::Superseded);

    let err = ledger
        .supersede(&old.id, &replacement.id)
        .expect_err("double supersede must fail");
    assert!(matches!(err, LedgerError::AlreadyResolved { .. }));
}

#[test]
fn chain_walks_back_to_root_in_order() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let v1 = ledger.propose(propose_input("ceo", "v1")).expect("propose");
    let v2 = ledger
        .propose(ProposeDecision {
            supersedes: Some(v1.id.clone()),
            ..propose_input("ceo", "v2")
        })
        .expect("propose");
    ledger.supersede(&v1.id, &v2.id).expect("supersede");
    let v3 = ledger
        .propose(ProposeDecision {
            supersedes: Some(v2.id.clone()),
            ..propose_input("ceo", "v3")
        })
        .expect("propose");
    ledger.supersede(&v2.id, &v3.id).expect("supersede");

    let chain = ledger.chain(&v3.id).expect("chain");
    let ids: Vec<&str> = chain.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["DEC-0001", "DEC-0002", "DEC-0003"]);
}

#[test]
fn forward_chain_may_branch() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let root = ledger.propose(propose_input("ceo", "root")).expect("propose");
    for summary in ["branch a", "branch b"] {
        ledger
            .propose(ProposeDecision {
                supersedes: Some(root.id.clone()),
                ..propose_input("ceo", summary)
            })
            .expect("propose");
    }

    let forward = ledger.forward_chain(&root.id).expect("forward chain");
    let ids: Vec<&str> = forward.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["DEC-0001", "DEC-0002", "DEC-0003"]);
}

#[test]
fn dependency_indices_are_maintained_incrementally() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let base = ledger.propose(propose_input("ceo", "base")).expect("propose");
    let dependent = ledger
        .propose(ProposeDecision {
            dependencies: vec![base.id.clone()],
            ..propose_input("cto", "dependent")
        })
        .expect("propose");

    let deps = ledger.dependency_graph(&dependent.id).expect("deps");
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].id, base.id);

    let dependents = ledger.dependents(&base.id).expect("dependents");
    assert_eq!(dependents.len(), 1);
    assert_eq!(dependents[0].id, dependent.id);
}

#[test]
fn propose_with_unknown_dependency_fails() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let err = ledger
        .propose(ProposeDecision {
            dependencies: vec!["DEC-0042".to_string()],
            ..propose_input("ceo", "d")
        })
        .expect_err("unknown dependency must fail");
    assert!(matches!(err, LedgerError::UnknownDependency { .. }));
}

#[test]
fn query_filters_conjunctively() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let a = ledger.propose(propose_input("ceo", "a")).expect("propose");
    ledger.propose(propose_input("cto", "b")).expect("propose");
    ledger.challenge(&a.id, "cto", "objection", None).expect("challenge");

    let by_author = ledger.query(&DecisionFilter {
        author: Some("ceo".to_string()),
        ..DecisionFilter::default()
    });
    assert_eq!(by_author.len(), 1);

    let challenged = ledger.query(&DecisionFilter {
        challenged: Some(true),
        ..DecisionFilter::default()
    });
    assert_eq!(challenged.len(), 1);
    assert_eq!(challenged[0].id, a.id);

    let none = ledger.query(&DecisionFilter {
        author: Some("ceo".to_string()),
        status: Some(DecisionStatus::Accepted),
        ..DecisionFilter::default()
    });
    assert!(none.is_empty());
}

#[test]
fn markdown_export_includes_challenge_history() {
    let mut ledger = DecisionLedger::in_memory("acme");
    let decision = ledger.propose(propose_input("ceo", "export me")).expect("propose");
    ledger
        .challenge(&decision.id, "cto", "needs narrowing", Some("narrow it".to_string()))
        .expect("challenge");

    let markdown = ledger.export_markdown(&DecisionFilter::default());
    assert!(markdown.contains("DEC-0001"));
    assert!(markdown.contains("export me"));
    assert!(markdown.contains("Round 1"));
    assert!(markdown.contains("needs narrowing"));
    assert!(markdown.contains("narrow it"));

    let json = ledger.export_json(&DecisionFilter::default()).expect("json");
    let parsed: Vec<DecisionRecord> = serde_json::from_str(&json).expect("parse");
    assert_eq!(parsed.len(), 1);
}

#[test]
fn ids_survive_restart_without_reuse() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("ledger.json");

    {
        let mut ledger = DecisionLedger::open(&path, "acme").expect("open");
        ledger.propose(propose_input("ceo", "one")).expect("propose");
        ledger.propose(propose_input("ceo", "two")).expect("propose");
    }

    let mut reopened = DecisionLedger::open(&path, "acme").expect("reopen");
    assert_eq!(reopened.len(), 2);
    assert_eq!(
        reopened.get("DEC-0001").map(|d| d.summary.as_str()),
        Some("one")
    );
    let third = reopened.propose(propose_input("ceo", "three")).expect("propose");
    assert_eq!(third.id, "DEC-0003");
}

#[test]
fn open_rejects_snapshot_for_other_project() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("ledger.json");
    {
        let mut ledger = DecisionLedger::open(&path, "acme").expect("open");
        ledger.propose(propose_input("ceo", "one")).expect("propose");
    }
    let err = DecisionLedger::open(&path, "other").expect_err("project mismatch must fail");
    assert!(matches!(err, LedgerError::SnapshotLoad { .. }));
}

#[test]
fn transitions_persist_immediately() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("ledger.json");
    {
        let mut ledger = DecisionLedger::open(&path, "acme").expect("open");
        let d = ledger.propose(propose_input("ceo", "one")).expect("propose");
        ledger.challenge(&d.id, "cto", "objection", None).expect("challenge");
    }
    let reopened = DecisionLedger::open(&path, "acme").expect("reopen");
    let record = reopened.get("DEC-0001").expect("record");
    assert_eq!(record.status, DecisionStatus::Challenged);
    assert_eq!(record.challenge_rounds, 1);
    assert_eq!(record.challenge_history.len(), 1);
}

proptest! {
    /// Decision ids are strictly increasing in proposal order.
    #[test]
    fn ids_strictly_increase(count in 1usize..30) {
        let mut ledger = DecisionLedger::in_memory("acme");
        let mut previous = 0u64;
        for i in 0..count {
            let record = ledger
                .propose(propose_input("ceo", &format!("d{i}")))
                .expect("propose");
            let seq: u64 = record.id
                .strip_prefix("DEC-")
                .expect("id prefix")
                .parse()
                .expect("id digits");
            prop_assert!(seq > previous);
            previous = seq;
        }
    }

    /// `challenge_rounds` is non-decreasing across any mutation sequence.
    #[test]
    fn rounds_never_decrease(challenges in 0u32..8) {
        let mut ledger = DecisionLedger::in_memory("acme");
        let decision = ledger.propose(propose_input("ceo", "d")).expect("propose");
        let mut last = 0u32;
        for i in 0..challenges {
            let updated = ledger
                .challenge(&decision.id, "cto", &format!("round {i}"), None)
                .expect("challenge");
            prop_assert!(updated.challenge_rounds >= last);
            prop_assert_eq!(updated.challenge_rounds, i + 1);
            last = updated.challenge_rounds;
        }
    }
}
