//! Tests for configuration parsing and validation.

use super::*;

const MINIMAL: &str = r#"
project_root = "/workspace/acme"

[roles.ceo]
challengers = ["cto"]

[roles.cto]
challengers = []
"#;

#[test]
fn role_id_accepts_lowercase_digits_underscore_hyphen() {
    for valid in ["ceo", "qa-lead", "agent_7", "x"] {
        let id = RoleId::parse(valid).expect("valid role id");
        assert_eq!(id.as_str(), valid);
    }
}

#[test]
fn role_id_rejects_invalid_values() {
    let err = RoleId::parse("").expect_err("empty");
    assert!(matches!(err, ConfigError::InvalidRoleId { .. }));

    let long = "a".repeat(MAX_ROLE_ID_LENGTH + 1);
    let err = RoleId::parse(&long).expect_err("too long");
    assert!(matches!(err, ConfigError::InvalidRoleId { .. }));

    for bad in ["CEO", "qa lead", "cto!", "rôle"] {
        let err = RoleId::parse(bad).expect_err("bad charset");
        assert!(matches!(err, ConfigError::InvalidRoleId { .. }), "{bad}");
    }
}

#[test]
fn minimal_config_parses_with_defaults() {
    let config = GovernanceConfig::from_toml(MINIMAL).expect("parse");

    assert_eq!(config.project_root, PathBuf::from("/workspace/acme"));
    assert_eq!(config.max_challenge_rounds, DEFAULT_MAX_CHALLENGE_ROUNDS);
    assert!(config.auto_escalate);
    assert_eq!(
        config.protected_paths,
        DEFAULT_PROTECTED_PATHS
            .iter()
            .map(|p| (*p).to_string())
            .collect::<Vec<_>>()
    );
    assert!(config.gates.is_empty());

    let ceo = RoleId::parse("ceo").expect("role id");
    let cto = RoleId::parse("cto").expect("role id");
    assert_eq!(config.roles[&ceo].challengers, vec![cto.clone()]);
    assert!(config.roles[&cto].challengers.is_empty());
}

#[test]
fn full_config_parses() {
    let config = GovernanceConfig::from_toml(
        r#"
project_root = "/workspace/acme"
max_challenge_rounds = 5
auto_escalate = false
protected_paths = ["board.yaml", "governance/**"]

[roles.ceo]
challengers = ["cto"]

[roles.cto]
challengers = []
metadata = { title = "Chief Technology Officer" }

[[gates]]
gate_id = "G1-design-review"
from_phase = 1
to_phase = 2

[[gates]]
gate_id = "G2-impl-review"
from_phase = 2
to_phase = 3
"#,
    )
    .expect("parse");

    assert_eq!(config.max_challenge_rounds, 5);
    assert!(!config.auto_escalate);
    assert_eq!(config.protected_paths.len(), 2);
    assert_eq!(config.gates.len(), 2);
    assert_eq!(config.gates[0].gate_id, "G1-design-review");

    let cto = RoleId::parse("cto").expect("role id");
    assert_eq!(
        config.roles[&cto].metadata.get("title").map(String::as_str),
        Some("Chief Technology Officer")
    );
}

#[test]
fn invalid_role_key_fails_at_parse() {
    let err = GovernanceConfig::from_toml(
        r#"
project_root = "/workspace/acme"

[roles.CEO]
challengers = []
"#,
    )
    .expect_err("uppercase role key");
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn unknown_challenger_is_rejected() {
    let err = GovernanceConfig::from_toml(
        r#"
project_root = "/workspace/acme"

[roles.ceo]
challengers = ["board"]
"#,
    )
    .expect_err("challenger not in role map");
    match err {
        ConfigError::UnknownChallenger { role, challenger } => {
            assert_eq!(role, "ceo");
            assert_eq!(challenger, "board");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_gate_transition_is_rejected() {
    let err = GovernanceConfig::from_toml(
        r#"
project_root = "/workspace/acme"

[[gates]]
gate_id = "G1"
from_phase = 1
to_phase = 2

[[gates]]
gate_id = "G1-bis"
from_phase = 1
to_phase = 2
"#,
    )
    .expect_err("two rules for 1 -> 2");
    assert!(matches!(err, ConfigError::DuplicateGateRule { .. }));
}

#[test]
fn non_adjacent_gate_rule_is_rejected() {
    let err = GovernanceConfig::from_toml(
        r#"
project_root = "/workspace/acme"

[[gates]]
gate_id = "G1"
from_phase = 1
to_phase = 3
"#,
    )
    .expect_err("gate must cover adjacent phases");
    assert!(matches!(err, ConfigError::NonAdjacentGateRule { .. }));
}

#[test]
fn zero_challenge_rounds_is_rejected() {
    let err = GovernanceConfig::from_toml(
        r#"
project_root = "/workspace/acme"
max_challenge_rounds = 0
"#,
    )
    .expect_err("zero rounds");
    assert!(matches!(err, ConfigError::Validation { .. }));
}

#[test]
fn empty_protected_pattern_is_rejected() {
    let err = GovernanceConfig::from_toml(
        r#"
project_root = "/workspace/acme"
protected_paths = ["board.yaml", ""]
"#,
    )
    .expect_err("empty pattern");
    assert!(matches!(err, ConfigError::Validation { .. }));
}

#[test]
fn challenger_map_and_policy_mirror_the_config() {
    let config = GovernanceConfig::from_toml(MINIMAL).expect("parse");

    let map = config.challenger_map();
    let ceo = RoleId::parse("ceo").expect("role id");
    assert_eq!(map[&ceo].len(), 1);

    let policy = config.challenge_policy();
    assert_eq!(policy.max_rounds, DEFAULT_MAX_CHALLENGE_ROUNDS);
    assert!(policy.auto_escalate);
}
