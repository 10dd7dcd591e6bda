//! Phase gate engine: verdict-driven phase advancement.
//!
//! Verdict-issuing roles record [`GateVerdict`]s; the engine consumes them
//! to permit or block phase advancement. Advancement is strictly
//! single-step and only through the gate configured for that transition.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use charter_core::config::GateRule;
//! use charter_core::gate::{GateVerdict, PhaseGateEngine, Verdict};
//!
//! # fn example() -> Result<(), charter_core::gate::GateError> {
//! let mut engine = PhaseGateEngine::in_memory(vec![GateRule {
//!     gate_id: "G2-design-review".into(),
//!     from_phase: 2,
//!     to_phase: 3,
//! }]);
//!
//! engine.record_verdict(GateVerdict {
//!     gate_id: "G2-design-review".into(),
//!     verdict: Verdict::Pass,
//!     issued_by: "qa-lead".into(),
//!     timestamp: Utc::now(),
//!     metrics: None,
//!     blocking_issues: vec![],
//!     warnings: vec![],
//!     conditions: vec![],
//!     expires_at: None,
//!     project: "acme".into(),
//!     phase: 2,
//! })?;
//!
//! let result = engine.advance_phase("acme", "G2-design-review", 2, 3, "implementation")?;
//! assert!(result.advanced);
//! assert_eq!(result.current_phase, 3);
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod verdict;


pub use engine::{
    AdvanceCheck, AdvanceResult, GATE_SNAPSHOT_SCHEMA, MAX_SNAPSHOT_SIZE, PhaseGateEngine,
    VerdictFilter,
};
pub use error::GateError;
pub use verdict::{GateVerdict, PhaseState, PhaseStatus, TestMetrics, Verdict};
