//! Risk Scoring
//!
//! Maps classified events to base risk scores, computes per-event flags,
//! and correlates brute-force attempts with later successful logins for
//! the same identity to escalate risk.
//!
//! ## Structure
//! - `rules`: score map, pattern sets, configurable knobs
//! - `engine`: the column-transform pipeline

pub mod engine;
pub mod rules;

pub use engine::RiskScoringEngine;
pub use rules::{
    ScoringConfig, ADJUSTED_RISK_SCORE_COL, BASE_RISK_SCORES, BASE_RISK_SCORE_COL,
    BRUTEFORCE_EVENTS, BRUTE_FORCE_COL, INSIDER_BRUTE_FORCE_COL, SUCCESSFUL_LOGIN_COL,
    SUCCESSFUL_LOGIN_EVENTS, TRUSTED_NETWORK_COL, UNIX_TIMESTAMP_COL,
};
