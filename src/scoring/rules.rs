//! Risk scoring rules
//!
//! Base score map, event pattern sets, and the configurable knobs of the
//! scoring engine. No scoring logic lives here — only constants and config.
//!
//! Scores are graded 0-100 from a security perspective: 0 is purely
//! informational, 100 a certain or near-certain break-in.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::classifier::event::UNKNOWN_PATTERN;
use crate::classifier::patterns::{DEFAULT_PATTERN, EXTENDED_PATTERN};

// ============================================================================
// BASE RISK SCORES
// ============================================================================

/// Base risk score per event pattern. Every name the classifier can
/// produce — including both catch-alls and the `UNKNOWN` sentinel — has an
/// entry; a missing entry is a configuration violation, not a silent zero.
pub static BASE_RISK_SCORES: Lazy<HashMap<&'static str, i64>> = Lazy::new(|| {
    HashMap::from([
        ("Reverse Mapping Issue", 50),
        ("Reverse Mapping Check Failure", 70), // likely IP spoofing
        ("Invalid User", 40),                  // probing for weak accounts
        ("Authentication Failure", 60),
        ("Successful Login", 20), // informational unless preceded by failures
        ("Disconnection", 5),
        ("Too Many Authentication Failures", 60), // brute force
        ("PAM Ignoring Max Retries", 70), // unlimited retries enable brute force
        ("Repeated PAM Authentication Failures", 60),
        ("Blocked IP Address", 10),
        ("Connection Reset by Peer", 20),
        ("Connection Closed by Peer", 20),
        ("Invalid User Auth Request", 50),
        ("PAM Check Pass (User Unknown)", 30),
        ("PAM Authentication Single Failure", 50),
        ("Repeated Password Failure", 70), // sustained brute force
        ("PAM Session Opened", 20),
        ("PAM Session Closed", 20),
        (EXTENDED_PATTERN, 10),
        (DEFAULT_PATTERN, 10),
        // Unmatched lines still flow through scoring with a low default.
        (UNKNOWN_PATTERN, 10),
    ])
});

/// Event patterns that correspond to successful logins.
pub const SUCCESSFUL_LOGIN_EVENTS: [&str; 2] = ["Successful Login", "PAM Session Opened"];

/// Event patterns that correspond to suspected brute-force attempts.
pub const BRUTEFORCE_EVENTS: [&str; 3] = [
    "Too Many Authentication Failures",
    "Repeated PAM Authentication Failures",
    "Repeated Password Failure",
];

// ============================================================================
// COLUMN LABELS
// ============================================================================

pub const BASE_RISK_SCORE_COL: &str = "base_risk_score";
pub const ADJUSTED_RISK_SCORE_COL: &str = "adjusted_risk_score";
pub const UNIX_TIMESTAMP_COL: &str = "unix_timestamp_secs";
pub const SUCCESSFUL_LOGIN_COL: &str = "successful_login";
pub const BRUTE_FORCE_COL: &str = "brute_force";
pub const TRUSTED_NETWORK_COL: &str = "trusted_network";
pub const INSIDER_BRUTE_FORCE_COL: &str = "insider_brute_force";

// ============================================================================
// DEFAULTS
// ============================================================================

/// Syslog time format found in OpenSSH logs, e.g. "Dec 10 07:22:46".
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%b %d %H:%M:%S";

/// Year assigned to parsed dates when the format carries none.
pub const DEFAULT_YEAR: i32 = 1970;

/// Correlation window between a brute-force event and a later successful
/// login, in seconds.
pub const DEFAULT_CORRELATION_WINDOW_SECS: i64 = 600;

/// Score added to each distinct login/attack row in a correlated pair.
pub const DEFAULT_CORRELATION_BONUS: i64 = 90;

/// Score added to brute-force events originating from a trusted network.
pub const DEFAULT_INSIDER_BONUS: i64 = 25;

/// Configurable knobs of the scoring engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Source-IP prefixes considered inside the trusted network.
    pub trusted_network_prefixes: Vec<String>,
    /// Correlation window in seconds.
    pub correlation_window_secs: i64,
    /// Bonus added once per distinct correlated row.
    pub correlation_bonus: i64,
    /// Bonus added to insider brute-force rows.
    pub insider_bonus: i64,
    /// chrono format for the textual event time field.
    pub timestamp_format: String,
    /// Year assumed when `timestamp_format` has no year component.
    pub default_year: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            trusted_network_prefixes: Vec::new(),
            correlation_window_secs: DEFAULT_CORRELATION_WINDOW_SECS,
            correlation_bonus: DEFAULT_CORRELATION_BONUS,
            insider_bonus: DEFAULT_INSIDER_BONUS,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            default_year: DEFAULT_YEAR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::patterns::RULES;

    #[test]
    fn every_producible_pattern_has_a_score() {
        for rule in RULES.iter() {
            assert!(
                BASE_RISK_SCORES.contains_key(rule.name),
                "no base score for pattern '{}'",
                rule.name
            );
        }
        assert!(BASE_RISK_SCORES.contains_key(UNKNOWN_PATTERN));
    }

    #[test]
    fn scores_are_within_grade_range() {
        for (name, score) in BASE_RISK_SCORES.iter() {
            assert!((0..=100).contains(score), "score out of range for '{}'", name);
        }
    }
}
