//! Risk Scoring Engine
//!
//! A sequence of column-wide transforms over a loaded table. Order matters:
//! later steps depend on columns written by earlier ones, and the
//! correlation step mutates the column the adjusted-score steps initialize.
//! `run_all` composes the steps in the required order.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::classifier::event::{COL_EVENT_PATTERN, COL_SOURCE_IP, COL_TIMESTAMP, COL_USER_ID};
use crate::dataset::table::{Table, Value};
use crate::error::{Error, Result};

use super::rules::{
    ScoringConfig, ADJUSTED_RISK_SCORE_COL, BASE_RISK_SCORES, BASE_RISK_SCORE_COL,
    BRUTEFORCE_EVENTS, BRUTE_FORCE_COL, INSIDER_BRUTE_FORCE_COL, SUCCESSFUL_LOGIN_COL,
    SUCCESSFUL_LOGIN_EVENTS, TRUSTED_NETWORK_COL, UNIX_TIMESTAMP_COL,
};

pub struct RiskScoringEngine {
    config: ScoringConfig,
}

impl RiskScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Step 1: look up the base risk score for every row by event pattern.
    /// A pattern with no map entry is a configuration invariant violation.
    pub fn score_base(&self, table: &mut Table) -> Result<()> {
        let mut scores = Vec::with_capacity(table.row_count());
        for i in 0..table.row_count() {
            let pattern = table.get(i, COL_EVENT_PATTERN);
            let name = pattern.as_str().unwrap_or_default();
            match BASE_RISK_SCORES.get(name) {
                Some(score) => scores.push(*score),
                None => {
                    return Err(Error::UnscoredPatternName {
                        pattern: name.to_string(),
                    })
                }
            }
        }
        for (i, score) in scores.into_iter().enumerate() {
            table.set(i, BASE_RISK_SCORE_COL, Value::Int(score));
        }
        Ok(())
    }

    /// Derive Unix seconds from the textual event time field.
    ///
    /// Caveat (inherited from the source data, not fixed here): when the
    /// configured format carries no year, every event is pinned to the
    /// configured default year. A year-less log spanning a year boundary
    /// will therefore be misordered — January records sort before the
    /// December records that actually preceded them.
    pub fn derive_timestamps(&self, table: &mut Table) {
        let mut stamps = Vec::with_capacity(table.row_count());
        for i in 0..table.row_count() {
            let stamp = table
                .get(i, COL_TIMESTAMP)
                .as_str()
                .and_then(|text| self.parse_unix_seconds(text));
            stamps.push(stamp);
        }
        for (i, stamp) in stamps.into_iter().enumerate() {
            let value = stamp.map(Value::Int).unwrap_or(Value::Null);
            table.set(i, UNIX_TIMESTAMP_COL, value);
        }
    }

    fn parse_unix_seconds(&self, text: &str) -> Option<i64> {
        // Syslog pads single-digit days with an extra space; collapse runs
        // of whitespace before parsing.
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let format = &self.config.timestamp_format;
        let has_year = format.contains("%Y") || format.contains("%y");
        let parsed = if has_year {
            NaiveDateTime::parse_from_str(&normalized, format)
        } else {
            NaiveDateTime::parse_from_str(
                &format!("{} {}", self.config.default_year, normalized),
                &format!("%Y {}", format),
            )
        };
        parsed.ok().map(|dt| dt.and_utc().timestamp())
    }

    /// Step 2: per-event boolean flags.
    pub fn compute_flags(&self, table: &mut Table) {
        let prefixes = &self.config.trusted_network_prefixes;
        let mut flags = Vec::with_capacity(table.row_count());
        for i in 0..table.row_count() {
            let name = table.get(i, COL_EVENT_PATTERN).as_str().unwrap_or_default();
            let login = SUCCESSFUL_LOGIN_EVENTS.contains(&name);
            let brute = BRUTEFORCE_EVENTS.contains(&name);
            let trusted = table
                .get(i, COL_SOURCE_IP)
                .as_str()
                .map(|ip| prefixes.iter().any(|p| ip.starts_with(p.as_str())))
                .unwrap_or(false);
            flags.push((login, brute, trusted));
        }
        for (i, (login, brute, trusted)) in flags.into_iter().enumerate() {
            table.set(i, SUCCESSFUL_LOGIN_COL, Value::Bool(login));
            table.set(i, BRUTE_FORCE_COL, Value::Bool(brute));
            table.set(i, TRUSTED_NETWORK_COL, Value::Bool(trusted));
            table.set(i, INSIDER_BRUTE_FORCE_COL, Value::Bool(brute && trusted));
        }
    }

    /// Step 3: adjusted score starts equal to the base score.
    pub fn initialize_adjusted(&self, table: &mut Table) {
        let base: Vec<Value> = (0..table.row_count())
            .map(|i| table.get(i, BASE_RISK_SCORE_COL).clone())
            .collect();
        for (i, value) in base.into_iter().enumerate() {
            table.set(i, ADJUSTED_RISK_SCORE_COL, value);
        }
    }

    /// Step 4: insider brute-force rows get a flat bonus.
    pub fn apply_insider_penalty(&self, table: &mut Table, bonus: i64) {
        for i in 0..table.row_count() {
            if table.get(i, INSIDER_BRUTE_FORCE_COL).as_bool() == Some(true) {
                self.add_to_adjusted(table, i, bonus);
            }
        }
    }

    fn add_to_adjusted(&self, table: &mut Table, row: usize, bonus: i64) {
        if let Some(current) = table.get(row, ADJUSTED_RISK_SCORE_COL).as_i64() {
            table.set(row, ADJUSTED_RISK_SCORE_COL, Value::Int(current + bonus));
        }
    }

    /// Step 5: escalate brute-force attempts followed by a successful
    /// login for the same identity within the window.
    ///
    /// Logins and attacks are grouped by user id, paired per identity, and
    /// a pair is kept iff `attack_ts <= login_ts <= attack_ts + window`.
    /// Each distinct login row and each distinct attack row appearing in
    /// any kept pair is bonused exactly once, however many pairs it is in.
    /// Rows with a null identity or timestamp never participate.
    ///
    /// Must run after `initialize_adjusted` — it mutates the same column.
    pub fn correlate_brute_force_success(&self, table: &mut Table, window_secs: i64, bonus: i64) {
        let mut logins: HashMap<String, Vec<(usize, i64)>> = HashMap::new();
        let mut attacks: HashMap<String, Vec<(usize, i64)>> = HashMap::new();

        for i in 0..table.row_count() {
            let user = match table.get(i, COL_USER_ID).as_str() {
                Some(u) if !u.is_empty() => u.to_string(),
                _ => continue,
            };
            let ts = match table.get(i, UNIX_TIMESTAMP_COL).as_i64() {
                Some(t) => t,
                None => continue,
            };
            if table.get(i, SUCCESSFUL_LOGIN_COL).as_bool() == Some(true) {
                logins.entry(user.clone()).or_default().push((i, ts));
            }
            if table.get(i, BRUTE_FORCE_COL).as_bool() == Some(true) {
                attacks.entry(user).or_default().push((i, ts));
            }
        }

        let mut bonused_logins: HashSet<usize> = HashSet::new();
        let mut bonused_attacks: HashSet<usize> = HashSet::new();

        for (user, user_logins) in &logins {
            let Some(user_attacks) = attacks.get(user) else {
                continue;
            };
            for &(login_row, login_ts) in user_logins {
                for &(attack_row, attack_ts) in user_attacks {
                    // An attack after the login never counts.
                    if attack_ts <= login_ts && login_ts <= attack_ts + window_secs {
                        bonused_logins.insert(login_row);
                        bonused_attacks.insert(attack_row);
                    }
                }
            }
        }

        if !bonused_logins.is_empty() {
            log::info!(
                "correlated {} login row(s) with {} brute-force row(s) within {}s",
                bonused_logins.len(),
                bonused_attacks.len(),
                window_secs
            );
        }
        for row in bonused_logins.into_iter().chain(bonused_attacks) {
            self.add_to_adjusted(table, row, bonus);
        }
    }

    /// Steps 1-5 in order, then a stable chronological sort (rows with an
    /// unparseable time sort last, ties keep original order).
    pub fn run_all(&self, table: &mut Table) -> Result<()> {
        self.score_base(table)?;
        self.derive_timestamps(table);
        self.compute_flags(table);
        self.initialize_adjusted(table);
        self.apply_insider_penalty(table, self.config.insider_bonus);
        self.correlate_brute_force_success(
            table,
            self.config.correlation_window_secs,
            self.config.correlation_bonus,
        );
        table.sort_by_numeric_column(UNIX_TIMESTAMP_COL);
        Ok(())
    }
}
