//! Log Pattern Classifier
//!
//! Matches raw OpenSSH log lines against the ordered rule list in
//! `patterns`, extracting named fields into a `ParsedEvent`. Lines nothing
//! matches (not even the catch-alls) classify as `UNKNOWN` with only the
//! raw line populated — an expected outcome, not a failure.

pub mod event;
pub mod patterns;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::DatasetDescriptor;
use crate::dataset::io::check_source;
use crate::dataset::table::Table;
use crate::error::Result;

pub use event::{ParsedEvent, UNKNOWN_PATTERN};
pub use patterns::{PatternRule, DEFAULT_PATTERN, EXTENDED_PATTERN, RULES};

/// Classify one log line. Rules are tried in priority order; the first
/// match names the pattern and supplies the captures.
pub fn classify(line: &str) -> ParsedEvent {
    for rule in RULES.iter() {
        if let Some(captures) = rule.regex.captures(line) {
            let mut event = ParsedEvent {
                pattern: rule.name.to_string(),
                raw_line: line.to_string(),
                ..Default::default()
            };
            for group in rule.regex.capture_names().flatten() {
                if let Some(m) = captures.name(group) {
                    event.set_capture(group, m.as_str());
                }
            }
            return event;
        }
    }
    ParsedEvent::unknown(line)
}

/// Parse a log source line by line into a table, one row per non-empty
/// line. Trailing line terminators are stripped so no emitted field ever
/// carries an embedded newline.
pub fn parse_source(descriptor: &DatasetDescriptor, path: &Path) -> Result<Table> {
    check_source(descriptor, path)?;

    let file = File::open(path).map_err(|e| crate::error::Error::EmptyOrInvalidSource {
        dataset_id: descriptor.id.clone(),
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut table = Table::new();
    let mut unmatched = 0usize;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| crate::error::Error::EmptyOrInvalidSource {
            dataset_id: descriptor.id.clone(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }
        let event = classify(line);
        if event.pattern == UNKNOWN_PATTERN {
            unmatched += 1;
        }
        table.push_row_ordered(event.into_pairs());
    }

    if unmatched > 0 {
        log::warn!(
            "dataset '{}': {} line(s) matched no pattern and were classified {}",
            descriptor.id,
            unmatched,
            UNKNOWN_PATTERN
        );
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::event::*;

    const FAILED_LINE: &str =
        "Dec 10 07:28:03 LabSZ sshd[24245]: Failed password for root from 183.136.162.51 port 20298 ssh2";
    const ACCEPTED_LINE: &str =
        "Dec 10 09:32:20 LabSZ sshd[24680]: Accepted password for fztu from 119.137.62.142 port 49116 ssh2";

    #[test]
    fn failed_password_classifies_with_all_captures() {
        let event = classify(FAILED_LINE);
        assert_eq!(event.pattern, "Authentication Failure");
        assert_eq!(event.timestamp.as_deref(), Some("Dec 10 07:28:03"));
        assert_eq!(event.host.as_deref(), Some("LabSZ"));
        assert_eq!(event.process.as_deref(), Some("sshd[24245]"));
        assert_eq!(event.user_id.as_deref(), Some("root"));
        assert_eq!(event.source_ip.as_deref(), Some("183.136.162.51"));
        assert_eq!(event.port.as_deref(), Some("20298"));
        assert_eq!(event.raw_line, FAILED_LINE);
    }

    #[test]
    fn accepted_password_is_successful_login() {
        let event = classify(ACCEPTED_LINE);
        assert_eq!(event.pattern, "Successful Login");
        assert_eq!(event.user_id.as_deref(), Some("fztu"));
    }

    #[test]
    fn invalid_user_variant_of_failed_password() {
        let line = "Dec 10 07:51:20 LabSZ sshd[24324]: Failed password for invalid user support from 103.99.0.122 port 60740 ssh2";
        let event = classify(line);
        assert_eq!(event.pattern, "Authentication Failure");
        assert_eq!(event.user_id.as_deref(), Some("support"));
    }

    #[test]
    fn too_many_failures_captures_identity() {
        let line = "Dec 10 08:11:33 LabSZ sshd[24437]: Disconnecting: Too many authentication failures for admin [preauth]";
        let event = classify(line);
        assert_eq!(event.pattern, "Too Many Authentication Failures");
        assert_eq!(event.user_id.as_deref(), Some("admin"));
    }

    #[test]
    fn pam_session_opened() {
        let line = "Dec 10 09:32:20 LabSZ sshd[24680]: pam_unix(sshd:session): session opened for user fztu by (uid=0)";
        let event = classify(line);
        assert_eq!(event.pattern, "PAM Session Opened");
        assert_eq!(event.user_id.as_deref(), Some("fztu"));
        assert_eq!(event.uid.as_deref(), Some("0"));
    }

    #[test]
    fn repeated_pam_failures_capture_rhost() {
        let line = "Dec 10 07:28:27 LabSZ sshd[24245]: PAM 5 more authentication failures; logname= uid=0 euid=0 tty=ssh ruser= rhost=183.136.162.51 user=root";
        let event = classify(line);
        assert_eq!(event.pattern, "Repeated PAM Authentication Failures");
        assert_eq!(event.source_ip.as_deref(), Some("183.136.162.51"));
        assert_eq!(event.user_id.as_deref(), Some("root"));
        assert_eq!(event.uid.as_deref(), Some("0"));
        assert_eq!(event.tty.as_deref(), Some("ssh"));
    }

    #[test]
    fn specific_rule_wins_over_catch_all() {
        // This line also fits the `extended` and `default` shapes; the
        // specific rule must win because it is listed first.
        let event = classify(FAILED_LINE);
        assert_ne!(event.pattern, EXTENDED_PATTERN);
        assert_ne!(event.pattern, DEFAULT_PATTERN);
    }

    #[test]
    fn generic_line_falls_through_to_extended() {
        let line = "Dec 10 06:55:46 LabSZ sshd[24200]: error: something odd happened here";
        let event = classify(line);
        // "error:" token + free text fits the extended shape.
        assert_eq!(event.pattern, EXTENDED_PATTERN);
        assert!(event.details.is_some());
    }

    #[test]
    fn every_rule_classifies_a_sample_line() {
        use std::collections::HashMap;

        use crate::dataset::table::Value;

        // One sample line per rule, with the captures that line must
        // produce. Kept in rule-list order.
        let samples: Vec<(&str, &str, Vec<(&str, &str)>)> = vec![
            (
                "Dec 10 06:55:46 LabSZ sshd[24200]: reverse mapping checking getaddrinfo for ns.marryaldkfaczcz.com [173.234.31.186] failed - POSSIBLE BREAK-IN ATTEMPT!",
                "Reverse Mapping Issue",
                vec![(COL_SOURCE_IP, "173.234.31.186")],
            ),
            (
                "Dec 10 09:12:32 LabSZ sshd[24717]: Address 103.99.0.122 maps to static.host.example.com, but this does not map back to the address - POSSIBLE BREAK-IN ATTEMPT!",
                "Reverse Mapping Check Failure",
                vec![(COL_SOURCE_IP, "103.99.0.122")],
            ),
            (
                "Dec 10 06:56:00 LabSZ sshd[24203]: Invalid user test9 from 52.80.34.196",
                "Invalid User",
                vec![(COL_USER_ID, "test9"), (COL_SOURCE_IP, "52.80.34.196")],
            ),
            (
                "Dec 10 07:28:03 LabSZ sshd[24245]: Failed password for root from 183.136.162.51 port 20298 ssh2",
                "Authentication Failure",
                vec![
                    (COL_USER_ID, "root"),
                    (COL_SOURCE_IP, "183.136.162.51"),
                    (COL_PORT, "20298"),
                ],
            ),
            (
                "Dec 10 09:32:20 LabSZ sshd[24680]: Accepted password for fztu from 119.137.62.142 port 49116 ssh2",
                "Successful Login",
                vec![
                    (COL_USER_ID, "fztu"),
                    (COL_SOURCE_IP, "119.137.62.142"),
                    (COL_PORT, "49116"),
                ],
            ),
            (
                "Dec 10 06:55:46 LabSZ sshd[24200]: Received disconnect from 212.47.254.145: 11: Bye Bye [preauth]",
                "Disconnection",
                vec![(COL_SOURCE_IP, "212.47.254.145")],
            ),
            (
                "Dec 10 08:11:33 LabSZ sshd[24437]: Disconnecting: Too many authentication failures for admin [preauth]",
                "Too Many Authentication Failures",
                vec![(COL_USER_ID, "admin")],
            ),
            (
                "Dec 10 08:30:00 LabSZ sshd[24500]: PAM service(sshd) ignoring max retries; 6 > 3",
                "PAM Ignoring Max Retries",
                vec![(COL_DETAILS, "6 > 3")],
            ),
            (
                "Dec 10 07:28:27 LabSZ sshd[24245]: PAM 5 more authentication failures; logname= uid=0 euid=0 tty=ssh ruser= rhost=183.136.162.51 user=root",
                "Repeated PAM Authentication Failures",
                vec![
                    (COL_USER_ID, "root"),
                    (COL_SOURCE_IP, "183.136.162.51"),
                    (COL_UID, "0"),
                    (COL_EUID, "0"),
                    (COL_TTY, "ssh"),
                ],
            ),
            (
                "Dec 10 11:21:14 LabSZ sshd[25658]: Blocked IP address 103.99.0.122",
                "Blocked IP Address",
                vec![(COL_SOURCE_IP, "103.99.0.122")],
            ),
            (
                "Dec 10 07:59:28 LabSZ sshd[24370]: Connection reset by 103.99.0.122 [preauth]",
                "Connection Reset by Peer",
                vec![(COL_SOURCE_IP, "103.99.0.122")],
            ),
            (
                "Dec 10 06:55:48 LabSZ sshd[24200]: Connection closed by 212.47.254.145 [preauth]",
                "Connection Closed by Peer",
                vec![(COL_SOURCE_IP, "212.47.254.145")],
            ),
            (
                "Dec 10 06:56:00 LabSZ sshd[24203]: input_userauth_request: invalid user test9 [preauth]",
                "Invalid User Auth Request",
                vec![(COL_USER_ID, "test9")],
            ),
            (
                "Dec 10 07:02:00 LabSZ sshd[24206]: pam_unix(sshd:auth): check pass; user unknown",
                "PAM Check Pass (User Unknown)",
                vec![],
            ),
            (
                "Dec 10 07:07:38 LabSZ sshd[24206]: pam_unix(sshd:auth): authentication failure; logname= uid=0 euid=0 tty=ssh ruser= rhost=103.99.0.122 user=root",
                "PAM Authentication Single Failure",
                vec![
                    (COL_USER_ID, "root"),
                    (COL_SOURCE_IP, "103.99.0.122"),
                    (COL_UID, "0"),
                    (COL_EUID, "0"),
                    (COL_TTY, "ssh"),
                ],
            ),
            (
                "Dec 10 07:28:03 LabSZ sshd[24245]: message repeated 5 times: [ Failed password for root from 183.136.162.51 port 20298 ssh2]",
                "Repeated Password Failure",
                vec![
                    (COL_USER_ID, "root"),
                    (COL_SOURCE_IP, "183.136.162.51"),
                    (COL_PORT, "20298"),
                ],
            ),
            (
                "Dec 10 09:32:20 LabSZ sshd[24680]: pam_unix(sshd:session): session opened for user fztu by (uid=0)",
                "PAM Session Opened",
                vec![(COL_USER_ID, "fztu"), (COL_UID, "0")],
            ),
            (
                "Dec 10 11:04:45 LabSZ sshd[25448]: pam_unix(sshd:session): session closed for user curi",
                "PAM Session Closed",
                vec![(COL_USER_ID, "curi")],
            ),
            (
                "Dec 10 06:55:46 LabSZ sshd[24200]: error: something odd happened here",
                EXTENDED_PATTERN,
                vec![(COL_DETAILS, "something odd happened here")],
            ),
            // A single-token body fits neither the extended shape (two
            // tokens) nor any specific rule.
            (
                "Dec 10 06:55:46 LabSZ sshd[1]: singleword",
                DEFAULT_PATTERN,
                vec![(COL_DETAILS, "singleword")],
            ),
        ];

        // every rule has exactly one sample
        let sampled: std::collections::HashSet<&str> =
            samples.iter().map(|(_, name, _)| *name).collect();
        assert_eq!(sampled.len(), samples.len(), "duplicate sample names");
        for rule in RULES.iter() {
            assert!(sampled.contains(rule.name), "no sample for '{}'", rule.name);
        }
        assert_eq!(samples.len(), RULES.len());

        for (line, name, captures) in samples {
            let event = classify(line);
            assert_eq!(event.pattern, name, "line: {}", line);
            assert_eq!(event.raw_line, line);

            let fields: HashMap<String, Value> = event.into_pairs().into_iter().collect();
            // the syslog prefix is always captured
            for column in [COL_TIMESTAMP, COL_HOST, COL_PROCESS] {
                assert!(!fields[column].is_null(), "'{}': null {}", name, column);
            }
            for (column, expected) in captures {
                assert_eq!(
                    fields[column].as_str(),
                    Some(expected),
                    "'{}': capture {}",
                    name,
                    column
                );
            }
        }
    }

    #[test]
    fn unmatched_line_is_unknown_with_raw_only() {
        let line = "totally unstructured noise";
        let event = classify(line);
        assert_eq!(event.pattern, UNKNOWN_PATTERN);
        assert_eq!(event.raw_line, line);
        assert!(event.timestamp.is_none());
        assert!(event.host.is_none());
        assert!(event.user_id.is_none());
        assert!(event.source_ip.is_none());
    }
}
