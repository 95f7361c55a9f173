//! OpenSSH log pattern rules
//!
//! Every rule matches the common syslog prefix (timestamp, host, process)
//! and then one structural body. Rules are held in an explicit priority
//! order and tried first-to-last: several rules are deliberate structural
//! subsets of the catch-alls, so specific rules MUST stay listed before
//! generic ones. Do not reorder and do not move the rules into a map —
//! classification correctness depends on this exact, stable order.

use once_cell::sync::Lazy;
use regex::Regex;

/// A named structural matcher for one category of log line.
pub struct PatternRule {
    pub name: &'static str,
    pub regex: Regex,
}

/// Name of the first catch-all ("identifier + free text" shape).
pub const EXTENDED_PATTERN: &str = "extended";
/// Name of the last catch-all (free text only).
pub const DEFAULT_PATTERN: &str = "default";

// Common syslog line prefix, e.g. "Dec 10 07:22:46 LabSZ sshd[24200]: ".
const PREFIX: &str = r"^(?P<timestamp>[A-Za-z]+\s+\d+\s+\d+:\d+:\d+)\s+(?P<host>\S+)\s+(?P<process>\S+):\s+";

fn rule(name: &'static str, body: &str) -> PatternRule {
    let pattern = format!("{}{}$", PREFIX, body);
    PatternRule {
        name,
        regex: Regex::new(&pattern).expect("built-in pattern must compile"),
    }
}

/// The fixed rule list, in priority order. The two catch-alls are always
/// last so every line fitting the syslog prefix classifies as something.
pub static RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    vec![
        // Possible IP spoofing.
        rule(
            "Reverse Mapping Issue",
            r"reverse mapping checking .+\[(?P<source_ip>[\d\.]+)\].+",
        ),
        rule(
            "Reverse Mapping Check Failure",
            r"Address\s+(?P<source_ip>[\d\.]+)\s+maps\s+to\s+\S+,\s+but\s+this\s+does\s+not\s+map\s+back\s+to\s+the\s+address\s+-\s+POSSIBLE\s+BREAK-IN\s+ATTEMPT!",
        ),
        rule(
            "Invalid User",
            r"Invalid user\s+(?P<user_id>\S+)\s+from\s+(?P<source_ip>[\d\.]+)",
        ),
        rule(
            "Authentication Failure",
            r"Failed password for (?:invalid user\s+)?(?P<user_id>\S+)\s+from\s+(?P<source_ip>[\d\.]+)\s+port\s+(?P<port>\d+)\s+ssh2",
        ),
        rule(
            "Successful Login",
            r"Accepted password for (?P<user_id>\S+) from (?P<source_ip>[\d\.]+) port (?P<port>\d+).+",
        ),
        rule(
            "Disconnection",
            r"Received disconnect from (?P<source_ip>[\d\.]+).+",
        ),
        // Brute-force related. The disconnected identity is captured as
        // user_id so these rows carry the key the correlation step joins on.
        rule(
            "Too Many Authentication Failures",
            r"Disconnecting: Too many authentication failures for (?:invalid user\s+)?(?P<user_id>\S+)\s*\[preauth\]",
        ),
        rule(
            "PAM Ignoring Max Retries",
            r"PAM service\(sshd\) ignoring max retries; (?P<details>.+)",
        ),
        rule(
            "Repeated PAM Authentication Failures",
            r"PAM\s+\d+\s+more\s+authentication\s+failures?\s*;\s+logname=\s*(?P<logname>\S*)\s*uid=\s*(?P<uid>\d+)\s*euid=\s*(?P<euid>\d+)\s*tty=\s*(?P<tty>\S*)\s*ruser=\s*(?P<ruser>\S*)\s*rhost=\s*(?P<source_ip>[A-Za-z0-9\.\-]+)\s*(?:user=\s*(?P<user_id>\S+))?",
        ),
        rule(
            "Blocked IP Address",
            r"Blocked IP address (?P<source_ip>[\d\.]+)",
        ),
        rule(
            "Connection Reset by Peer",
            r"Connection reset by (?P<source_ip>[\d\.]+) \[preauth\]",
        ),
        rule(
            "Connection Closed by Peer",
            r"Connection closed by (?P<source_ip>[\d\.]+) \[preauth\]",
        ),
        // Invalid authentication, usually a problem when repeated.
        rule(
            "Invalid User Auth Request",
            r"input_userauth_request: invalid user\s+(?P<user_id>\S*)\s*\[preauth\]",
        ),
        rule(
            "PAM Check Pass (User Unknown)",
            r"pam_unix\(sshd:auth\): check pass; user unknown",
        ),
        rule(
            "PAM Authentication Single Failure",
            r"pam_unix\(sshd:auth\):\s+authentication\s+failure;\s+logname=(?P<logname>\S*)\s*uid=(?P<uid>\d+)\s*euid=(?P<euid>\d+)\s*tty=(?P<tty>\S*)\s*ruser=(?P<ruser>\S*)\s*rhost=(?P<source_ip>[A-Za-z0-9\.\-]+)\s*(?:user=(?P<user_id>\S+))?",
        ),
        rule(
            "Repeated Password Failure",
            r"message\s+repeated\s+\d+\s+times:\s+\[\s*Failed password for (?:invalid user\s+)?(?P<user_id>\S+)\s+from\s+(?P<source_ip>[\d\.]+)\s+port\s+(?P<port>\d+)\s+ssh2\s*\]\s*",
        ),
        rule(
            "PAM Session Opened",
            r"pam_unix\(sshd:session\): session opened for user (?P<user_id>\S+) by \(uid=(?P<uid>\d+)\)",
        ),
        rule(
            "PAM Session Closed",
            r"pam_unix\(sshd:session\): session closed for user (?P<user_id>\S+)",
        ),
        // Catch-alls, always last.
        rule(EXTENDED_PATTERN, r"(?P<user_id>\S+) (?P<details>.+)"),
        rule(DEFAULT_PATTERN, r"(?P<details>.+)"),
    ]
});
