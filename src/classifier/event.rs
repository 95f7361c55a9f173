//! Parsed event record
//!
//! A `ParsedEvent` is one classified log line. Every field any pattern can
//! capture is declared up front as an optional, so downstream code sees a
//! stable column set regardless of which pattern matched; the pattern name
//! and the raw line are always present.

use serde::{Deserialize, Serialize};

use crate::dataset::table::Value;

// Column labels shared by the classifier and the scoring engine.
pub const COL_EVENT_PATTERN: &str = "event_pattern";
pub const COL_RAW_LINE: &str = "raw_line";
pub const COL_TIMESTAMP: &str = "timestamp";
pub const COL_HOST: &str = "host";
pub const COL_PROCESS: &str = "process";
pub const COL_USER_ID: &str = "user_id";
pub const COL_SOURCE_IP: &str = "source_ip";
pub const COL_PORT: &str = "port";
pub const COL_DETAILS: &str = "details";
pub const COL_LOGNAME: &str = "logname";
pub const COL_UID: &str = "uid";
pub const COL_EUID: &str = "euid";
pub const COL_TTY: &str = "tty";
pub const COL_RUSER: &str = "ruser";

/// Pattern name reserved for lines no rule matches.
pub const UNKNOWN_PATTERN: &str = "UNKNOWN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedEvent {
    /// Name of the matched pattern rule, or `UNKNOWN`.
    pub pattern: String,
    /// The original line, verbatim.
    pub raw_line: String,

    pub timestamp: Option<String>,
    pub host: Option<String>,
    pub process: Option<String>,
    pub user_id: Option<String>,
    pub source_ip: Option<String>,
    pub port: Option<String>,
    pub details: Option<String>,
    pub logname: Option<String>,
    pub uid: Option<String>,
    pub euid: Option<String>,
    pub tty: Option<String>,
    pub ruser: Option<String>,
}

impl ParsedEvent {
    pub fn unknown(raw_line: impl Into<String>) -> Self {
        Self {
            pattern: UNKNOWN_PATTERN.to_string(),
            raw_line: raw_line.into(),
            ..Default::default()
        }
    }

    /// Assign a named capture to its field. Unrecognized group names are
    /// ignored rather than being an error, so pattern additions cannot
    /// silently corrupt unrelated fields.
    pub fn set_capture(&mut self, group: &str, value: &str) {
        let slot = match group {
            COL_TIMESTAMP => &mut self.timestamp,
            COL_HOST => &mut self.host,
            COL_PROCESS => &mut self.process,
            COL_USER_ID => &mut self.user_id,
            COL_SOURCE_IP => &mut self.source_ip,
            COL_PORT => &mut self.port,
            COL_DETAILS => &mut self.details,
            COL_LOGNAME => &mut self.logname,
            COL_UID => &mut self.uid,
            COL_EUID => &mut self.euid,
            COL_TTY => &mut self.tty,
            COL_RUSER => &mut self.ruser,
            _ => return,
        };
        *slot = Some(value.to_string());
    }

    /// Emit every declared field as a (column, value) pair, nulls included,
    /// in a fixed column order.
    pub fn into_pairs(self) -> Vec<(String, Value)> {
        fn opt(v: Option<String>) -> Value {
            v.map(Value::Str).unwrap_or(Value::Null)
        }
        vec![
            (COL_EVENT_PATTERN.to_string(), Value::Str(self.pattern)),
            (COL_RAW_LINE.to_string(), Value::Str(self.raw_line)),
            (COL_TIMESTAMP.to_string(), opt(self.timestamp)),
            (COL_HOST.to_string(), opt(self.host)),
            (COL_PROCESS.to_string(), opt(self.process)),
            (COL_USER_ID.to_string(), opt(self.user_id)),
            (COL_SOURCE_IP.to_string(), opt(self.source_ip)),
            (COL_PORT.to_string(), opt(self.port)),
            (COL_DETAILS.to_string(), opt(self.details)),
            (COL_LOGNAME.to_string(), opt(self.logname)),
            (COL_UID.to_string(), opt(self.uid)),
            (COL_EUID.to_string(), opt(self.euid)),
            (COL_TTY.to_string(), opt(self.tty)),
            (COL_RUSER.to_string(), opt(self.ruser)),
        ]
    }
}
