//! Change normalization
//!
//! Cleans the affected-services text, derives the synthetic change identity and
//! attaches the topology metadata every change vertex carries.

use crate::config::{AttributeNames, SyncConfig};
use crate::record::{keys, ChangeRecord, CHANGE_ENTITY_TYPE};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

/// Prefix of every synthetic change identity
pub const UNIQUE_ID_PREFIX: &str = "CHG_";

static PARENTHESIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)").expect("Invalid parenthesized-suffix pattern"));

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Source of "now" for identities of changes without a start time
pub type Clock = fn() -> DateTime<Utc>;

/// Unify separators in an affected-services text
///
/// `;` and newlines become `separator`, tabs are dropped and every parenthesized
/// group is removed together with the whitespace before it.
#[must_use]
pub fn beautify_services(raw: &str, separator: &str) -> String {
    let unified = raw
        .replace(';', separator)
        .replace('\n', separator)
        .replace('\t', "");
    PARENTHESIZED.replace_all(&unified, "").into_owned()
}

/// Start time as epoch seconds
///
/// Text is parsed as RFC 3339 or as a naive date/time taken to be UTC; numbers
/// are epoch milliseconds.
#[must_use]
pub fn parse_start_time(value: &Value) -> Option<i64> {
    match value {
        Value::String(text) => parse_start_text(text.trim()),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|ms| ms.floor() as i64))
            .map(|ms| ms.div_euclid(1000)),
        _ => None,
    }
}

fn parse_start_text(text: &str) -> Option<i64> {
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp());
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp())
}

/// Derive the synthetic identity of a change
///
/// `CHG_<epoch seconds>` from the start time (or `now` when it is absent or
/// unparseable), followed by `_<services>` with every `|` turned into `_` when
/// the affected-services text is non-empty.
#[must_use]
pub fn generate_unique_id(
    record: &ChangeRecord,
    attributes: &AttributeNames,
    now: DateTime<Utc>,
) -> String {
    let seconds = match record.get(&attributes.start_time) {
        None | Some(Value::Null) => now.timestamp(),
        Some(raw) => parse_start_time(raw).unwrap_or_else(|| {
            tracing::warn!(start_time = %raw, "Unparseable start time, using current time");
            now.timestamp()
        }),
    };

    let mut unique_id = format!("{UNIQUE_ID_PREFIX}{seconds}");
    if let Some(services) = record.non_empty_text(&attributes.affected_services) {
        unique_id.push('_');
        unique_id.push_str(&services.replace('|', "_"));
    }
    unique_id
}

/// Change record with its synthetic identity attached
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedChange {
    /// Synthetic identity, also stored as `uniqueId`
    pub unique_id: String,
    /// Rebuilt record
    pub record: ChangeRecord,
}

/// Normalizes change records for one run
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: Arc<SyncConfig>,
    clock: Clock,
}

impl Normalizer {
    /// Create normalizer reading the system clock
    #[inline]
    #[must_use]
    pub fn new(config: Arc<SyncConfig>) -> Self {
        Self {
            config,
            clock: Utc::now,
        }
    }

    /// With a fixed clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Beautify, assign identity and attach topology metadata
    #[must_use]
    pub fn normalize(&self, record: ChangeRecord) -> NormalizedChange {
        let attributes = &self.config.attributes;

        let record = match record.text(&attributes.affected_services) {
            Some(raw) => {
                let cleaned = beautify_services(raw, &self.config.separator);
                record.with(&attributes.affected_services, cleaned)
            }
            None => record,
        };

        let unique_id = generate_unique_id(&record, attributes, (self.clock)());
        let record = record
            .with(keys::UNIQUE_ID, unique_id.clone())
            .with(keys::ENTITY_TYPES, vec![CHANGE_ENTITY_TYPE])
            .with(keys::MATCH_TOKENS, vec![unique_id.clone()]);
        NormalizedChange { unique_id, record }
    }
}
