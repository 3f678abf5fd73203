//! Decoding of raw log lines into [`LogEvent`]s.
//!
//! Three line syntaxes are understood:
//!
//! - `Structured`: one JSON object per line, body nested under `event`
//! - `Legacy`: `<level markers> -- <instance>: {json}` logger output
//! - `Conversation`: one JSON object per line, keyed by `type` and `uuid`
//!
//! Decoding never fails. Malformed JSON lines are dropped; legacy lines that
//! cannot be matched are kept as plain `system` log events.

use chrono::{DateTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use crate::types::LogEvent;

/// Signature-derived ids keep this many leading characters.
const SIGNATURE_ID_LEN: usize = 36;

lazy_static! {
    static ref LEGACY_LINE: Regex =
        Regex::new(r"(?:^|\s)--\s+(?P<instance>[^:\s][^:]*?)\s*:\s*(?P<body>\{.*\})\s*$")
            .expect("legacy line pattern is valid");
}

/// Line syntax of a session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSyntax {
    Structured,
    Legacy,
    Conversation,
}

/// Outcome of matching one legacy logger line.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyLine<'a> {
    /// Instance name and a decoded JSON body.
    Matched { instance: &'a str, body: Value },
    /// The line had the logger shape but its body was not valid JSON.
    MalformedBody { instance: &'a str },
    /// The line is not in logger format at all.
    NoMatch,
}

/// Match a legacy logger line without interpreting the body.
pub fn parse_legacy_line(line: &str) -> LegacyLine<'_> {
    let Some(caps) = LEGACY_LINE.captures(line) else {
        return LegacyLine::NoMatch;
    };
    let (Some(instance), Some(body)) = (caps.name("instance"), caps.name("body")) else {
        return LegacyLine::NoMatch;
    };
    let instance = instance.as_str().trim();

    match serde_json::from_str::<Value>(body.as_str()) {
        Ok(body) => LegacyLine::Matched { instance, body },
        Err(_) => LegacyLine::MalformedBody { instance },
    }
}

/// Decode one non-empty line. `index` is the line's position among the
/// non-empty lines of its file; `now` stands in for missing timestamps.
pub fn decode_line(
    syntax: LogSyntax,
    line: &str,
    index: usize,
    now: DateTime<Utc>,
) -> Option<LogEvent> {
    match syntax {
        LogSyntax::Structured => decode_structured(line, index, now),
        LogSyntax::Legacy => Some(decode_legacy(line, index, now)),
        LogSyntax::Conversation => decode_conversation(line, index, now),
    }
}

/// Decode every non-empty line of a log, in file order.
pub fn decode_log(syntax: LogSyntax, text: &str, now: DateTime<Utc>) -> Vec<LogEvent> {
    non_empty_lines(text)
        .enumerate()
        .filter_map(|(index, line)| decode_line(syntax, line, index, now))
        .collect()
}

/// Iterate the non-empty lines of a log.
pub fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|line| !line.trim().is_empty())
}

fn decode_structured(line: &str, index: usize, now: DateTime<Utc>) -> Option<LogEvent> {
    let payload = parse_object(line, index)?;

    let raw_ts = raw_timestamp(&payload);
    let event_id = signature_id(&payload).unwrap_or_else(|| {
        format!(
            "{}-{}",
            raw_ts.clone().unwrap_or_else(|| index.to_string()),
            index
        )
    });
    let instance = str_field(&payload, "instance")
        .or_else(|| str_field(&payload, "instance_name"))
        .unwrap_or("system")
        .to_string();
    let kind = payload
        .get("event")
        .and_then(|e| str_field(e, "type"))
        .or_else(|| str_field(&payload, "type"))
        .unwrap_or("log")
        .to_string();

    Some(LogEvent {
        event_id,
        timestamp: raw_ts.unwrap_or_else(|| clock(now)),
        instance,
        kind,
        payload,
    })
}

fn decode_legacy(line: &str, index: usize, now: DateTime<Utc>) -> LogEvent {
    match parse_legacy_line(line) {
        LegacyLine::Matched { instance, body } => {
            let event_id = signature_id(&body).unwrap_or_else(|| format!("line-{}", index));
            let kind = str_field(&body, "type").unwrap_or("log").to_string();
            LogEvent {
                event_id,
                timestamp: clock(now),
                instance: instance.to_string(),
                kind,
                payload: body,
            }
        }
        LegacyLine::MalformedBody { .. } | LegacyLine::NoMatch => {
            tracing::trace!(index, "keeping unmatched legacy line as plain log event");
            LogEvent {
                event_id: format!("line-{}", index),
                timestamp: clock(now),
                instance: "system".to_string(),
                kind: "log".to_string(),
                payload: json!({ "message": line }),
            }
        }
    }
}

fn decode_conversation(line: &str, index: usize, now: DateTime<Utc>) -> Option<LogEvent> {
    let payload = parse_object(line, index)?;

    let raw_ts = raw_timestamp(&payload);
    let event_id = match str_field(&payload, "uuid") {
        Some(uuid) if !uuid.is_empty() => uuid.to_string(),
        _ => format!(
            "{}-{}",
            raw_ts.clone().unwrap_or_else(|| index.to_string()),
            index
        ),
    };
    let kind = str_field(&payload, "type").unwrap_or("log").to_string();
    let instance = match kind.as_str() {
        "user" => "user",
        "assistant" => "assistant",
        _ => "system",
    }
    .to_string();

    Some(LogEvent {
        event_id,
        timestamp: raw_ts.unwrap_or_else(|| clock(now)),
        instance,
        kind,
        payload,
    })
}

fn parse_object(line: &str, index: usize) -> Option<Value> {
    match serde_json::from_str::<Value>(line.trim()) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            tracing::debug!(index, "dropping non-object log line");
            None
        }
        Err(e) => {
            tracing::debug!(index, error = %e, "dropping malformed log line");
            None
        }
    }
}

/// First [`SIGNATURE_ID_LEN`] characters of the first content-block signature.
fn signature_id(value: &Value) -> Option<String> {
    let content = value
        .pointer("/event/message/content")
        .or_else(|| value.pointer("/message/content"))?;
    content
        .as_array()?
        .iter()
        .filter_map(|block| block.get("signature").and_then(Value::as_str))
        .find(|sig| !sig.is_empty())
        .map(|sig| sig.chars().take(SIGNATURE_ID_LEN).collect())
}

pub(crate) fn raw_timestamp(value: &Value) -> Option<String> {
    match value.get("timestamp")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field<'a>(value: &'a Value, name: &str) -> Option<&'a str> {
    value.get(name).and_then(Value::as_str)
}

fn clock(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}
