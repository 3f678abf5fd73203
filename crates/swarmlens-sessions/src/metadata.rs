//! Heuristic display metadata taken from the head of a session log.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::codec::{decode_line, non_empty_lines, LogSyntax};
use crate::types::{LogEvent, UNTITLED};

/// Number of leading non-empty lines inspected.
pub const METADATA_SCAN_LINES: usize = 10;

/// Fallback titles are cut to this many characters.
pub const TITLE_MAX_CHARS: usize = 80;

/// Display metadata derived from a session's first events.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMetadata {
    /// Summary title, else first user message line, else [`UNTITLED`].
    pub title: String,
    pub start_time: Option<DateTime<Utc>>,
    pub root_directory: Option<String>,
    /// The first user message was a `warmup` probe.
    pub is_warmup: bool,
}

/// Scan the first [`METADATA_SCAN_LINES`] non-empty lines of `text`.
pub fn extract_metadata(syntax: LogSyntax, text: &str, now: DateTime<Utc>) -> ExtractedMetadata {
    let events = non_empty_lines(text)
        .take(METADATA_SCAN_LINES)
        .enumerate()
        .filter_map(|(index, line)| decode_line(syntax, line, index, now));
    extract_from_events(events)
}

/// Same heuristics over already-decoded events.
pub fn extract_from_events<I>(events: I) -> ExtractedMetadata
where
    I: IntoIterator<Item = LogEvent>,
{
    let mut summary: Option<String> = None;
    let mut start_time: Option<DateTime<Utc>> = None;
    let mut root_directory: Option<String> = None;
    let mut candidate: Option<String> = None;
    let mut is_warmup = false;

    for event in events.into_iter().take(METADATA_SCAN_LINES) {
        match event.kind.as_str() {
            "summary" if summary.is_none() => {
                summary = event
                    .field("summary")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
            }
            "user" if start_time.is_none() => {
                let Some(ts) = event
                    .field("timestamp")
                    .and_then(Value::as_str)
                    .and_then(parse_timestamp)
                else {
                    continue;
                };
                start_time = Some(ts);
                root_directory = event
                    .field("cwd")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                if let Some(text) = message_text(&event) {
                    is_warmup = text.trim().eq_ignore_ascii_case("warmup");
                    candidate = title_candidate(text);
                }
            }
            _ => {}
        }

        if summary.is_some() && start_time.is_some() {
            break;
        }
    }

    ExtractedMetadata {
        title: summary
            .or(candidate)
            .unwrap_or_else(|| UNTITLED.to_string()),
        start_time,
        root_directory,
        is_warmup,
    }
}

/// RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM:SS[.f]` read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Timestamp held in a JSON value: a date string or epoch seconds.
pub(crate) fn timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

/// Text of a user message: string content, or the first text block.
fn message_text(event: &LogEvent) -> Option<&str> {
    let message = event.field("message")?;
    if let Some(text) = message.as_str() {
        return Some(text);
    }
    match message.get("content")? {
        Value::String(text) => Some(text),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str).unwrap_or("text") == "text")
            .find_map(|b| b.get("text").and_then(Value::as_str)),
        _ => None,
    }
}

/// First line, trimmed, markdown heading markers stripped, truncated.
fn title_candidate(text: &str) -> Option<String> {
    let first = text.trim().lines().next()?.trim();
    let stripped = first.trim_start_matches('#').trim();
    if stripped.is_empty() {
        return None;
    }
    Some(stripped.chars().take(TITLE_MAX_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    fn user_line(ts: &str, content: &str) -> String {
        serde_json::json!({
            "type": "user",
            "timestamp": ts,
            "cwd": "/home/user/app",
            "message": {"role": "user", "content": content}
        })
        .to_string()
    }

    #[test]
    fn test_summary_wins_over_user_message() {
        let text = format!(
            "{}\n{}\n{}",
            r#"{"type":"summary","summary":"Refactor auth"}"#,
            r#"{"type":"summary","summary":"Second summary"}"#,
            user_line("2026-01-20T10:00:00Z", "please fix it")
        );
        let meta = extract_metadata(LogSyntax::Conversation, &text, now());
        assert_eq!(meta.title, "Refactor auth");
        assert_eq!(
            meta.start_time,
            Some(Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap())
        );
        assert_eq!(meta.root_directory.as_deref(), Some("/home/user/app"));
        assert!(!meta.is_warmup);
    }

    #[test]
    fn test_fallback_title_strips_heading_and_truncates() {
        let long = format!("## {}\nsecond line", "x".repeat(120));
        let text = user_line("2026-01-20T10:00:00Z", &long);
        let meta = extract_metadata(LogSyntax::Conversation, &text, now());
        assert_eq!(meta.title, "x".repeat(TITLE_MAX_CHARS));
    }

    #[test]
    fn test_first_user_event_only_sets_start() {
        let text = format!(
            "{}\n{}",
            user_line("2026-01-20T10:00:00Z", "first"),
            user_line("2026-01-21T10:00:00Z", "second")
        );
        let meta = extract_metadata(LogSyntax::Conversation, &text, now());
        assert_eq!(meta.title, "first");
        assert_eq!(
            meta.start_time,
            Some(Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_warmup_detected_case_insensitive() {
        let text = user_line("2026-01-20T10:00:00Z", "  Warmup \n");
        let meta = extract_metadata(LogSyntax::Conversation, &text, now());
        assert!(meta.is_warmup);
    }

    #[test]
    fn test_untitled_when_nothing_found() {
        let text = r#"{"type":"file-history-snapshot","messageId":"m"}"#;
        let meta = extract_metadata(LogSyntax::Conversation, text, now());
        assert_eq!(meta.title, UNTITLED);
        assert!(meta.start_time.is_none());
    }

    #[test]
    fn test_only_first_ten_lines_scanned() {
        let mut lines: Vec<String> = (0..10)
            .map(|_| r#"{"type":"file-history-snapshot"}"#.to_string())
            .collect();
        lines.push(user_line("2026-01-20T10:00:00Z", "too late"));
        let meta = extract_metadata(LogSyntax::Conversation, &lines.join("\n"), now());
        assert_eq!(meta.title, UNTITLED);
    }

    #[test]
    fn test_array_content_uses_first_text_block() {
        let text = serde_json::json!({
            "type": "user",
            "timestamp": "2026-01-20T10:00:00Z",
            "message": {"content": [
                {"type": "image", "source": {}},
                {"type": "text", "text": "# Build the parser"}
            ]}
        })
        .to_string();
        let meta = extract_metadata(LogSyntax::Conversation, &text, now());
        assert_eq!(meta.title, "Build the parser");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2026-01-20T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-01-20T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-01-20T10:00:00.000"), Some(expected));
        assert_eq!(
            timestamp_value(&serde_json::json!(expected.timestamp())),
            Some(expected)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_structured_syntax_reads_nested_event() {
        let text = r#"{"timestamp":"2026-01-20T10:00:00Z","instance":"lead","event":{"type":"user","timestamp":"2026-01-20T10:00:00Z","cwd":"/srv/app","message":{"content":"Plan the release"}}}"#;
        let meta = extract_metadata(LogSyntax::Structured, text, now());
        assert_eq!(meta.title, "Plan the release");
        assert_eq!(meta.root_directory.as_deref(), Some("/srv/app"));
    }
}
