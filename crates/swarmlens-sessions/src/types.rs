use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Title used when no summary or user message could be found.
pub const UNTITLED: &str = "Untitled";

/// Which on-disk store a session lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// One directory per session with a metadata file and an event log.
    Structured,
    /// One append-only JSON-lines file per session.
    Conversation,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Structured => "structured",
            SourceType::Conversation => "conversation",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "structured" => Ok(SourceType::Structured),
            "conversation" => Ok(SourceType::Conversation),
            _ => Err(format!("Unknown source type: {}", s)),
        }
    }
}

/// Which sources a listing should include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFilter {
    #[default]
    All,
    StructuredOnly,
    ConversationOnly,
}

impl SourceFilter {
    pub fn includes(&self, source: SourceType) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::StructuredOnly => source == SourceType::Structured,
            SourceFilter::ConversationOnly => source == SourceType::Conversation,
        }
    }
}

impl FromStr for SourceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(SourceFilter::All),
            "structured" | "structured_only" => Ok(SourceFilter::StructuredOnly),
            "conversation" | "conversation_only" => Ok(SourceFilter::ConversationOnly),
            _ => Err(format!("Unknown source filter: {}", s)),
        }
    }
}

/// Location of one session inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub source: SourceType,
    pub project: String,
    pub session: String,
}

impl SessionKey {
    pub fn new(source: SourceType, project: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            source,
            project: project.into(),
            session: session.into(),
        }
    }

    /// Composite id, `{sourceType}:{projectKey}/{sessionKey}`.
    pub fn id(&self) -> String {
        format!("{}:{}/{}", self.source, self.project, self.session)
    }
}

/// Summary entry for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub source_type: SourceType,
    pub project_key: String,
    pub session_key: String,
    pub active: bool,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_directory: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<usize>,
    /// Source-specific fields carried through from the store's own metadata.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One decoded entry of a session's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub event_id: String,
    pub timestamp: String,
    pub instance: String,
    pub kind: String,
    pub payload: Value,
}

impl LogEvent {
    /// The object holding the event body. Structured-store lines wrap it in
    /// an `event` field; other syntaxes carry it at the top level.
    pub fn body(&self) -> &Value {
        match self.payload.get("event") {
            Some(inner) if inner.is_object() => inner,
            _ => &self.payload,
        }
    }

    /// Look a field up in the body first, then at the top level.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body().get(name).or_else(|| self.payload.get(name))
    }

    pub fn is_turn(&self) -> bool {
        self.instance == "user" || self.instance == "assistant"
    }
}

/// A single session with its full decoded event sequence, in file order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    pub id: String,
    pub metadata: SessionRecord,
    pub events: Vec<LogEvent>,
}
