use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::codec::{decode_log, LogSyntax};
use crate::error::SessionsError;
use crate::fs::FileStore;
use crate::liveness::marker_liveness;
use crate::metadata::{extract_metadata, timestamp_value};
use crate::source::{is_hidden, SessionSource};
use crate::types::{SessionDetail, SessionKey, SessionRecord, SourceType};

pub const METADATA_FILE: &str = "session_metadata.json";
pub const JSON_LOG_FILE: &str = "session.log.json";
pub const LEGACY_LOG_FILE: &str = "session.log";

const TITLE_KEYS: &[&str] = &["title", "name", "swarm_name"];
const START_KEYS: &[&str] = &["start_time", "timestamp", "started_at"];
const ROOT_KEYS: &[&str] = &["root_directory", "working_directory", "cwd"];

/// Metadata keys that would collide with record fields once flattened.
const RESERVED_KEYS: &[&str] = &[
    "id",
    "sourceType",
    "projectKey",
    "sessionKey",
    "active",
    "title",
    "rootDirectory",
    "startTime",
    "messageCount",
];

/// Sessions stored as `{root}/{project}/{session}/session_metadata.json`
/// with an NDJSON (or legacy text) event log alongside.
pub struct StructuredSource {
    store: Arc<dyn FileStore>,
    root: PathBuf,
    run_dir: PathBuf,
}

/// Raw log of a session together with its syntax.
struct SessionLog {
    syntax: LogSyntax,
    text: String,
}

impl StructuredSource {
    pub fn new(store: Arc<dyn FileStore>, root: PathBuf, run_dir: PathBuf) -> Self {
        Self {
            store,
            root,
            run_dir,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, key: &SessionKey) -> PathBuf {
        self.root.join(&key.project).join(&key.session)
    }

    /// Prefer the NDJSON log, fall back to the legacy text log.
    fn log_path(&self, dir: &Path) -> Option<(LogSyntax, PathBuf)> {
        let json_log = dir.join(JSON_LOG_FILE);
        if self.store.exists(&json_log) {
            return Some((LogSyntax::Structured, json_log));
        }
        let legacy_log = dir.join(LEGACY_LOG_FILE);
        if self.store.exists(&legacy_log) {
            return Some((LogSyntax::Legacy, legacy_log));
        }
        None
    }

    fn read_session(
        &self,
        key: &SessionKey,
        now: DateTime<Utc>,
    ) -> Result<(SessionRecord, Option<SessionLog>)> {
        let dir = self.session_dir(key);
        let metadata_path = dir.join(METADATA_FILE);

        let raw = self
            .store
            .read_to_string(&metadata_path)
            .with_context(|| format!("Failed to read {:?}", metadata_path))?;
        let metadata: Map<String, Value> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {:?}", metadata_path))?;

        let (log, fallback_time) = match self.log_path(&dir) {
            Some((syntax, path)) => {
                let text = self
                    .store
                    .read_to_string(&path)
                    .with_context(|| format!("Failed to read {:?}", path))?;
                let mtime = self.store.mod_time(&path)?;
                (Some(SessionLog { syntax, text }), mtime)
            }
            None => (None, self.store.mod_time(&metadata_path)?),
        };

        let extracted = log
            .as_ref()
            .map(|log| extract_metadata(log.syntax, &log.text, now));

        let title = first_str(&metadata, TITLE_KEYS)
            .map(str::to_string)
            .or_else(|| extracted.as_ref().map(|e| e.title.clone()))
            .unwrap_or_else(|| crate::types::UNTITLED.to_string());
        let start_time = START_KEYS
            .iter()
            .find_map(|k| metadata.get(*k).and_then(timestamp_value))
            .or_else(|| extracted.as_ref().and_then(|e| e.start_time))
            .unwrap_or(fallback_time);
        let root_directory = first_str(&metadata, ROOT_KEYS)
            .map(str::to_string)
            .or_else(|| extracted.as_ref().and_then(|e| e.root_directory.clone()));
        let message_count = metadata
            .get("message_count")
            .and_then(Value::as_u64)
            .map(|n| n as usize);

        let liveness = marker_liveness(self.store.as_ref(), &self.run_dir, &key.session);

        let mut extra = metadata;
        for reserved in RESERVED_KEYS {
            extra.remove(*reserved);
        }

        let record = SessionRecord {
            id: key.id(),
            source_type: SourceType::Structured,
            project_key: key.project.clone(),
            session_key: key.session.clone(),
            active: liveness.active,
            title,
            root_directory,
            start_time,
            message_count,
            extra,
        };

        Ok((record, log))
    }
}

impl SessionSource for StructuredSource {
    fn source_type(&self) -> SourceType {
        SourceType::Structured
    }

    fn discover(&self) -> Result<Vec<SessionKey>> {
        if !self.store.exists(&self.root) {
            tracing::debug!("Structured store not found at {:?}", self.root);
            return Ok(Vec::new());
        }

        let projects = self
            .store
            .list_dir(&self.root)
            .with_context(|| format!("Failed to read structured store: {:?}", self.root))?;

        let mut keys = Vec::new();
        for project in projects.into_iter().filter(|p| !is_hidden(p)) {
            let project_dir = self.root.join(&project);
            let sessions = match self.store.list_dir(&project_dir) {
                Ok(sessions) => sessions,
                Err(e) => {
                    tracing::debug!("Skipping project {:?}: {}", project_dir, e);
                    continue;
                }
            };
            keys.extend(
                sessions
                    .into_iter()
                    .filter(|s| !is_hidden(s))
                    .map(|s| SessionKey::new(SourceType::Structured, project.clone(), s)),
            );
        }

        Ok(keys)
    }

    fn load_record(&self, key: &SessionKey, now: DateTime<Utc>) -> Result<Option<SessionRecord>> {
        let (record, _) = self.read_session(key, now)?;
        Ok(Some(record))
    }

    fn load_detail(
        &self,
        key: &SessionKey,
        now: DateTime<Utc>,
    ) -> crate::error::Result<SessionDetail> {
        if !self.store.exists(&self.session_dir(key).join(METADATA_FILE)) {
            return Err(SessionsError::NotFound(key.id()));
        }

        let (metadata, log) = self.read_session(key, now)?;
        let events = log
            .map(|log| decode_log(log.syntax, &log.text, now))
            .unwrap_or_default();

        Ok(SessionDetail {
            id: metadata.id.clone(),
            metadata,
            events,
        })
    }
}

fn first_str<'a>(metadata: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| metadata.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}
