use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Map;

use crate::codec::{decode_log, LogSyntax};
use crate::error::SessionsError;
use crate::fs::FileStore;
use crate::liveness::recency_liveness;
use crate::metadata::{extract_metadata, ExtractedMetadata};
use crate::source::{is_hidden, SessionSource};
use crate::types::{LogEvent, SessionDetail, SessionKey, SessionRecord, SourceType};

const LOG_EXTENSION: &str = ".jsonl";

/// Sessions stored as `{root}/{project}/{session}.jsonl`.
pub struct ConversationSource {
    store: Arc<dyn FileStore>,
    root: PathBuf,
    active_window: Duration,
}

/// Everything read from one conversation log.
struct LoadedLog {
    record: SessionRecord,
    extracted: ExtractedMetadata,
    events: Vec<LogEvent>,
}

impl ConversationSource {
    pub fn new(store: Arc<dyn FileStore>, root: PathBuf, active_window: Duration) -> Self {
        Self {
            store,
            root,
            active_window,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn log_path(&self, key: &SessionKey) -> PathBuf {
        self.root
            .join(&key.project)
            .join(format!("{}{}", key.session, LOG_EXTENSION))
    }

    fn load(&self, key: &SessionKey, now: DateTime<Utc>) -> Result<LoadedLog> {
        let path = self.log_path(key);
        let text = self
            .store
            .read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let modified = self
            .store
            .mod_time(&path)
            .with_context(|| format!("Failed to stat {:?}", path))?;

        let events = decode_log(LogSyntax::Conversation, &text, now);
        let extracted = extract_metadata(LogSyntax::Conversation, &text, now);
        let turns = events.iter().filter(|e| e.is_turn()).count();
        let liveness = recency_liveness(modified, now, self.active_window);

        let record = SessionRecord {
            id: key.id(),
            source_type: SourceType::Conversation,
            project_key: key.project.clone(),
            session_key: key.session.clone(),
            active: liveness.active,
            title: extracted.title.clone(),
            root_directory: extracted.root_directory.clone(),
            start_time: extracted.start_time.unwrap_or(modified),
            message_count: Some(turns),
            extra: Map::new(),
        };

        Ok(LoadedLog {
            record,
            extracted,
            events,
        })
    }
}

impl SessionSource for ConversationSource {
    fn source_type(&self) -> SourceType {
        SourceType::Conversation
    }

    fn discover(&self) -> Result<Vec<SessionKey>> {
        if !self.store.exists(&self.root) {
            tracing::debug!("Conversation store not found at {:?}", self.root);
            return Ok(Vec::new());
        }

        let projects = self
            .store
            .list_dir(&self.root)
            .with_context(|| format!("Failed to read conversation store: {:?}", self.root))?;

        let mut keys = Vec::new();
        for project in projects.into_iter().filter(|p| !is_hidden(p)) {
            let project_dir = self.root.join(&project);
            let files = match self.store.list_dir(&project_dir) {
                Ok(files) => files,
                Err(e) => {
                    tracing::debug!("Skipping project {:?}: {}", project_dir, e);
                    continue;
                }
            };
            for file in files.iter().filter(|f| !is_hidden(f)) {
                if let Some(stem) = file.strip_suffix(LOG_EXTENSION) {
                    keys.push(SessionKey::new(SourceType::Conversation, project.clone(), stem));
                }
            }
        }

        Ok(keys)
    }

    fn load_record(&self, key: &SessionKey, now: DateTime<Utc>) -> Result<Option<SessionRecord>> {
        let loaded = self.load(key, now)?;

        if loaded.extracted.is_warmup {
            tracing::debug!(id = %loaded.record.id, "skipping warmup session");
            return Ok(None);
        }
        if loaded.record.message_count == Some(0) {
            tracing::debug!(id = %loaded.record.id, "skipping session without turns");
            return Ok(None);
        }

        Ok(Some(loaded.record))
    }

    fn load_detail(
        &self,
        key: &SessionKey,
        now: DateTime<Utc>,
    ) -> crate::error::Result<SessionDetail> {
        if !self.store.exists(&self.log_path(key)) {
            return Err(SessionsError::NotFound(key.id()));
        }

        let LoadedLog { record, events, .. } = self.load(key, now)?;
        Ok(SessionDetail {
            id: record.id.clone(),
            metadata: record,
            events,
        })
    }
}
