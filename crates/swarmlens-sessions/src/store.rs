use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::EngineConfig;
use crate::error::{Result, SessionsError};
use crate::fs::{FileStore, LocalFileStore};
use crate::source::{ConversationSource, SessionSource, StructuredSource};
use crate::types::{SessionDetail, SessionKey, SessionRecord, SourceFilter, SourceType};

/// Unified, ranked view over every configured session store.
///
/// Holds no session data between calls; every query re-reads the stores.
pub struct SessionStore {
    sources: Vec<Arc<dyn SessionSource>>,
    interleave_threshold: usize,
    max_workers: usize,
}

impl SessionStore {
    /// Create a store reading the local filesystem.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_file_store(Arc::new(LocalFileStore), config)
    }

    /// Create a store over a custom file-store capability.
    pub fn with_file_store(files: Arc<dyn FileStore>, config: &EngineConfig) -> Self {
        let structured = StructuredSource::new(
            Arc::clone(&files),
            config.structured_root.clone(),
            config.run_dir.clone(),
        );
        let conversation = ConversationSource::new(
            files,
            config.conversation_root.clone(),
            config.active_window,
        );
        Self::with_sources(
            vec![Arc::new(structured), Arc::new(conversation)],
            config.interleave_threshold,
            config.max_workers,
        )
    }

    pub fn with_sources(
        sources: Vec<Arc<dyn SessionSource>>,
        interleave_threshold: usize,
        max_workers: usize,
    ) -> Self {
        Self {
            sources,
            interleave_threshold,
            max_workers: max_workers.max(1),
        }
    }

    /// List sessions from the selected sources, ranked for display.
    pub async fn list_sessions(&self, filter: SourceFilter) -> Vec<SessionRecord> {
        self.list_sessions_at(filter, Utc::now()).await
    }

    /// [`list_sessions`](Self::list_sessions) with an explicit clock.
    pub async fn list_sessions_at(
        &self,
        filter: SourceFilter,
        now: DateTime<Utc>,
    ) -> Vec<SessionRecord> {
        let mut discovery = JoinSet::new();
        for source in self.sources.iter().filter(|s| filter.includes(s.source_type())) {
            let source = Arc::clone(source);
            discovery.spawn_blocking(move || {
                let keys = source.discover();
                (source, keys)
            });
        }

        let permits = Arc::new(Semaphore::new(self.max_workers));
        let mut loads = JoinSet::new();

        while let Some(joined) = discovery.join_next().await {
            let (source, keys) = match joined {
                Ok((source, Ok(keys))) => (source, keys),
                Ok((source, Err(e))) => {
                    tracing::warn!("Failed to enumerate {} sessions: {:#}", source.source_type(), e);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Session discovery task failed: {}", e);
                    continue;
                }
            };

            tracing::debug!("Discovered {} {} sessions", keys.len(), source.source_type());

            for key in keys {
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                    break;
                };
                let source = Arc::clone(&source);
                loads.spawn_blocking(move || {
                    let _permit = permit;
                    let record = source.load_record(&key, now);
                    (key, record)
                });
            }
        }

        let mut records = Vec::new();
        while let Some(joined) = loads.join_next().await {
            match joined {
                Ok((_, Ok(Some(record)))) => records.push(record),
                Ok((_, Ok(None))) => {}
                Ok((key, Err(e))) => {
                    tracing::warn!("Failed to load session {}: {:#}", key.id(), e);
                }
                Err(e) => {
                    tracing::warn!("Session load task failed: {}", e);
                }
            }
        }

        rank_sessions(records, filter, self.interleave_threshold)
    }

    /// Load a single session by the id returned from a listing.
    pub async fn get_session(&self, id: &str) -> Result<SessionDetail> {
        self.get_session_at(id, Utc::now()).await
    }

    /// [`get_session`](Self::get_session) with an explicit clock.
    pub async fn get_session_at(&self, id: &str, now: DateTime<Utc>) -> Result<SessionDetail> {
        let key = parse_session_id(id)?;
        let source = self
            .sources
            .iter()
            .find(|s| s.source_type() == key.source)
            .cloned()
            .ok_or_else(|| SessionsError::UnknownSourceType(key.source.to_string()))?;

        tokio::task::spawn_blocking(move || source.load_detail(&key, now))
            .await
            .map_err(|e| SessionsError::Task(e.to_string()))?
    }
}

/// Split `{type}:{project}/{session}` back into a [`SessionKey`].
pub fn parse_session_id(id: &str) -> Result<SessionKey> {
    let (prefix, location) = id
        .split_once(':')
        .ok_or_else(|| SessionsError::InvalidId(id.to_string()))?;
    let source: SourceType = prefix
        .parse()
        .map_err(|_| SessionsError::UnknownSourceType(prefix.to_string()))?;
    let (project, session) = location
        .split_once('/')
        .ok_or_else(|| SessionsError::InvalidId(id.to_string()))?;

    if !is_safe_component(project) || !is_safe_component(session) {
        return Err(SessionsError::InvalidId(id.to_string()));
    }

    Ok(SessionKey::new(source, project, session))
}

/// Keys map straight onto path components and must not escape the store.
fn is_safe_component(part: &str) -> bool {
    !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
}

/// Active first, newest first, then by id so equal keys keep a stable order.
fn compare_records(a: &SessionRecord, b: &SessionRecord) -> Ordering {
    b.active
        .cmp(&a.active)
        .then_with(|| b.start_time.cmp(&a.start_time))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort, then interleave by source when a combined listing is long.
pub fn rank_sessions(
    mut records: Vec<SessionRecord>,
    filter: SourceFilter,
    interleave_threshold: usize,
) -> Vec<SessionRecord> {
    records.sort_by(compare_records);

    if filter == SourceFilter::All && records.len() > interleave_threshold {
        interleave(records)
    } else {
        records
    }
}

/// Round-robin structured and conversation records within the active and
/// inactive groups, keeping every active record ahead of every inactive one.
/// Expects `records` already sorted.
pub fn interleave(records: Vec<SessionRecord>) -> Vec<SessionRecord> {
    let (active, inactive): (Vec<_>, Vec<_>) = records.into_iter().partition(|r| r.active);
    let mut merged = round_robin(active);
    merged.extend(round_robin(inactive));
    merged
}

fn round_robin(group: Vec<SessionRecord>) -> Vec<SessionRecord> {
    let total = group.len();
    let (structured, conversation): (Vec<_>, Vec<_>) = group
        .into_iter()
        .partition(|r| r.source_type == SourceType::Structured);

    let mut merged = Vec::with_capacity(total);
    let mut structured = structured.into_iter();
    let mut conversation = conversation.into_iter();
    loop {
        let (s, c) = (structured.next(), conversation.next());
        if s.is_none() && c.is_none() {
            break;
        }
        merged.extend(s);
        merged.extend(c);
    }
    merged
}
