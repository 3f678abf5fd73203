//! Per-store session adapters.

mod conversation;
mod structured;

pub use conversation::ConversationSource;
pub use structured::StructuredSource;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{SessionDetail, SessionKey, SessionRecord, SourceType};

/// One on-disk session store.
///
/// `discover` and `load_record` are split so callers can fan the per-session
/// work out across workers.
pub trait SessionSource: Send + Sync {
    fn source_type(&self) -> SourceType;

    /// Enumerate sessions. A missing store root yields no sessions.
    fn discover(&self) -> anyhow::Result<Vec<SessionKey>>;

    /// Build the listing entry for one session. `Ok(None)` means the session
    /// exists but is not worth listing.
    fn load_record(
        &self,
        key: &SessionKey,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<SessionRecord>>;

    /// Load one session with its full event sequence.
    fn load_detail(&self, key: &SessionKey, now: DateTime<Utc>) -> Result<SessionDetail>;
}

/// Dot-prefixed entries are never sessions or projects.
pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}
