//! Store-specific "is this session still running" checks.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::fs::FileStore;

/// Which signal decided liveness. A marker is authoritative; a recent write
/// is only a timing heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessSignal {
    Marker,
    RecentWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    pub active: bool,
    pub signal: LivenessSignal,
}

/// Structured store: active iff `{run_dir}/{session}` exists.
pub fn marker_liveness(store: &dyn FileStore, run_dir: &Path, session: &str) -> Liveness {
    Liveness {
        active: store.exists(&run_dir.join(session)),
        signal: LivenessSignal::Marker,
    }
}

/// Conversation store: active iff the log was modified within `window` of
/// `now`. Modification times ahead of `now` count as active.
pub fn recency_liveness(modified: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> Liveness {
    let age = now.signed_duration_since(modified);
    let active = match age.to_std() {
        Ok(age) => age <= window,
        Err(_) => true,
    };
    Liveness {
        active,
        signal: LivenessSignal::RecentWrite,
    }
}
