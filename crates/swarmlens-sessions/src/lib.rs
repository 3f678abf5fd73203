//! # swarmlens-sessions
//!
//! Discovers agent sessions in the structured swarm store and the
//! conversation log store, normalizes their events, and ranks them into a
//! single listing.
//!
//! ## Key Types
//!
//! - [`SessionStore`] - `list_sessions` / `get_session` over every store
//! - [`SessionRecord`] - listing entry
//! - [`SessionDetail`] - metadata plus decoded [`LogEvent`]s
//! - [`FileStore`] - the filesystem capability the sources read through

pub mod codec;
pub mod config;
pub mod error;
pub mod fs;
pub mod liveness;
pub mod metadata;
pub mod source;
pub mod store;
pub mod types;

pub use codec::{decode_line, decode_log, parse_legacy_line, LegacyLine, LogSyntax};
pub use config::EngineConfig;
pub use error::SessionsError;
pub use fs::{FileStore, LocalFileStore};
pub use liveness::{Liveness, LivenessSignal};
pub use metadata::{extract_metadata, ExtractedMetadata};
pub use source::{ConversationSource, SessionSource, StructuredSource};
pub use store::{interleave, parse_session_id, rank_sessions, SessionStore};
pub use types::{
    LogEvent, SessionDetail, SessionKey, SessionRecord, SourceFilter, SourceType, UNTITLED,
};
