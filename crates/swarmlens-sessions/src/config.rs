use std::path::PathBuf;
use std::time::Duration;

/// Default recency window for conversation-store liveness.
pub const DEFAULT_ACTIVE_WINDOW: Duration = Duration::from_secs(2 * 60);

/// Combined listings longer than this are interleaved by source.
pub const DEFAULT_INTERLEAVE_THRESHOLD: usize = 20;

/// Default cap on concurrent per-session loads.
pub const DEFAULT_MAX_WORKERS: usize = 16;

/// Locations and tuning knobs for the session engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the structured store (`{project}/{session}/session_metadata.json`)
    pub structured_root: PathBuf,
    /// Directory holding liveness markers for structured sessions
    pub run_dir: PathBuf,
    /// Root of the conversation store (`{project}/{session}.jsonl`)
    pub conversation_root: PathBuf,
    pub active_window: Duration,
    pub interleave_threshold: usize,
    pub max_workers: usize,
}

impl EngineConfig {
    /// Default locations under `home`.
    pub fn with_home(home: PathBuf) -> Self {
        let swarm = home.join(".claude-swarm");
        Self {
            structured_root: swarm.join("sessions"),
            run_dir: swarm.join("run"),
            conversation_root: home.join(".claude").join("projects"),
            active_window: DEFAULT_ACTIVE_WINDOW,
            interleave_threshold: DEFAULT_INTERLEAVE_THRESHOLD,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_home(dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }
}
