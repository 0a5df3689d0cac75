use serde::{Deserialize, Serialize};
use visitcoach_core::BackendConfig;
use visitcoach_core::backend::DEFAULT_CHUNK_SIZE;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCoachConfig {
    #[serde(default)]
    pub backend: RawBackendSection,

    #[serde(default)]
    pub replay: RawReplaySection,
}

/// Backend section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBackendSection {
    /// Analysis endpoint URL
    pub endpoint: Option<String>,

    /// Whole-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawReplaySection {
    /// Bytes per replayed chunk
    pub chunk_size: Option<usize>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CoachConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    pub chunk_size: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
