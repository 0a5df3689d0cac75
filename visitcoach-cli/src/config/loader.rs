use super::types::{
    CoachConfig, RawBackendSection, RawCoachConfig, RawReplaySection, ReplayConfig,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use visitcoach_core::BackendConfig;
use visitcoach_core::backend::{DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT_SECS};

/// Overrides the configured endpoint
pub const ENDPOINT_ENV: &str = "VISITCOACH_ENDPOINT";

/// Overrides the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "VISITCOACH_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project + environment)
    pub fn load() -> Result<CoachConfig> {
        let mut layers = Vec::new();
        if let Some(user_path) = Self::user_config_path() {
            layers.push(user_path);
        }
        layers.push(Self::project_config_path());

        let raw = Self::load_layers(&layers)?;
        let raw = Self::apply_env(raw);
        Ok(Self::finalize(raw))
    }

    /// Read and merge config files in order, later files winning
    ///
    /// Missing files are skipped.
    pub fn load_layers(paths: &[PathBuf]) -> Result<RawCoachConfig> {
        let mut raw = RawCoachConfig::default();
        for path in paths {
            if let Some(layer) = Self::read_raw(path)? {
                raw = Self::merge_raw(raw, layer);
            }
        }
        Ok(raw)
    }

    fn read_raw(path: &Path) -> Result<Option<RawCoachConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(Some(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "visitcoach").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with VISITCOACH_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".visitcoach/config.toml")
        }
    }

    /// Apply environment overrides on top of the file layers
    fn apply_env(mut raw: RawCoachConfig) -> RawCoachConfig {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV)
            && !endpoint.trim().is_empty()
        {
            raw.backend.endpoint = Some(endpoint);
        }
        raw
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawCoachConfig, overlay: RawCoachConfig) -> RawCoachConfig {
        RawCoachConfig {
            backend: RawBackendSection {
                endpoint: overlay.backend.endpoint.or(base.backend.endpoint),
                timeout_secs: overlay.backend.timeout_secs.or(base.backend.timeout_secs),
            },
            replay: RawReplaySection {
                chunk_size: overlay.replay.chunk_size.or(base.replay.chunk_size),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawCoachConfig) -> CoachConfig {
        CoachConfig {
            backend: BackendConfig {
                endpoint: raw.backend.endpoint,
                timeout_secs: raw.backend.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            },
            replay: ReplayConfig {
                chunk_size: raw.replay.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            },
        }
    }
}
