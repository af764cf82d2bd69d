//! Engine configuration for Cairn.
//!
//! ```toml
//! [engine]
//! max_arity = 255
//! trail_elision = true
//! catcher_capacity = 256
//!
//! [capabilities]
//! filesystem = true
//! host_reflection = true
//! statistics = true
//!
//! [limits]
//! max_steps = 1000000
//! ```
//!
//! Every section and key is optional.

use std::path::{Path, PathBuf};
use std::{env, fs};

use cairn_types::{Capabilities, Capability};
use serde::Deserialize;
use thiserror::Error;

/// Size of the fixed argument register bank; `max_arity` may not go below it.
pub const FIXED_REGISTERS: usize = 8;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "CAIRN_CONFIG";

// Default value functions for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

const fn default_max_arity() -> usize {
    255
}

const fn default_catcher_capacity() -> usize {
    256
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub capabilities: CapabilityConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } => Some(path),
            ConfigError::Parse { path, .. } => path.as_deref(),
            ConfigError::Invalid(_) => None,
        }
    }
}

/// Engine tunables.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EngineSection {
    /// Number of argument registers. Registers past the fixed bank live in
    /// an overflow array. Default: 255. Minimum: 8.
    #[serde(default = "default_max_arity")]
    pub max_arity: usize,
    /// Skip trailing bindings of variables younger than the newest choice
    /// point. Default: true.
    #[serde(default = "default_true")]
    pub trail_elision: bool,
    /// Initial capacity of the catcher-barrier stack. Default: 256.
    #[serde(default = "default_catcher_capacity")]
    pub catcher_capacity: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_arity: default_max_arity(),
            trail_elision: true,
            catcher_capacity: default_catcher_capacity(),
        }
    }
}

/// Capability switches. All capabilities are enabled unless turned off.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct CapabilityConfig {
    #[serde(default = "default_true")]
    pub filesystem: bool,
    #[serde(default = "default_true")]
    pub host_reflection: bool,
    #[serde(default = "default_true")]
    pub statistics: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            filesystem: true,
            host_reflection: true,
            statistics: true,
        }
    }
}

impl CapabilityConfig {
    #[must_use]
    pub fn enabled(&self) -> Capabilities {
        Capabilities::none()
            .with(Capability::Filesystem, self.filesystem)
            .with(Capability::HostReflection, self.host_reflection)
            .with(Capability::Statistics, self.statistics)
    }
}

/// Limits consulted by the reduction loop.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct LimitsConfig {
    /// Stop after this many reductions per `run` call. Default: unlimited.
    pub max_steps: Option<u64>,
}

impl EngineConfig {
    /// Load the user config, falling back to defaults.
    ///
    /// Read and parse failures are logged and yield the default config; a
    /// missing file is not an error.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Failed to load config at {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|source| ConfigError::Parse { path: None, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_arity < FIXED_REGISTERS {
            return Err(ConfigError::Invalid(format!(
                "max_arity must be at least {FIXED_REGISTERS} (got {})",
                self.engine.max_arity
            )));
        }
        if self.limits.max_steps == Some(0) {
            return Err(ConfigError::Invalid("max_steps must be at least 1".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_capability(mut self, cap: Capability, enabled: bool) -> Self {
        match cap {
            Capability::Filesystem => self.capabilities.filesystem = enabled,
            Capability::HostReflection => self.capabilities.host_reflection = enabled,
            Capability::Statistics => self.capabilities.statistics = enabled,
        }
        self
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

/// `$CAIRN_CONFIG` if set, otherwise `~/.cairn/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".cairn").join("config.toml"))
}
