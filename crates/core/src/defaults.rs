//! Process-wide default configuration
//!
//! Defaults are loaded once at startup and handed to the executor through a
//! [`DefaultsProvider`]; nothing in this crate mutates them afterwards.

use crate::{Result, StepError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the defaults file
pub const DEFAULTS_ENV_VAR: &str = "VAULTSTEP_DEFAULTS";

/// Global fallback configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalDefaults {
    /// Credential used when a step names none
    #[serde(default)]
    pub credential_id: Option<String>,
    /// Backend URL used when a step names none
    #[serde(default)]
    pub vault_url: Option<String>,
    /// Default renewal toggle
    #[serde(default)]
    pub renew: Option<bool>,
    /// Default renewal horizon in hours
    #[serde(default)]
    pub renew_hours: Option<u32>,
    /// Default for detailed failure output
    #[serde(default)]
    pub print_stacktrace: Option<bool>,
    /// Enterprise namespace
    #[serde(default)]
    pub namespace: Option<String>,
    /// Default KV engine version
    #[serde(default)]
    pub engine_version: Option<u8>,
    /// Upper bound for each backend call, in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Default for strict key lookup
    #[serde(default)]
    pub fail_on_missing_key: Option<bool>,
}

impl GlobalDefaults {
    /// Parse defaults from TOML
    ///
    /// # Errors
    ///
    /// Returns a configuration error on invalid TOML or unknown keys.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| StepError::configuration(format!("invalid defaults file: {e}")))
    }

    /// Request timeout as a `Duration`
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Source of the current global defaults.
///
/// Implementations must be safe for concurrent reads.
pub trait DefaultsProvider: Send + Sync {
    /// The defaults in effect, or `None` when the system is not configured
    fn current_defaults(&self) -> Option<GlobalDefaults>;
}

/// Fixed defaults, or none at all
#[derive(Debug, Clone, Default)]
pub struct StaticDefaults(Option<GlobalDefaults>);

impl StaticDefaults {
    /// Provide the given defaults
    #[must_use]
    pub const fn new(defaults: GlobalDefaults) -> Self {
        Self(Some(defaults))
    }

    /// Provide no defaults
    #[must_use]
    pub const fn unconfigured() -> Self {
        Self(None)
    }
}

impl DefaultsProvider for StaticDefaults {
    fn current_defaults(&self) -> Option<GlobalDefaults> {
        self.0.clone()
    }
}

/// Defaults read from a TOML file at construction time
#[derive(Debug, Clone)]
pub struct FileDefaults {
    path: Option<PathBuf>,
    defaults: Option<GlobalDefaults>,
}

impl FileDefaults {
    /// Load defaults from `path`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            StepError::configuration(format!(
                "failed to read defaults file {}: {e}",
                path.display()
            ))
        })?;
        let defaults = GlobalDefaults::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "Loaded global defaults");
        Ok(Self {
            path: Some(path.to_path_buf()),
            defaults: Some(defaults),
        })
    }

    /// Locate and load the defaults file.
    ///
    /// Lookup order:
    /// 1. `explicit`, which must exist
    /// 2. `$VAULTSTEP_DEFAULTS`, which must exist
    /// 3. `<config dir>/vaultstep/defaults.toml`, skipped when missing
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a named file is missing or any
    /// found file is invalid.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(DEFAULTS_ENV_VAR).filter(|p| !p.is_empty()) {
            return Self::load(PathBuf::from(path));
        }
        match default_location() {
            Some(path) if path.is_file() => Self::load(path),
            _ => {
                tracing::debug!("No global defaults file found");
                Ok(Self::unconfigured())
            }
        }
    }

    /// A provider with no defaults
    #[must_use]
    pub const fn unconfigured() -> Self {
        Self {
            path: None,
            defaults: None,
        }
    }

    /// File the defaults were read from
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl DefaultsProvider for FileDefaults {
    fn current_defaults(&self) -> Option<GlobalDefaults> {
        self.defaults.clone()
    }
}

/// `<config dir>/vaultstep/defaults.toml`
#[must_use]
pub fn default_location() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vaultstep").join("defaults.toml"))
}
