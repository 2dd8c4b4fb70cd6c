//! Application configuration management.
//!
//! Settings are merged from several layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file: `--config PATH`, or `config.toml` in the platform config
//!    directory (e.g. `~/.config/cataloguer/config.toml` on Linux)
//! 3. `CATALOGUER_*` environment variables (`CATALOGUER_FORMAT_PATTERN`, ...)
//! 4. Command-line flags
//!
//! ```toml
//! format_pattern = "%Y/%m/{file}"
//! unknown_format_pattern = "unsorted/{relative_path}/{file}"
//! storage_location = "~/.catalogues"
//! follow_symlinks = false
//! skip_hidden = true
//! ```
//!
//! Templates are parsed while the configuration is extracted, so a bad
//! template fails the invocation before anything is scanned.

use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::Template;
use crate::scanner::WalkerConfig;

/// Prefix of environment variables read by [`Config::figment`].
pub const ENV_PREFIX: &str = "CATALOGUER_";

/// Keys accepted in the configuration file and the environment.
pub const KEYS: &[&str] = &[
    "format_pattern",
    "unknown_format_pattern",
    "storage_location",
    "follow_symlinks",
    "skip_hidden",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`{}", suggestion_suffix(.suggestion))]
    UnknownKey {
        key: String,
        suggestion: Option<&'static str>,
    },

    #[error("configuration file {0} does not exist")]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

fn suggestion_suffix(suggestion: &Option<&'static str>) -> String {
    suggestion
        .map(|s| format!(", did you mean `{s}`?"))
        .unwrap_or_default()
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Template for files with a capture date
    pub format_pattern: Option<Template>,
    /// Template for files without one; rendered with the run's start time
    pub unknown_format_pattern: Option<Template>,
    /// Directory holding catalogue snapshots; a leading `~` is expanded
    pub storage_location: PathBuf,
    pub follow_symlinks: bool,
    pub skip_hidden: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format_pattern: None,
            unknown_format_pattern: None,
            storage_location: PathBuf::from("~/.catalogues"),
            follow_symlinks: false,
            skip_hidden: false,
        }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_pattern: Option<Template>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_format_pattern: Option<Template>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<PathBuf>,
}

impl Config {
    /// Platform-specific path of the default configuration file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "cataloguer").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Defaults, then the file at `path` (skipped if missing), then the
    /// environment.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).only(KEYS))
    }

    /// Load every layer, with `overrides` on top.
    ///
    /// `explicit` is a file named with `--config`; it must exist. Without
    /// it the default path is used when present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a missing explicit file, unknown keys,
    /// invalid templates or badly typed values.
    pub fn load(explicit: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) if !path.is_file() => return Err(ConfigError::MissingFile(path.into())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };
        log::debug!("Configuration file: {:?}", path);

        let figment = Self::figment(path.as_deref()).merge(Serialized::defaults(overrides));
        Self::from_figment(&figment)
    }

    /// Extract and validate a configuration.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let mut config: Config = figment.extract().map_err(|err| {
            let unknown = err.clone().into_iter().find_map(|e| match e.kind {
                figment::error::Kind::UnknownField(key, _) => Some(key),
                _ => None,
            });
            match unknown {
                Some(key) => ConfigError::UnknownKey {
                    suggestion: suggest_key(&key),
                    key,
                },
                None => ConfigError::Invalid(Box::new(err)),
            }
        })?;
        config.storage_location = expand_home(&config.storage_location);
        Ok(config)
    }

    #[must_use]
    pub fn walker(&self) -> WalkerConfig {
        WalkerConfig::new(self.follow_symlinks, self.skip_hidden)
    }
}

/// Closest known key, if it is close enough to be a typo.
fn suggest_key(key: &str) -> Option<&'static str> {
    KEYS.iter()
        .map(|known| (*known, strsim::jaro_winkler(key, known)))
        .filter(|(_, score)| *score > 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(known, _)| known)
}

/// Replace a leading `~` with the home directory.
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}
