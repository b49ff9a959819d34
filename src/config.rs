//! Configuration for linegrid.
//!
//! Settings are read from `~/.linegrid/config.toml`. Every field is optional
//! and command-line flags take precedence.
//!
//! # Configuration File
//!
//! ```toml
//! # Label put in front of every line (optional)
//! prefix = "build"
//!
//! # Emit a partial line after this many milliseconds without output.
//! # 0 or absent: only on newline or at the end of the stream
//! flush_timeout_ms = 250
//!
//! # "inherit" forwards output as it arrives, "collect" gathers it
//! stdio = "inherit"
//!
//! # Label palette, in hand-out order
//! colors = ["cyan", "magenta", "brightYellow"]
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::line_buffer::FlushTimeout;
use crate::core::process::StdioMode;
use crate::ui::palette::{self, ColorCycler};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default line label
    pub prefix: Option<String>,
    /// Partial-line flush delay in milliseconds
    pub flush_timeout_ms: Option<u64>,
    /// Output handling
    pub stdio: StdioMode,
    /// Palette override, by color name
    pub colors: Vec<String>,
}

impl Config {
    /// Load configuration from the default location, falling back to the
    /// defaults when the file is missing or invalid
    pub fn load() -> Self {
        let Some(path) = Self::get_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Get config file path
    pub fn get_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn flush_timeout(&self) -> FlushTimeout {
        FlushTimeout::from(self.flush_timeout_ms)
    }

    /// Palette built from `colors`. Unknown names are skipped.
    pub fn palette(&self) -> ColorCycler {
        let colors = self
            .colors
            .iter()
            .filter_map(|name| {
                let color = palette::color_by_name(name);
                if color.is_none() {
                    tracing::warn!(
                        "Unknown color {:?} in config, expected one of {:?}",
                        name,
                        palette::list()
                    );
                }
                color
            })
            .collect();
        ColorCycler::with_colors(colors)
    }
}

/// `~/.linegrid`, created on demand
pub fn config_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".linegrid");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::style::Color;
    use std::time::Duration;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.stdio, StdioMode::Inherit);
        assert_eq!(config.flush_timeout(), FlushTimeout::Never);
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml(
            r#"
            prefix = "build"
            flush_timeout_ms = 250
            stdio = "collect"
            colors = ["red", "bright-green"]
            "#,
        )
        .unwrap();

        assert_eq!(config.prefix.as_deref(), Some("build"));
        assert_eq!(
            config.flush_timeout(),
            FlushTimeout::After(Duration::from_millis(250))
        );
        assert_eq!(config.stdio, StdioMode::Collect);

        let mut palette = config.palette();
        assert_eq!(palette.next_color(), Color::DarkRed);
        assert_eq!(palette.next_color(), Color::Green);
        assert_eq!(palette.next_color(), Color::DarkRed);
    }

    #[test]
    fn test_zero_timeout_disables_flush() {
        let config = Config::from_toml("flush_timeout_ms = 0").unwrap();
        assert_eq!(config.flush_timeout(), FlushTimeout::Never);
    }

    #[test]
    fn test_unknown_colors_skipped() {
        let config = Config::from_toml(r#"colors = ["purple", "blue"]"#).unwrap();
        let palette = config.palette();
        assert_eq!(palette.len(), 1);

        let config = Config::from_toml(r#"colors = ["purple"]"#).unwrap();
        assert_eq!(config.palette().len(), palette::DEFAULT_PALETTE.len());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        assert!(matches!(
            Config::from_toml("stdio = \"sideways\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_toml("flush_timeout_ms = -1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_missing_path() {
        let path = std::env::temp_dir().join("linegrid-missing-config.toml");
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Read { .. })
        ));
    }
}
