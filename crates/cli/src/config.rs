//! Configuration loading from host.toml.

use std::path::{Path, PathBuf};

use capability::Grants;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub guest: GuestConfig,

    /// Capabilities revoked for the guest.
    #[serde(default)]
    pub capabilities: Grants,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuestConfig {
    /// Path to the engine component. Overridden by `--component`.
    pub component: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit newline-delimited JSON instead of text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::CapabilityKind;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.guest.component.is_none());
        assert_eq!(config.capabilities, Grants::default());
        assert_eq!(config.log.level, "warn");
        assert!(!config.log.json);
    }

    #[test]
    fn full_config() {
        let config = Config::parse(
            r#"
[guest]
component = "engine.wasm"

[capabilities]
deny = ["random"]

[log]
level = "debug"
json = true
"#,
        )
        .unwrap();

        assert_eq!(config.guest.component, Some(PathBuf::from("engine.wasm")));
        assert!(!config.capabilities.is_granted(CapabilityKind::Random));
        assert!(config.capabilities.is_granted(CapabilityKind::Stdout));
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let err = Config::parse("[backend]\nmodel = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[log]\nlevel = \"info\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("host.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
