use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{Error, ErrorKind, Result};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
}

/// Settings applied when a connection is opened.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Open the database read-only
    pub read_only: bool,
    /// Create the file when it does not exist (ignored when read-only)
    pub create: bool,
    /// How long to wait on a locked database before failing
    pub busy_timeout_ms: Option<u64>,
    pub foreign_keys: Option<bool>,
    /// Journal mode such as "WAL" or "DELETE"
    pub journal_mode: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            read_only: false,
            create: true,
            busy_timeout_ms: None,
            foreign_keys: None,
            journal_mode: None,
        }
    }
}

impl ConnectionConfig {
    /// Rejects values that cannot be passed to the engine verbatim.
    pub fn validate(&self) -> Result<()> {
        if let Some(mode) = &self.journal_mode {
            if mode.is_empty() || !mode.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(Error::new(
                    ErrorKind::Config,
                    format!("invalid journal_mode {:?}", mode),
                ));
            }
        }
        Ok(())
    }
}

impl Config {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.connection.validate()?;
        Ok(config)
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = thinsqlite::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Config::from_toml_str(&content)
}

/// `<config dir>/thinsqlite/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("thinsqlite").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_CONFIG: &str = r#"
[connection]
read_only = false
create = true
busy_timeout_ms = 500
foreign_keys = true
journal_mode = "WAL"
"#;

    #[test]
    fn test_load_config_from_str() {
        let config = Config::from_toml_str(SAMPLE_CONFIG).expect("Failed to parse sample config");
        let conn = config.connection;
        assert!(!conn.read_only);
        assert!(conn.create);
        assert_eq!(conn.busy_timeout_ms, Some(500));
        assert_eq!(conn.foreign_keys, Some(true));
        assert_eq!(conn.journal_mode.as_deref(), Some("WAL"));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.connection.create);
    }

    #[test]
    fn test_invalid_journal_mode() {
        let err = Config::from_toml_str("[connection]\njournal_mode = \"WAL; DROP TABLE x\"\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_load_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_CONFIG.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.connection.busy_timeout_ms, Some(500));

        let err = load_config("/nonexistent/thinsqlite.toml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_default_config_path_layout() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("thinsqlite/config.toml"));
        }
    }
}
