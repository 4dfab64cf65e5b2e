//! # robotape-config
//!
//! TOML configuration for the robotape runtime.
//!
//! Every field has a default, so an empty document is a valid configuration:
//! an in-memory store, three retries per tool, no backoff.
//!
//! ```toml
//! [store]
//! path = "tapes.db"
//!
//! [tools]
//! max_retries = 2
//! agent = "search_agent"
//!
//! [tools.backoff]
//! kind = "exponential"
//! base_delay_ms = 100
//! max_delay_ms = 2000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use robotape_contracts::{
    error::{RobotapeError, RobotapeResult},
    tool::Backoff,
};

/// Retry bound applied when nothing else is configured.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Agent name stamped on tool outcome steps when nothing else is configured.
pub const DEFAULT_TOOL_AGENT: &str = "agent";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotapeConfig {
    pub store: StoreConfig,
    pub tools: ToolConfig,
}

/// Where tapes are persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// SQLite database file. `None` selects an in-memory store.
    pub path: Option<PathBuf>,
}

/// Defaults applied to every tool built with `Tool::with_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Agent name recorded on tool outcome steps.
    pub agent: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::None,
            agent: DEFAULT_TOOL_AGENT.to_string(),
        }
    }
}

impl RobotapeConfig {
    /// Parse `s` as a TOML configuration document.
    ///
    /// Returns `RobotapeError::Config` if the TOML is malformed, contains
    /// unknown keys, or fails `validate`.
    pub fn from_toml_str(s: &str) -> RobotapeResult<Self> {
        let config: RobotapeConfig = toml::from_str(s).map_err(|e| RobotapeError::Config {
            reason: format!("failed to parse configuration TOML: {e}"),
        })?;
        config.validate()?;
        debug!(
            store_path = ?config.store.path,
            max_retries = config.tools.max_retries,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> RobotapeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| RobotapeError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> RobotapeResult<()> {
        if self.tools.agent.trim().is_empty() {
            return Err(RobotapeError::Config {
                reason: "tools.agent must not be empty".to_string(),
            });
        }
        if let Backoff::Exponential {
            base_delay_ms,
            max_delay_ms,
        } = self.tools.backoff
        {
            if base_delay_ms > max_delay_ms {
                return Err(RobotapeError::Config {
                    reason: format!(
                        "tools.backoff.base_delay_ms ({base_delay_ms}) exceeds max_delay_ms ({max_delay_ms})"
                    ),
                });
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = RobotapeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RobotapeConfig::default());
        assert_eq!(config.tools.max_retries, 3);
        assert_eq!(config.tools.backoff, Backoff::None);
        assert!(config.store.path.is_none());
    }

    #[test]
    fn full_document_parses() {
        let toml = r#"
            [store]
            path = "tapes.db"

            [tools]
            max_retries = 2
            agent = "search_agent"

            [tools.backoff]
            kind = "exponential"
            base_delay_ms = 100
            max_delay_ms = 2000
        "#;

        let config = RobotapeConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.store.path, Some(PathBuf::from("tapes.db")));
        assert_eq!(config.tools.max_retries, 2);
        assert_eq!(config.tools.agent, "search_agent");
        assert_eq!(
            config.tools.backoff,
            Backoff::Exponential {
                base_delay_ms: 100,
                max_delay_ms: 2000
            }
        );
    }

    #[test]
    fn fixed_backoff_parses() {
        let toml = r#"
            [tools.backoff]
            kind = "fixed"
            delay_ms = 50
        "#;
        let config = RobotapeConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.tools.backoff, Backoff::Fixed { delay_ms: 50 });
    }

    #[test]
    fn unknown_key_is_a_config_error() {
        let err = RobotapeConfig::from_toml_str("[tools]\nretries = 2\n").unwrap_err();
        assert!(matches!(err, RobotapeError::Config { .. }));
    }

    #[test]
    fn inverted_backoff_bounds_are_rejected() {
        let toml = r#"
            [tools.backoff]
            kind = "exponential"
            base_delay_ms = 500
            max_delay_ms = 100
        "#;
        let err = RobotapeConfig::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("base_delay_ms"));
    }

    #[test]
    fn empty_agent_is_rejected() {
        let err = RobotapeConfig::from_toml_str("[tools]\nagent = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("tools.agent"));
    }

    #[test]
    fn from_file_reads_and_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tools]\nmax_retries = 0").unwrap();

        let config = RobotapeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.tools.max_retries, 0);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = RobotapeConfig::from_file(Path::new("/nonexistent/robotape.toml")).unwrap_err();
        assert!(matches!(err, RobotapeError::Config { .. }));
    }
}
