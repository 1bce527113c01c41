//! Server configuration
//!
//! Two layers:
//! - [`ServerConfig`]: read once at start-up from TOML. Bind address, links, library layout.
//! - [`LiveConfig`]: admin/ban/mute lists and tunables, read from JSON and re-read whenever the
//!   file changes. Readers always see one whole snapshot.

pub mod live;
pub mod watcher;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{links, network};
use crate::error::{LibraryError, LibraryResult};
use crate::library::LibraryGeometry;

pub use live::{LiveConfig, LiveConfigHandle};
pub use watcher::ConfigWatcher;

/// Static server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub server_name: String,
    /// JSON file with the live settings; defaults are used when absent
    pub live_config_path: Option<PathBuf>,
    /// Log every inbound packet
    pub debug: bool,
    /// Webhook that receives `/report` submissions as `{"content": ...}` JSON; reporting is off
    /// without one
    pub report_webhook_url: Option<String>,
    pub learn_more_url: String,
    pub nearby_search_url: String,
    pub library: LibraryGeometry,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: network::DEFAULT_BIND_ADDRESS.to_string(),
            server_name: "Library of Babel".to_string(),
            live_config_path: None,
            debug: false,
            report_webhook_url: None,
            learn_more_url: links::LEARN_MORE_URL.to_string(),
            nearby_search_url: links::NEARBY_SEARCH_TOOL_URL.to_string(),
            library: LibraryGeometry::default(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> LibraryResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| LibraryError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> LibraryResult<Self> {
        let config: ServerConfig = toml::from_str(raw)?;
        config.library.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ServerConfig::from_toml_str(
            r#"
            bind_address = "127.0.0.1:4000"
            debug = true
            report_webhook_url = "https://hooks.example/reports"

            [library]
            proximity_threshold = 48.0
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:4000");
        assert!(config.debug);
        assert_eq!(config.report_webhook_url.as_deref(), Some("https://hooks.example/reports"));
        assert_eq!(config.library.proximity_threshold, 48.0);
        assert_eq!(config.library.shelf_count(), 81);
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let result = ServerConfig::from_toml_str(
            r#"
            [library]
            vertical_chunks = 244
            "#,
        );
        assert!(matches!(result.unwrap_err(), LibraryError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server_name = \"Babel Test\"").unwrap();
        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.server_name, "Babel Test");

        assert!(ServerConfig::load("/definitely/not/here.toml").is_err());
    }
}
