//! Bump tool configuration, loaded from a TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors that can occur loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for the version-bump flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BumpConfig {
    /// Perforce client workspace the bump runs in.
    pub workspace: String,
    /// Depot path of the project, without a trailing wildcard.
    pub depot: String,
    /// Local path of the version manifest.
    pub version_file: PathBuf,
    /// Override for the p4 executable name.
    pub p4_executable: Option<String>,
    /// Force-sync the workspace to the latest change before bumping.
    pub sync: bool,
}

impl Default for BumpConfig {
    fn default() -> Self {
        Self {
            workspace: String::new(),
            depot: "//depot/main".to_string(),
            version_file: PathBuf::from("version.json"),
            p4_executable: None,
            sync: true,
        }
    }
}

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load(path: &Path) -> Result<BumpConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BumpConfig::default();
        assert_eq!(config.depot, "//depot/main");
        assert_eq!(config.version_file, PathBuf::from("version.json"));
        assert!(config.p4_executable.is_none());
        assert!(config.sync);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("p4bump.toml");
        std::fs::write(
            &path,
            "workspace = \"ws_build\"\ndepot = \"//game/main\"\n",
        )
        .expect("write fixture");

        let config = load(&path).expect("load");
        assert_eq!(config.workspace, "ws_build");
        assert_eq!(config.depot, "//game/main");
        assert_eq!(config.version_file, PathBuf::from("version.json"));
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("p4bump.toml");
        std::fs::write(&path, "workspace = [unclosed").expect("write fixture");
        assert!(matches!(load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            load(&dir.path().join("absent.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
