//! Tool configuration, typically loaded from `config.yaml`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Branch checked out when none is given on the command line.
pub const DEFAULT_BRANCH: &str = "develop";

/// Directory under which per-project workspaces are created.
pub const DEFAULT_WORKSPACE_BASE: &str = "/workspace";

/// sideloader configuration shared by every build on a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path on the target machine where builds are installed.
    pub install_location: String,
    /// Branch to build when none is requested.
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Directory in which workspaces are created.
    #[serde(default = "default_workspace_base")]
    pub workspace_base: PathBuf,
    /// GPG key used to sign `.deb` packages.
    #[serde(default)]
    pub gpg_key: Option<String>,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_workspace_base() -> PathBuf {
    PathBuf::from(DEFAULT_WORKSPACE_BASE)
}

impl Config {
    /// Create a configuration with defaults for everything but the install location.
    #[must_use]
    pub fn new(install_location: impl Into<String>) -> Self {
        Self {
            install_location: install_location.into(),
            default_branch: default_branch(),
            workspace_base: default_workspace_base(),
            gpg_key: None,
        }
    }

    /// Load the configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read, is not valid
    /// YAML, or lacks `install_location`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(
                format!("Failed to read {}: {e}", path.display()),
                "Pass the path to your sideloader config with --config",
            )
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::Config { message, help } => {
                Error::config(format!("{}: {message}", path.display()), help)
            }
            other => other,
        })
    }

    /// Parse the configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the YAML is invalid or incomplete.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| {
            Error::config(
                e.to_string(),
                "config.yaml needs at least an install_location entry",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_yaml("install_location: /var/praekelt\n").unwrap();
        assert_eq!(config.install_location, "/var/praekelt");
        assert_eq!(config.default_branch, "develop");
        assert_eq!(config.workspace_base, PathBuf::from("/workspace"));
        assert_eq!(config.gpg_key, None);
        assert_eq!(config, Config::new("/var/praekelt"));
    }

    #[test]
    fn test_all_fields() {
        let yaml = "install_location: /opt\n\
                    default_branch: main\n\
                    workspace_base: /tmp/ws\n\
                    gpg_key: ABCD1234\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.workspace_base, PathBuf::from("/tmp/ws"));
        assert_eq!(config.gpg_key.as_deref(), Some("ABCD1234"));
    }

    #[test]
    fn test_missing_install_location() {
        let err = Config::from_yaml("default_branch: main\n").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("install_location"));
    }

    #[test]
    fn test_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "install_location: /var/praekelt\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.install_location, "/var/praekelt");
    }

    #[test]
    fn test_from_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = Config::from_file(temp.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[test]
    fn test_invalid_yaml_names_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "install_location: [unclosed\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("config.yaml"));
    }
}
