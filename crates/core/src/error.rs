//! Error types for the sideloader pipeline.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for sideloader operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing, building or packaging a project.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The tool configuration (`config.yaml`) is missing or invalid.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(sideloader::config), help("{help}"))]
    Config {
        /// The error message
        message: String,
        /// Help text for the user
        help: String,
    },

    /// The project's deploy file could not be parsed or was overridden badly.
    #[error("Deploy error: {message}")]
    #[diagnostic(
        code(sideloader::deploy),
        help("Check the project's .deploy.yaml and the command-line overrides")
    )]
    Deploy {
        /// The error message
        message: String,
        /// The deploy file involved, if any
        path: Option<PathBuf>,
    },

    /// The repository URL could not be turned into a repository name.
    #[error("Invalid repository URL: {url}")]
    #[diagnostic(
        code(sideloader::repo_url),
        help("Use a URL of the form https://github.com/<org>/<repo>.git")
    )]
    RepoUrl {
        /// The offending URL
        url: String,
    },

    /// An unknown deploy type or package target was requested.
    #[error("Unknown {kind}: {value}")]
    #[diagnostic(code(sideloader::unknown_value), help("Valid values: {valid}"))]
    UnknownValue {
        /// What was being parsed (e.g. "deploy type")
        kind: &'static str,
        /// The rejected value
        value: String,
        /// Comma-separated list of accepted values
        valid: &'static str,
    },

    /// An external command could not be started.
    #[error("Failed to spawn '{command}': {source}")]
    #[diagnostic(
        code(sideloader::spawn),
        help("Ensure the program is installed and on PATH")
    )]
    Spawn {
        /// The command line
        command: String,
        /// The underlying source error
        #[source]
        source: std::io::Error,
    },

    /// An external command exited unsuccessfully.
    #[error("Command '{command}' failed with {status}")]
    #[diagnostic(code(sideloader::command_failed), help("{stderr}"))]
    CommandFailed {
        /// The command line
        command: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// A filesystem operation failed.
    #[error("I/O {operation} failed on {}: {source}", path.display())]
    #[diagnostic(code(sideloader::io))]
    Io {
        /// What was being attempted (e.g. "create directory")
        operation: &'static str,
        /// The path involved
        path: PathBuf,
        /// The underlying source error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a new deploy error.
    #[must_use]
    pub fn deploy(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Deploy {
            message: message.into(),
            path,
        }
    }

    /// Create a new repository URL error.
    #[must_use]
    pub fn repo_url(url: impl Into<String>) -> Self {
        Self::RepoUrl { url: url.into() }
    }

    /// Create a new I/O error tied to a path.
    #[must_use]
    pub fn io(
        operation: &'static str,
        path: impl AsRef<Path>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// The [`std::io::ErrorKind`] behind this error, if it wraps one.
    #[must_use]
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::Io { source, .. } | Self::Spawn { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = Error::config("install_location is required", "add it to config.yaml");
        assert_eq!(
            err.to_string(),
            "Configuration error: install_location is required"
        );
    }

    #[test]
    fn test_deploy_error() {
        let err = Error::deploy("Deploy has no attribute 'blah'", None);
        assert!(err.to_string().contains("no attribute 'blah'"));
    }

    #[test]
    fn test_repo_url_error() {
        let err = Error::repo_url("https://github.com");
        assert_eq!(err.to_string(), "Invalid repository URL: https://github.com");
    }

    #[test]
    fn test_unknown_value_error() {
        let err = Error::UnknownValue {
            kind: "deploy type",
            value: "docker".to_string(),
            valid: "dir, python, virtualenv",
        };
        assert_eq!(err.to_string(), "Unknown deploy type: docker");
    }

    #[test]
    fn test_command_failed_error() {
        let err = Error::CommandFailed {
            command: "git clone x".to_string(),
            status: "exit status: 128".to_string(),
            stderr: String::new(),
        };
        assert!(err.to_string().contains("git clone x"));
        assert!(err.to_string().contains("128"));
    }

    #[test]
    fn test_io_error_kind() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io("create directory", "/tmp/ws/build", source);
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
        assert!(err.to_string().contains("create directory"));
        assert!(err.to_string().contains("/tmp/ws/build"));
    }

    #[test]
    fn test_non_io_error_has_no_kind() {
        assert_eq!(Error::repo_url("x").io_kind(), None);
    }
}
