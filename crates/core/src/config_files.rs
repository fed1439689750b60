//! Service configuration files shipped inside a package.

use std::path::PathBuf;

/// A set of config files from the build output, the directory inside the
/// package they are copied into, and the packages they need at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFiles {
    /// Paths relative to the build directory.
    pub files: Vec<String>,
    /// Directory relative to the package root, e.g. `etc/nginx/sites-enabled`.
    pub config_dir: PathBuf,
    /// Packages the files are useless without (nginx configs need nginx).
    pub dependencies: Vec<String>,
}

impl ConfigFiles {
    /// Create a set of config files.
    #[must_use]
    pub fn new(
        files: Vec<String>,
        config_dir: impl Into<PathBuf>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            files,
            config_dir: config_dir.into(),
            dependencies,
        }
    }

    /// nginx site definitions.
    #[must_use]
    pub fn nginx(files: Vec<String>) -> Self {
        Self::new(
            files,
            "etc/nginx/sites-enabled",
            vec!["nginx-light".to_string()],
        )
    }

    /// supervisor program definitions.
    #[must_use]
    pub fn supervisor(files: Vec<String>) -> Self {
        Self::new(
            files,
            "etc/supervisor/conf.d",
            vec!["supervisor".to_string()],
        )
    }
}
