//! Well-known paths inside a Python virtualenv.

use std::path::{Path, PathBuf};

/// Name of the build virtualenv inside a workspace.
pub const BUILD_VENV_NAME: &str = "ve";

/// Paths of a virtualenv rooted at `<root>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenvPaths {
    /// The virtualenv directory.
    pub venv: PathBuf,
    /// Its `bin` directory.
    pub bin: PathBuf,
    /// The `activate` script.
    pub activate: PathBuf,
    /// The `pip` executable.
    pub pip: PathBuf,
    /// The `python` executable.
    pub python: PathBuf,
}

impl VenvPaths {
    /// Compute the paths of a virtualenv called `name` under `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>, name: &str) -> Self {
        let venv = root.as_ref().join(name);
        let bin = venv.join("bin");
        Self {
            activate: bin.join("activate"),
            pip: bin.join("pip"),
            python: bin.join("python"),
            bin,
            venv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venv_paths() {
        let paths = VenvPaths::new("/mypath", "myvenv");

        assert_eq!(paths.venv, Path::new("/mypath/myvenv"));
        assert_eq!(paths.bin, Path::new("/mypath/myvenv/bin"));
        assert_eq!(paths.activate, Path::new("/mypath/myvenv/bin/activate"));
        assert_eq!(paths.pip, Path::new("/mypath/myvenv/bin/pip"));
        assert_eq!(paths.python, Path::new("/mypath/myvenv/bin/python"));
    }
}
