//! Deploy types: how the build output is turned into an fpm source.

use crate::deploy::Deploy;
use crate::error::{Error, Result};
use crate::fs::list_dir_names;
use crate::venv::VenvPaths;
use crate::workspace::Workspace;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The kind of deployment being packaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeployType {
    /// A plain directory tree.
    Dir,
    /// A Python package built from the repository's `setup.py`.
    Python,
    /// A directory tree with a virtualenv recreated at install time.
    #[default]
    VirtualEnv,
}

impl DeployType {
    /// All deploy types, in CLI order.
    pub const ALL: [Self; 3] = [Self::Dir, Self::Python, Self::VirtualEnv];

    /// The `-s` source type passed to fpm.
    #[must_use]
    pub const fn fpm_source(self) -> &'static str {
        match self {
            Self::Dir | Self::VirtualEnv => "dir",
            Self::Python => "python",
        }
    }

    /// Packages every deployment of this type needs on the target machine.
    #[must_use]
    pub fn dependencies(self) -> Vec<String> {
        match self {
            Self::VirtualEnv => vec!["python-virtualenv".to_string()],
            Self::Dir | Self::Python => Vec::new(),
        }
    }

    /// Whether fpm reads the version from the source (e.g. `setup.py`).
    #[must_use]
    pub const fn provides_version(self) -> bool {
        matches!(self, Self::Python)
    }

    /// Scripting injected before the user's post-install script.
    #[must_use]
    pub fn set_up_script(self, install_location: &Path, deploy: &Deploy) -> String {
        match self {
            Self::Dir | Self::Python => String::new(),
            Self::VirtualEnv => {
                let venv_name = deploy
                    .virtualenv_prefix
                    .as_deref()
                    .map_or_else(|| "python".to_string(), |prefix| format!("{prefix}-python"));
                let venv = VenvPaths::new(install_location, &venv_name);
                let frozen = install_location
                    .join(format!("{}-requirements.pip", deploy.name_or_empty()));

                format!(
                    "# Create and activate the virtualenv\n\
                     if [ ! -f {python} ]; then\n    \
                     /usr/bin/virtualenv {venv}\n\
                     fi\n\
                     VENV={venv}\n\
                     source {activate}\n\
                     \n\
                     # Upgrade pip and re-install pip requirements\n\
                     {pip} install --upgrade pip\n\
                     {pip} install --upgrade -r {frozen}",
                    python = venv.python.display(),
                    venv = venv.venv.display(),
                    activate = venv.activate.display(),
                    pip = venv.pip.display(),
                    frozen = frozen.display(),
                )
            }
        }
    }

    /// Scripting injected after the user's post-install script.
    #[must_use]
    pub const fn tear_down_script(self) -> &'static str {
        match self {
            Self::VirtualEnv => "deactivate",
            Self::Dir | Self::Python => "",
        }
    }

    /// Positional arguments for fpm: what to package.
    ///
    /// # Errors
    ///
    /// Returns an error if the package directory cannot be listed.
    pub fn fpm_args(self, workspace: &Workspace) -> Result<Vec<String>> {
        match self {
            Self::Python => Ok(vec![
                workspace.repo_path("setup.py").display().to_string(),
            ]),
            Self::Dir | Self::VirtualEnv => list_dir_names(workspace.package_dir()),
        }
    }
}

impl fmt::Display for DeployType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dir => write!(f, "dir"),
            Self::Python => write!(f, "python"),
            Self::VirtualEnv => write!(f, "virtualenv"),
        }
    }
}

impl FromStr for DeployType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dir" => Ok(Self::Dir),
            "python" => Ok(Self::Python),
            "virtualenv" => Ok(Self::VirtualEnv),
            _ => Err(Error::UnknownValue {
                kind: "deploy type",
                value: s.to_string(),
                valid: "dir, python, virtualenv",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::GitRepo;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_round_trips_display() {
        for dtype in DeployType::ALL {
            assert_eq!(dtype.to_string().parse::<DeployType>().unwrap(), dtype);
        }
        assert!("docker".parse::<DeployType>().is_err());
    }

    #[test]
    fn test_attributes() {
        assert_eq!(DeployType::Dir.fpm_source(), "dir");
        assert_eq!(DeployType::Python.fpm_source(), "python");
        assert_eq!(DeployType::VirtualEnv.fpm_source(), "dir");

        assert!(DeployType::Python.provides_version());
        assert!(!DeployType::Dir.provides_version());

        assert_eq!(DeployType::VirtualEnv.dependencies(), vec!["python-virtualenv"]);
        assert!(DeployType::Dir.dependencies().is_empty());
    }

    #[test]
    fn test_dir_scripts_are_empty() {
        let deploy = Deploy::default();
        assert_eq!(DeployType::Dir.set_up_script(Path::new("/opt"), &deploy), "");
        assert_eq!(DeployType::Dir.tear_down_script(), "");
    }

    #[test]
    fn test_virtualenv_set_up_script() {
        let deploy = Deploy {
            name: Some("myapp".to_string()),
            ..Default::default()
        };
        let script = DeployType::VirtualEnv.set_up_script(Path::new("/var/praekelt"), &deploy);

        assert_eq!(
            script,
            "# Create and activate the virtualenv\n\
             if [ ! -f /var/praekelt/python/bin/python ]; then\n    \
             /usr/bin/virtualenv /var/praekelt/python\n\
             fi\n\
             VENV=/var/praekelt/python\n\
             source /var/praekelt/python/bin/activate\n\
             \n\
             # Upgrade pip and re-install pip requirements\n\
             /var/praekelt/python/bin/pip install --upgrade pip\n\
             /var/praekelt/python/bin/pip install --upgrade -r /var/praekelt/myapp-requirements.pip"
        );
        assert_eq!(DeployType::VirtualEnv.tear_down_script(), "deactivate");
    }

    #[test]
    fn test_virtualenv_prefix() {
        let deploy = Deploy {
            name: Some("myapp".to_string()),
            virtualenv_prefix: Some("web".to_string()),
            ..Default::default()
        };
        let script = DeployType::VirtualEnv.set_up_script(Path::new("/opt"), &deploy);
        assert!(script.contains("VENV=/opt/web-python\n"));
    }

    #[test]
    fn test_fpm_args() {
        let temp = TempDir::new().unwrap();
        let repo = GitRepo::new("https://github.com/org/app.git", "main", "app");
        let workspace = Workspace::new("ws", temp.path(), "/opt", repo).unwrap();
        workspace.create_clean_workspace().unwrap();
        workspace.make_package_dir().unwrap();
        std::fs::write(workspace.package_path("b.txt"), "").unwrap();
        std::fs::write(workspace.package_path("a.txt"), "").unwrap();

        assert_eq!(
            DeployType::Dir.fpm_args(&workspace).unwrap(),
            vec!["a.txt", "b.txt"]
        );
        assert_eq!(
            DeployType::Python.fpm_args(&workspace).unwrap(),
            vec![workspace.repo_path("setup.py").display().to_string()]
        );
    }
}
