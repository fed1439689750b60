//! Build workspaces.
//!
//! A workspace is a directory under the configured workspace base that holds
//! the repository checkout, the build output, the package tree and the build
//! virtualenv:
//!
//! ```text
//! <base>/<id>/
//! ├── <repo name>/          git checkout
//! ├── build/                build script output ($BUILDDIR)
//! ├── package/              fpm input (-C)
//! │   └── <install location>/   $INSTALLDIR
//! ├── ve/                   build virtualenv (kept between runs)
//! └── postinstall.sh
//! ```

use crate::deploy::Deploy;
use crate::error::{Error, Result};
use crate::fs::remove_dir_if_exists;
use crate::process::{CommandRunner, CommandSpec};
use crate::repo::GitRepo;
use std::path::{Component, Path, PathBuf};

/// Default name of the project's deploy file.
pub const DEFAULT_DEPLOY_FILE: &str = ".deploy.yaml";

/// Paths of a single workspace and the operations that prepare it.
#[derive(Debug, Clone)]
pub struct Workspace {
    install_location: String,
    repo: GitRepo,
    dir: PathBuf,
    repo_dir: PathBuf,
    build_dir: PathBuf,
    package_dir: PathBuf,
    install_dir: PathBuf,
}

impl Workspace {
    /// Describe the workspace `<workspace_base>/<workspace_id>`. Nothing is
    /// created on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace path cannot be made absolute.
    pub fn new(
        workspace_id: &str,
        workspace_base: impl AsRef<Path>,
        install_location: impl Into<String>,
        repo: GitRepo,
    ) -> Result<Self> {
        let joined = workspace_base.as_ref().join(workspace_id);
        let dir = std::path::absolute(&joined).map_err(|e| Error::io("resolve path", &joined, e))?;
        let install_location = install_location.into();

        let package_dir = dir.join("package");
        let install_dir = package_dir.join(install_location.trim_start_matches('/'));

        Ok(Self {
            repo_dir: dir.join(&repo.name),
            build_dir: dir.join("build"),
            install_dir,
            package_dir,
            dir,
            install_location,
            repo,
        })
    }

    /// The repository being built.
    #[must_use]
    pub const fn repo(&self) -> &GitRepo {
        &self.repo
    }

    /// Install location on the target machine.
    #[must_use]
    pub fn install_location(&self) -> &Path {
        Path::new(&self.install_location)
    }

    /// The workspace root.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The git checkout.
    #[must_use]
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Where the build script puts its output.
    #[must_use]
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Root of the tree handed to fpm.
    #[must_use]
    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    /// The install location mirrored inside the package tree.
    #[must_use]
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// A path within the workspace directory.
    #[must_use]
    pub fn path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.dir.join(path)
    }

    /// A path within the package directory.
    #[must_use]
    pub fn package_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.package_dir.join(path)
    }

    /// A path within the build directory.
    #[must_use]
    pub fn build_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.build_dir.join(path)
    }

    /// A path within the repository checkout.
    #[must_use]
    pub fn repo_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.repo_dir.join(path)
    }

    /// A path within the install directory.
    #[must_use]
    pub fn install_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.install_dir.join(path)
    }

    /// Create a clean workspace and fetch the repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be prepared or git fails.
    pub fn set_up(&self, runner: &dyn CommandRunner) -> Result<()> {
        self.create_clean_workspace()?;
        self.fetch_repo(runner)
    }

    /// Create the workspace directory, or clean it out if it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or cleaned.
    pub fn create_clean_workspace(&self) -> Result<()> {
        if self.dir.exists() {
            self.clean_workspace()
        } else {
            std::fs::create_dir_all(&self.dir)
                .map_err(|e| Error::io("create workspace", &self.dir, e))
        }
    }

    /// Remove the checkout, build and package directories. The build
    /// virtualenv and any other files are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be removed.
    pub fn clean_workspace(&self) -> Result<()> {
        for dir in [
            &self.repo_dir,
            &self.build_dir,
            &self.package_dir,
            &self.install_dir,
        ] {
            if remove_dir_if_exists(dir)? {
                tracing::debug!(path = %dir.display(), "Removed stale directory");
            }
        }
        Ok(())
    }

    /// Clone the repository and check out the requested branch.
    ///
    /// # Errors
    ///
    /// Returns an error if either git command fails.
    pub fn fetch_repo(&self, runner: &dyn CommandRunner) -> Result<()> {
        tracing::info!(url = %self.repo.url, branch = %self.repo.branch, "Fetching git repo");
        runner.run(
            &CommandSpec::new("git")
                .arg("clone")
                .arg(&self.repo.url)
                .arg(&self.repo_dir),
        )?;
        runner.run(
            &CommandSpec::new("git")
                .arg("-C")
                .arg(&self.repo_dir)
                .arg("checkout")
                .arg(&self.repo.branch),
        )?;
        Ok(())
    }

    /// Load the project's deploy file from the checkout, falling back to the
    /// defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the deploy file exists but is invalid.
    pub fn load_deploy(&self, deploy_file: &str) -> Result<Deploy> {
        if !self.repo_dir.exists() {
            tracing::warn!(
                path = %self.repo_dir.display(),
                "Repo directory not found. Has it been fetched yet?"
            );
        }

        let path = self.repo_path(deploy_file);
        if path.exists() {
            Deploy::from_file(&path)
        } else {
            tracing::info!(file = deploy_file, "No deploy file found, continuing with defaults");
            Ok(Deploy::default())
        }
    }

    /// Create the build directory. The workspace must already exist.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` I/O error if the workspace does not exist.
    pub fn make_build_dir(&self) -> Result<()> {
        create_dir(&self.build_dir)
    }

    /// Create the package directory. The workspace must already exist.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` I/O error if the workspace does not exist.
    pub fn make_package_dir(&self) -> Result<()> {
        create_dir(&self.package_dir)
    }

    /// Create the install directory one level at a time. The package
    /// directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` I/O error if the package directory does not exist.
    pub fn make_install_dir(&self) -> Result<()> {
        let relative = self
            .install_dir
            .strip_prefix(&self.package_dir)
            .unwrap_or(&self.install_dir);

        let mut current = self.package_dir.clone();
        if !current.is_dir() {
            return Err(Error::io(
                "create directory",
                &self.install_dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            ));
        }
        for component in relative.components() {
            if let Component::Normal(part) = component {
                current.push(part);
                if !current.is_dir() {
                    create_dir(&current)?;
                }
            }
        }
        Ok(())
    }
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir(path).map_err(|e| Error::io("create directory", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::RecordingRunner;
    use tempfile::TempDir;

    fn create_workspace(temp: &TempDir) -> Workspace {
        let repo = GitRepo::new(
            "https://github.com/praekelt/sideloader2.git",
            "develop",
            "sideloader2",
        );
        Workspace::new("test_id", temp.path(), "/var/praekelt", repo).unwrap()
    }

    #[test]
    fn test_paths() {
        let temp = TempDir::new().unwrap();
        let workspace = create_workspace(&temp);
        let root = temp.path().join("test_id");

        assert_eq!(workspace.path("test"), root.join("test"));
        assert_eq!(workspace.package_path("test"), root.join("package/test"));
        assert_eq!(workspace.build_path("test"), root.join("build/test"));
        assert_eq!(workspace.repo_path("test"), root.join("sideloader2/test"));
        assert_eq!(
            workspace.install_path("test"),
            root.join("package/var/praekelt/test")
        );
    }

    #[test]
    fn test_relative_base_is_made_absolute() {
        let repo = GitRepo::new("u", "b", "r");
        let workspace = Workspace::new("id", "relative/base", "/opt", repo).unwrap();
        assert!(workspace.dir().is_absolute());
        assert!(workspace.dir().ends_with("relative/base/id"));
    }

    #[test]
    fn test_create_clean_workspace_creates_dir() {
        let temp = TempDir::new().unwrap();
        let workspace = create_workspace(&temp);
        workspace.create_clean_workspace().unwrap();

        let ws_dir = temp.path().join("test_id");
        assert!(ws_dir.is_dir());
        assert_eq!(std::fs::read_dir(&ws_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_create_clean_workspace_cleans_dir() {
        let temp = TempDir::new().unwrap();
        let workspace = create_workspace(&temp);

        // Create some mess
        let ws_dir = temp.path().join("test_id");
        for dir in ["package", "build", "sideloader2", "ve"] {
            std::fs::create_dir_all(ws_dir.join(dir)).unwrap();
        }
        std::fs::write(ws_dir.join("test-file"), "").unwrap();

        workspace.create_clean_workspace().unwrap();

        assert!(ws_dir.is_dir());
        assert!(!ws_dir.join("package").exists());
        assert!(!ws_dir.join("build").exists());
        assert!(!ws_dir.join("sideloader2").exists());

        // The virtualenv and other files survive
        assert!(ws_dir.join("ve").is_dir());
        assert!(ws_dir.join("test-file").exists());
    }

    #[test]
    fn test_make_dirs() {
        let temp = TempDir::new().unwrap();
        let workspace = create_workspace(&temp);
        workspace.create_clean_workspace().unwrap();

        workspace.make_build_dir().unwrap();
        workspace.make_package_dir().unwrap();
        workspace.make_install_dir().unwrap();

        let root = temp.path().join("test_id");
        assert!(root.join("build").is_dir());
        assert!(root.join("package").is_dir());
        assert!(root.join("package/var/praekelt").is_dir());
    }

    #[test]
    fn test_make_dirs_without_workspace_fails() {
        let temp = TempDir::new().unwrap();
        let workspace = create_workspace(&temp);

        for result in [
            workspace.make_build_dir(),
            workspace.make_package_dir(),
            workspace.make_install_dir(),
        ] {
            let err = result.unwrap_err();
            assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
        }
    }

    #[test]
    fn test_fetch_repo() {
        let temp = TempDir::new().unwrap();
        let workspace = create_workspace(&temp);
        let runner = RecordingRunner::new();

        workspace.fetch_repo(&runner).unwrap();

        let repo_dir = temp.path().join("test_id/sideloader2").display().to_string();
        assert_eq!(
            runner.argvs(),
            vec![
                vec![
                    "git".to_string(),
                    "clone".to_string(),
                    "https://github.com/praekelt/sideloader2.git".to_string(),
                    repo_dir.clone(),
                ],
                vec![
                    "git".to_string(),
                    "-C".to_string(),
                    repo_dir,
                    "checkout".to_string(),
                    "develop".to_string(),
                ],
            ]
        );
    }

    #[test]
    fn test_fetch_repo_failure_propagates() {
        let temp = TempDir::new().unwrap();
        let workspace = create_workspace(&temp);
        let runner = RecordingRunner::new().with_failure("git");

        assert!(workspace.set_up(&runner).is_err());
        // Clone failed, so checkout never ran
        assert_eq!(runner.commands().len(), 1);
    }

    #[test]
    fn test_load_deploy_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let workspace = create_workspace(&temp);
        workspace.create_clean_workspace().unwrap();

        let deploy = workspace.load_deploy(DEFAULT_DEPLOY_FILE).unwrap();
        assert_eq!(deploy, Deploy::default());
    }

    #[test]
    fn test_load_deploy_from_repo() {
        let temp = TempDir::new().unwrap();
        let workspace = create_workspace(&temp);
        std::fs::create_dir_all(workspace.repo_dir()).unwrap();
        std::fs::write(
            workspace.repo_path(DEFAULT_DEPLOY_FILE),
            "name: my-app\npip:\n  - django\n",
        )
        .unwrap();

        let deploy = workspace.load_deploy(DEFAULT_DEPLOY_FILE).unwrap();
        assert_eq!(deploy.name.as_deref(), Some("my-app"));
        assert_eq!(deploy.pip, vec!["django"]);
    }
}
