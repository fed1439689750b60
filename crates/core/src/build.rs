//! Building a project inside its workspace.

use crate::deploy::Deploy;
use crate::deploy_type::DeployType;
use crate::error::{Error, Result};
use crate::fs::{copy_tree, list_dir_abs};
use crate::process::{CommandRunner, CommandSpec};
use crate::venv::{BUILD_VENV_NAME, VenvPaths};
use crate::workspace::Workspace;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the generated post-install script inside the workspace.
pub const POSTINSTALL_SCRIPT: &str = "postinstall.sh";

/// Gets a fetched workspace into a state that is ready for packaging.
pub struct Build<'a> {
    workspace: &'a Workspace,
    deploy: Deploy,
    deploy_type: DeployType,
    runner: &'a dyn CommandRunner,
    venv: VenvPaths,
    debug: bool,
}

impl<'a> Build<'a> {
    /// Create a build for `workspace` using the build virtualenv at `<workspace>/ve`.
    #[must_use]
    pub fn new(
        workspace: &'a Workspace,
        deploy: Deploy,
        deploy_type: DeployType,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            venv: VenvPaths::new(workspace.dir(), BUILD_VENV_NAME),
            workspace,
            deploy,
            deploy_type,
            runner,
            debug: false,
        }
    }

    /// Log the generated post-install script.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The deploy description being built.
    #[must_use]
    pub const fn deploy(&self) -> &Deploy {
        &self.deploy
    }

    /// Run every build step in order.
    ///
    /// # Errors
    ///
    /// Returns the first error from any step.
    pub fn build(&self) -> Result<()> {
        let env = self.prepare_environment()?;
        self.run_buildscript(&env)?;
        self.copy_files()?;
        self.freeze_virtualenv()?;
        self.create_postinstall_script()
    }

    /// Create the build virtualenv and build directory, and compute the
    /// environment the build script runs with.
    ///
    /// # Errors
    ///
    /// Returns an error if the virtualenv or build directory cannot be set up.
    pub fn prepare_environment(&self) -> Result<BTreeMap<String, String>> {
        self.create_build_virtualenv()?;
        self.workspace.make_build_dir()?;
        Ok(self.build_env())
    }

    /// Create the build virtualenv if needed, upgrade pip and install the
    /// deploy's pip requirements.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the commands fail.
    pub fn create_build_virtualenv(&self) -> Result<()> {
        tracing::info!(venv = %self.venv.venv.display(), "Creating virtualenv");
        if !self.venv.python.exists() {
            self.runner
                .run(&CommandSpec::new("virtualenv").arg(&self.venv.venv))?;
        }

        tracing::info!("Upgrading pip");
        self.pip_install("pip")?;

        tracing::info!("Installing pip dependencies");
        for dep in &self.deploy.pip {
            tracing::info!(dependency = %dep, "Installing");
            self.pip_install(dep)?;
        }
        Ok(())
    }

    fn pip_install(&self, requirement: &str) -> Result<()> {
        self.runner.run(
            &CommandSpec::new(&self.venv.pip)
                .args(["install", "--upgrade"])
                .arg(requirement),
        )?;
        Ok(())
    }

    /// The environment handed to the build script.
    #[must_use]
    pub fn build_env(&self) -> BTreeMap<String, String> {
        let display = |p: &Path| p.display().to_string();
        let path = std::env::var_os("PATH").map_or_else(
            || display(&self.venv.bin),
            |inherited| format!("{}:{}", self.venv.bin.display(), inherited.to_string_lossy()),
        );

        let repo = self.workspace.repo();
        BTreeMap::from([
            ("VENV".to_string(), display(&self.venv.venv)),
            ("PIP".to_string(), display(&self.venv.pip)),
            ("REPO".to_string(), repo.name.clone()),
            ("BRANCH".to_string(), repo.branch.clone()),
            ("WORKSPACE".to_string(), display(self.workspace.dir())),
            ("BUILDDIR".to_string(), display(self.workspace.build_dir())),
            ("INSTALLDIR".to_string(), display(self.workspace.install_dir())),
            ("NAME".to_string(), self.deploy.name_or_empty().to_string()),
            ("PATH".to_string(), path),
        ])
    }

    /// Make the build script executable and run it from the workspace root.
    /// Does nothing when the deploy has no build script.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be made executable, or if it
    /// fails and the deploy does not allow broken builds.
    pub fn run_buildscript(&self, env: &BTreeMap<String, String>) -> Result<()> {
        let Some(buildscript) = self.deploy.buildscript() else {
            return Ok(());
        };

        let path = self.workspace.repo_path(buildscript);
        make_executable(&path)?;

        tracing::info!(script = %path.display(), "Running build script");
        let result = self.runner.run(
            &CommandSpec::new(&path)
                .current_dir(self.workspace.dir())
                .envs(env),
        );

        match result {
            Err(err @ Error::CommandFailed { .. }) if self.deploy.allow_broken_build => {
                tracing::warn!(
                    error = %err,
                    "Build script failed, continuing because allow_broken_build is set"
                );
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }

    /// Create the package tree: the build output at the install location plus
    /// any config files.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory or file cannot be created or copied.
    pub fn copy_files(&self) -> Result<()> {
        tracing::info!("Preparing package");
        self.workspace.make_package_dir()?;
        self.copy_build()?;
        self.copy_config_files()
    }

    /// Copy everything in the build directory into the install directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be created or copied.
    pub fn copy_build(&self) -> Result<()> {
        self.workspace.make_install_dir()?;

        for entry in list_dir_abs(self.workspace.build_dir())? {
            if let Some(name) = entry.file_name() {
                copy_tree(&entry, &self.workspace.install_path(name))?;
            }
        }
        Ok(())
    }

    /// Copy each config file from the build directory into its config
    /// directory inside the package.
    ///
    /// # Errors
    ///
    /// Returns an error if a config directory cannot be created or a file
    /// cannot be copied.
    pub fn copy_config_files(&self) -> Result<()> {
        for config_files in &self.deploy.config_files {
            let config_dir = self.workspace.package_path(&config_files.config_dir);
            std::fs::create_dir_all(&config_dir)
                .map_err(|e| Error::io("create directory", &config_dir, e))?;

            for file in &config_files.files {
                let source = self.workspace.build_path(file);
                let Some(file_name) = source.file_name() else {
                    return Err(Error::deploy(
                        format!("Config file path '{file}' has no file name"),
                        None,
                    ));
                };
                let target = config_dir.join(file_name);
                std::fs::copy(&source, &target)
                    .map_err(|e| Error::io("copy config file", &source, e))?;
            }
        }
        Ok(())
    }

    /// Write the build virtualenv's frozen requirements into the install
    /// directory, where the install-time virtualenv picks them up.
    ///
    /// # Errors
    ///
    /// Returns an error if `pip freeze` fails or the file cannot be written.
    pub fn freeze_virtualenv(&self) -> Result<()> {
        let frozen = self
            .runner
            .run(&CommandSpec::new(&self.venv.pip).arg("freeze"))?;

        let path = self.requirements_path();
        std::fs::write(&path, frozen).map_err(|e| Error::io("write requirements", &path, e))
    }

    /// Where the frozen requirements are written.
    #[must_use]
    pub fn requirements_path(&self) -> PathBuf {
        self.workspace
            .install_path(format!("{}-requirements.pip", self.deploy.name_or_empty()))
    }

    /// Generate the post-install script and write it to the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the user's script cannot be read or the result
    /// cannot be written.
    pub fn create_postinstall_script(&self) -> Result<()> {
        let content = self.generate_postinstall_script()?;
        if self.debug {
            tracing::debug!(script = %content, "Generated postinstall script");
        }
        self.write_postinstall_script(&content)
    }

    /// Compose the post-install script: deploy-type set-up, the standard
    /// variables, the user's script and the deploy-type tear-down.
    ///
    /// # Errors
    ///
    /// Returns an error if the user's post-install script cannot be read.
    pub fn generate_postinstall_script(&self) -> Result<String> {
        tracing::info!("Constructing postinstall script");

        let set_up = self
            .deploy_type
            .set_up_script(self.workspace.install_location(), &self.deploy);
        let tear_down = self.deploy_type.tear_down_script();

        let user_postinstall = match self.deploy.postinstall() {
            Some(postinstall) => {
                let path = self.workspace.repo_path(postinstall);
                std::fs::read_to_string(&path)
                    .map_err(|e| Error::io("read postinstall script", &path, e))?
            }
            None => String::new(),
        };

        let repo = self.workspace.repo();
        Ok(format!(
            "#!/bin/bash\n\
             \n\
             {set_up}\n\
             \n\
             INSTALLDIR={installdir}\n\
             REPO={repo}\n\
             BRANCH={branch}\n\
             NAME={name}\n\
             \n\
             {user_postinstall}\n\
             \n\
             {tear_down}\n",
            installdir = self.workspace.install_dir().display(),
            repo = repo.name,
            branch = repo.branch,
            name = self.deploy.name_or_empty(),
        ))
    }

    /// Write the post-install script to `<workspace>/postinstall.sh` with mode 0755.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or made executable.
    pub fn write_postinstall_script(&self, content: &str) -> Result<()> {
        let path = self.workspace.path(POSTINSTALL_SCRIPT);
        std::fs::write(&path, content)
            .map_err(|e| Error::io("write postinstall script", &path, e))?;
        set_mode(&path, 0o755)
    }
}

/// Add execute permission for everyone (`chmod a+x`).
fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata =
            std::fs::metadata(path).map_err(|e| Error::io("read build script", path, e))?;
        let mode = metadata.permissions().mode() | 0o111;
        set_mode(path, mode)
    }
    #[cfg(not(unix))]
    {
        std::fs::metadata(path)
            .map(|_| ())
            .map_err(|e| Error::io("read build script", path, e))
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| Error::io("set permissions", path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
