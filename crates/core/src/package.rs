//! Packaging a built workspace with fpm.

use crate::build::POSTINSTALL_SCRIPT;
use crate::deploy::Deploy;
use crate::deploy_type::DeployType;
use crate::error::{Error, Result};
use crate::fs::list_dir_abs;
use crate::process::{CommandRunner, CommandSpec};
use crate::workspace::Workspace;
use std::fmt;
use std::str::FromStr;

/// Architecture every package is built for.
pub const PACKAGE_ARCH: &str = "amd64";

/// Package format produced by fpm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PackageTarget {
    /// Debian package.
    #[default]
    Deb,
    /// RPM package.
    Rpm,
}

impl PackageTarget {
    /// The fpm `-t` value, also used as the file extension.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deb => "deb",
            Self::Rpm => "rpm",
        }
    }
}

impl fmt::Display for PackageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deb" => Ok(Self::Deb),
            "rpm" => Ok(Self::Rpm),
            _ => Err(Error::UnknownValue {
                kind: "package manager",
                value: s.to_string(),
                valid: "deb, rpm",
            }),
        }
    }
}

/// Turns a built workspace into a package and optionally signs it.
pub struct Package<'a> {
    workspace: &'a Workspace,
    deploy: &'a Deploy,
    deploy_type: DeployType,
    target: PackageTarget,
    gpg_key: Option<String>,
    sign: bool,
    debug: bool,
    runner: &'a dyn CommandRunner,
}

impl<'a> Package<'a> {
    /// Create a packager. Signing is enabled by default but only happens
    /// when a GPG key is given.
    #[must_use]
    pub fn new(
        workspace: &'a Workspace,
        deploy: &'a Deploy,
        deploy_type: DeployType,
        target: PackageTarget,
        gpg_key: Option<String>,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            workspace,
            deploy,
            deploy_type,
            target,
            gpg_key,
            sign: true,
            debug: false,
            runner,
        }
    }

    /// Enable or disable signing.
    #[must_use]
    pub const fn with_sign(mut self, sign: bool) -> Self {
        self.sign = sign;
        self
    }

    /// Pass `--debug` to fpm.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Build the package, then sign it.
    ///
    /// # Errors
    ///
    /// Returns an error if fpm or the signing tool fails.
    pub fn package(&self) -> Result<()> {
        self.run_fpm()?;
        self.sign_debs()
    }

    /// The complete fpm invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the deploy has no version but needs one, or the
    /// package directory cannot be listed.
    pub fn fpm_command(&self) -> Result<CommandSpec> {
        let package_dir = self.workspace.package_dir();
        let mut fpm = CommandSpec::new("fpm")
            .arg("-C")
            .arg(package_dir)
            .arg("-p")
            .arg(package_dir)
            .args(["-s", self.deploy_type.fpm_source()])
            .args(["-t", self.target.as_str()])
            .args(["-a", PACKAGE_ARCH])
            .arg("-n")
            .arg(self.deploy.name_or_empty())
            .arg("--after-install")
            .arg(self.workspace.path(POSTINSTALL_SCRIPT));

        if !self.deploy_type.provides_version() {
            let version = self.deploy.version.as_deref().ok_or_else(|| {
                Error::deploy(
                    format!("A version is required for {} packages", self.deploy_type),
                    None,
                )
            })?;
            fpm = fpm.args(["-v", version]);
        }

        for dep in self.list_all_dependencies() {
            fpm = fpm.arg("-d").arg(dep);
        }

        if let Some(user) = &self.deploy.user {
            fpm = fpm.arg(format!("--{}-user", self.target)).arg(user);
        }

        if self.debug {
            fpm = fpm.arg("--debug");
        }

        Ok(fpm.args(self.deploy_type.fpm_args(self.workspace)?))
    }

    /// Run fpm to build the package into the package directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be built or fpm fails.
    pub fn run_fpm(&self) -> Result<()> {
        tracing::info!(format = %self.target, "Building package");
        self.runner.run(&self.fpm_command()?)?;
        tracing::info!("Build completed successfully");
        Ok(())
    }

    /// Every package dependency: the deploy's own, then the deploy type's,
    /// then those of its config files.
    #[must_use]
    pub fn list_all_dependencies(&self) -> Vec<String> {
        let mut deps = self.deploy.dependencies.clone();
        deps.extend(self.deploy_type.dependencies());
        for config_files in &self.deploy.config_files {
            deps.extend(config_files.dependencies.iter().cloned());
        }
        deps
    }

    /// Sign every `.deb` in the package directory with the configured key.
    ///
    /// # Errors
    ///
    /// Returns an error if the package directory cannot be listed or
    /// `dpkg-sig` fails.
    pub fn sign_debs(&self) -> Result<()> {
        if !self.sign {
            tracing::info!("Signing disabled, skipping signing");
            return Ok(());
        }
        let Some(gpg_key) = &self.gpg_key else {
            tracing::info!("No GPG key configured, skipping signing");
            return Ok(());
        };
        if self.target != PackageTarget::Deb {
            tracing::info!(
                format = %self.target,
                "Only .deb packages are signed, skipping signing"
            );
            return Ok(());
        }

        tracing::info!("Signing package");
        let debs = list_dir_abs(self.workspace.package_dir())?
            .into_iter()
            .filter(|path| path.extension().is_some_and(|ext| ext == "deb"));
        for deb in debs {
            self.runner.run(
                &CommandSpec::new("dpkg-sig")
                    .args(["-k", gpg_key.as_str(), "--sign", "builder"])
                    .arg(&deb),
            )?;
        }
        Ok(())
    }
}
