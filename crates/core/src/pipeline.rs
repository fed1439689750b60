//! End-to-end sideloader runs: fetch, build, package.

use crate::build::Build;
use crate::config::Config;
use crate::deploy::{Deploy, DeployOverrides};
use crate::deploy_type::DeployType;
use crate::error::Result;
use crate::package::{Package, PackageTarget};
use crate::process::CommandRunner;
use crate::repo::GitRepo;
use crate::workspace::{DEFAULT_DEPLOY_FILE, Workspace};

/// Build number used for the version when none is given.
pub const DEFAULT_BUILD_NUMBER: u32 = 1;

/// Per-run choices.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Deploy file name, relative to the repository root.
    pub deploy_file: String,
    /// Deploy type.
    pub deploy_type: DeployType,
    /// Package format.
    pub target: PackageTarget,
    /// Build number, used for the `0.<n>` fallback version.
    pub build_number: Option<u32>,
    /// Sign `.deb` packages when a key is configured.
    pub sign: bool,
    /// Extra logging and `fpm --debug`.
    pub debug: bool,
    /// Deploy fields forced from the command line.
    pub overrides: DeployOverrides,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            deploy_file: DEFAULT_DEPLOY_FILE.to_string(),
            deploy_type: DeployType::default(),
            target: PackageTarget::default(),
            build_number: None,
            sign: true,
            debug: false,
            overrides: DeployOverrides::default(),
        }
    }
}

/// A configured sideloader for one repository.
#[derive(Debug, Clone)]
pub struct Sideloader {
    config: Config,
    repo: GitRepo,
    workspace_id: String,
}

impl Sideloader {
    /// Create a sideloader. The workspace id defaults to the repository name.
    #[must_use]
    pub fn new(config: Config, repo: GitRepo, workspace_id: Option<String>) -> Self {
        let workspace_id = workspace_id.unwrap_or_else(|| repo.name.clone());
        Self {
            config,
            repo,
            workspace_id,
        }
    }

    /// Build `url`, using the configured default branch unless `branch` is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not name a repository.
    pub fn for_url(
        config: Config,
        url: &str,
        branch: Option<String>,
        workspace_id: Option<String>,
    ) -> Result<Self> {
        let branch = branch.unwrap_or_else(|| config.default_branch.clone());
        let repo = GitRepo::from_url(url, branch)?;
        Ok(Self::new(config, repo, workspace_id))
    }

    /// The repository being built.
    #[must_use]
    pub const fn repo(&self) -> &GitRepo {
        &self.repo
    }

    /// The workspace id.
    #[must_use]
    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// The workspace this sideloader builds in.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace path cannot be resolved.
    pub fn workspace(&self) -> Result<Workspace> {
        Workspace::new(
            &self.workspace_id,
            &self.config.workspace_base,
            self.config.install_location.clone(),
            self.repo.clone(),
        )
    }

    /// Fetch, build and package the repository.
    ///
    /// # Errors
    ///
    /// Returns the first error from any stage.
    #[tracing::instrument(
        name = "sideloader_run",
        skip_all,
        fields(repo = %self.repo.name, branch = %self.repo.branch, workspace = %self.workspace_id)
    )]
    pub fn run(&self, options: &RunOptions, runner: &dyn CommandRunner) -> Result<Deploy> {
        let workspace = self.workspace()?;
        workspace.set_up(runner)?;

        let deploy = self.load_deploy(&workspace, options)?;
        tracing::info!(
            name = deploy.name_or_empty(),
            version = deploy.version.as_deref().unwrap_or_default(),
            deploy_type = %options.deploy_type,
            "Loaded deploy"
        );

        Build::new(&workspace, deploy.clone(), options.deploy_type, runner)
            .with_debug(options.debug)
            .build()?;

        Package::new(
            &workspace,
            &deploy,
            options.deploy_type,
            options.target,
            self.config.gpg_key.clone(),
            runner,
        )
        .with_sign(options.sign)
        .with_debug(options.debug)
        .package()?;

        Ok(deploy)
    }

    /// Load the deploy file and resolve name and version.
    ///
    /// The version is the explicit override, else `0.<build number>`; a
    /// `version` in the deploy file is always replaced so every build number
    /// yields a new package version. The name is the override, else the
    /// deploy file's name, else the repository name.
    ///
    /// # Errors
    ///
    /// Returns an error if the deploy file is invalid.
    pub fn load_deploy(&self, workspace: &Workspace, options: &RunOptions) -> Result<Deploy> {
        let mut deploy = workspace
            .load_deploy(&options.deploy_file)?
            .with_overrides(&options.overrides);

        if options.overrides.version.is_none() {
            let build_number = options.build_number.unwrap_or(DEFAULT_BUILD_NUMBER);
            deploy.version = Some(format!("0.{build_number}"));
        }
        if deploy.name.is_none() {
            deploy.name = Some(self.repo.name.clone());
        }
        Ok(deploy)
    }
}
