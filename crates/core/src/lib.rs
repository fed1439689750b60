//! Core pipeline for sideloader.
//!
//! sideloader turns a git repository into an installable OS package. A run
//! clones the repository into a [`Workspace`], loads the project's
//! [`Deploy`] description, executes the project's build inside a build
//! virtualenv ([`Build`]) and finally hands the resulting tree to `fpm`
//! ([`Package`]).
//!
//! Every external program is invoked through a [`CommandRunner`], so the
//! whole pipeline can be exercised with a [`RecordingRunner`] instead of the
//! real tools.
//!
//! ```rust,ignore
//! use sideloader_core::{Config, GitRepo, RunOptions, Sideloader, SystemRunner};
//!
//! let config = Config::from_file("config.yaml")?;
//! let repo = GitRepo::from_url("https://github.com/praekelt/sideloader2.git", "develop")?;
//! let sideloader = Sideloader::new(config, repo, None);
//! sideloader.run(&RunOptions::default(), &SystemRunner::new(false))?;
//! ```

pub mod build;
pub mod config;
pub mod config_files;
pub mod deploy;
pub mod deploy_type;
pub mod error;
pub mod fs;
pub mod package;
pub mod pipeline;
pub mod process;
pub mod repo;
pub mod venv;
pub mod workspace;

pub use build::Build;
pub use config::Config;
pub use config_files::ConfigFiles;
pub use deploy::{Deploy, DeployOverrides};
pub use deploy_type::DeployType;
pub use error::{Error, Result};
pub use package::{Package, PackageTarget};
pub use pipeline::{RunOptions, Sideloader};
pub use process::{CommandRunner, CommandSpec, RecordingRunner, SystemRunner};
pub use repo::GitRepo;
pub use venv::VenvPaths;
pub use workspace::Workspace;
