use crate::tracing::LogLevel;
use clap::{Parser, ValueEnum};
use miette::{Diagnostic, Report};
use serde::Serialize;
use sideloader_core::{DeployOverrides, DeployType, PackageTarget, RunOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Build or packaging failure exit code
pub const EXIT_BUILD: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(sideloader::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// An external tool, the build script or the filesystem failed (exit code 3)
    #[error("Build error: {message}")]
    #[diagnostic(code(sideloader::cli::build))]
    Build {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new build error with help text
    #[must_use]
    pub fn build_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Convert `sideloader_core::Error` to the matching `CliError` variant.
///
/// Anything the user can fix by editing `config.yaml`, `.deploy.yaml` or the
/// command line is a `Config` error; everything that happens while running
/// external tools is a `Build` error.
impl From<sideloader_core::Error> for CliError {
    fn from(err: sideloader_core::Error) -> Self {
        use sideloader_core::Error;

        match err {
            Error::Config { message, help } => Self::config_with_help(message, help),
            Error::Deploy { message, path } => match path {
                Some(path) => Self::config_with_help(
                    format!("{message} ({})", path.display()),
                    "Check the project's deploy file",
                ),
                None => Self::config(message),
            },
            Error::RepoUrl { .. } | Error::UnknownValue { .. } => Self::config(err.to_string()),
            Error::Spawn { .. } => Self::build_with_help(
                err.to_string(),
                "Ensure the program is installed and on PATH",
            ),
            Error::CommandFailed {
                command,
                status,
                stderr,
            } => {
                let help = if stderr.is_empty() {
                    "Re-run with --debug to see the command output".to_string()
                } else {
                    stderr
                };
                Self::build_with_help(format!("'{command}' failed with {status}"), help)
            }
            Error::Io { .. } => Self::build_with_help(
                err.to_string(),
                "Check file permissions and the workspace_base setting",
            ),
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Build { .. } => EXIT_BUILD,
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Build { .. } => "build",
            },
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Deploy type as accepted on the command line
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum DeployTypeArg {
    /// Package the install tree as-is
    Dir,
    /// Package the repository's setup.py
    Python,
    /// Package the install tree and recreate a virtualenv on install
    #[default]
    Virtualenv,
}

impl From<DeployTypeArg> for DeployType {
    fn from(arg: DeployTypeArg) -> Self {
        match arg {
            DeployTypeArg::Dir => Self::Dir,
            DeployTypeArg::Python => Self::Python,
            DeployTypeArg::Virtualenv => Self::VirtualEnv,
        }
    }
}

/// Package format as accepted on the command line
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum PackmanArg {
    /// Debian package
    #[default]
    Deb,
    /// RPM package
    Rpm,
}

impl From<PackmanArg> for PackageTarget {
    fn from(arg: PackmanArg) -> Self {
        match arg {
            PackmanArg::Deb => Self::Deb,
            PackmanArg::Rpm => Self::Rpm,
        }
    }
}

/// Build a deb or rpm package from a git repository.
#[derive(Parser, Debug)]
#[command(name = "sideloader")]
#[command(about = "Build deb and rpm packages from git repositories with fpm")]
#[command(long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Git repository URL, e.g. https://github.com/org/project.git
    #[arg(value_name = "GIT_URL")]
    pub git_url: String,

    /// Branch to build (defaults to `default_branch` from the config file)
    #[arg(long)]
    pub branch: Option<String>,

    /// Build number, used for the `0.<build>` version fallback
    #[arg(long, default_value_t = 0)]
    pub build: u32,

    /// Workspace id (defaults to the repository name)
    #[arg(long)]
    pub id: Option<String>,

    /// Deploy file name, relative to the repository root
    #[arg(long, default_value = sideloader_core::workspace::DEFAULT_DEPLOY_FILE)]
    pub deploy_file: String,

    /// Package name override
    #[arg(long)]
    pub name: Option<String>,

    /// Build script override, relative to the repository root
    #[arg(long)]
    pub build_script: Option<String>,

    /// Post-install script override, relative to the repository root
    #[arg(long)]
    pub postinst_script: Option<String>,

    /// Package version override
    #[arg(long)]
    pub version: Option<String>,

    /// Deploy type
    #[arg(long, value_enum, default_value_t = DeployTypeArg::default())]
    pub dtype: DeployTypeArg,

    /// Package format
    #[arg(long, value_enum, default_value_t = PackmanArg::default())]
    pub packman: PackmanArg,

    /// Path to the sideloader config file
    #[arg(long, env = "SIDELOADER_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Override any deploy file attribute (repeatable), e.g. --set pip=a,b
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Verbose logging and `fpm --debug`
    #[arg(long, overrides_with = "no_debug")]
    pub debug: bool,

    /// Disable debug output
    #[arg(long, overrides_with = "debug")]
    pub no_debug: bool,

    /// Sign .deb packages when a GPG key is configured (default)
    #[arg(long, overrides_with = "no_sign")]
    pub sign: bool,

    /// Do not sign packages
    #[arg(long, overrides_with = "sign")]
    pub no_sign: bool,

    /// Emit JSON envelopes on stdout and JSON logs on stderr
    #[arg(long)]
    pub json: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, short = 'L', value_enum, default_value_t = LogLevel::Info)]
    pub level: LogLevel,
}

impl Cli {
    /// Whether debug mode is on.
    #[must_use]
    pub const fn debug_enabled(&self) -> bool {
        self.debug && !self.no_debug
    }

    /// Whether packages should be signed.
    #[must_use]
    pub const fn sign_enabled(&self) -> bool {
        !self.no_sign
    }

    /// Collect the deploy overrides from the dedicated flags and `--set`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed `--set` values or
    /// unknown deploy attributes.
    pub fn overrides(&self) -> Result<DeployOverrides, CliError> {
        let mut overrides = DeployOverrides::default();
        for pair in &self.set {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                CliError::config_with_help(
                    format!("Invalid override '{pair}'"),
                    "Use --set KEY=VALUE",
                )
            })?;
            overrides.set(key.trim(), value)?;
        }

        if let Some(name) = &self.name {
            overrides.name = Some(name.clone());
        }
        if let Some(script) = &self.build_script {
            overrides.buildscript = Some(script.clone());
        }
        if let Some(script) = &self.postinst_script {
            overrides.postinstall = Some(script.clone());
        }
        if let Some(version) = &self.version {
            overrides.version = Some(version.clone());
        }
        Ok(overrides)
    }

    /// Per-run options for the pipeline.
    ///
    /// # Errors
    ///
    /// See [`Cli::overrides`].
    pub fn run_options(&self) -> Result<RunOptions, CliError> {
        Ok(RunOptions {
            deploy_file: self.deploy_file.clone(),
            deploy_type: self.dtype.into(),
            target: self.packman.into(),
            build_number: Some(self.build),
            sign: self.sign_enabled(),
            debug: self.debug_enabled(),
            overrides: self.overrides()?,
        })
    }
}

/// Parse the process arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
