//! The `sideloader` command line.
//!
//! Parses arguments, loads `config.yaml` and drives one
//! [`sideloader_core::Sideloader`] run with the system command runner.

pub mod cli;
pub mod tracing;

use cli::{Cli, CliError};
use serde::Serialize;
use sideloader_core::{CommandRunner, Config, Deploy, Sideloader, SystemRunner};

/// What a successful run produced, reported in `--json` mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Package name
    pub name: String,
    /// Package version
    pub version: Option<String>,
    /// Branch that was built
    pub branch: String,
    /// Directory holding the built package(s)
    pub package_dir: String,
}

/// Run the command described by `cli` with the real system tools.
///
/// # Errors
///
/// Returns a [`CliError`] describing the first failure.
pub fn run(cli: &Cli) -> Result<RunSummary, CliError> {
    run_with(cli, &SystemRunner::new(cli.debug_enabled()))
}

/// Run the command described by `cli` with the given command runner.
///
/// # Errors
///
/// Returns a [`CliError`] describing the first failure.
pub fn run_with(cli: &Cli, runner: &dyn CommandRunner) -> Result<RunSummary, CliError> {
    let config = Config::from_file(&cli.config)?;
    let options = cli.run_options()?;
    let sideloader = Sideloader::for_url(config, &cli.git_url, cli.branch.clone(), cli.id.clone())?;

    let deploy = sideloader.run(&options, runner)?;
    let workspace = sideloader.workspace()?;
    Ok(summarize(&sideloader, &deploy, &workspace))
}

fn summarize(
    sideloader: &Sideloader,
    deploy: &Deploy,
    workspace: &sideloader_core::Workspace,
) -> RunSummary {
    RunSummary {
        name: deploy.name_or_empty().to_string(),
        version: deploy.version.clone(),
        branch: sideloader.repo().branch.clone(),
        package_dir: workspace.package_dir().display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use sideloader_core::RecordingRunner;
    use tempfile::TempDir;

    #[test]
    fn test_run_with_recording_runner() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yaml");
        std::fs::write(
            &config_path,
            format!(
                "install_location: /var/app\nworkspace_base: {}\n",
                temp.path().join("ws").display()
            ),
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "sideloader",
            "https://github.com/org/web.git",
            "--config",
            config_path.to_str().unwrap(),
            "--branch",
            "main",
            "--build",
            "12",
            "--dtype",
            "dir",
        ])
        .unwrap();

        let runner = RecordingRunner::new();
        let summary = run_with(&cli, &runner).unwrap();
        assert_eq!(summary.name, "web");
        assert_eq!(summary.version.as_deref(), Some("0.12"));
        assert_eq!(summary.branch, "main");
        assert!(summary.package_dir.ends_with("package"));

        let checkout = &runner.argvs()[1];
        assert_eq!(checkout.last().map(String::as_str), Some("main"));
    }

    #[test]
    fn test_missing_config_is_a_config_error() {
        let temp = TempDir::new().unwrap();
        let cli = Cli::try_parse_from([
            "sideloader",
            "https://github.com/org/web.git",
            "--config",
            temp.path().join("nope.yaml").to_str().unwrap(),
        ])
        .unwrap();

        let err = run_with(&cli, &RecordingRunner::new()).unwrap_err();
        assert_eq!(cli::exit_code_for(&err), cli::EXIT_CLI);
    }
}
