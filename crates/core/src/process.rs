//! External command execution.
//!
//! The pipeline never spawns processes directly; it describes each command as
//! a [`CommandSpec`] and hands it to a [`CommandRunner`]. [`SystemRunner`]
//! executes commands for real, [`RecordingRunner`] only remembers them.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

/// A program invocation: argv, working directory and extra environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run.
    pub program: OsString,
    /// Arguments, not including the program.
    pub args: Vec<OsString>,
    /// Working directory; inherited when `None`.
    pub current_dir: Option<PathBuf>,
    /// Variables added to the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// Start describing an invocation of `program`.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Add environment variables.
    #[must_use]
    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// The full argv as lossy strings, program first.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// Executes [`CommandSpec`]s.
pub trait CommandRunner {
    /// Run a command to completion and return its standard output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be started or exits
    /// unsuccessfully.
    fn run(&self, command: &CommandSpec) -> Result<String>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &CommandSpec) -> Result<String> {
        (**self).run(command)
    }
}

/// Runs commands as child processes.
///
/// Standard output is captured and returned; standard error is captured and
/// attached to the error when the command fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    debug: bool,
}

impl SystemRunner {
    /// Create a runner. With `debug` set, every command line and its output
    /// is logged.
    #[must_use]
    pub const fn new(debug: bool) -> Self {
        Self { debug }
    }
}

impl CommandRunner for SystemRunner {
    #[tracing::instrument(name = "run_command", skip_all, fields(program = ?command.program))]
    fn run(&self, command: &CommandSpec) -> Result<String> {
        if self.debug {
            tracing::debug!(command = %command, "Running command");
        }

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|source| Error::Spawn {
            command: command.to_string(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if self.debug {
            tracing::debug!(
                stdout = %stdout.trim_end(),
                stderr = %stderr.trim_end(),
                "Command output"
            );
        }

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: stderr.trim_end().to_string(),
            });
        }

        Ok(stdout)
    }
}

/// Records commands instead of running them.
///
/// Every command succeeds with the configured output (empty by default).
/// Commands can be made to fail by program path.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<CommandSpec>>,
    outputs: BTreeMap<OsString, String>,
    failing: Vec<OsString>,
}

impl RecordingRunner {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `output` whenever `program` is run.
    #[must_use]
    pub fn with_output(mut self, program: impl AsRef<Path>, output: impl Into<String>) -> Self {
        self.outputs
            .insert(program.as_ref().as_os_str().to_owned(), output.into());
        self
    }

    /// Fail whenever `program` is run.
    #[must_use]
    pub fn with_failure(mut self, program: impl AsRef<Path>) -> Self {
        self.failing.push(program.as_ref().as_os_str().to_owned());
        self
    }

    /// Everything run so far.
    #[must_use]
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    /// Everything run so far, as argv vectors.
    #[must_use]
    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.commands().iter().map(CommandSpec::argv).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &CommandSpec) -> Result<String> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }
        if self.failing.contains(&command.program) {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
                stderr: String::new(),
            });
        }
        Ok(self
            .outputs
            .get(&command.program)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_args() {
        let cmd = CommandSpec::new("git").args(["clone", "url"]);
        assert_eq!(cmd.to_string(), "git clone url");
    }

    #[test]
    fn test_display_without_args() {
        assert_eq!(CommandSpec::new("true").to_string(), "true");
    }

    #[test]
    fn test_argv() {
        let cmd = CommandSpec::new("pip").arg("install").arg("--upgrade");
        assert_eq!(cmd.argv(), vec!["pip", "install", "--upgrade"]);
    }

    #[test]
    fn test_recording_runner() {
        let runner = RecordingRunner::new().with_output("pip", "django==5.0\n");
        let out = runner
            .run(&CommandSpec::new("pip").arg("freeze"))
            .unwrap();
        assert_eq!(out, "django==5.0\n");
        assert_eq!(runner.argvs(), vec![vec!["pip", "freeze"]]);
    }

    #[test]
    fn test_recording_runner_failure() {
        let runner = RecordingRunner::new().with_failure("false");
        let err = runner.run(&CommandSpec::new("false")).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert_eq!(runner.commands().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_stdout() {
        let runner = SystemRunner::new(true);
        let out = runner
            .run(&CommandSpec::new("sh").args(["-c", "printf hello"]))
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_env_and_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut env = BTreeMap::new();
        env.insert("GREETING".to_string(), "hi".to_string());

        let out = SystemRunner::default()
            .run(
                &CommandSpec::new("sh")
                    .args(["-c", "printf \"$GREETING\" > out.txt"])
                    .current_dir(temp.path())
                    .envs(&env),
            )
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(
            std::fs::read_to_string(temp.path().join("out.txt")).unwrap(),
            "hi"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_failure() {
        let err = SystemRunner::default()
            .run(&CommandSpec::new("sh").args(["-c", "echo boom >&2; exit 3"]))
            .unwrap_err();
        match err {
            Error::CommandFailed { stderr, status, .. } => {
                assert_eq!(stderr, "boom");
                assert!(status.contains('3'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_system_runner_spawn_failure() {
        let err = SystemRunner::default()
            .run(&CommandSpec::new("/definitely/not/a/program"))
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
