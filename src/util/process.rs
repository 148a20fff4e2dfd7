//! Subprocess execution utilities.
//!
//! The backtick expander only ever needs "run this shell command line and
//! give me its stdout lines", which is what [`ShellExecutor`] models. The
//! production implementation is [`SystemShell`]; tests plug in a mock.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion, capturing stdout/stderr.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        Ok(output)
    }

    /// Display the command for log messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Runs a shell command line and returns its captured standard-output lines.
pub trait ShellExecutor {
    /// Run `command` through the host shell, blocking until it exits.
    ///
    /// Failures are not errors here: whatever was captured (possibly
    /// nothing) is returned.
    fn run_lines(&mut self, command: &str) -> Vec<String>;
}

/// [`ShellExecutor`] backed by the platform shell (`cmd /c` or `sh -c`).
#[derive(Debug, Clone, Default)]
pub struct SystemShell {
    cwd: Option<PathBuf>,
}

impl SystemShell {
    pub fn new() -> Self {
        SystemShell { cwd: None }
    }

    /// Run commands from `cwd` instead of the process working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    fn builder(&self, command: &str) -> ProcessBuilder {
        let pb = if cfg!(windows) {
            ProcessBuilder::new("cmd").args(["/c", command])
        } else {
            ProcessBuilder::new("sh").args(["-c", command])
        };
        match self.cwd {
            Some(ref cwd) => pb.cwd(cwd),
            None => pb,
        }
    }
}

impl ShellExecutor for SystemShell {
    fn run_lines(&mut self, command: &str) -> Vec<String> {
        let pb = self.builder(command);
        match pb.exec() {
            Ok(output) => {
                if !output.status.success() {
                    tracing::debug!(
                        "`{}` exited with {:?}",
                        pb.display_command(),
                        output.status.code()
                    );
                }
                String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .map(|l| l.trim_end_matches('\r').to_string())
                    .collect()
            }
            Err(e) => {
                tracing::debug!("{:#}", e);
                Vec::new()
            }
        }
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
