//! Test utilities and mocks for buildline unit tests.
//!
//! The generator talks to the outside world through three seams: the shell
//! (backtick commands), the script host and the notifier. This module
//! provides recording mocks for each so resolution can be tested without
//! spawning processes or touching script files.
//!
//! # Example
//!
//! ```rust,ignore
//! use buildline::test_support::{MockShell, demo_project};
//!
//! #[test]
//! fn test_example() {
//!     let shell = MockShell::new();
//!     shell.expect("pkg-config --cflags gtk", &["-I/usr/include/gtk"]);
//!
//!     let mut project = demo_project();
//!     // hand `Box::new(shell.clone())` to the generator...
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::builder::scripts::{Notifier, ScriptError, ScriptHost};
use crate::core::target::BuildSettings;
use crate::util::process::ShellExecutor;

pub use fixtures::*;

/// Pattern for matching commands in [`MockShell`].
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on the trimmed command.
    Exact(String),
    /// Match if the command starts with a prefix.
    StartsWith(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd.trim() == s,
            CommandPattern::StartsWith(s) => cmd.trim().starts_with(s.as_str()),
            CommandPattern::Any => true,
        }
    }
}

#[derive(Debug, Default)]
struct ShellState {
    expectations: Vec<(CommandPattern, Vec<String>)>,
    calls: Vec<String>,
}

/// Mock shell returning canned output lines.
///
/// Clones share state, so a test can keep one handle and give another to
/// the generator. Commands without an expectation produce no output, like
/// a command that failed to start.
#[derive(Debug, Clone, Default)]
pub struct MockShell {
    state: Arc<Mutex<ShellState>>,
}

impl MockShell {
    pub fn new() -> Self {
        MockShell::default()
    }

    /// Answer `cmd` with `lines`.
    pub fn expect(&self, cmd: &str, lines: &[&str]) -> &Self {
        self.expect_pattern(CommandPattern::Exact(cmd.to_string()), lines)
    }

    /// Answer every command starting with `prefix` with `lines`.
    pub fn expect_prefix(&self, prefix: &str, lines: &[&str]) -> &Self {
        self.expect_pattern(CommandPattern::StartsWith(prefix.to_string()), lines)
    }

    pub fn expect_pattern(&self, pattern: CommandPattern, lines: &[&str]) -> &Self {
        let lines = lines.iter().map(|l| l.to_string()).collect();
        self.lock().expectations.push((pattern, lines));
        self
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ShellState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ShellExecutor for MockShell {
    fn run_lines(&mut self, command: &str) -> Vec<String> {
        let mut state = self.lock();
        state.calls.push(command.to_string());
        state
            .expectations
            .iter()
            .find(|(pattern, _)| pattern.matches(command))
            .map(|(_, lines)| lines.clone())
            .unwrap_or_default()
    }
}

type ScriptFn = Arc<dyn Fn(&mut BuildSettings) + Send + Sync>;

#[derive(Clone)]
enum ScriptBehavior {
    Missing,
    NoEntryPoint,
    Run(ScriptFn),
}

#[derive(Default)]
struct ScriptState {
    behaviors: HashMap<String, ScriptBehavior>,
    runs: Vec<String>,
}

/// Mock script host keyed by script path.
///
/// Paths without a registered behavior run successfully and change
/// nothing. Clones share state.
#[derive(Clone, Default)]
pub struct MockScriptHost {
    state: Arc<Mutex<ScriptState>>,
}

impl MockScriptHost {
    pub fn new() -> Self {
        MockScriptHost::default()
    }

    /// Run `f` against the settings whenever `path` is executed.
    pub fn on_run<F>(&self, path: &str, f: F)
    where
        F: Fn(&mut BuildSettings) + Send + Sync + 'static,
    {
        self.set(path, ScriptBehavior::Run(Arc::new(f)));
    }

    /// Make `path` fail to load.
    pub fn fail_missing(&self, path: &str) {
        self.set(path, ScriptBehavior::Missing);
    }

    /// Make `path` load but lack the entry point.
    pub fn fail_entry(&self, path: &str) {
        self.set(path, ScriptBehavior::NoEntryPoint);
    }

    /// Every script path executed so far, in order.
    pub fn runs(&self) -> Vec<String> {
        self.lock().runs.clone()
    }

    fn set(&self, path: &str, behavior: ScriptBehavior) {
        self.lock().behaviors.insert(path.to_string(), behavior);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ScriptHost for MockScriptHost {
    fn run_build_script(
        &mut self,
        path: &str,
        entry: &str,
        settings: &mut BuildSettings,
    ) -> Result<(), ScriptError> {
        let behavior = {
            let mut state = self.lock();
            state.runs.push(path.to_string());
            state.behaviors.get(path).cloned()
        };

        match behavior {
            None => Ok(()),
            Some(ScriptBehavior::Run(f)) => {
                f(settings);
                Ok(())
            }
            Some(ScriptBehavior::Missing) => Err(ScriptError::NotLoaded {
                path: path.to_string(),
                reason: "no such file".into(),
            }),
            Some(ScriptBehavior::NoEntryPoint) => Err(ScriptError::MissingEntryPoint {
                path: path.to_string(),
                entry: entry.to_string(),
            }),
        }
    }
}

/// Notifier that records every message it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        RecordingNotifier::default()
    }

    /// `(title, message)` pairs, in order.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&mut self, title: &str, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((title.to_string(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_shell_basic() {
        let mut shell = MockShell::new();
        shell.expect("gcc --version", &["gcc 12.0.0"]);
        shell.expect_prefix("pkg-config", &["-I/usr/include/x"]);

        assert_eq!(shell.run_lines("gcc --version"), vec!["gcc 12.0.0"]);
        assert_eq!(
            shell.run_lines("pkg-config --cflags x"),
            vec!["-I/usr/include/x"]
        );
        assert!(shell.run_lines("unknown").is_empty());
        assert_eq!(shell.call_count(), 3);
    }

    #[test]
    fn test_mock_shell_clones_share_state() {
        let shell = MockShell::new();
        let mut other = shell.clone();
        other.run_lines("a");
        assert_eq!(shell.calls(), vec!["a".to_string()]);
    }

    #[test]
    fn test_mock_script_host() {
        let host = MockScriptHost::new();
        host.on_run("a.toml", |s| s.set_title("changed"));
        host.fail_missing("b.toml");

        let mut runner = host.clone();
        let mut settings = BuildSettings::new("t");
        runner.run_build_script("a.toml", "SetBuildOptions", &mut settings).unwrap();
        assert_eq!(settings.title(), "changed");
        assert!(runner.run_build_script("b.toml", "SetBuildOptions", &mut settings).is_err());
        assert!(runner.run_build_script("c.toml", "SetBuildOptions", &mut settings).is_ok());
        assert_eq!(host.runs().len(), 3);
    }
}
