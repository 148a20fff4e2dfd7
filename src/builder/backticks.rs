//! Backtick (shell command) expansion inside option strings.
//!
//! Options such as `` `pkg-config --cflags gtk+-2.0` `` are replaced by the
//! command's output. Each distinct command runs once per session; the
//! expansion text is also scanned for search dirs.

use std::collections::HashMap;

use tracing::debug;

use crate::util::process::ShellExecutor;

/// Session cache of backtick command output, keyed by the trimmed command.
///
/// The cache is never cleared; command output is assumed stable for the
/// lifetime of the owner.
#[derive(Debug, Default)]
pub struct BacktickCache {
    entries: HashMap<String, String>,
}

impl BacktickCache {
    pub fn new() -> Self {
        BacktickCache {
            entries: HashMap::new(),
        }
    }

    /// Replace every `` `cmd` `` segment of `text` with the command output.
    ///
    /// Returns the expansions joined by spaces (each followed by one), or an
    /// empty string when `text` has no complete backtick pair. Scanning stops
    /// at the first segment whose command is blank.
    pub fn expand(&mut self, text: &mut String, shell: &mut dyn ShellExecutor) -> String {
        let mut expanded = String::new();

        while let Some((start, end)) = find_pair(text) {
            let cmd = text[start + 1..end].trim().to_string();
            if cmd.is_empty() {
                break;
            }

            let output = match self.entries.get(&cmd) {
                Some(cached) => cached.clone(),
                None => {
                    debug!("Caching result of `{}`", cmd);
                    let output = shell.run_lines(&cmd).join(" ");
                    self.entries.insert(cmd.clone(), output.clone());
                    output
                }
            };

            expanded.push_str(&output);
            expanded.push(' ');
            text.replace_range(start..=end, &output);
        }

        expanded
    }

    /// Cached output for `cmd`, if it ran before.
    pub fn get(&self, cmd: &str) -> Option<&str> {
        self.entries.get(cmd.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn find_pair(text: &str) -> Option<(usize, usize)> {
    let start = text.find('`')?;
    let end = text[start + 1..].find('`')? + start + 1;
    Some((start, end))
}

/// Collect every path introduced by `flag` in `output`.
///
/// A path runs from the end of the flag to the next space; paths with
/// embedded spaces are not supported. An empty flag yields nothing.
pub fn search_dirs_from_backticks(output: &str, flag: &str) -> Vec<String> {
    let mut dirs = Vec::new();
    if output.is_empty() || flag.is_empty() {
        return dirs;
    }

    let mut pos = 0;
    while let Some(found) = output[pos..].find(flag) {
        let begin = pos + found + flag.len();
        let rest = &output[begin..];
        let len = rest.find(' ').unwrap_or(rest.len());
        if len > 0 {
            dirs.push(rest[..len].to_string());
        }
        pos = begin;
    }
    dirs
}
