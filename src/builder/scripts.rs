//! Pre-build scripts.
//!
//! A project or target may list scripts that adjust its build settings
//! right before command lines are resolved. Scripts are run through a
//! [`ScriptHost`]; the built-in [`TomlScriptHost`] reads declarative TOML
//! scripts whose entry point is a top-level table:
//!
//! ```toml
//! [SetBuildOptions.add]
//! compiler_options = ["-DFROM_SCRIPT"]
//!
//! [SetBuildOptions.remove]
//! linker_options = ["-s"]
//!
//! [SetBuildOptions.relations]
//! include_dirs = "prepend"
//! ```
//!
//! Failures are collected per path and reported once, in a batch.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::core::target::{BuildSettings, OptionCategory, OptionList, OptionsRelation};

/// Entry point every pre-build script must provide.
pub const BUILD_OPTIONS_ENTRY: &str = "SetBuildOptions";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    /// The script is missing or does not parse.
    #[error("failed to load script `{path}`: {reason}")]
    NotLoaded { path: String, reason: String },

    /// The script loaded but has no such entry point.
    #[error("script `{path}` has no `{entry}` entry point")]
    MissingEntryPoint { path: String, entry: String },
}

/// Runs pre-build scripts against a settings block.
pub trait ScriptHost {
    fn run_build_script(
        &mut self,
        path: &str,
        entry: &str,
        settings: &mut BuildSettings,
    ) -> Result<(), ScriptError>;
}

/// Receives the batched failure report outside batch mode.
pub trait Notifier {
    fn error(&mut self, title: &str, message: &str);
}

/// Notifier that writes to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn error(&mut self, title: &str, message: &str) {
        eprintln!("{}: {}", title, message.trim_end());
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptBody {
    #[serde(default)]
    add: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    remove: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    relations: BTreeMap<String, OptionsRelation>,
}

/// Declarative TOML script host.
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlScriptHost;

impl TomlScriptHost {
    pub fn new() -> Self {
        TomlScriptHost
    }

    fn load(path: &str) -> Result<toml::Table, ScriptError> {
        let not_loaded = |reason: String| ScriptError::NotLoaded {
            path: path.to_string(),
            reason,
        };
        let contents =
            std::fs::read_to_string(Path::new(path)).map_err(|e| not_loaded(e.to_string()))?;
        contents
            .parse::<toml::Table>()
            .map_err(|e| not_loaded(e.message().to_string()))
    }
}

impl ScriptHost for TomlScriptHost {
    fn run_build_script(
        &mut self,
        path: &str,
        entry: &str,
        settings: &mut BuildSettings,
    ) -> Result<(), ScriptError> {
        let table = Self::load(path)?;
        let body = table
            .get(entry)
            .cloned()
            .ok_or_else(|| ScriptError::MissingEntryPoint {
                path: path.to_string(),
                entry: entry.to_string(),
            })?;
        let body: ScriptBody = body.try_into().map_err(|e: toml::de::Error| {
            ScriptError::NotLoaded {
                path: path.to_string(),
                reason: e.message().to_string(),
            }
        })?;

        let unknown = |key: &str| ScriptError::NotLoaded {
            path: path.to_string(),
            reason: format!("unknown option list `{}`", key),
        };

        for (key, values) in &body.add {
            let list = option_list_from_key(key).ok_or_else(|| unknown(key))?;
            for value in values {
                settings.add_to_list(list, value.as_str());
            }
        }
        for (key, values) in &body.remove {
            let list = option_list_from_key(key).ok_or_else(|| unknown(key))?;
            for value in values {
                settings.remove_from_list(list, value);
            }
        }
        for (key, relation) in &body.relations {
            let category = category_from_key(key).ok_or_else(|| unknown(key))?;
            settings.set_option_relation(category, *relation);
        }

        debug!("ran {} from {}", entry, path);
        Ok(())
    }
}

fn option_list_from_key(key: &str) -> Option<OptionList> {
    Some(match key {
        "include_dirs" => OptionList::IncludeDirs,
        "lib_dirs" => OptionList::LibDirs,
        "resource_include_dirs" => OptionList::ResourceIncludeDirs,
        "compiler_options" => OptionList::CompilerOptions,
        "linker_options" => OptionList::LinkerOptions,
        "link_libs" => OptionList::LinkLibs,
        "resource_compiler_options" => OptionList::ResourceCompilerOptions,
        _ => return None,
    })
}

fn category_from_key(key: &str) -> Option<OptionCategory> {
    Some(match key {
        "include_dirs" => OptionCategory::IncludeDirs,
        "lib_dirs" => OptionCategory::LibDirs,
        "resource_dirs" => OptionCategory::ResourceDirs,
        "compiler_options" => OptionCategory::CompilerOptions,
        "linker_options" => OptionCategory::LinkerOptions,
        _ => return None,
    })
}

/// Scripts that failed during one resolve pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptFailures {
    not_loaded: Vec<String>,
    missing_entry: Vec<String>,
}

impl ScriptFailures {
    pub fn clear(&mut self) {
        self.not_loaded.clear();
        self.missing_entry.clear();
    }

    /// Whether `path` already failed and must not be retried.
    pub fn has_failed(&self, path: &str) -> bool {
        self.not_loaded.iter().any(|p| p == path) || self.missing_entry.iter().any(|p| p == path)
    }

    pub fn record(&mut self, path: &str, error: &ScriptError) {
        if self.has_failed(path) {
            return;
        }
        match error {
            ScriptError::NotLoaded { .. } => self.not_loaded.push(path.to_string()),
            ScriptError::MissingEntryPoint { .. } => self.missing_entry.push(path.to_string()),
        }
    }

    pub fn not_loaded(&self) -> &[String] {
        &self.not_loaded
    }

    pub fn missing_entry(&self) -> &[String] {
        &self.missing_entry
    }

    pub fn is_empty(&self) -> bool {
        self.not_loaded.is_empty() && self.missing_entry.is_empty()
    }

    /// One message covering every failure, or `None` when nothing failed.
    pub fn report(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut msg = String::new();
        if !self.not_loaded.is_empty() {
            msg.push_str("Scripts that failed to load (missing or invalid):\n\n");
            for path in &self.not_loaded {
                msg.push_str(path);
                msg.push('\n');
            }
            msg.push('\n');
        }
        if !self.missing_entry.is_empty() {
            msg.push_str(&format!(
                "Scripts that failed to load because the mandatory entry point\n{} is missing:\n\n",
                BUILD_OPTIONS_ENTRY
            ));
            for path in &self.missing_entry {
                msg.push_str(path);
                msg.push('\n');
            }
            msg.push('\n');
        }
        Some(msg)
    }
}
