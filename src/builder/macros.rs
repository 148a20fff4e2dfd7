//! `$(NAME)` variable expansion.
//!
//! The generator hands every user-visible string through a
//! [`MacroExpander`] before it ends up on a command line. The default
//! [`MacroManager`] knows a few project/target built-ins, user variables
//! from the config file and the process environment, in that order.
//! Unknown variables are left untouched.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::core::target::BuildSettings;

static MACRO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\(([A-Za-z_][A-Za-z0-9_]*)\)").unwrap());

/// What a macro may refer to while it is expanded.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacroScope<'a> {
    pub project_title: Option<&'a str>,
    pub project_dir: Option<&'a str>,
    pub target: Option<&'a BuildSettings>,
}

impl<'a> MacroScope<'a> {
    /// No project, no target: only user and environment variables.
    pub fn global() -> Self {
        MacroScope::default()
    }

    pub fn with_target(mut self, target: &'a BuildSettings) -> Self {
        self.target = Some(target);
        self
    }
}

/// Expands user-defined variables in a string.
pub trait MacroExpander {
    fn expand(&self, text: &str, scope: &MacroScope<'_>) -> String;
}

/// Expander backed by built-ins, user variables and the environment.
#[derive(Debug, Clone, Default)]
pub struct MacroManager {
    vars: BTreeMap<String, String>,
    use_env: bool,
}

impl MacroManager {
    pub fn new() -> Self {
        MacroManager {
            vars: BTreeMap::new(),
            use_env: true,
        }
    }

    /// User variables, typically from the `[macros]` config table.
    pub fn with_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.vars.extend(vars);
        self
    }

    /// Disable environment lookups.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    fn builtin(name: &str, scope: &MacroScope<'_>) -> Option<String> {
        match name {
            "PROJECT_NAME" | "PROJECT_TITLE" => scope.project_title.map(str::to_string),
            "PROJECT_DIR" => scope.project_dir.map(str::to_string),
            "TARGET_NAME" => scope.target.map(|t| t.title().to_string()),
            "TARGET_OBJECT_DIR" => scope.target.map(|t| t.object_output()),
            "TARGET_COMPILER" => scope.target.map(|t| t.compiler_id().to_string()),
            "PLATFORM" => Some(crate::core::platform::Platform::current().to_string()),
            _ => None,
        }
    }

    fn lookup(&self, name: &str, scope: &MacroScope<'_>) -> Option<String> {
        if let Some(value) = Self::builtin(name, scope) {
            return Some(value);
        }
        if let Some(value) = self.vars.get(name) {
            return Some(value.clone());
        }
        if self.use_env {
            return std::env::var(name).ok();
        }
        None
    }
}

impl MacroExpander for MacroManager {
    fn expand(&self, text: &str, scope: &MacroScope<'_>) -> String {
        if !text.contains("$(") {
            return text.to_string();
        }
        MACRO_RE
            .replace_all(text, |caps: &Captures<'_>| {
                self.lookup(&caps[1], scope)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
