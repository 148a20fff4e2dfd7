//! Configuration file support for buildline.
//!
//! buildline supports two configuration file locations:
//! - Global: `~/.buildline/config.toml` - User-wide defaults
//! - Project: `.buildline/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::generator::GeneratorOptions;
use crate::builder::macros::MacroManager;
use crate::core::compiler::{Compiler, CompilerRegistry};

/// buildline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Include path and default compiler settings
    pub compiler: CompilerConfig,

    /// Build settings
    pub build: BuildConfig,

    /// User `$(NAME)` variables
    pub macros: BTreeMap<String, String>,

    /// Extra or overriding compiler definitions
    pub compilers: Vec<Compiler>,
}

/// `[compiler]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Add each compiled file's directory to its include path
    pub include_file_cwd: Option<bool>,

    /// Add the project's common top-level directory to the include path
    pub include_prj_cwd: Option<bool>,

    /// Default compiler id (built-in default: gcc)
    pub default: Option<String>,
}

/// `[build]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Batch build: report script failures to the log only
    pub batch: Option<bool>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.compiler.include_file_cwd.is_some() {
            self.compiler.include_file_cwd = other.compiler.include_file_cwd;
        }
        if other.compiler.include_prj_cwd.is_some() {
            self.compiler.include_prj_cwd = other.compiler.include_prj_cwd;
        }
        if other.compiler.default.is_some() {
            self.compiler.default = other.compiler.default;
        }

        if other.build.batch.is_some() {
            self.build.batch = other.build.batch;
        }

        self.macros.extend(other.macros);

        for compiler in other.compilers {
            match self.compilers.iter_mut().find(|c| c.id == compiler.id) {
                Some(existing) => *existing = compiler,
                None => self.compilers.push(compiler),
            }
        }
    }

    /// Built-in compilers plus the configured ones, with the configured
    /// default. An unknown default id leaves the registry without a usable
    /// default compiler.
    pub fn registry(&self) -> CompilerRegistry {
        let mut registry = CompilerRegistry::with_builtins();
        for compiler in &self.compilers {
            registry.register(compiler.clone());
        }
        if let Some(ref id) = self.compiler.default {
            registry.set_default(id.as_str());
        }
        registry
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            include_file_cwd: self.compiler.include_file_cwd.unwrap_or(false),
            include_prj_cwd: self.compiler.include_prj_cwd.unwrap_or(false),
            batch: self.build.batch.unwrap_or(false),
        }
    }

    /// Macro expander seeded with the `[macros]` table.
    pub fn macro_manager(&self) -> MacroManager {
        MacroManager::new().with_vars(self.macros.clone())
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.buildline/config.toml)
/// 2. Global config (~/.buildline/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global buildline config directory (~/.buildline).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".buildline"))
}

/// Get the global config path (~/.buildline/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.buildline/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".buildline").join("config.toml")
}
