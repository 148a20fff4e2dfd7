//! Command implementations

pub mod command;
pub mod output_name;
pub mod resolve;
pub mod toolchain;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use buildline::builder::CompilerCommandGenerator;
use buildline::core::{find_manifest, Manifest, Project};
use buildline::util::config::{global_config_path, load_config, project_config_path, Config};
use buildline::util::process::SystemShell;

/// A loaded project with the configuration that applies to it.
pub struct Session {
    pub project: Project,
    pub config: Config,
}

/// Current working directory.
pub fn cwd() -> Result<PathBuf> {
    std::env::current_dir().context("failed to get current directory")
}

/// Configuration for a project rooted at `root` (global + project files).
pub fn config_for(root: &Path) -> Config {
    load_config(global_config_path().as_deref(), &project_config_path(root))
}

/// Locate and load the manifest, or `None` when there is none to find.
pub fn try_load(manifest: Option<PathBuf>) -> Result<Option<Session>> {
    let path = match manifest {
        Some(path) => path,
        None => match find_manifest(&cwd()?) {
            Ok(path) => path,
            Err(_) => return Ok(None),
        },
    };
    load(&path).map(Some)
}

/// Load the manifest at `path`.
pub fn load(path: &Path) -> Result<Session> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd()?.join(path)
    };
    let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let config = config_for(&root);

    let manifest = Manifest::load(&path)?;
    let project = manifest.into_project(&path.to_string_lossy(), &config.registry())?;
    tracing::debug!("loaded project `{}` from {}", project.title(), path.display());

    Ok(Session { project, config })
}

/// A generator wired to `config`, running shell commands from `dir`.
pub fn generator(config: &Config, dir: &Path) -> CompilerCommandGenerator {
    CompilerCommandGenerator::new(config.registry())
        .with_options(config.generator_options())
        .with_macros(Box::new(config.macro_manager()))
        .with_shell(Box::new(SystemShell::new().with_cwd(dir)))
}
