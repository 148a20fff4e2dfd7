//! Project description file (`buildline.toml`).
//!
//! The manifest is a plain serde mirror of the project model; turning it
//! into a [`Project`] goes through the regular setters so target filenames
//! get the same policy treatment as edits made at runtime.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::compiler::CompilerRegistry;
use crate::core::platform::Platform;
use crate::core::project::{Project, ProjectFile};
use crate::core::target::{
    BuildSettings, FilenamePolicy, MakeCommand, OptionCategory, OptionList, OptionsRelation,
    TargetType,
};

/// Default manifest file name.
pub const MANIFEST_NAME: &str = "buildline.toml";

/// Errors found while turning a manifest into a project.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("duplicate target `{0}`")]
    DuplicateTarget(String),

    #[error("target #{0} has an empty title")]
    EmptyTargetTitle(usize),

    #[error("could not find `buildline.toml` in `{}` or any parent directory", .dir.display())]
    NotFound { dir: PathBuf },
}

/// Find the manifest in `start` or the nearest parent directory.
pub fn find_manifest(start: &Path) -> Result<PathBuf, ManifestError> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(MANIFEST_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(ManifestError::NotFound {
                dir: start.to_path_buf(),
            });
        }
    }
}

/// Option lists shared by `[project]` and `[[targets]]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionLists {
    pub include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub resource_include_dirs: Vec<String>,
    pub compiler_options: Vec<String>,
    pub linker_options: Vec<String>,
    pub link_libs: Vec<String>,
    pub resource_compiler_options: Vec<String>,
    /// Pre-build script paths
    pub scripts: Vec<String>,
}

impl OptionLists {
    fn apply(self, settings: &mut BuildSettings) {
        settings.set_list(OptionList::IncludeDirs, self.include_dirs);
        settings.set_list(OptionList::LibDirs, self.lib_dirs);
        settings.set_list(OptionList::ResourceIncludeDirs, self.resource_include_dirs);
        settings.set_list(OptionList::CompilerOptions, self.compiler_options);
        settings.set_list(OptionList::LinkerOptions, self.linker_options);
        settings.set_list(OptionList::LinkLibs, self.link_libs);
        settings.set_list(
            OptionList::ResourceCompilerOptions,
            self.resource_compiler_options,
        );
        settings.set_list(OptionList::BuildScripts, self.scripts);
    }
}

/// `[project]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub title: String,
    pub compiler: Option<String>,
    #[serde(flatten)]
    pub options: OptionLists,
}

/// Make command overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MakeSection {
    pub build: Option<String>,
    pub compile_file: Option<String>,
    pub clean: Option<String>,
    pub dist_clean: Option<String>,
}

/// One `[[targets]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSection {
    pub title: String,
    #[serde(rename = "type", default)]
    pub target_type: TargetType,
    #[serde(default)]
    pub compiler: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub object_output: Option<String>,
    #[serde(default)]
    pub deps_output: Option<String>,
    #[serde(default)]
    pub prefix: FilenamePolicy,
    #[serde(default)]
    pub extension: FilenamePolicy,
    #[serde(default)]
    pub platforms: Option<Vec<Platform>>,
    #[serde(default = "default_true")]
    pub create_static_lib: bool,
    #[serde(default = "default_true")]
    pub create_def_file: bool,
    #[serde(default)]
    pub relations: BTreeMap<String, OptionsRelation>,
    #[serde(default)]
    pub make: MakeSection,
    #[serde(default)]
    pub execution_parameters: Option<String>,
    #[serde(flatten)]
    pub options: OptionLists,
}

fn default_true() -> bool {
    true
}

/// The whole manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub project: ProjectSection,
    pub targets: Vec<TargetSection>,
    pub files: Vec<ProjectFile>,
}

impl Manifest {
    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Build the project model. `filename` becomes the project (and target)
    /// file name, so output paths are derived relative to it.
    pub fn into_project(self, filename: &str, registry: &CompilerRegistry) -> Result<Project> {
        let title = if self.project.title.is_empty() {
            "untitled".to_string()
        } else {
            self.project.title
        };

        let mut project = Project::new(title, filename);
        let project_compiler = self
            .project
            .compiler
            .or_else(|| registry.default_id().map(str::to_string))
            .unwrap_or_default();
        project.settings.set_compiler_id(project_compiler.as_str());
        self.project.options.apply(&mut project.settings);

        for (idx, section) in self.targets.into_iter().enumerate() {
            if section.title.is_empty() {
                return Err(ManifestError::EmptyTargetTitle(idx).into());
            }
            if project.target_by_title(&section.title).is_some() {
                return Err(ManifestError::DuplicateTarget(section.title).into());
            }

            let target = project.add_target(section.title.as_str());
            if let Some(ref id) = section.compiler {
                target.settings.set_compiler_id(id.as_str());
            }
            let compiler = registry.get(target.settings.compiler_id());

            let settings = &mut target.settings;
            settings.set_filename_policy(section.prefix, section.extension);
            settings.set_target_type(section.target_type, compiler);
            if let Some(ref output) = section.output {
                settings.set_output_filename(output, compiler);
            }
            if let Some(ref dir) = section.working_dir {
                settings.set_working_dir(dir);
            }
            if let Some(ref dir) = section.object_output {
                settings.set_object_output(dir);
            }
            if let Some(ref dir) = section.deps_output {
                settings.set_deps_output(dir);
            }
            if let Some(ref params) = section.execution_parameters {
                settings.set_execution_parameters(params.as_str());
            }
            for (key, relation) in &section.relations {
                let category = parse_category(key)
                    .with_context(|| format!("target `{}`", settings.title()))?;
                settings.set_option_relation(category, *relation);
            }
            let make = [
                (MakeCommand::Build, &section.make.build),
                (MakeCommand::CompileFile, &section.make.compile_file),
                (MakeCommand::Clean, &section.make.clean),
                (MakeCommand::DistClean, &section.make.dist_clean),
            ];
            for (slot, value) in make {
                if let Some(cmd) = value {
                    settings.set_make_command(slot, cmd.as_str());
                }
            }
            section.options.apply(settings);

            if let Some(platforms) = section.platforms {
                target.set_platforms(platforms);
            }
            target.set_create_static_lib(section.create_static_lib);
            target.set_create_def_file(section.create_def_file);
        }

        for file in self.files {
            project.add_file(file);
        }

        project.set_modified(false);
        Ok(project)
    }
}

fn parse_category(key: &str) -> Result<OptionCategory> {
    let category: OptionCategory = toml::Value::String(key.to_string())
        .try_into()
        .map_err(|_| anyhow::anyhow!("unknown option category `{}`", key))?;
    Ok(category)
}
