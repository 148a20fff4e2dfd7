//! Projects: a settings block, its build targets and its source files.

use serde::{Deserialize, Serialize};

use crate::core::target::{BuildSettings, BuildTarget, TargetId};
use crate::util::strings::{is_absolute, FileName};

/// The compiler program a file is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileBinding {
    #[serde(rename = "CC", alias = "cc", alias = "c")]
    Cc,
    #[serde(rename = "CPP", alias = "cpp", alias = "c++")]
    Cpp,
    #[serde(rename = "WINDRES", alias = "windres", alias = "rc")]
    Windres,
}

impl FileBinding {
    /// Guess a binding from the file extension.
    pub fn from_extension(path: &str) -> Option<Self> {
        let ext = FileName::parse(path).ext.to_lowercase();
        match ext.as_str() {
            "c" => Some(FileBinding::Cc),
            "cpp" | "cc" | "cxx" | "c++" => Some(FileBinding::Cpp),
            "rc" => Some(FileBinding::Windres),
            _ => None,
        }
    }
}

impl std::str::FromStr for FileBinding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CC" | "C" => Ok(FileBinding::Cc),
            "CPP" | "C++" => Ok(FileBinding::Cpp),
            "WINDRES" | "RC" => Ok(FileBinding::Windres),
            _ => Err(format!(
                "invalid file binding '{}'; expected 'CC', 'CPP' or 'WINDRES'",
                s
            )),
        }
    }
}

/// A source file registered with a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Path relative to the project base path (or absolute)
    pub path: String,
    /// Compiler program to use for this file
    #[serde(default)]
    pub binding: Option<FileBinding>,
}

impl ProjectFile {
    pub fn new(path: impl Into<String>) -> Self {
        ProjectFile {
            path: path.into(),
            binding: None,
        }
    }

    pub fn with_binding(mut self, binding: FileBinding) -> Self {
        self.binding = Some(binding);
        self
    }
}

/// A project: project-level settings plus the targets layered on top.
#[derive(Debug, Clone)]
pub struct Project {
    /// Project-level settings
    pub settings: BuildSettings,
    targets: Vec<BuildTarget>,
    files: Vec<ProjectFile>,
    next_id: u32,
}

impl Project {
    /// Create a project whose settings were loaded from `filename`.
    pub fn new(title: impl Into<String>, filename: impl Into<String>) -> Self {
        let mut settings = BuildSettings::new(title);
        settings.set_filename(filename);
        settings.set_modified(false);
        Project {
            settings,
            targets: Vec::new(),
            files: Vec::new(),
            next_id: 1,
        }
    }

    pub fn title(&self) -> &str {
        self.settings.title()
    }

    /// Directory containing the project file.
    pub fn base_path(&self) -> String {
        self.settings.base_path()
    }

    /// Add a target inheriting the project's file name and compiler.
    pub fn add_target(&mut self, title: impl Into<String>) -> &mut BuildTarget {
        let id = TargetId(self.next_id);
        self.next_id += 1;

        let mut target = BuildTarget::new(id, title);
        target.settings.set_filename(self.settings.filename());
        target
            .settings
            .set_compiler_id(self.settings.compiler_id());
        self.targets.push(target);
        self.settings.set_modified(true);

        let last = self.targets.len() - 1;
        &mut self.targets[last]
    }

    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    pub fn targets_mut(&mut self) -> &mut [BuildTarget] {
        &mut self.targets
    }

    pub fn target(&self, id: TargetId) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.id() == id)
    }

    pub fn target_mut(&mut self, id: TargetId) -> Option<&mut BuildTarget> {
        self.targets.iter_mut().find(|t| t.id() == id)
    }

    pub fn target_by_title(&self, title: &str) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.title() == title)
    }

    /// Split borrow used while resolving: project settings plus targets.
    pub fn split_mut(&mut self) -> (&mut BuildSettings, &mut [BuildTarget]) {
        (&mut self.settings, &mut self.targets)
    }

    pub fn add_file(&mut self, file: ProjectFile) {
        self.files.push(file);
        self.settings.set_modified(true);
    }

    pub fn files(&self) -> &[ProjectFile] {
        &self.files
    }

    pub fn file(&self, path: &str) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// True if the project or any of its targets has unsaved changes.
    pub fn is_modified(&self) -> bool {
        self.settings.is_modified() || self.targets.iter().any(|t| t.settings.is_modified())
    }

    /// Clear or set the modified flag on the project and every target.
    pub fn set_modified(&mut self, modified: bool) {
        self.settings.set_modified(modified);
        for t in &mut self.targets {
            t.settings.set_modified(modified);
        }
    }

    /// Deepest directory containing every project file, or the base path
    /// when the project has no files.
    pub fn common_top_level_path(&self) -> String {
        let base = self.base_path();
        let mut common: Option<Vec<String>> = None;

        for file in &self.files {
            let full = if is_absolute(&file.path) {
                file.path.clone()
            } else {
                format!("{}/{}", base, file.path)
            };
            let dir = FileName::parse(&full).dir;
            let parts = normalize_components(&dir);

            common = Some(match common {
                None => parts,
                Some(prev) => prev
                    .into_iter()
                    .zip(parts)
                    .take_while(|(a, b)| a == b)
                    .map(|(a, _)| a)
                    .collect(),
            });
        }

        match common {
            None => base,
            Some(parts) if parts.is_empty() => ".".into(),
            Some(parts) => parts.join("/"),
        }
    }
}

/// Split a path into components, folding `.` and `..` lexically.
fn normalize_components(path: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let rooted = path.starts_with('/') || path.starts_with('\\');
    if rooted {
        out.push(String::new());
    }
    for part in path.split(|c: char| c == '/' || c == '\\') {
        match part {
            "" | "." => {}
            ".." => {
                if out.last().is_some_and(|p| !p.is_empty() && p != "..") {
                    out.pop();
                } else if !rooted {
                    out.push("..".into());
                }
            }
            other => out.push(other.to_string()),
        }
    }
    out
}
