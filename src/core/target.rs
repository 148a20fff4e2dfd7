//! Build targets and the settings block shared by targets and projects.
//!
//! [`BuildSettings`] carries everything a target (or its parent project)
//! declares: type, naming policy, output locations, option lists and the
//! per-category merge relation. It also knows how to derive default output
//! filenames from the target type, so callers never have to spell one out.
//! Every mutator marks the block as modified.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::compiler::Compiler;
use crate::core::platform::{with_dot_ext, Platform};
use crate::util::strings::{unix_filename, FileName};

/// The kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TargetType {
    /// GUI executable
    #[default]
    #[serde(alias = "exe")]
    Executable,
    /// Console executable
    #[serde(alias = "console")]
    ConsoleOnly,
    /// Shared/dynamic library (.so / .dylib / .dll)
    #[serde(alias = "dylib", alias = "shared")]
    DynamicLib,
    /// Static library (.a / .lib)
    #[serde(alias = "staticlib", alias = "static")]
    StaticLib,
    /// Native plugin / driver (.sys)
    Native,
    /// Runs pre/post build commands only
    #[serde(alias = "commands")]
    CommandsOnly,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Executable => "executable",
            TargetType::ConsoleOnly => "console-only",
            TargetType::DynamicLib => "dynamic-lib",
            TargetType::StaticLib => "static-lib",
            TargetType::Native => "native",
            TargetType::CommandsOnly => "commands-only",
        }
    }

    /// Static or dynamic library.
    pub fn is_library(&self) -> bool {
        matches!(self, TargetType::StaticLib | TargetType::DynamicLib)
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "executable" | "exe" => Ok(TargetType::Executable),
            "console-only" | "console" => Ok(TargetType::ConsoleOnly),
            "dynamic-lib" | "dylib" | "shared" => Ok(TargetType::DynamicLib),
            "static-lib" | "staticlib" | "static" => Ok(TargetType::StaticLib),
            "native" => Ok(TargetType::Native),
            "commands-only" | "commands" => Ok(TargetType::CommandsOnly),
            _ => Err(format!("invalid target type '{}'", s)),
        }
    }
}

/// Whether the prefix / extension of a target filename is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FilenamePolicy {
    /// Apply the platform (or compiler) default
    #[default]
    #[serde(alias = "default")]
    PlatformDefault,
    /// Leave the user-supplied name alone
    None,
}

impl std::str::FromStr for FilenamePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" | "platform-default" => Ok(FilenamePolicy::PlatformDefault),
            "none" => Ok(FilenamePolicy::None),
            _ => Err(format!(
                "invalid filename policy '{}'; expected 'default' or 'none'",
                s
            )),
        }
    }
}

/// How a target's option values combine with its parent project's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OptionsRelation {
    /// Project values only
    #[serde(alias = "parent")]
    UseParentOnly,
    /// Target values only
    #[serde(alias = "target")]
    UseTargetOnly,
    /// Target values, then project values
    #[serde(alias = "prepend")]
    PrependToParent,
    /// Project values, then target values
    #[default]
    #[serde(alias = "append")]
    AppendToParent,
}

/// The option categories that carry their own merge relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionCategory {
    IncludeDirs,
    LibDirs,
    ResourceDirs,
    CompilerOptions,
    LinkerOptions,
}

impl OptionCategory {
    pub const ALL: [OptionCategory; 5] = [
        OptionCategory::IncludeDirs,
        OptionCategory::LibDirs,
        OptionCategory::ResourceDirs,
        OptionCategory::CompilerOptions,
        OptionCategory::LinkerOptions,
    ];

    fn index(self) -> usize {
        match self {
            OptionCategory::IncludeDirs => 0,
            OptionCategory::LibDirs => 1,
            OptionCategory::ResourceDirs => 2,
            OptionCategory::CompilerOptions => 3,
            OptionCategory::LinkerOptions => 4,
        }
    }
}

/// The ordered string lists a settings block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionList {
    IncludeDirs,
    LibDirs,
    ResourceIncludeDirs,
    CompilerOptions,
    LinkerOptions,
    LinkLibs,
    ResourceCompilerOptions,
    BuildScripts,
}

/// Make-style command template slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MakeCommand {
    Build,
    CompileFile,
    Clean,
    DistClean,
}

impl MakeCommand {
    fn index(self) -> usize {
        match self {
            MakeCommand::Build => 0,
            MakeCommand::CompileFile => 1,
            MakeCommand::Clean => 2,
            MakeCommand::DistClean => 3,
        }
    }
}

/// The four make command templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeCommands {
    commands: [String; 4],
    modified: bool,
}

impl Default for MakeCommands {
    fn default() -> Self {
        MakeCommands {
            commands: [
                "$make -f $makefile $target".into(),
                "$make -f $makefile $file".into(),
                "$make -f $makefile clean$target".into(),
                "$make -f $makefile distclean$target".into(),
            ],
            modified: false,
        }
    }
}

impl MakeCommands {
    pub fn get(&self, cmd: MakeCommand) -> &str {
        &self.commands[cmd.index()]
    }

    /// Whether any template differs from what was loaded.
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

/// Settings shared by build targets and projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    title: String,
    filename: String,
    output_filename: String,
    working_dir: String,
    object_output: String,
    deps_output: String,
    execution_parameters: String,
    host_application: String,
    target_type: TargetType,
    compiler_id: String,
    prefix_policy: FilenamePolicy,
    extension_policy: FilenamePolicy,
    relations: [OptionsRelation; 5],
    include_dirs: Vec<String>,
    lib_dirs: Vec<String>,
    resource_include_dirs: Vec<String>,
    compiler_options: Vec<String>,
    linker_options: Vec<String>,
    link_libs: Vec<String>,
    resource_compiler_options: Vec<String>,
    build_scripts: Vec<String>,
    make_commands: MakeCommands,
    modified: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            title: String::new(),
            filename: String::new(),
            output_filename: String::new(),
            working_dir: String::new(),
            object_output: String::new(),
            deps_output: String::new(),
            execution_parameters: String::new(),
            host_application: String::new(),
            target_type: TargetType::Executable,
            compiler_id: String::new(),
            prefix_policy: FilenamePolicy::PlatformDefault,
            extension_policy: FilenamePolicy::PlatformDefault,
            relations: [OptionsRelation::AppendToParent; 5],
            include_dirs: Vec::new(),
            lib_dirs: Vec::new(),
            resource_include_dirs: Vec::new(),
            compiler_options: Vec::new(),
            linker_options: Vec::new(),
            link_libs: Vec::new(),
            resource_compiler_options: Vec::new(),
            build_scripts: Vec::new(),
            make_commands: MakeCommands::default(),
            modified: false,
        }
    }
}

impl BuildSettings {
    pub fn new(title: impl Into<String>) -> Self {
        BuildSettings {
            title: title.into(),
            ..BuildSettings::default()
        }
    }

    // ---- modification tracking ----

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
        if !modified {
            self.make_commands.modified = false;
        }
    }

    // ---- identity and plain properties ----

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        if self.title == title {
            return;
        }
        self.title = title;
        self.modified = true;
    }

    /// The file the settings were loaded from; output names derive from it.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        let filename = filename.into();
        if self.filename == filename {
            return;
        }
        self.filename = filename;
        self.modified = true;
    }

    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    /// Change the target type and re-suggest the output filename for it.
    pub fn set_target_type(&mut self, target_type: TargetType, compiler: Option<&Compiler>) {
        if self.target_type == target_type {
            return;
        }
        self.target_type = target_type;
        self.output_filename = self.suggest_output_filename(compiler);
        self.modified = true;
    }

    pub fn compiler_id(&self) -> &str {
        &self.compiler_id
    }

    pub fn set_compiler_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.compiler_id == id {
            return;
        }
        self.compiler_id = id;
        self.modified = true;
    }

    pub fn filename_policy(&self) -> (FilenamePolicy, FilenamePolicy) {
        (self.prefix_policy, self.extension_policy)
    }

    pub fn set_filename_policy(&mut self, prefix: FilenamePolicy, extension: FilenamePolicy) {
        self.prefix_policy = prefix;
        self.extension_policy = extension;
        self.modified = true;
    }

    pub fn option_relation(&self, category: OptionCategory) -> OptionsRelation {
        self.relations[category.index()]
    }

    pub fn set_option_relation(&mut self, category: OptionCategory, relation: OptionsRelation) {
        if self.relations[category.index()] == relation {
            return;
        }
        self.relations[category.index()] = relation;
        self.modified = true;
    }

    pub fn execution_parameters(&self) -> &str {
        &self.execution_parameters
    }

    pub fn set_execution_parameters(&mut self, params: impl Into<String>) {
        let params = params.into();
        if self.execution_parameters == params {
            return;
        }
        self.execution_parameters = params;
        self.modified = true;
    }

    pub fn host_application(&self) -> &str {
        &self.host_application
    }

    pub fn set_host_application(&mut self, app: impl Into<String>) {
        let app = app.into();
        if self.host_application == app {
            return;
        }
        self.host_application = app;
        self.modified = true;
    }

    pub fn make_commands(&self) -> &MakeCommands {
        &self.make_commands
    }

    pub fn make_command(&self, cmd: MakeCommand) -> &str {
        self.make_commands.get(cmd)
    }

    pub fn set_make_command(&mut self, cmd: MakeCommand, make: impl Into<String>) {
        let make = make.into();
        if self.make_commands.commands[cmd.index()] == make {
            return;
        }
        self.make_commands.commands[cmd.index()] = make;
        self.make_commands.modified = true;
        self.modified = true;
    }

    // ---- option lists ----

    pub fn list(&self, list: OptionList) -> &[String] {
        match list {
            OptionList::IncludeDirs => &self.include_dirs,
            OptionList::LibDirs => &self.lib_dirs,
            OptionList::ResourceIncludeDirs => &self.resource_include_dirs,
            OptionList::CompilerOptions => &self.compiler_options,
            OptionList::LinkerOptions => &self.linker_options,
            OptionList::LinkLibs => &self.link_libs,
            OptionList::ResourceCompilerOptions => &self.resource_compiler_options,
            OptionList::BuildScripts => &self.build_scripts,
        }
    }

    fn list_mut(&mut self, list: OptionList) -> &mut Vec<String> {
        match list {
            OptionList::IncludeDirs => &mut self.include_dirs,
            OptionList::LibDirs => &mut self.lib_dirs,
            OptionList::ResourceIncludeDirs => &mut self.resource_include_dirs,
            OptionList::CompilerOptions => &mut self.compiler_options,
            OptionList::LinkerOptions => &mut self.linker_options,
            OptionList::LinkLibs => &mut self.link_libs,
            OptionList::ResourceCompilerOptions => &mut self.resource_compiler_options,
            OptionList::BuildScripts => &mut self.build_scripts,
        }
    }

    /// Replace a whole list.
    pub fn set_list(&mut self, list: OptionList, values: Vec<String>) {
        let slot = self.list_mut(list);
        if *slot == values {
            return;
        }
        *slot = values;
        self.modified = true;
    }

    /// Append a value unless it is already present.
    pub fn add_to_list(&mut self, list: OptionList, value: impl Into<String>) {
        let value = value.into();
        let slot = self.list_mut(list);
        if slot.contains(&value) {
            return;
        }
        slot.push(value);
        self.modified = true;
    }

    /// Remove every occurrence of a value.
    pub fn remove_from_list(&mut self, list: OptionList, value: &str) {
        let slot = self.list_mut(list);
        let before = slot.len();
        slot.retain(|v| v != value);
        if slot.len() != before {
            self.modified = true;
        }
    }

    pub fn include_dirs(&self) -> &[String] {
        &self.include_dirs
    }

    pub fn lib_dirs(&self) -> &[String] {
        &self.lib_dirs
    }

    pub fn resource_include_dirs(&self) -> &[String] {
        &self.resource_include_dirs
    }

    pub fn compiler_options(&self) -> &[String] {
        &self.compiler_options
    }

    pub fn linker_options(&self) -> &[String] {
        &self.linker_options
    }

    pub fn link_libs(&self) -> &[String] {
        &self.link_libs
    }

    pub fn resource_compiler_options(&self) -> &[String] {
        &self.resource_compiler_options
    }

    pub fn build_scripts(&self) -> &[String] {
        &self.build_scripts
    }

    // ---- output locations ----

    /// Directory of [`filename`](Self::filename), or "." when there is none.
    pub fn base_path(&self) -> String {
        if self.filename.is_empty() {
            return ".".into();
        }
        let dir = FileName::parse(&self.filename).dir;
        if dir.is_empty() {
            ".".into()
        } else {
            dir
        }
    }

    pub fn set_working_dir(&mut self, dir: &str) {
        if self.working_dir == dir {
            return;
        }
        self.working_dir = unix_filename(dir);
        self.modified = true;
    }

    /// Working directory for running the output. Only runnable targets
    /// have one; it defaults to the output file's directory.
    pub fn working_dir(&self, compiler: Option<&Compiler>) -> String {
        if !matches!(
            self.target_type,
            TargetType::ConsoleOnly | TargetType::Executable | TargetType::DynamicLib
        ) {
            return String::new();
        }
        if self.working_dir.is_empty() {
            return FileName::parse(&self.output_filename(compiler)).dir;
        }
        self.working_dir.clone()
    }

    pub fn set_object_output(&mut self, dir: &str) {
        if self.object_output == dir {
            return;
        }
        self.object_output = unix_filename(dir);
        self.modified = true;
    }

    /// Object output directory, `<base>/.objs` unless set.
    pub fn object_output(&self) -> String {
        self.output_dir_or_default(&self.object_output, ".objs")
    }

    pub fn set_deps_output(&mut self, dir: &str) {
        if self.deps_output == dir {
            return;
        }
        self.deps_output = unix_filename(dir);
        self.modified = true;
    }

    /// Dependency output directory, `<base>/.deps` unless set.
    pub fn deps_output(&self) -> String {
        self.output_dir_or_default(&self.deps_output, ".deps")
    }

    fn output_dir_or_default(&self, value: &str, default_name: &str) -> String {
        if self.target_type == TargetType::CommandsOnly {
            return String::new();
        }
        if !value.is_empty() {
            return value.to_string();
        }
        let base = self.base_path();
        if base.is_empty() || base == "." {
            default_name.to_string()
        } else {
            format!("{}/{}", base, default_name)
        }
    }

    // ---- output filename resolution ----

    /// The output filename, suggested from the target type when unset.
    pub fn output_filename(&self, compiler: Option<&Compiler>) -> String {
        if self.target_type == TargetType::CommandsOnly {
            return String::new();
        }
        if self.output_filename.is_empty() {
            return self.suggest_output_filename(compiler);
        }
        self.output_filename.clone()
    }

    /// Set the output filename; an empty name re-suggests one, anything
    /// else goes through [`generate_target_filename`](Self::generate_target_filename).
    pub fn set_output_filename(&mut self, filename: &str, compiler: Option<&Compiler>) {
        if filename.is_empty() {
            self.output_filename = self.suggest_output_filename(compiler);
            self.modified = true;
            return;
        }
        if self.output_filename == filename {
            return;
        }
        let unix = unix_filename(filename);
        self.output_filename = self.generate_target_filename(&unix, compiler);
        self.modified = true;
    }

    /// Suggest an output filename (no directory) for the current target type.
    pub fn suggest_output_filename(&self, compiler: Option<&Compiler>) -> String {
        let suggestion = match self.target_type {
            TargetType::ConsoleOnly | TargetType::Executable => self.executable_filename(compiler),
            TargetType::DynamicLib => self.dynamic_lib_filename(compiler),
            TargetType::StaticLib => self.static_lib_filename(compiler),
            TargetType::Native => self.native_filename(compiler),
            TargetType::CommandsOnly => String::new(),
        };
        unix_filename(&FileName::parse(&suggestion).full_name())
    }

    /// Apply the prefix and extension policies to `filename` for the
    /// current platform.
    pub fn generate_target_filename(&self, filename: &str, compiler: Option<&Compiler>) -> String {
        self.generate_target_filename_for(filename, compiler, Platform::current())
    }

    /// Apply the prefix and extension policies to `filename`.
    ///
    /// Prefix and extension are decided independently. Static libraries
    /// take their prefix and extension from the compiler.
    pub fn generate_target_filename_for(
        &self,
        filename: &str,
        compiler: Option<&Compiler>,
        platform: Platform,
    ) -> String {
        if self.prefix_policy == FilenamePolicy::None
            && self.extension_policy == FilenamePolicy::None
        {
            return filename.to_string();
        }

        let fname = FileName::parse(filename);
        let default_prefix = self.prefix_policy == FilenamePolicy::PlatformDefault;
        let default_ext = self.extension_policy == FilenamePolicy::PlatformDefault;

        let prefix = match self.target_type {
            TargetType::DynamicLib if default_prefix => platform.dynamic_lib_prefix(),
            TargetType::StaticLib if default_prefix => {
                compiler.map(|c| c.switches.lib_prefix.as_str()).unwrap_or("")
            }
            _ => "",
        };

        let ext = match self.target_type {
            TargetType::ConsoleOnly | TargetType::Executable => platform.executable_ext(),
            TargetType::DynamicLib => platform.dynamic_lib_ext(),
            TargetType::Native => platform.native_ext(),
            TargetType::StaticLib => compiler
                .map(|c| c.switches.lib_extension.as_str())
                .unwrap_or_else(|| platform.static_lib_ext()),
            TargetType::CommandsOnly => return String::new(),
        };

        let mut out = fname.dir_with_sep();
        if !prefix.is_empty() && !fname.name.starts_with(prefix) {
            out.push_str(prefix);
        }
        if default_ext {
            out.push_str(&with_dot_ext(&fname.name, ext));
        } else {
            out.push_str(&fname.full_name());
        }
        out
    }

    fn has_naming_policy(&self) -> bool {
        self.prefix_policy != FilenamePolicy::None || self.extension_policy != FilenamePolicy::None
    }

    /// Settings file name, falling back to the stored output name.
    fn naming_base(&self) -> &str {
        if self.filename.is_empty() {
            &self.output_filename
        } else {
            &self.filename
        }
    }

    pub fn executable_filename(&self, compiler: Option<&Compiler>) -> String {
        if self.target_type == TargetType::CommandsOnly {
            return String::new();
        }
        if self.has_naming_policy() {
            return self.generate_target_filename(&self.filename, compiler);
        }
        let mut fname = FileName::parse(&self.filename);
        fname.set_ext(Platform::current().executable_ext());
        fname.full_path()
    }

    pub fn dynamic_lib_filename(&self, compiler: Option<&Compiler>) -> String {
        if self.target_type == TargetType::CommandsOnly {
            return String::new();
        }
        let base = self.naming_base();
        if self.has_naming_policy() {
            return self.generate_target_filename(base, compiler);
        }
        let mut fname = FileName::parse(base);
        fname.set_ext(Platform::current().dynamic_lib_ext());
        fname.full_path()
    }

    pub fn native_filename(&self, compiler: Option<&Compiler>) -> String {
        if self.target_type == TargetType::CommandsOnly {
            return String::new();
        }
        let base = self.naming_base();
        if self.has_naming_policy() {
            return self.generate_target_filename(base, compiler);
        }
        let mut fname = FileName::parse(base);
        fname.set_ext(Platform::current().native_ext());
        fname.full_path()
    }

    /// Static library name, or the import library name for dynamic libs.
    pub fn static_lib_filename(&self, compiler: Option<&Compiler>) -> String {
        if self.target_type == TargetType::CommandsOnly {
            return String::new();
        }
        let base = self.naming_base();
        if self.target_type == TargetType::StaticLib && self.has_naming_policy() {
            return self.generate_target_filename(base, compiler);
        }

        let (prefix, suffix) = match compiler {
            Some(c) => (c.switches.lib_prefix.as_str(), c.switches.lib_extension.as_str()),
            None => ("lib", Platform::current().static_lib_ext()),
        };
        let mut fname = FileName::parse(base);
        if !fname.name.starts_with(prefix) {
            fname.set_name(format!("{}{}", prefix, fname.name));
        }
        fname.set_ext(suffix);
        fname.full_path()
    }
}

/// Stable identity of a target within its project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TargetId(pub u32);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One buildable artifact within a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    id: TargetId,
    /// Settings layered over the project's
    pub settings: BuildSettings,
    platforms: Vec<Platform>,
    create_static_lib: bool,
    create_def_file: bool,
}

impl BuildTarget {
    pub fn new(id: TargetId, title: impl Into<String>) -> Self {
        BuildTarget {
            id,
            settings: BuildSettings::new(title),
            platforms: Platform::ALL.to_vec(),
            create_static_lib: true,
            create_def_file: true,
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn title(&self) -> &str {
        self.settings.title()
    }

    pub fn target_type(&self) -> TargetType {
        self.settings.target_type()
    }

    pub fn compiler_id(&self) -> &str {
        self.settings.compiler_id()
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn set_platforms(&mut self, platforms: Vec<Platform>) {
        if self.platforms == platforms {
            return;
        }
        self.platforms = platforms;
        self.settings.modified = true;
    }

    pub fn supports_platform(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }

    pub fn supports_current_platform(&self) -> bool {
        self.supports_platform(Platform::current())
    }

    /// Dynamic libs: also produce an import library.
    pub fn create_static_lib(&self) -> bool {
        self.create_static_lib
    }

    pub fn set_create_static_lib(&mut self, create: bool) {
        if self.create_static_lib == create {
            return;
        }
        self.create_static_lib = create;
        self.settings.modified = true;
    }

    /// Dynamic libs: also produce a module-definition file.
    pub fn create_def_file(&self) -> bool {
        self.create_def_file
    }

    pub fn set_create_def_file(&mut self, create: bool) {
        if self.create_def_file == create {
            return;
        }
        self.create_def_file = create;
        self.settings.modified = true;
    }
}
