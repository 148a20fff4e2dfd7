//! Compiler command-line generation.
//!
//! [`CompilerCommandGenerator::init`] walks a project once per build and
//! resolves, for every target, the strings that end up on compiler, linker
//! and resource compiler command lines: output names, search dir switches,
//! flags and link libraries. Compiler defaults are appended after the
//! project/target values, which are ordered by the target's option
//! relations. Pre-build scripts may tweak settings during resolution; their
//! changes are rolled back when resolution ends.
//!
//! [`CompilerCommandGenerator::generate_command_line`] then fills a command
//! template (e.g. `$compiler $options $includes -c $file -o $object`) for
//! one file from the resolved values.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use serde::Serialize;
use tracing::{debug, warn};

use crate::builder::backticks::{search_dirs_from_backticks, BacktickCache};
use crate::builder::errors::GeneratorError;
use crate::builder::macros::{MacroExpander, MacroManager, MacroScope};
use crate::builder::merge::ordered_options;
use crate::builder::scripts::{
    Notifier, ScriptFailures, ScriptHost, StderrNotifier, TomlScriptHost, BUILD_OPTIONS_ENTRY,
};
use crate::core::compiler::{Compiler, CompilerRegistry};
use crate::core::platform::Platform;
use crate::core::project::{FileBinding, Project};
use crate::core::target::{
    BuildSettings, BuildTarget, FilenamePolicy, OptionCategory, TargetId, TargetType,
};
use crate::util::process::{ShellExecutor, SystemShell};
use crate::util::strings::{
    fix_path_separators, is_absolute, quote_if_needed, string_from_array, unix_filename,
    unquote_if_needed, FileName,
};

/// Switches that change how include paths are assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Add the compiled file's own directory to its include path
    pub include_file_cwd: bool,
    /// Add the project's common top-level directory to the include path
    pub include_prj_cwd: bool,
    /// Batch build: report script failures to the log, not the notifier
    pub batch: bool,
}

/// Resolved command-line fragments for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub output: String,
    pub static_output: String,
    pub def_output: String,
    pub includes: String,
    pub lib_dirs: String,
    pub res_includes: String,
    pub compiler_flags: String,
    pub linker_flags: String,
    pub link_libs: String,
    pub res_compiler_flags: String,
}

/// The per-file half of a command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLineInput {
    pub file: String,
    /// Compiler program binding; guessed from the extension when `None`
    pub binding: Option<FileBinding>,
    pub object: String,
    pub flat_object: String,
    pub deps: String,
}

impl CommandLineInput {
    pub fn new(file: impl Into<String>) -> Self {
        CommandLineInput {
            file: file.into(),
            ..CommandLineInput::default()
        }
    }

    pub fn binding(mut self, binding: FileBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.object = object.into();
        self
    }

    pub fn flat_object(mut self, flat_object: impl Into<String>) -> Self {
        self.flat_object = flat_object.into();
        self
    }

    pub fn deps(mut self, deps: impl Into<String>) -> Self {
        self.deps = deps.into();
        self
    }
}

/// Restores a settings block to its captured state when dropped.
struct SettingsGuard<'a> {
    settings: &'a mut BuildSettings,
    backup: BuildSettings,
}

impl<'a> SettingsGuard<'a> {
    fn new(settings: &'a mut BuildSettings) -> Self {
        let backup = settings.clone();
        SettingsGuard { settings, backup }
    }
}

impl Deref for SettingsGuard<'_> {
    type Target = BuildSettings;

    fn deref(&self) -> &BuildSettings {
        self.settings
    }
}

impl DerefMut for SettingsGuard<'_> {
    fn deref_mut(&mut self) -> &mut BuildSettings {
        self.settings
    }
}

impl Drop for SettingsGuard<'_> {
    fn drop(&mut self) {
        *self.settings = std::mem::take(&mut self.backup);
    }
}

/// Project and target settings visible while one target is resolved.
struct Layers<'a> {
    project: &'a BuildSettings,
    target: &'a BuildSettings,
    base_path: &'a str,
    scope: MacroScope<'a>,
}

type Key = Option<TargetId>;

/// Resolves project settings into compiler, linker and resource compiler
/// command lines.
pub struct CompilerCommandGenerator {
    registry: CompilerRegistry,
    options: GeneratorOptions,
    shell: Box<dyn ShellExecutor>,
    macros: Box<dyn MacroExpander>,
    scripts: Box<dyn ScriptHost>,
    notifier: Box<dyn Notifier>,
    backticks: BacktickCache,
    resolved: HashMap<Key, ResolvedTarget>,
    compiler_search_dirs: HashMap<Key, Vec<String>>,
    linker_search_dirs: HashMap<Key, Vec<String>>,
    prj_inc_path: String,
    project_title: Option<String>,
    project_dir: Option<String>,
    failures: ScriptFailures,
    last_report: Option<String>,
}

impl CompilerCommandGenerator {
    /// A generator using the system shell, environment macros, TOML
    /// scripts and stderr notifications.
    pub fn new(registry: CompilerRegistry) -> Self {
        CompilerCommandGenerator {
            registry,
            options: GeneratorOptions::default(),
            shell: Box::new(SystemShell::new()),
            macros: Box::new(MacroManager::new()),
            scripts: Box::new(TomlScriptHost::new()),
            notifier: Box::new(StderrNotifier),
            backticks: BacktickCache::new(),
            resolved: HashMap::new(),
            compiler_search_dirs: HashMap::new(),
            linker_search_dirs: HashMap::new(),
            prj_inc_path: String::new(),
            project_title: None,
            project_dir: None,
            failures: ScriptFailures::default(),
            last_report: None,
        }
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_shell(mut self, shell: Box<dyn ShellExecutor>) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_macros(mut self, macros: Box<dyn MacroExpander>) -> Self {
        self.macros = macros;
        self
    }

    pub fn with_scripts(mut self, scripts: Box<dyn ScriptHost>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn registry(&self) -> &CompilerRegistry {
        &self.registry
    }

    pub fn options(&self) -> GeneratorOptions {
        self.options
    }

    /// Resolve every target of `project`, or only the compiler defaults
    /// when there is no project.
    ///
    /// Fails only when no default compiler is registered. Targets whose
    /// compiler is unknown, that only run commands or that do not build on
    /// this platform get empty entries.
    pub fn init(&mut self, project: Option<&mut Project>) -> Result<(), GeneratorError> {
        self.resolved.clear();
        self.compiler_search_dirs.clear();
        self.linker_search_dirs.clear();
        self.prj_inc_path.clear();
        self.project_title = None;
        self.project_dir = None;
        self.failures.clear();
        self.last_report = None;

        let default = self
            .registry
            .default_compiler()
            .cloned()
            .ok_or(GeneratorError::NoDefaultCompiler)?;

        let Some(project) = project else {
            let entry = self.resolve_target(&default, None, None);
            self.resolved.insert(None, entry);
            return Ok(());
        };

        let mut prj_inc = project.common_top_level_path();
        if prj_inc.ends_with('\\') {
            prj_inc.pop();
        }
        if !prj_inc.is_empty() {
            self.prj_inc_path = format!(
                "{}{}",
                default.switches.include_dirs,
                quote_if_needed(&prj_inc)
            );
        }

        let title = project.title().to_string();
        let base_path = project.base_path();
        self.project_title = Some(title.clone());
        self.project_dir = Some(base_path.clone());

        let (project_settings, targets) = project.split_mut();
        let mut project_settings = SettingsGuard::new(project_settings);
        self.run_build_scripts(&mut *project_settings, &title, &base_path, false);

        for target in targets.iter_mut() {
            let id = target.id();
            let compiler = self.registry.get(target.compiler_id()).cloned();
            let compiler = match compiler {
                Some(c)
                    if target.target_type() != TargetType::CommandsOnly
                        && target.supports_current_platform() =>
                {
                    c
                }
                _ => {
                    debug!("skipping target `{}`", target.title());
                    self.resolved.insert(Some(id), ResolvedTarget::default());
                    self.compiler_search_dirs.insert(Some(id), Vec::new());
                    self.linker_search_dirs.insert(Some(id), Vec::new());
                    continue;
                }
            };

            let mut target_settings = SettingsGuard::new(&mut target.settings);
            self.run_build_scripts(&mut *target_settings, &title, &base_path, true);

            let layers = Layers {
                project: &*project_settings,
                target: &*target_settings,
                base_path: &base_path,
                scope: MacroScope {
                    project_title: Some(&title),
                    project_dir: Some(&base_path),
                    target: Some(&*target_settings),
                },
            };
            let entry = self.resolve_target(&compiler, Some(&layers), Some(id));
            self.resolved.insert(Some(id), entry);
        }

        drop(project_settings);

        if let Some(msg) = self.failures.report() {
            if self.options.batch {
                warn!("{}", msg.trim_end());
            } else {
                self.notifier.error("Error", &msg);
            }
            self.last_report = Some(msg);
        }

        Ok(())
    }

    /// Resolved values for a target (`None` for the no-target defaults).
    pub fn resolved(&self, target: Option<TargetId>) -> Option<&ResolvedTarget> {
        self.resolved.get(&target)
    }

    /// Directories the compiler searches for `target`; empty if unknown.
    pub fn compiler_search_dirs(&self, target: Option<TargetId>) -> &[String] {
        self.compiler_search_dirs
            .get(&target)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Directories the linker searches for `target`; empty if unknown.
    pub fn linker_search_dirs(&self, target: Option<TargetId>) -> &[String] {
        self.linker_search_dirs
            .get(&target)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn script_failures(&self) -> &ScriptFailures {
        &self.failures
    }

    /// The batched script failure report of the last `init`, if any.
    pub fn last_script_report(&self) -> Option<&str> {
        self.last_report.as_deref()
    }

    pub fn backtick_cache(&self) -> &BacktickCache {
        &self.backticks
    }

    fn run_build_scripts(
        &mut self,
        settings: &mut BuildSettings,
        project_title: &str,
        base_path: &str,
        is_target: bool,
    ) {
        let paths: Vec<String> = {
            let scope = MacroScope {
                project_title: Some(project_title),
                project_dir: Some(base_path),
                target: if is_target { Some(&*settings) } else { None },
            };
            settings
                .build_scripts()
                .iter()
                .map(|script| {
                    let path = self.macros.expand(script, &scope);
                    if is_absolute(&path) {
                        path
                    } else {
                        format!("{}/{}", base_path, path)
                    }
                })
                .collect()
        };

        for path in paths {
            if self.failures.has_failed(&path) {
                continue;
            }
            if let Err(e) = self
                .scripts
                .run_build_script(&path, BUILD_OPTIONS_ENTRY, settings)
            {
                debug!("{}", e);
                self.failures.record(&path, &e);
            }
        }
    }

    fn resolve_target(
        &mut self,
        compiler: &Compiler,
        layers: Option<&Layers<'_>>,
        key: Key,
    ) -> ResolvedTarget {
        let (output, static_output, def_output) = match layers {
            Some(l) => self.setup_output_filenames(compiler, l),
            None => Default::default(),
        };
        let includes = self.setup_include_dirs(compiler, layers, key);
        let lib_dirs = self.setup_lib_dirs(compiler, layers, key);
        let res_includes = self.setup_resource_include_dirs(compiler, layers);
        let compiler_flags = self.setup_compiler_options(compiler, layers, key);
        let linker_flags = self.setup_linker_options(compiler, layers, key);
        let link_libs = self.setup_link_libraries(compiler, layers);
        let res_compiler_flags = self.setup_resource_compiler_options(compiler, layers);

        ResolvedTarget {
            output,
            static_output,
            def_output,
            includes,
            lib_dirs,
            res_includes,
            compiler_flags,
            linker_flags,
            link_libs,
            res_compiler_flags,
        }
    }

    fn scope<'a>(layers: Option<&'a Layers<'a>>) -> MacroScope<'a> {
        layers.map(|l| l.scope).unwrap_or_default()
    }

    /// `switch<dir> ` for every dir, macro-expanded, quoted and path-fixed.
    fn prefixed_dirs(
        &self,
        compiler: &Compiler,
        dirs: &[String],
        switch: &str,
        scope: &MacroScope<'_>,
    ) -> String {
        let mut out = String::new();
        for dir in dirs {
            let dir = self.macros.expand(dir, scope);
            let dir = fix_path_separators(
                &quote_if_needed(&dir),
                compiler.switches.force_fwd_slashes,
            );
            out.push_str(switch);
            out.push_str(&dir);
            out.push(' ');
        }
        out
    }

    fn fix_quoted(compiler: &Compiler, s: &str) -> String {
        fix_path_separators(&quote_if_needed(s), compiler.switches.force_fwd_slashes)
    }

    fn setup_output_filenames(
        &self,
        compiler: &Compiler,
        layers: &Layers<'_>,
    ) -> (String, String, String) {
        let target = layers.target;
        let raw = target.output_filename(Some(compiler));
        let output = Self::fix_quoted(compiler, &raw);

        // expand first so a macro that yields a directory is not mistaken
        // for part of the file name
        let expanded = self.macros.expand(&raw, &layers.scope);
        let mut fname = FileName::parse(&expanded);

        let (prefix_policy, ext_policy) = target.filename_policy();
        let is_dynamic = target.target_type() == TargetType::DynamicLib;
        let lib_prefix = &compiler.switches.lib_prefix;
        if (prefix_policy == FilenamePolicy::PlatformDefault || is_dynamic)
            && !fname.name.starts_with(lib_prefix.as_str())
        {
            fname.set_name(format!("{}{}", lib_prefix, fname.name));
        }
        if ext_policy == FilenamePolicy::PlatformDefault || is_dynamic {
            fname.set_ext(compiler.switches.lib_extension.as_str());
        }
        let static_output = Self::fix_quoted(compiler, &unix_filename(&fname.full_path()));

        fname.set_ext("def");
        let def_output = Self::fix_quoted(compiler, &unix_filename(&fname.full_path()));

        (output, static_output, def_output)
    }

    fn setup_include_dirs(
        &mut self,
        compiler: &Compiler,
        layers: Option<&Layers<'_>>,
        key: Key,
    ) -> String {
        let mut result = String::new();
        let scope = Self::scope(layers);
        let switch = compiler.switches.include_dirs.as_str();

        if let Some(l) = layers {
            let relation = l.target.option_relation(OptionCategory::IncludeDirs);
            let mut search_dirs: Vec<String> = ordered_options(
                relation,
                &l.project.include_dirs().to_vec(),
                &l.target.include_dirs().to_vec(),
            )
            .iter()
            .map(|d| self.macros.expand(d, &scope))
            .collect();
            if self.options.include_prj_cwd {
                search_dirs.push(l.base_path.to_string());
            }
            if self.options.include_file_cwd {
                search_dirs.push(".".into());
            }
            self.compiler_search_dirs
                .entry(key)
                .or_default()
                .extend(search_dirs);

            let tstr = self.prefixed_dirs(compiler, l.target.include_dirs(), switch, &scope);
            let pstr = self.prefixed_dirs(compiler, l.project.include_dirs(), switch, &scope);
            result.push_str(&ordered_options(relation, &pstr, &tstr));
        }

        result.push_str(&self.prefixed_dirs(compiler, &compiler.include_dirs, switch, &scope));
        result
    }

    fn setup_lib_dirs(
        &mut self,
        compiler: &Compiler,
        layers: Option<&Layers<'_>>,
        key: Key,
    ) -> String {
        let mut result = String::new();
        let scope = Self::scope(layers);
        let switch = compiler.switches.lib_dirs.as_str();

        if let Some(l) = layers {
            let relation = l.target.option_relation(OptionCategory::LibDirs);
            let search_dirs: Vec<String> = ordered_options(
                relation,
                &l.project.lib_dirs().to_vec(),
                &l.target.lib_dirs().to_vec(),
            )
            .iter()
            .map(|d| make_absolute(l.base_path, &self.macros.expand(d, &scope)))
            .collect();
            self.linker_search_dirs
                .entry(key)
                .or_default()
                .extend(search_dirs);

            let tstr = self.prefixed_dirs(compiler, l.target.lib_dirs(), switch, &scope);
            let pstr = self.prefixed_dirs(compiler, l.project.lib_dirs(), switch, &scope);
            result = ordered_options(relation, &pstr, &tstr);
        }

        result.push_str(&self.prefixed_dirs(compiler, &compiler.lib_dirs, switch, &scope));
        result
    }

    fn setup_resource_include_dirs(
        &self,
        compiler: &Compiler,
        layers: Option<&Layers<'_>>,
    ) -> String {
        let mut result = String::new();
        let scope = Self::scope(layers);
        let switch = compiler.switches.include_dirs.as_str();

        if let Some(l) = layers {
            let relation = l.target.option_relation(OptionCategory::ResourceDirs);
            let tstr =
                self.prefixed_dirs(compiler, l.target.resource_include_dirs(), switch, &scope);
            let pstr =
                self.prefixed_dirs(compiler, l.project.resource_include_dirs(), switch, &scope);
            result = ordered_options(relation, &pstr, &tstr);
        }

        result.push_str(&self.prefixed_dirs(
            compiler,
            &compiler.resource_include_dirs,
            switch,
            &scope,
        ));
        result
    }

    /// Append backtick-discovered dirs to the search lists of `key`.
    fn search_dirs_from_output(&mut self, compiler: &Compiler, key: Key, output: &str) {
        if output.is_empty() {
            return;
        }
        let inc = search_dirs_from_backticks(output, &compiler.switches.include_dirs);
        self.compiler_search_dirs.entry(key).or_default().extend(inc);
        let lib = search_dirs_from_backticks(output, &compiler.switches.lib_dirs);
        self.linker_search_dirs.entry(key).or_default().extend(lib);
    }

    fn setup_compiler_options(
        &mut self,
        compiler: &Compiler,
        layers: Option<&Layers<'_>>,
        key: Key,
    ) -> String {
        let mut result = String::new();
        if let Some(l) = layers {
            let tstr = string_from_array(l.target.compiler_options(), " ") + " ";
            let pstr = string_from_array(l.project.compiler_options(), " ") + " ";
            result = ordered_options(
                l.target.option_relation(OptionCategory::CompilerOptions),
                &pstr,
                &tstr,
            );
        }
        result.push_str(&string_from_array(&compiler.compiler_options, " "));
        result.push(' ');

        let expanded = self.backticks.expand(&mut result, self.shell.as_mut());
        self.search_dirs_from_output(compiler, key, &expanded);
        result
    }

    fn setup_linker_options(
        &mut self,
        compiler: &Compiler,
        layers: Option<&Layers<'_>>,
        key: Key,
    ) -> String {
        let mut result = String::new();
        if let Some(l) = layers {
            let tstr = string_from_array(l.target.linker_options(), " ");
            let pstr = string_from_array(l.project.linker_options(), " ");
            result = ordered_options(
                l.target.option_relation(OptionCategory::LinkerOptions),
                &pstr,
                &tstr,
            );
        }
        result.push_str(&string_from_array(&compiler.linker_options, " "));

        let expanded = self.backticks.expand(&mut result, self.shell.as_mut());
        self.search_dirs_from_output(compiler, key, &expanded);
        result
    }

    fn setup_link_libraries(&self, compiler: &Compiler, layers: Option<&Layers<'_>>) -> String {
        let fixup_all = |libs: &[String]| {
            let mut out = String::new();
            for lib in libs {
                out.push_str(&fixup_link_library(compiler, lib));
                out.push(' ');
            }
            out
        };

        let mut result = String::new();
        if let Some(l) = layers {
            let tstr = fixup_all(l.target.link_libs());
            let pstr = fixup_all(l.project.link_libs());
            result = ordered_options(
                l.target.option_relation(OptionCategory::LinkerOptions),
                &pstr,
                &tstr,
            );
        }
        result.push_str(&fixup_all(&compiler.link_libs));
        result
    }

    fn setup_resource_compiler_options(
        &mut self,
        compiler: &Compiler,
        layers: Option<&Layers<'_>>,
    ) -> String {
        let mut result = String::new();
        if let Some(l) = layers {
            let tstr = string_from_array(l.target.resource_compiler_options(), " ");
            let pstr = string_from_array(l.project.resource_compiler_options(), " ");
            result = ordered_options(
                l.target.option_relation(OptionCategory::ResourceDirs),
                &pstr,
                &tstr,
            );
        }
        result.push_str(&string_from_array(&compiler.resource_compiler_options, " "));

        self.backticks.expand(&mut result, self.shell.as_mut());
        result
    }

    /// Fill `template` for one file.
    ///
    /// Returns an empty string when the step must be skipped: the target
    /// does not build on this platform, its compiler is unknown, or the
    /// template names a program the compiler does not define.
    pub fn generate_command_line(
        &self,
        template: &str,
        target: Option<&BuildTarget>,
        input: &CommandLineInput,
    ) -> Result<String, GeneratorError> {
        if let Some(t) = target {
            if !t.supports_current_platform() {
                return Ok(String::new());
            }
        }

        let compiler = match target {
            Some(t) => match self.registry.get(t.compiler_id()) {
                Some(c) => c,
                None => {
                    debug!(
                        "GenerateCommandLine: unknown compiler `{}` (file={})",
                        t.compiler_id(),
                        input.file
                    );
                    return Ok(String::new());
                }
            },
            None => self
                .registry
                .default_compiler()
                .ok_or(GeneratorError::NoDefaultCompiler)?,
        };

        let programs = &compiler.programs;
        let compiler_str = match input.binding {
            Some(FileBinding::Cc) => programs.c.as_str(),
            Some(FileBinding::Cpp) => programs.cpp.as_str(),
            Some(FileBinding::Windres) => programs.windres.as_str(),
            None => {
                if FileName::parse(&input.file).ext.eq_ignore_ascii_case("c") {
                    programs.c.as_str()
                } else {
                    programs.cpp.as_str()
                }
            }
        };

        if (compiler_str.is_empty() && template.contains("$compiler"))
            || (programs.ld.is_empty() && template.contains("$linker"))
            || (programs.lib.is_empty() && template.contains("$lib_linker"))
            || (programs.windres.is_empty() && template.contains("$rescomp"))
        {
            debug!(
                "GenerateCommandLine: no executable found! (file={})",
                input.file
            );
            return Ok(String::new());
        }

        let fwd = compiler.switches.force_fwd_slashes;
        let fix = |s: &str| fix_path_separators(s, fwd);
        let compiler_str = fix(compiler_str);

        let mut file_inc = String::new();
        if self.options.include_file_cwd {
            let dir = FileName::parse(unquote_if_needed(&input.file)).dir;
            if !dir.is_empty() {
                file_inc = format!("{}{}", compiler.switches.include_dirs, quote_if_needed(&dir));
            }
        }
        if self.options.include_prj_cwd {
            file_inc.push(' ');
            file_inc.push_str(&self.prj_inc_path);
        }
        let file_inc = fix(&file_inc);

        let file = fix(&input.file);
        let file_parts = FileName::parse(&file);
        let deps = fix(&input.deps);
        let object = fix(&input.object);
        let flat_object = fix(&input.flat_object);

        let empty = ResolvedTarget::default();
        let entry = self.resolved.get(&target.map(|t| t.id())).unwrap_or(&empty);

        let mut cmd = template.to_string();
        let mut replace = |token: &str, value: &str| {
            if cmd.contains(token) {
                cmd = cmd.replace(token, value);
            }
        };

        replace("$compiler", &compiler_str);
        replace("$linker", &programs.ld);
        replace("$lib_linker", &programs.lib);
        replace("$rescomp", &programs.windres);
        replace("$options", &entry.compiler_flags);
        replace("$link_options", &entry.linker_flags);
        replace("$includes", &format!("{}{}", entry.includes, file_inc));
        replace("$res_includes", &format!("{}{}", entry.res_includes, file_inc));
        replace("$res_options", &entry.res_compiler_flags);
        replace("$libdirs", &entry.lib_dirs);
        replace("$libs", &entry.link_libs);
        replace("$file_basename", &file_parts.name);
        replace("$file_name", &file_parts.name);
        replace("$file_dir", &file_parts.dir);
        replace("$file_ext", &file_parts.ext);
        replace("$file", &file);
        replace("$dep_object", &deps);
        // before $object, which is a prefix of it
        match target {
            Some(t) => replace("$objects_output_dir", &fix(&t.settings.object_output())),
            // no target means no object dir; the macro pass only knows $(NAME)
            None => replace("$objects_output_dir", ""),
        }
        replace("$object", &object);
        replace("$resource_output", &object);

        let exe_output = match target {
            Some(_) => entry.output.clone(),
            None => {
                let unquoted = if input.object.starts_with('"') {
                    input.object.replace('"', "")
                } else {
                    input.object.clone()
                };
                let mut fname = FileName::parse(&unquoted);
                fname.set_ext(Platform::current().executable_ext());
                fix(&quote_if_needed(&fname.full_path()))
            }
        };
        let exe_parts = FileName::parse(unquote_if_needed(&exe_output));
        replace("$exe_output", &exe_output);
        replace("$exe_name", &exe_parts.name);
        replace("$exe_dir", &exe_parts.dir);
        replace("$exe_ext", &exe_parts.ext);

        replace("$link_resobjects", &deps);
        replace("$link_objects", &object);
        replace("$link_flat_objects", &flat_object);
        replace("$+link_objects", &object);
        replace("$-link_objects", &object);
        replace("$-+link_objects", &object);
        replace("$+-link_objects", &object);

        if let Some(t) = target {
            let tt = t.target_type();
            if tt.is_library() {
                if tt == TargetType::StaticLib || t.create_static_lib() {
                    replace("$static_output", &entry.static_output);
                } else {
                    replace("-Wl,--out-implib=$static_output", "");
                    replace("$static_output", "");
                }
                if t.create_def_file() {
                    replace("$def_output", &entry.def_output);
                } else {
                    replace("-Wl,--output-def=$def_output", "");
                    replace("$def_output", "");
                }
            }
        }

        let scope = MacroScope {
            project_title: self.project_title.as_deref(),
            project_dir: self.project_dir.as_deref(),
            target: target.map(|t| &t.settings),
        };
        Ok(self.macros.expand(&cmd, &scope))
    }
}

/// Turn a link library entry into its command-line form.
///
/// Bare names get the compiler's link switch, with the `lib` prefix and
/// extension stripped or added as the linker expects. Entries containing a
/// path separator are passed through.
pub fn fixup_link_library(compiler: &Compiler, lib: &str) -> String {
    if lib.is_empty() {
        return String::new();
    }

    let switches = &compiler.switches;
    let mut result = fix_path_separators(&quote_if_needed(lib), switches.force_fwd_slashes);
    if result.contains('/') || result.contains('\\') {
        return result;
    }

    let prefix = switches.lib_prefix.as_str();
    let dot_ext = format!(".{}", switches.lib_extension);

    let mut had_prefix = false;
    if !switches.linker_needs_lib_prefix && !prefix.is_empty() && result.starts_with(prefix) {
        result.drain(..prefix.len());
        had_prefix = true;
    }

    let has_ext = result.len() > switches.lib_extension.len() && result.ends_with(&dot_ext);
    if !switches.linker_needs_lib_extension && has_ext {
        if had_prefix {
            result.truncate(result.len() - dot_ext.len());
        }
    } else if switches.linker_needs_lib_extension
        && !switches.lib_extension.is_empty()
        && !has_ext
    {
        result.push_str(&dot_ext);
    }

    format!("{}{}", switches.link_libs, result)
}

/// Join a relative dir onto `base`; absolute dirs are returned as-is.
fn make_absolute(base: &str, dir: &str) -> String {
    if is_absolute(dir) {
        return dir.to_string();
    }
    let rel = dir.strip_prefix("./").unwrap_or(dir);
    if rel.is_empty() || rel == "." {
        base.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches(['/', '\\']), rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::{OptionList, OptionsRelation};
    use crate::test_support::{demo_project, MockScriptHost, MockShell, RecordingNotifier};

    fn generator(shell: &MockShell) -> CompilerCommandGenerator {
        let macros = MacroManager::new().without_env();
        CompilerCommandGenerator::new(CompilerRegistry::with_builtins())
            .with_shell(Box::new(shell.clone()))
            .with_macros(Box::new(macros))
            .with_scripts(Box::new(MockScriptHost::new()))
    }

    fn gcc_c() -> String {
        Compiler::gcc().programs.c
    }

    #[test]
    fn test_init_without_default_compiler_fails() {
        let mut gen = CompilerCommandGenerator::new(CompilerRegistry::new());
        assert_eq!(gen.init(None), Err(GeneratorError::NoDefaultCompiler));

        let input = CommandLineInput::new("a.c").object("a.o");
        assert_eq!(
            gen.generate_command_line("$compiler", None, &input),
            Err(GeneratorError::NoDefaultCompiler)
        );
    }

    #[test]
    fn test_single_file_command_uses_c_compiler() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        gen.init(None).unwrap();

        let input = CommandLineInput::new("a.c").object("a.o");
        let cmd = gen
            .generate_command_line("$compiler -c $file -o $object", None, &input)
            .unwrap();
        assert_eq!(cmd, format!("{} -c a.c -o a.o", gcc_c()));

        let input = CommandLineInput::new("a.cpp").object("a.o");
        let cmd = gen.generate_command_line("$compiler", None, &input).unwrap();
        assert_eq!(cmd, Compiler::gcc().programs.cpp);
    }

    #[test]
    fn test_binding_overrides_extension() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        gen.init(None).unwrap();

        let input = CommandLineInput::new("a.c").binding(FileBinding::Cpp);
        let cmd = gen.generate_command_line("$compiler", None, &input).unwrap();
        assert_eq!(cmd, Compiler::gcc().programs.cpp);
    }

    #[test]
    fn test_missing_program_yields_empty_command() {
        let shell = MockShell::new();
        let mut registry = CompilerRegistry::with_builtins();
        let mut gcc = Compiler::gcc();
        gcc.programs.windres = String::new();
        registry.register(gcc);
        let mut gen = CompilerCommandGenerator::new(registry)
            .with_shell(Box::new(shell.clone()))
            .with_scripts(Box::new(MockScriptHost::new()));
        gen.init(None).unwrap();

        let input = CommandLineInput::new("res.rc").object("res.o");
        assert_eq!(
            gen.generate_command_line("$rescomp -i $file", None, &input)
                .unwrap(),
            ""
        );
        // not referenced, so not required
        assert_ne!(
            gen.generate_command_line("$compiler -c $file", None, &input)
                .unwrap(),
            ""
        );
    }

    #[test]
    fn test_single_file_exe_output() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        gen.init(None).unwrap();

        let input = CommandLineInput::new("hello.c").object("out dir/hello.o");
        let cmd = gen
            .generate_command_line("$exe_output|$exe_name|$objects_output_dir|", None, &input)
            .unwrap();
        let exe = crate::core::platform::with_dot_ext(
            "out dir/hello",
            Platform::current().executable_ext(),
        );
        assert_eq!(cmd, format!("\"{}\"|hello||", exe));
    }

    #[test]
    fn test_every_target_gets_an_entry() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        let mut project = Project::new("cmds", "/work/cmds/buildline.toml");
        for title in ["a", "b", "c"] {
            project
                .add_target(title)
                .settings
                .set_target_type(TargetType::CommandsOnly, None);
        }

        gen.init(Some(&mut project)).unwrap();
        for target in project.targets() {
            let entry = gen.resolved(Some(target.id())).unwrap();
            assert_eq!(entry, &ResolvedTarget::default());
            assert!(gen.compiler_search_dirs(Some(target.id())).is_empty());
        }
    }

    #[test]
    fn test_unknown_compiler_and_platform_are_skipped() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        let mut project = demo_project();
        let ids: Vec<TargetId> = project.targets().iter().map(|t| t.id()).collect();
        project.targets_mut()[0].settings.set_compiler_id("nope");
        project.targets_mut()[1].set_platforms(vec![]);

        gen.init(Some(&mut project)).unwrap();
        assert_eq!(gen.resolved(Some(ids[0])), Some(&ResolvedTarget::default()));
        assert_eq!(gen.resolved(Some(ids[1])), Some(&ResolvedTarget::default()));

        let input = CommandLineInput::new("src/main.c").object("main.o");
        let t1 = project.target(ids[1]).unwrap();
        assert_eq!(
            gen.generate_command_line("$compiler -c $file", Some(t1), &input)
                .unwrap(),
            ""
        );
        let t0 = project.target(ids[0]).unwrap();
        assert_eq!(
            gen.generate_command_line("$compiler -c $file", Some(t0), &input)
                .unwrap(),
            ""
        );
    }

    #[test]
    fn test_option_relations_order_flags() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        let mut project = demo_project();
        let id = project.targets()[0].id();
        project.targets_mut()[0]
            .settings
            .set_option_relation(OptionCategory::CompilerOptions, OptionsRelation::PrependToParent);
        project.targets_mut()[0]
            .settings
            .set_option_relation(OptionCategory::IncludeDirs, OptionsRelation::UseTargetOnly);

        gen.init(Some(&mut project)).unwrap();
        let entry = gen.resolved(Some(id)).unwrap();
        assert_eq!(entry.compiler_flags, "-g  -Wall   ");
        assert_eq!(entry.includes, "-Idebug/include ");
        assert_eq!(
            gen.compiler_search_dirs(Some(id)),
            ["debug/include".to_string()]
        );
    }

    #[test]
    fn test_lib_dirs_and_link_libs() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        let mut project = demo_project();
        let id = project.targets()[0].id();

        gen.init(Some(&mut project)).unwrap();
        let entry = gen.resolved(Some(id)).unwrap();
        assert_eq!(entry.lib_dirs, "-Llib -L/opt/lib ");
        assert_eq!(entry.link_libs, "-lm -lpthread ");
        assert_eq!(
            gen.linker_search_dirs(Some(id)),
            ["/work/demo/lib".to_string(), "/opt/lib".to_string()]
        );
    }

    #[test]
    fn test_compile_command_for_target() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        let mut project = demo_project();
        let id = project.targets()[0].id();

        gen.init(Some(&mut project)).unwrap();
        let target = project.target(id).unwrap();
        let input = CommandLineInput::new("src/main.c").object("obj/main.o");
        let cmd = gen
            .generate_command_line(
                "$compiler $options $includes -c $file -o $object",
                Some(target),
                &input,
            )
            .unwrap();
        assert_eq!(
            cmd,
            format!(
                "{} -Wall  -g    -Iinclude -Idebug/include  -c src/main.c -o obj/main.o",
                gcc_c()
            )
        );
    }

    #[test]
    fn test_backticks_feed_search_dirs_and_run_once() {
        let shell = MockShell::new();
        shell.expect("pkg-config --cflags gtk", &["-I/usr/include/gtk", "-pthread"]);
        shell.expect("pkg-config --libs gtk", &["-L/usr/lib/gtk", "-lgtk"]);
        let mut gen = generator(&shell);

        let mut project = demo_project();
        project.settings.add_to_list(OptionList::CompilerOptions, "`pkg-config --cflags gtk`");
        project.settings.add_to_list(OptionList::LinkerOptions, "`pkg-config --libs gtk`");
        let id = project.targets()[0].id();

        gen.init(Some(&mut project)).unwrap();
        let entry = gen.resolved(Some(id)).unwrap();
        assert!(entry.compiler_flags.contains("-I/usr/include/gtk -pthread"));
        assert!(!entry.compiler_flags.contains('`'));
        assert!(gen
            .compiler_search_dirs(Some(id))
            .contains(&"/usr/include/gtk".to_string()));
        assert!(gen
            .linker_search_dirs(Some(id))
            .contains(&"/usr/lib/gtk".to_string()));

        // both targets and a second init reuse the cache
        gen.init(Some(&mut project)).unwrap();
        assert_eq!(shell.call_count(), 2);
        assert_eq!(gen.backtick_cache().len(), 2);
    }

    #[test]
    fn test_import_lib_disabled_removes_flag() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        let mut project = Project::new("demo", "/work/demo/buildline.toml");
        project.settings.set_compiler_id("gcc");
        let gcc = Compiler::gcc();
        let target = project.add_target("dll");
        target
            .settings
            .set_target_type(TargetType::DynamicLib, Some(&gcc));
        target.settings.set_output_filename("bin/foo", Some(&gcc));
        target.set_create_static_lib(false);
        let id = target.id();

        gen.init(Some(&mut project)).unwrap();
        let target = project.target(id).unwrap();
        let input = CommandLineInput::new("").object("a.o");
        let cmd = gen
            .generate_command_line(&gcc.templates.link_dynamic, Some(target), &input)
            .unwrap();

        assert!(!cmd.contains("$static_output"));
        assert!(!cmd.contains("--out-implib"));
        assert!(cmd.contains("-Wl,--output-def=bin/libfoo.def"));
    }

    #[test]
    fn test_static_lib_outputs() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        let mut project = Project::new("demo", "/work/demo/buildline.toml");
        project.settings.set_compiler_id("gcc");
        let gcc = Compiler::gcc();
        let target = project.add_target("lib");
        target
            .settings
            .set_target_type(TargetType::StaticLib, Some(&gcc));
        target.settings.set_output_filename("lib/demo", Some(&gcc));
        let id = target.id();

        gen.init(Some(&mut project)).unwrap();
        let entry = gen.resolved(Some(id)).unwrap();
        assert_eq!(entry.output, "lib/libdemo.a");
        assert_eq!(entry.static_output, "lib/libdemo.a");
        assert_eq!(entry.def_output, "lib/libdemo.def");

        let target = project.target(id).unwrap();
        let input = CommandLineInput::new("").object("a.o b.o");
        let cmd = gen
            .generate_command_line(&gcc.templates.link_static, Some(target), &input)
            .unwrap();
        assert_eq!(cmd, format!("{} -r -s lib/libdemo.a a.o b.o", gcc.programs.lib));
    }

    #[test]
    fn test_scripts_apply_during_init_and_are_rolled_back() {
        let shell = MockShell::new();
        let scripts = MockScriptHost::new();
        scripts.on_run("/work/demo/opts.toml", |settings| {
            settings.add_to_list(OptionList::CompilerOptions, "-DSCRIPTED");
        });
        let mut gen = generator(&shell).with_scripts(Box::new(scripts.clone()));

        let mut project = demo_project();
        project.targets_mut()[0]
            .settings
            .add_to_list(OptionList::BuildScripts, "opts.toml");
        project.set_modified(false);
        let id = project.targets()[0].id();
        let before = project.targets()[0].settings.clone();

        gen.init(Some(&mut project)).unwrap();

        assert!(gen
            .resolved(Some(id))
            .unwrap()
            .compiler_flags
            .contains("-DSCRIPTED"));
        assert_eq!(project.targets()[0].settings, before);
        assert!(!project.is_modified());
        assert_eq!(scripts.runs(), vec!["/work/demo/opts.toml".to_string()]);
    }

    #[test]
    fn test_script_failures_are_batched() {
        let shell = MockShell::new();
        let scripts = MockScriptHost::new();
        scripts.fail_missing("/work/demo/missing.toml");
        scripts.fail_entry("/work/demo/noentry.toml");

        let mut gen = generator(&shell)
            .with_scripts(Box::new(scripts.clone()))
            .with_options(GeneratorOptions {
                batch: true,
                ..GeneratorOptions::default()
            });

        let mut project = demo_project();
        project
            .settings
            .add_to_list(OptionList::BuildScripts, "missing.toml");
        for target in project.targets_mut() {
            target
                .settings
                .add_to_list(OptionList::BuildScripts, "missing.toml");
            target
                .settings
                .add_to_list(OptionList::BuildScripts, "noentry.toml");
        }

        gen.init(Some(&mut project)).unwrap();

        assert_eq!(
            gen.script_failures().not_loaded(),
            ["/work/demo/missing.toml".to_string()]
        );
        assert_eq!(
            gen.script_failures().missing_entry(),
            ["/work/demo/noentry.toml".to_string()]
        );
        // a script that failed once is not retried
        assert_eq!(scripts.runs().len(), 2);
        assert!(gen.last_script_report().unwrap().contains("missing.toml"));

        gen.init(Some(&mut project)).unwrap();
        assert_eq!(scripts.runs().len(), 4);
    }

    #[test]
    fn test_script_failures_go_to_notifier_outside_batch() {
        let shell = MockShell::new();
        let scripts = MockScriptHost::new();
        scripts.fail_entry("/work/demo/noentry.toml");
        let notifier = RecordingNotifier::new();

        let mut gen = generator(&shell)
            .with_scripts(Box::new(scripts))
            .with_notifier(Box::new(notifier.clone()));

        let mut project = demo_project();
        project
            .settings
            .add_to_list(OptionList::BuildScripts, "noentry.toml");

        gen.init(Some(&mut project)).unwrap();
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "Error");
        assert!(messages[0].1.contains("/work/demo/noentry.toml"));
        assert!(messages[0].1.contains("SetBuildOptions is missing"));
    }

    #[test]
    fn test_init_is_repeatable() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        let mut project = demo_project();
        let ids: Vec<TargetId> = project.targets().iter().map(|t| t.id()).collect();

        gen.init(Some(&mut project)).unwrap();
        let first: Vec<ResolvedTarget> = ids
            .iter()
            .map(|id| gen.resolved(Some(*id)).cloned().unwrap())
            .collect();
        let dirs = gen.compiler_search_dirs(Some(ids[0])).to_vec();

        gen.init(Some(&mut project)).unwrap();
        for (id, entry) in ids.iter().zip(&first) {
            assert_eq!(gen.resolved(Some(*id)), Some(entry));
        }
        assert_eq!(gen.compiler_search_dirs(Some(ids[0])), dirs.as_slice());
        assert!(gen.resolved(None).is_none());
    }

    #[test]
    fn test_include_cwd_options() {
        let shell = MockShell::new();
        let mut gen = generator(&shell).with_options(GeneratorOptions {
            include_file_cwd: true,
            include_prj_cwd: true,
            batch: false,
        });
        let mut project = demo_project();
        let id = project.targets()[0].id();

        gen.init(Some(&mut project)).unwrap();
        let search = gen.compiler_search_dirs(Some(id));
        assert!(search.contains(&"/work/demo".to_string()));
        assert!(search.contains(&".".to_string()));

        let target = project.target(id).unwrap();
        let input = CommandLineInput::new("src/util/str.c");
        let cmd = gen
            .generate_command_line("$includes", Some(target), &input)
            .unwrap();
        assert!(cmd.ends_with("-Isrc/util -I/work/demo/src"), "{}", cmd);
    }

    #[test]
    fn test_objects_output_dir_before_object() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        let mut project = demo_project();
        let id = project.targets()[0].id();
        project.targets_mut()[0]
            .settings
            .set_object_output("obj/Debug");

        gen.init(Some(&mut project)).unwrap();
        let target = project.target(id).unwrap();
        let input = CommandLineInput::new("a.c").object("obj/Debug/a.o");
        let cmd = gen
            .generate_command_line("-MF $objects_output_dir/a.d $object", Some(target), &input)
            .unwrap();
        assert_eq!(cmd, "-MF obj/Debug/a.d obj/Debug/a.o");
    }

    #[test]
    fn test_force_fwd_slashes() {
        let shell = MockShell::new();
        let mut registry = CompilerRegistry::with_builtins();
        let mut gcc = Compiler::gcc();
        gcc.switches.force_fwd_slashes = true;
        registry.register(gcc);
        let mut gen = CompilerCommandGenerator::new(registry)
            .with_shell(Box::new(shell.clone()))
            .with_scripts(Box::new(MockScriptHost::new()));
        gen.init(None).unwrap();

        let input = CommandLineInput::new(r"src\my\ file.c").object(r"obj\a.o");
        let cmd = gen
            .generate_command_line("$file $object", None, &input)
            .unwrap();
        assert_eq!(cmd, r"src/my\ file.c obj/a.o");

        let input = CommandLineInput::new(r"src\sub\a.c");
        let cmd = gen
            .generate_command_line("$file|$file_dir|$file_name|$file_ext", None, &input)
            .unwrap();
        assert_eq!(cmd, "src/sub/a.c|src/sub|a|c");
    }

    #[test]
    fn test_fixup_link_library() {
        let gcc = Compiler::gcc();
        assert_eq!(fixup_link_library(&gcc, "m"), "-lm");
        assert_eq!(fixup_link_library(&gcc, "libfoo.a"), "-lfoo");
        assert_eq!(fixup_link_library(&gcc, "foo.a"), "-lfoo.a");
        assert_eq!(fixup_link_library(&gcc, "/opt/lib/libx.a"), "/opt/lib/libx.a");
        assert_eq!(fixup_link_library(&gcc, ""), "");

        let msvc = Compiler::msvc();
        assert_eq!(fixup_link_library(&msvc, "user32"), "user32.lib");
        assert_eq!(fixup_link_library(&msvc, "user32.lib"), "user32.lib");
    }

    #[test]
    fn test_make_absolute() {
        assert_eq!(make_absolute("/work", "lib"), "/work/lib");
        assert_eq!(make_absolute("/work/", "./lib"), "/work/lib");
        assert_eq!(make_absolute("/work", "."), "/work");
        assert_eq!(make_absolute("/work", "/opt/lib"), "/opt/lib");
    }

    #[test]
    fn test_res_options_token() {
        let shell = MockShell::new();
        let mut gen = generator(&shell);
        let mut project = demo_project();
        let id = project.targets()[0].id();
        project
            .settings
            .add_to_list(OptionList::ResourceCompilerOptions, "--codepage=65001");

        gen.init(Some(&mut project)).unwrap();
        let target = project.target(id).unwrap();
        let input = CommandLineInput::new("r.rc");
        let cmd = gen
            .generate_command_line("windres $res_options", Some(target), &input)
            .unwrap();
        assert_eq!(cmd, "windres --codepage=65001 ");
    }
}
