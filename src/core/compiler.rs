//! Compiler definitions and the registry that hands them out by id.
//!
//! A [`Compiler`] is read-only from the generator's point of view: it names
//! the toolchain programs, the switches used to spell include dirs, lib dirs
//! and link libraries, and its own default search dirs and options.

use serde::{Deserialize, Serialize};

use crate::core::target::TargetType;

/// Names of the toolchain programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerPrograms {
    /// C compiler (e.g., "gcc", "cl.exe")
    pub c: String,
    /// C++ compiler
    pub cpp: String,
    /// Linker for executables and dynamic libs
    pub ld: String,
    /// Librarian for static libs
    pub lib: String,
    /// Resource compiler
    pub windres: String,
    /// make program
    pub make: String,
}

impl Default for CompilerPrograms {
    fn default() -> Self {
        CompilerPrograms {
            c: "gcc".into(),
            cpp: "g++".into(),
            ld: "g++".into(),
            lib: "ar".into(),
            windres: String::new(),
            make: "make".into(),
        }
    }
}

/// Command-line spelling rules of a compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSwitches {
    /// Prefix for include dirs (e.g., "-I")
    pub include_dirs: String,
    /// Prefix for library dirs (e.g., "-L")
    pub lib_dirs: String,
    /// Prefix for link libraries (e.g., "-l")
    pub link_libs: String,
    /// Static library prefix (e.g., "lib")
    pub lib_prefix: String,
    /// Static library extension, without the dot (e.g., "a")
    pub lib_extension: String,
    /// Whether link libraries keep their `lib` prefix on the command line
    pub linker_needs_lib_prefix: bool,
    /// Whether link libraries keep their extension on the command line
    pub linker_needs_lib_extension: bool,
    /// Convert backslashes to forward slashes in every path
    pub force_fwd_slashes: bool,
}

impl Default for CompilerSwitches {
    fn default() -> Self {
        CompilerSwitches {
            include_dirs: "-I".into(),
            lib_dirs: "-L".into(),
            link_libs: "-l".into(),
            lib_prefix: "lib".into(),
            lib_extension: "a".into(),
            linker_needs_lib_prefix: false,
            linker_needs_lib_extension: false,
            force_fwd_slashes: false,
        }
    }
}

/// Macro templates for each build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTemplates {
    pub compile_object: String,
    pub compile_resource: String,
    pub link_executable: String,
    pub link_console_executable: String,
    pub link_dynamic: String,
    pub link_static: String,
    pub link_native: String,
}

impl Default for CommandTemplates {
    fn default() -> Self {
        CommandTemplates {
            compile_object: "$compiler $options $includes -c $file -o $object".into(),
            compile_resource: "$rescomp -i $file -J rc -o $resource_output -O coff $res_includes"
                .into(),
            link_executable:
                "$linker $libdirs -o $exe_output $link_objects $link_resobjects $link_options $libs"
                    .into(),
            link_console_executable:
                "$linker $libdirs -o $exe_output $link_objects $link_resobjects $link_options $libs"
                    .into(),
            link_dynamic: "$linker -shared -Wl,--output-def=$def_output -Wl,--out-implib=$static_output -Wl,--dll $libdirs $link_objects $link_resobjects -o $exe_output $link_options $libs".into(),
            link_static: "$lib_linker -r -s $static_output $link_objects".into(),
            link_native: "$linker -shared $libdirs $link_objects $link_resobjects -o $exe_output $link_options $libs".into(),
        }
    }
}

impl CommandTemplates {
    /// Link template for a target type; `None` for commands-only targets.
    pub fn link_template(&self, target_type: TargetType) -> Option<&str> {
        let template = match target_type {
            TargetType::Executable => &self.link_executable,
            TargetType::ConsoleOnly => &self.link_console_executable,
            TargetType::DynamicLib => &self.link_dynamic,
            TargetType::StaticLib => &self.link_static,
            TargetType::Native => &self.link_native,
            TargetType::CommandsOnly => return None,
        };
        Some(template.as_str())
    }
}

/// A configured compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compiler {
    /// Registry key (e.g., "gcc")
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub programs: CompilerPrograms,
    #[serde(default)]
    pub switches: CompilerSwitches,
    #[serde(default)]
    pub templates: CommandTemplates,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub lib_dirs: Vec<String>,
    #[serde(default)]
    pub resource_include_dirs: Vec<String>,
    #[serde(default)]
    pub compiler_options: Vec<String>,
    #[serde(default)]
    pub linker_options: Vec<String>,
    #[serde(default)]
    pub link_libs: Vec<String>,
    #[serde(default)]
    pub resource_compiler_options: Vec<String>,
}

impl Compiler {
    /// Create a compiler with GCC-style defaults.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Compiler {
            id: id.into(),
            name: name.into(),
            programs: CompilerPrograms::default(),
            switches: CompilerSwitches::default(),
            templates: CommandTemplates::default(),
            include_dirs: Vec::new(),
            lib_dirs: Vec::new(),
            resource_include_dirs: Vec::new(),
            compiler_options: Vec::new(),
            linker_options: Vec::new(),
            link_libs: Vec::new(),
            resource_compiler_options: Vec::new(),
        }
    }

    /// GNU GCC.
    pub fn gcc() -> Self {
        let mut c = Compiler::new("gcc", "GNU GCC Compiler");
        if cfg!(windows) {
            c.programs.c = "mingw32-gcc.exe".into();
            c.programs.cpp = "mingw32-g++.exe".into();
            c.programs.ld = "mingw32-g++.exe".into();
            c.programs.lib = "ar.exe".into();
            c.programs.windres = "windres.exe".into();
            c.programs.make = "mingw32-make.exe".into();
        }
        c
    }

    /// Microsoft Visual C++.
    pub fn msvc() -> Self {
        let mut c = Compiler::new("msvc", "Microsoft Visual C++");
        c.programs = CompilerPrograms {
            c: "cl.exe".into(),
            cpp: "cl.exe".into(),
            ld: "link.exe".into(),
            lib: "link.exe".into(),
            windres: "rc.exe".into(),
            make: "nmake.exe".into(),
        };
        c.switches = CompilerSwitches {
            include_dirs: "/I".into(),
            lib_dirs: "/LIBPATH:".into(),
            link_libs: String::new(),
            lib_prefix: String::new(),
            lib_extension: "lib".into(),
            linker_needs_lib_prefix: false,
            linker_needs_lib_extension: true,
            force_fwd_slashes: false,
        };
        c.templates = CommandTemplates {
            compile_object: "$compiler /nologo $options $includes /c $file /Fo$object".into(),
            compile_resource: "$rescomp $res_includes -fo$resource_output $file".into(),
            link_executable: "$linker /nologo /subsystem:windows $libdirs /out:$exe_output $libs $link_objects $link_resobjects $link_options".into(),
            link_console_executable: "$linker /nologo $libdirs /out:$exe_output $libs $link_objects $link_resobjects $link_options".into(),
            link_dynamic: "$linker /dll /nologo $libdirs /out:$exe_output $libs $link_objects $link_resobjects $link_options".into(),
            link_static: "$lib_linker /lib /nologo $libdirs /out:$static_output $libs $link_objects $link_resobjects $link_options".into(),
            link_native: "$linker /nologo /subsystem:native $libdirs /out:$exe_output $libs $link_objects $link_resobjects $link_options".into(),
        };
        c
    }
}

/// All known compilers plus the id of the default one.
#[derive(Debug, Clone, Default)]
pub struct CompilerRegistry {
    compilers: Vec<Compiler>,
    default_id: Option<String>,
}

impl CompilerRegistry {
    /// An empty registry with no default compiler.
    pub fn new() -> Self {
        CompilerRegistry {
            compilers: Vec::new(),
            default_id: None,
        }
    }

    /// Registry holding the built-in presets, GCC being the default.
    pub fn with_builtins() -> Self {
        let mut reg = CompilerRegistry::new();
        reg.register(Compiler::gcc());
        reg.register(Compiler::msvc());
        reg.default_id = Some("gcc".into());
        reg
    }

    /// Add a compiler, replacing any compiler with the same id.
    pub fn register(&mut self, compiler: Compiler) {
        match self.compilers.iter_mut().find(|c| c.id == compiler.id) {
            Some(existing) => *existing = compiler,
            None => self.compilers.push(compiler),
        }
    }

    /// Set the default compiler id. The id is not validated here.
    pub fn set_default(&mut self, id: impl Into<String>) {
        self.default_id = Some(id.into());
    }

    /// Look up a compiler by id.
    pub fn get(&self, id: &str) -> Option<&Compiler> {
        self.compilers.iter().find(|c| c.id == id)
    }

    /// The default compiler, if one is set and registered.
    pub fn default_compiler(&self) -> Option<&Compiler> {
        self.default_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn default_id(&self) -> Option<&str> {
        self.default_id.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Compiler> {
        self.compilers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let reg = CompilerRegistry::with_builtins();
        let gcc = reg.default_compiler().unwrap();
        assert_eq!(gcc.id, "gcc");
        assert_eq!(gcc.switches.include_dirs, "-I");
        assert_eq!(reg.get("msvc").unwrap().switches.lib_dirs, "/LIBPATH:");
        assert!(reg.get("nope").is_none());
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut reg = CompilerRegistry::with_builtins();
        let mut custom = Compiler::gcc();
        custom.programs.c = "gcc-13".into();
        reg.register(custom);

        assert_eq!(reg.iter().count(), 2);
        assert_eq!(reg.get("gcc").unwrap().programs.c, "gcc-13");
    }

    #[test]
    fn test_default_must_be_registered() {
        let mut reg = CompilerRegistry::new();
        assert!(reg.default_compiler().is_none());
        reg.set_default("clang");
        assert!(reg.default_compiler().is_none());
        reg.register(Compiler::new("clang", "Clang"));
        assert_eq!(reg.default_compiler().unwrap().id, "clang");
    }

    #[test]
    fn test_link_template_by_type() {
        let gcc = Compiler::gcc();
        assert_eq!(
            gcc.templates.link_template(TargetType::StaticLib),
            Some("$lib_linker -r -s $static_output $link_objects")
        );
        assert!(gcc
            .templates
            .link_template(TargetType::DynamicLib)
            .unwrap()
            .contains("-shared"));
        assert_eq!(gcc.templates.link_template(TargetType::CommandsOnly), None);
    }

    #[test]
    fn test_deserialize_partial_compiler() {
        let c: Compiler = toml::from_str(
            r#"
id = "clang"
name = "LLVM Clang"

[programs]
c = "clang"
cpp = "clang++"
ld = "clang++"
"#,
        )
        .unwrap();
        assert_eq!(c.programs.c, "clang");
        assert_eq!(c.programs.lib, "ar");
        assert_eq!(c.switches.lib_prefix, "lib");
    }
}
