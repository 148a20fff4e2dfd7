//! Test fixtures for common test scenarios.

use crate::core::project::{Project, ProjectFile};
use crate::core::target::OptionList;

/// Project file path used by [`demo_project`].
pub const DEMO_PROJECT_FILE: &str = "/work/demo/buildline.toml";

/// A small GCC project at `/work/demo`.
///
/// Project: include dir `include`, lib dir `lib`, flag `-Wall`, lib `m`.
/// Target `Debug`: include dir `debug/include`, lib dir `/opt/lib`, flag
/// `-g`, lib `pthread`. Target `Release`: no options of its own. Files live
/// under `src/` and `src/util/`.
pub fn demo_project() -> Project {
    let mut project = Project::new("demo", DEMO_PROJECT_FILE);
    project.settings.set_compiler_id("gcc");
    project.settings.add_to_list(OptionList::IncludeDirs, "include");
    project.settings.add_to_list(OptionList::LibDirs, "lib");
    project.settings.add_to_list(OptionList::CompilerOptions, "-Wall");
    project.settings.add_to_list(OptionList::LinkLibs, "m");

    let debug = project.add_target("Debug");
    debug
        .settings
        .add_to_list(OptionList::IncludeDirs, "debug/include");
    debug.settings.add_to_list(OptionList::LibDirs, "/opt/lib");
    debug.settings.add_to_list(OptionList::CompilerOptions, "-g");
    debug.settings.add_to_list(OptionList::LinkLibs, "pthread");

    project.add_target("Release");

    project.add_file(ProjectFile::new("src/main.c"));
    project.add_file(ProjectFile::new("src/util/str.c"));
    project.set_modified(false);
    project
}

/// Manifest text describing an executable and a static library.
pub fn demo_manifest() -> &'static str {
    r#"[project]
title = "demo"
compiler = "gcc"
include_dirs = ["include"]
compiler_options = ["-Wall"]
link_libs = ["m"]

[[targets]]
title = "app"
type = "console"
output = "bin/app"
compiler_options = ["-g"]

[targets.relations]
compiler_options = "prepend"

[[targets]]
title = "core"
type = "static-lib"
output = "lib/core"

[[files]]
path = "src/main.c"

[[files]]
path = "src/core.cpp"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_project_shape() {
        let p = demo_project();
        assert_eq!(p.targets().len(), 2);
        assert_eq!(p.targets()[1].compiler_id(), "gcc");
        assert!(!p.is_modified());
        assert_eq!(p.common_top_level_path(), "/work/demo/src");
    }

    #[test]
    fn test_demo_manifest_parses() {
        use crate::core::compiler::CompilerRegistry;
        use crate::core::manifest::Manifest;
        use crate::core::target::TargetType;

        let registry = CompilerRegistry::with_builtins();
        let p = Manifest::parse(demo_manifest())
            .unwrap()
            .into_project(DEMO_PROJECT_FILE, &registry)
            .unwrap();
        assert_eq!(p.targets().len(), 2);
        assert_eq!(p.targets()[0].target_type(), TargetType::ConsoleOnly);
        assert_eq!(p.files().len(), 2);
    }
}
