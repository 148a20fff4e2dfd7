//! `buildline resolve` command

use anyhow::{bail, Result};
use serde::Serialize;

use crate::cli::ResolveArgs;
use buildline::builder::ResolvedTarget;
use buildline::core::{TargetId, TargetType};

use super::{generator, try_load};

#[derive(Serialize)]
struct ResolveOutput<'a> {
    project: &'a str,
    base_path: String,
    targets: Vec<TargetOutput<'a>>,
    script_report: Option<&'a str>,
}

#[derive(Serialize)]
struct TargetOutput<'a> {
    id: TargetId,
    title: &'a str,
    #[serde(rename = "type")]
    target_type: TargetType,
    compiler: &'a str,
    resolved: Option<&'a ResolvedTarget>,
    compiler_search_dirs: &'a [String],
    linker_search_dirs: &'a [String],
}

pub fn execute(args: ResolveArgs) -> Result<()> {
    let Some(mut session) = try_load(args.manifest)? else {
        bail!(
            "could not find `buildline.toml` in the current directory or any parent\n\
             help: pass --manifest <PATH>"
        );
    };

    let base_path = session.project.base_path();
    let mut gen = generator(&session.config, std::path::Path::new(&base_path));
    gen.init(Some(&mut session.project))?;

    let project = &session.project;
    let targets: Vec<TargetOutput<'_>> = project
        .targets()
        .iter()
        .map(|t| TargetOutput {
            id: t.id(),
            title: t.title(),
            target_type: t.target_type(),
            compiler: t.compiler_id(),
            resolved: gen.resolved(Some(t.id())),
            compiler_search_dirs: gen.compiler_search_dirs(Some(t.id())),
            linker_search_dirs: gen.linker_search_dirs(Some(t.id())),
        })
        .collect();

    let output = ResolveOutput {
        project: project.title(),
        base_path,
        targets,
        script_report: gen.last_script_report(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Project `{}` ({})", output.project, output.base_path);
    for target in &output.targets {
        println!();
        println!(
            "Target `{}` [{}, {}]",
            target.title, target.target_type, target.compiler
        );
        let Some(r) = target.resolved else {
            continue;
        };
        let rows = [
            ("output", &r.output),
            ("static output", &r.static_output),
            ("def output", &r.def_output),
            ("includes", &r.includes),
            ("res includes", &r.res_includes),
            ("lib dirs", &r.lib_dirs),
            ("options", &r.compiler_flags),
            ("link options", &r.linker_flags),
            ("libs", &r.link_libs),
            ("res options", &r.res_compiler_flags),
        ];
        for (label, value) in rows {
            if !value.trim().is_empty() {
                println!("  {:<14} {}", format!("{}:", label), value.trim_end());
            }
        }
        if !target.compiler_search_dirs.is_empty() {
            println!(
                "  {:<14} {}",
                "search dirs:",
                target.compiler_search_dirs.join(" ")
            );
        }
        if !target.linker_search_dirs.is_empty() {
            println!(
                "  {:<14} {}",
                "lib search:",
                target.linker_search_dirs.join(" ")
            );
        }
    }

    Ok(())
}
