//! `buildline toolchain` command

use anyhow::Result;
use serde::Serialize;

use crate::cli::ToolchainArgs;
use buildline::core::Compiler;
use buildline::util::process::find_executable;

use super::{config_for, cwd};

#[derive(Serialize)]
struct ProgramStatus {
    role: &'static str,
    name: String,
    path: Option<String>,
}

#[derive(Serialize)]
struct CompilerStatus {
    id: String,
    name: String,
    default: bool,
    programs: Vec<ProgramStatus>,
}

fn programs(compiler: &Compiler) -> Vec<ProgramStatus> {
    let p = &compiler.programs;
    [
        ("c", &p.c),
        ("c++", &p.cpp),
        ("linker", &p.ld),
        ("librarian", &p.lib),
        ("resources", &p.windres),
        ("make", &p.make),
    ]
    .into_iter()
    .map(|(role, name)| ProgramStatus {
        role,
        name: name.clone(),
        path: if name.is_empty() {
            None
        } else {
            find_executable(name).map(|p| p.display().to_string())
        },
    })
    .collect()
}

pub fn execute(args: ToolchainArgs) -> Result<()> {
    let registry = config_for(&cwd()?).registry();
    let default_id = registry.default_id().map(str::to_string);

    let compilers: Vec<CompilerStatus> = registry
        .iter()
        .map(|c| CompilerStatus {
            id: c.id.clone(),
            name: c.name.clone(),
            default: default_id.as_deref() == Some(c.id.as_str()),
            programs: programs(c),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&compilers)?);
        return Ok(());
    }

    if registry.default_compiler().is_none() {
        tracing::warn!(
            "default compiler `{}` is not configured",
            default_id.as_deref().unwrap_or("")
        );
    }

    for compiler in &compilers {
        let marker = if compiler.default { " (default)" } else { "" };
        println!("{}: {}{}", compiler.id, compiler.name, marker);
        for program in &compiler.programs {
            if program.name.is_empty() {
                println!("  {:<10} -", program.role);
                continue;
            }
            match program.path {
                Some(ref path) => println!("  {:<10} {} ({})", program.role, program.name, path),
                None => println!("  {:<10} {} (not found)", program.role, program.name),
            }
        }
    }

    Ok(())
}
