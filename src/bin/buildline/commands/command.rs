//! `buildline command` command

use std::path::Path;

use anyhow::{anyhow, Result};

use crate::cli::{CommandArgs, Step};
use buildline::builder::CommandLineInput;
use buildline::core::{BuildTarget, Compiler, FileBinding};
use buildline::util::strings::FileName;

use super::{config_for, cwd, generator, try_load};

pub fn execute(args: CommandArgs) -> Result<()> {
    let session = try_load(args.manifest.clone())?;

    let line = match session {
        Some(mut session) => {
            let base_path = session.project.base_path();
            let mut gen = generator(&session.config, Path::new(&base_path));
            gen.init(Some(&mut session.project))?;

            let project = &session.project;
            let target = match args.target {
                Some(ref title) => Some(project.target_by_title(title).ok_or_else(|| {
                    anyhow!(
                        "target `{}` not found\n\
                         help: Run `buildline resolve` to see available targets",
                        title
                    )
                })?),
                None => None,
            };

            let compiler_id = target
                .map(|t| t.compiler_id().to_string())
                .or_else(|| gen.registry().default_id().map(str::to_string))
                .unwrap_or_default();
            let compiler = gen.registry().get(&compiler_id).cloned();

            let binding = project.file(&args.file).and_then(|f| f.binding);
            let input = input_for(&args, target, binding);
            let template = template_for(&args, compiler.as_ref(), target, binding);

            match template {
                Some(template) => gen.generate_command_line(&template, target, &input)?,
                None => String::new(),
            }
        }
        None => {
            if let Some(ref title) = args.target {
                return Err(anyhow!(
                    "target `{}` requires a project, but no `buildline.toml` was found",
                    title
                ));
            }
            let dir = cwd()?;
            let config = config_for(&dir);
            let mut gen = generator(&config, &dir);
            gen.init(None)?;

            let compiler = gen.registry().default_compiler().cloned();
            let input = input_for(&args, None, None);
            match template_for(&args, compiler.as_ref(), None, None) {
                Some(template) => gen.generate_command_line(&template, None, &input)?,
                None => String::new(),
            }
        }
    };

    println!("{}", line);
    Ok(())
}

fn input_for(
    args: &CommandArgs,
    target: Option<&BuildTarget>,
    binding: Option<FileBinding>,
) -> CommandLineInput {
    let object = args.object.clone().unwrap_or_else(|| {
        let mut fname = FileName::parse(&args.file);
        fname.set_ext("o");
        match target {
            Some(t) => format!("{}/{}", t.settings.object_output(), fname.full_path()),
            None => fname.full_path(),
        }
    });
    let flat_object = args.flat_object.clone().unwrap_or_else(|| object.clone());

    let mut input = CommandLineInput::new(args.file.as_str())
        .object(object)
        .flat_object(flat_object)
        .deps(args.deps.as_str());
    if let Some(binding) = binding {
        input = input.binding(binding);
    }
    input
}

/// The explicit template, or the compiler's template for the step.
fn template_for(
    args: &CommandArgs,
    compiler: Option<&Compiler>,
    target: Option<&BuildTarget>,
    binding: Option<FileBinding>,
) -> Option<String> {
    if let Some(ref template) = args.template {
        return Some(template.clone());
    }
    let templates = &compiler?.templates;

    let step = match args.step {
        Step::Compile if binding == Some(FileBinding::Windres) => Step::Resource,
        Step::Compile if FileBinding::from_extension(&args.file) == Some(FileBinding::Windres) => {
            Step::Resource
        }
        step => step,
    };

    match step {
        Step::Compile => Some(templates.compile_object.clone()),
        Step::Resource => Some(templates.compile_resource.clone()),
        Step::Link => match target {
            Some(t) => templates.link_template(t.target_type()).map(str::to_string),
            None => Some(templates.link_console_executable.clone()),
        },
    }
}
