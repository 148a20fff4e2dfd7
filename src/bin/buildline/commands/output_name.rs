//! `buildline output-name` command

use anyhow::{anyhow, Result};

use crate::cli::OutputNameArgs;
use buildline::core::target::{FilenamePolicy, TargetType};
use buildline::core::BuildSettings;

use super::{config_for, cwd};

pub fn execute(args: OutputNameArgs) -> Result<()> {
    let target_type: TargetType = args.target_type.parse().map_err(|e: String| anyhow!(e))?;
    let prefix: FilenamePolicy = args.prefix.parse().map_err(|e: String| anyhow!(e))?;
    let extension: FilenamePolicy = args.extension.parse().map_err(|e: String| anyhow!(e))?;

    let registry = config_for(&cwd()?).registry();
    let compiler = match args.compiler {
        Some(ref id) => Some(
            registry
                .get(id)
                .ok_or_else(|| anyhow!("unknown compiler `{}`", id))?,
        ),
        None => registry.default_compiler(),
    };

    let mut settings = BuildSettings::new("output-name");
    settings.set_filename_policy(prefix, extension);
    settings.set_target_type(target_type, compiler);

    println!("{}", settings.generate_target_filename(&args.name, compiler));
    Ok(())
}
