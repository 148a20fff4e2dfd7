//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// buildline - resolve project build settings into compiler command lines
#[derive(Parser)]
#[command(name = "buildline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the resolved options of every target
    Resolve(ResolveArgs),

    /// Print the command line for one file or link step
    Command(CommandArgs),

    /// Print the output filename generated for a target type
    OutputName(OutputNameArgs),

    /// List configured compilers and whether their programs are on PATH
    Toolchain(ToolchainArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Path to buildline.toml (searched upwards from the current dir by default)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Build step whose template is used when `--template` is not given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Step {
    Compile,
    Resource,
    Link,
}

#[derive(Args)]
pub struct CommandArgs {
    /// Source file (relative to the project dir)
    #[arg(long)]
    pub file: String,

    /// Target title; without one the file is compiled on its own
    #[arg(long)]
    pub target: Option<String>,

    /// Object file (defaults to the file name with a `.o` extension)
    #[arg(long)]
    pub object: Option<String>,

    /// Flat object file name (defaults to the object)
    #[arg(long)]
    pub flat_object: Option<String>,

    /// Dependency / resource object file
    #[arg(long, default_value = "")]
    pub deps: String,

    /// Build step
    #[arg(long, value_enum, default_value_t = Step::Compile)]
    pub step: Step,

    /// Explicit command template, overriding the compiler's
    #[arg(long)]
    pub template: Option<String>,

    /// Path to buildline.toml
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Args)]
pub struct OutputNameArgs {
    /// Target type (executable, console-only, dynamic-lib, static-lib, native)
    #[arg(long = "type")]
    pub target_type: String,

    /// Base file name, optionally with a directory
    #[arg(long)]
    pub name: String,

    /// Prefix policy (default, none)
    #[arg(long, default_value = "default")]
    pub prefix: String,

    /// Extension policy (default, none)
    #[arg(long, default_value = "default")]
    pub extension: String,

    /// Compiler id (defaults to the configured default compiler)
    #[arg(long)]
    pub compiler: Option<String>,
}

#[derive(Args)]
pub struct ToolchainArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
