//! Command-line generation.
//!
//! This module resolves project/target settings into compiler, linker and
//! resource compiler command lines.

pub mod backticks;
pub mod errors;
pub mod generator;
pub mod macros;
pub mod merge;
pub mod scripts;

pub use backticks::BacktickCache;
pub use errors::GeneratorError;
pub use generator::{
    CommandLineInput, CompilerCommandGenerator, GeneratorOptions, ResolvedTarget,
};
pub use macros::{MacroExpander, MacroManager, MacroScope};
pub use scripts::{Notifier, ScriptHost, TomlScriptHost};
