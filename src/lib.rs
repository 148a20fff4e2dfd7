//! buildline - build configuration resolver and command-line generator
//!
//! This crate merges compiler defaults, project settings and per-target
//! overrides into the exact command lines used to compile, link and
//! archive each target of a C/C++ project.

pub mod builder;
pub mod core;
pub mod util;

/// Test utilities and mocks for buildline unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides mock implementations for the shell, the
/// script host and the notifier, plus project fixtures.
#[cfg(test)]
pub mod test_support;

pub use builder::{CompilerCommandGenerator, GeneratorError};
pub use core::{BuildSettings, BuildTarget, Compiler, CompilerRegistry, Manifest, Project};
pub use util::config::Config;
