//! Core data structures for buildline.
//!
//! This module contains the project model the generator reads:
//! - Platforms and compilers
//! - Build settings shared by projects and targets
//! - Projects and their manifest

pub mod compiler;
pub mod manifest;
pub mod platform;
pub mod project;
pub mod target;

pub use compiler::{Compiler, CompilerRegistry};
pub use manifest::{find_manifest, Manifest, MANIFEST_NAME};
pub use platform::Platform;
pub use project::{FileBinding, Project, ProjectFile};
pub use target::{BuildSettings, BuildTarget, TargetId, TargetType};
