//! Shared utilities

pub mod config;
pub mod process;
pub mod strings;

pub use config::Config;
