//! Generator error types.

use thiserror::Error;

/// Errors that abort command-line resolution.
///
/// Everything else (missing target compiler, unsupported platform, failed
/// scripts or backtick commands) degrades to empty values instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("default compiler is invalid: no default compiler is registered")]
    NoDefaultCompiler,
}
