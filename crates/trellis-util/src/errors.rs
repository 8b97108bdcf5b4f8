use miette::Diagnostic;
use thiserror::Error;

/// Coarse error type for callers that only need to report a failure.
///
/// The resolver crate keeps its own detailed errors and converts into this
/// one at the boundary.
#[derive(Debug, Error, Diagnostic)]
pub enum TrellisError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(trellis::io))]
    Io(#[from] std::io::Error),

    /// Invalid or malformed resolver configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(trellis::config),
        help("Check trellis.toml for syntax errors and out-of-range values")
    )]
    Config { message: String },

    /// Malformed coordinate, version, range or constraint string.
    #[error("Parse error: {message}")]
    #[diagnostic(code(trellis::parse))]
    Parse { message: String },

    /// Dependency collection or graph transformation failed.
    #[error("Dependency resolution failed: {message}")]
    #[diagnostic(code(trellis::resolution))]
    Resolution { message: String },
}

pub type TrellisResult<T> = miette::Result<T>;
