//! Error handling for kiln.
//! Defines the error taxonomy and result alias used throughout the crate.

use thiserror::Error;

/// Custom error types for kiln operations.
///
/// Every failure that can abort a generation run is represented here, so the
/// caller can surface the exact kind together with the offending entry.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}.")]
    IoError(#[from] std::io::Error),

    /// An asset was requested that the source never listed.
    #[error("Asset '{path}' was not found in the template source.")]
    NotFound { path: String },

    /// A context lookup for a name that was never set.
    #[error("Variable '{name}' is not defined in the context.")]
    UndefinedVariable { name: String },

    /// A template expression references a name absent from the context.
    #[error("Template references unresolved variable '{name}'.")]
    UnresolvedVariable { name: String },

    #[error("Template syntax error: {message}")]
    TemplateSyntaxError { message: String },

    /// Any other failure raised by the rendering engine.
    #[error("Failed to render. Original error: {0}")]
    RenderError(String),

    #[error("Cannot set '{name}': the context is frozen.")]
    FrozenContext { name: String },

    #[error("Path '{path}' escapes the output root '{root}'.")]
    PathTraversal { path: String, root: String },

    #[error("Failed to write '{path}'. Original error: {source}")]
    WriteFailure { path: String, source: std::io::Error },

    #[error("Cannot write '{path}': target already exists.")]
    Collision { path: String },

    #[error("Failed to parse ignore patterns. Original error: {0}")]
    GlobSetParseError(#[from] globset::Error),

    #[error("Failed to walk the template directory. Original error: {0}")]
    WalkDirError(#[from] walkdir::Error),

    #[error("Invalid replacement token. Original error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Configuration error: {0}.")]
    ConfigError(String),

    #[error("Failed to parse manifest '{path}'. Original error: {message}")]
    ConfigParseError { path: String, message: String },

    #[error("Cannot proceed: template directory '{template_dir}' does not exist.")]
    TemplateDoesNotExistsError { template_dir: String },
}

impl Error {
    /// Short, stable name of the failure kind, used in user-facing reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::IoError(_) => "IoError",
            Error::NotFound { .. } => "NotFound",
            Error::UndefinedVariable { .. } => "UndefinedVariable",
            Error::UnresolvedVariable { .. } => "UnresolvedVariable",
            Error::TemplateSyntaxError { .. } => "TemplateSyntaxError",
            Error::RenderError(_) => "RenderError",
            Error::FrozenContext { .. } => "FrozenContext",
            Error::PathTraversal { .. } => "PathTraversal",
            Error::WriteFailure { .. } => "WriteFailure",
            Error::Collision { .. } => "Collision",
            Error::GlobSetParseError(_) => "GlobSetParseError",
            Error::WalkDirError(_) => "WalkDirError",
            Error::RegexError(_) => "RegexError",
            Error::ConfigError(_) => "ConfigError",
            Error::ConfigParseError { .. } => "ConfigParseError",
            Error::TemplateDoesNotExistsError { .. } => "TemplateDoesNotExists",
        }
    }
}

/// Convenience type alias for Results with kiln's Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The error to report
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: impl std::fmt::Display) -> ! {
    eprintln!("{err}");
    std::process::exit(1);
}
