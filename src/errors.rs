use thiserror::Error;

/// Errors that can occur while looking up gems or their documentation.
///
/// The `Display` text of each variant is what a tool caller sees, so the
/// not-found variants are phrased as complete sentences.
#[derive(Error, Debug)]
pub enum GemdocsError {
    #[error("Gem '{name}' not found")]
    PackageNotFound { name: String },

    #[error("Object '{path}' not found in {gem}")]
    ObjectNotFound { path: String, gem: String },

    #[error("package manager error: {message} (command: {command})")]
    PackageManager { message: String, command: String },

    #[error("documentation generator error: {message}")]
    Generator { message: String },

    #[error("documentation server error: {message}")]
    DocServer { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("Missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("browser error: {message}")]
    Browser { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] ureq::Error),
}

/// Convenience alias for results using `GemdocsError`.
pub type Result<T> = std::result::Result<T, GemdocsError>;
