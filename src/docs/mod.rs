/// Markdown and JSON rendering of documentation projections.
pub mod formatter;

/// Resolves, loads and projects a gem's documentation registry.
pub mod projector;

/// Serializable projection types.
pub mod types;

pub use formatter::{format_docs_as_json, format_docs_as_markdown};
pub use projector::RegistryProjector;
pub use types::*;
