//! Integration with the YARD documentation tool.
//!
//! YARD builds a queryable registry of a gem's classes, modules and methods,
//! and can serve rendered HTML docs from a background daemon. Both are
//! external processes; this module wraps them behind traits so the rest of
//! the crate can be exercised with fakes.

/// Documentation database generation and loading.
pub mod generator;

/// In-memory registry of code objects.
pub mod registry;

/// The `yard server` daemon lifecycle.
pub mod server;

pub use generator::{DocGenerator, YardCli};
pub use registry::{
    AttributeFacts, DocRegistry, ObjectFacts, ObjectKind, Scope, TagFacts, Visibility,
};
pub use server::{DocServer, ServeMode, ServerStatus, StartOutcome, YardProcess, YardServer};
