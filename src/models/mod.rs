// src/models/mod.rs

//! Domain models for the watcher.

mod config;
mod finding;

// Re-export all public types
pub use config::{
    Config, HttpConfig, MailConfig, PageConfig, ProjectsConfig, RECORD_ID_PLACEHOLDER, Retention,
};
pub use finding::{Finding, IdentityKey, PageMatch, ProjectRecord, SeenSet};
