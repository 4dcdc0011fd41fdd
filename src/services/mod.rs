//! Service layer for the watcher.
//!
//! This module contains the source adapters and the notifier:
//! - HTML page keyword matching (`PageSource`)
//! - Record search API querying (`ProjectSource`)
//! - Mail digest composition and submission (`EmailNotifier`)

mod mailer;
mod page;
mod projects;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Finding;

pub use mailer::{
    DisabledNotifier, Digest, EmailNotifier, MailCredentials, Notifier, PASSWORD_VAR,
    RECIPIENT_VAR, SENDER_VAR, build_message, compose_digest,
};
pub use page::{PageSource, extract_matches};
pub use projects::{ApiRecord, ApiSearch, ProjectSource, RecordSearch, SearchResponse};

/// A keyword whose query failed while the others went on.
#[derive(Debug)]
pub struct KeywordFailure {
    pub keyword: String,
    pub error: AppError,
}

/// Everything a source produced during one run.
#[derive(Debug, Default)]
pub struct Harvest {
    pub findings: Vec<Finding>,
    pub failures: Vec<KeywordFailure>,
}

impl Harvest {
    pub fn new(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            failures: Vec::new(),
        }
    }

    /// True when some keywords could not be queried.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// A remote source of keyword matches.
///
/// `Err` means the source failed as a whole and produced nothing this run.
#[async_trait]
pub trait Source: Send + Sync {
    async fn collect(&self) -> Result<Harvest>;
}
