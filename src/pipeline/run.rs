// src/pipeline/run.rs

//! One complete pass of a watch pipeline.
//!
//! load → collect → diff → notify (if anything is new) → persist.
//! Every step's failure is logged and recorded in the returned report; the
//! run itself never fails.

use chrono::Local;

use crate::models::{Finding, Retention};
use crate::pipeline::diff::calculate_delta;
use crate::services::{Notifier, Source, compose_digest};
use crate::storage::SeenStore;

/// Per-pipeline run settings.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Name used in the mail subject and logs
    pub name: String,
    /// First line of the mail body
    pub headline: String,
    pub retention: Retention,
    /// Fetch and diff only; no mail, no write
    pub dry_run: bool,
}

/// What happened to the notification step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    /// Nothing new to report
    NotNeeded,
    Sent,
    /// Dry run
    Skipped,
    Failed(String),
}

/// Outcome of one run.
#[derive(Debug)]
pub struct RunReport {
    /// Set when the source failed as a whole
    pub source_error: Option<String>,
    /// Keywords whose query failed, with the error message
    pub keyword_failures: Vec<(String, String)>,
    /// Findings collected, duplicates included
    pub found: usize,
    pub new_findings: Vec<Finding>,
    pub notification: NotificationStatus,
    pub persisted: bool,
}

impl RunReport {
    fn empty() -> Self {
        Self {
            source_error: None,
            keyword_failures: Vec::new(),
            found: 0,
            new_findings: Vec::new(),
            notification: NotificationStatus::NotNeeded,
            persisted: false,
        }
    }

    /// True when the source produced nothing because it failed outright.
    pub fn source_failed(&self) -> bool {
        self.source_error.is_some()
    }
}

/// Run one pipeline pass.
pub async fn run_pipeline(
    source: &dyn Source,
    store: &SeenStore,
    notifier: &dyn Notifier,
    options: &RunOptions,
) -> RunReport {
    let mut report = RunReport::empty();
    log::info!(
        "Starting {} watch - {}",
        options.name,
        Local::now().format("%Y-%m-%d %H:%M")
    );

    let previous = store.load().await;

    let harvest = match source.collect().await {
        Ok(harvest) => harvest,
        Err(e) => {
            // Nothing was observed; the Seen-Set stays as it is.
            log::error!("{} fetch failed: {}", options.name, e);
            report.source_error = Some(e.to_string());
            return report;
        }
    };
    report.found = harvest.findings.len();
    report.keyword_failures = harvest
        .failures
        .iter()
        .map(|f| (f.keyword.clone(), f.error.to_string()))
        .collect();

    let delta = calculate_delta(&harvest.findings, &previous);
    report.new_findings = delta.new_findings.clone();

    if delta.has_changes() {
        log::info!("New results found: {}", delta.new_findings.len());
        let digest = compose_digest(
            &options.name,
            &options.headline,
            &delta.new_findings,
            Local::now().naive_local(),
        );

        report.notification = if options.dry_run {
            log::info!("Dry run, not sending: {}\n{}", digest.subject, digest.body);
            NotificationStatus::Skipped
        } else {
            match notifier.send(&digest).await {
                Ok(()) => NotificationStatus::Sent,
                Err(e) => {
                    log::error!("Email notification failed: {}", e);
                    NotificationStatus::Failed(e.to_string())
                }
            }
        };
    } else {
        log::info!("No new results");
    }

    if options.dry_run {
        return report;
    }

    // Keys of failed keywords are unknown this run; replacing would forget them.
    let retention = if harvest.is_partial() && options.retention == Retention::Replace {
        log::warn!(
            "{} keyword(s) failed, keeping previous results alongside current ones",
            harvest.failures.len()
        );
        Retention::Accumulate
    } else {
        options.retention
    };

    let next = delta.next_state(&previous, retention);
    match store.save(&next).await {
        Ok(()) => {
            log::debug!("Saved {} keys to {}", next.len(), store.path().display());
            report.persisted = true;
        }
        Err(e) => log::error!("Failed to save results to {}: {}", store.path().display(), e),
    }

    report
}
