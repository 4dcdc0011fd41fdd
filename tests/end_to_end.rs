//! End-to-end runs against fake sources and a recording notifier.

use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;
use url::Url;
use veille::{
    error::Result,
    models::{Finding, PageMatch, Retention},
    pipeline::{NotificationStatus, RunOptions, run_pipeline},
    services::{Digest, Harvest, Notifier, Source, extract_matches},
    storage::SeenStore,
};

const STATE_FILE: &str = "previous_results.json";
const EXPECTED_STATE: &str = r#"[["IEL ENR signs contract","https://example.org/a","IEL ENR"]]"#;

struct StaticPage {
    html: &'static str,
    keywords: Vec<String>,
}

#[async_trait]
impl Source for StaticPage {
    async fn collect(&self) -> Result<Harvest> {
        let base = Url::parse("https://example.org/")?;
        Ok(Harvest::new(extract_matches(self.html, &base, &self.keywords)))
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<Digest>>,
}

#[async_trait]
impl Notifier for Outbox {
    async fn send(&self, digest: &Digest) -> Result<()> {
        self.sent.lock().unwrap().push(digest.clone());
        Ok(())
    }
}

fn source() -> StaticPage {
    StaticPage {
        html: r#"<html><body>
            <p>Avis sans lien IEL ENR</p>
            <a href="/a">IEL ENR signs contract</a>
        </body></html>"#,
        keywords: vec!["IEL ENR".to_string()],
    }
}

fn options(retention: Retention) -> RunOptions {
    RunOptions {
        name: "Test".into(),
        headline: "Nouveaux résultats :".into(),
        retention,
        dry_run: false,
    }
}

#[tokio::test]
async fn first_run_notifies_and_persists() {
    for retention in [Retention::Replace, Retention::Accumulate] {
        let tmp = TempDir::new().unwrap();
        let store = SeenStore::new(tmp.path(), STATE_FILE);
        let outbox = Outbox::default();

        let report = run_pipeline(&source(), &store, &outbox, &options(retention)).await;

        assert_eq!(
            report.new_findings,
            vec![Finding::Page(PageMatch {
                text: "IEL ENR signs contract".into(),
                url: "https://example.org/a".into(),
                keyword: "IEL ENR".into(),
            })]
        );
        assert_eq!(report.notification, NotificationStatus::Sent);

        let sent = outbox.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("Texte : IEL ENR signs contract"));
        assert!(sent[0].body.contains("URL : https://example.org/a"));

        let state = std::fs::read_to_string(tmp.path().join(STATE_FILE)).unwrap();
        assert_eq!(state, EXPECTED_STATE);
    }
}

#[tokio::test]
async fn known_result_is_not_renotified() {
    for retention in [Retention::Replace, Retention::Accumulate] {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(STATE_FILE), EXPECTED_STATE).unwrap();
        let store = SeenStore::new(tmp.path(), STATE_FILE);
        let outbox = Outbox::default();

        let report = run_pipeline(&source(), &store, &outbox, &options(retention)).await;

        assert!(report.new_findings.is_empty());
        assert_eq!(report.notification, NotificationStatus::NotNeeded);
        assert!(outbox.sent.lock().unwrap().is_empty());

        let state = std::fs::read_to_string(tmp.path().join(STATE_FILE)).unwrap();
        assert_eq!(state, EXPECTED_STATE);
    }
}
