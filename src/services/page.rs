// src/services/page.rs

//! HTML page keyword matcher.
//!
//! Fetches one page and reports every text node containing a keyword,
//! attributed to its first enclosing `<a>` element.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Finding, PageConfig, PageMatch};
use crate::services::{Harvest, Source};
use crate::utils::http::fetch_text;
use crate::utils::resolve_url;

/// Source watching a single HTML page.
pub struct PageSource {
    client: Client,
    url: Url,
    keywords: Vec<String>,
}

impl PageSource {
    /// Create a page source for the configured URL.
    pub fn new(client: Client, page: &PageConfig, keywords: Vec<String>) -> Result<Self> {
        Ok(Self {
            client,
            url: Url::parse(&page.url)?,
            keywords,
        })
    }
}

#[async_trait]
impl Source for PageSource {
    async fn collect(&self) -> Result<Harvest> {
        log::info!("Fetching {}", self.url);
        let html = fetch_text(self.client.get(self.url.clone()))
            .await
            .map_err(|e| AppError::fetch(self.url.as_str(), e))?;

        let findings = extract_matches(&html, &self.url, &self.keywords);
        log::info!("Found {} keyword matches on the page", findings.len());
        Ok(Harvest::new(findings))
    }
}

/// Extract keyword matches from an HTML document.
///
/// Keywords are processed in order and text nodes in document order, so a
/// node matching two keywords yields two findings. Matching is
/// case-insensitive. Matches without an enclosing link, or whose link has
/// no `href`, are dropped.
pub fn extract_matches(html: &str, base: &Url, keywords: &[String]) -> Vec<Finding> {
    let document = Html::parse_document(html);
    let mut findings = Vec::new();

    for keyword in keywords {
        let needle = keyword.to_lowercase();
        if needle.is_empty() {
            continue;
        }

        for node in document.tree.root().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let text = text.trim();
            if text.is_empty() || !text.to_lowercase().contains(&needle) {
                continue;
            }

            let Some(link) = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "a")
            else {
                log::debug!("Dropping match without link: {text}");
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };

            findings.push(Finding::Page(PageMatch {
                text: text.to_string(),
                url: resolve_url(base, href.trim()),
                keyword: keyword.clone(),
            }));
        }
    }

    findings
}
