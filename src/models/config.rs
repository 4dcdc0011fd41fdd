//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Placeholder substituted with the record id in `detail_url_template`.
pub const RECORD_ID_PLACEHOLDER: &str = "{id}";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Keywords searched by both pipelines, in query order
    #[serde(default = "defaults::keywords")]
    pub keywords: Vec<String>,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Mail submission settings
    #[serde(default)]
    pub mail: MailConfig,

    /// HTML page pipeline
    #[serde(default)]
    pub page: PageConfig,

    /// Record search API pipeline
    #[serde(default)]
    pub projects: ProjectsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(AppError::validation("No keywords defined"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.mail.smtp_host.trim().is_empty() {
            return Err(AppError::validation("mail.smtp_host is empty"));
        }
        if self.mail.timeout_secs == 0 {
            return Err(AppError::validation("mail.timeout_secs must be > 0"));
        }
        Url::parse(&self.page.url)
            .map_err(|e| AppError::validation(format!("page.url: {e}")))?;
        Url::parse(&self.projects.api_base)
            .map_err(|e| AppError::validation(format!("projects.api_base: {e}")))?;
        if self.projects.dataset.trim().is_empty() {
            return Err(AppError::validation("projects.dataset is empty"));
        }
        if self.projects.rows == 0 {
            return Err(AppError::validation("projects.rows must be > 0"));
        }
        if !self
            .projects
            .detail_url_template
            .contains(RECORD_ID_PLACEHOLDER)
        {
            return Err(AppError::validation(format!(
                "projects.detail_url_template must contain {RECORD_ID_PLACEHOLDER}"
            )));
        }
        if self.page.state_file == self.projects.state_file {
            return Err(AppError::validation(
                "page.state_file and projects.state_file must differ",
            ));
        }
        Ok(())
    }

    /// Keywords with blank entries removed.
    pub fn active_keywords(&self) -> Vec<String> {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keywords: defaults::keywords(),
            http: HttpConfig::default(),
            mail: MailConfig::default(),
            page: PageConfig::default(),
            projects: ProjectsConfig::default(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Mail submission settings. Credentials come from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "defaults::smtp_host")]
    pub smtp_host: String,

    #[serde(default = "defaults::smtp_port")]
    pub smtp_port: u16,

    /// SMTP session timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: defaults::smtp_host(),
            smtp_port: defaults::smtp_port(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// What the Seen-Set becomes after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Retention {
    /// Keep only the keys observed by the current run.
    Replace,
    /// Union of every key observed so far.
    #[default]
    Accumulate,
}

/// HTML page pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Name used in the mail subject
    #[serde(default = "defaults::page_name")]
    pub name: String,

    /// First line of the mail body
    #[serde(default = "defaults::page_headline")]
    pub headline: String,

    /// Page to fetch; also the base for relative links
    #[serde(default = "defaults::page_url")]
    pub url: String,

    /// Seen-Set file name inside the storage directory
    #[serde(default = "defaults::page_state_file")]
    pub state_file: String,

    #[serde(default)]
    pub retention: Retention,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            name: defaults::page_name(),
            headline: defaults::page_headline(),
            url: defaults::page_url(),
            state_file: defaults::page_state_file(),
            retention: Retention::default(),
        }
    }
}

/// Record search API pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Name used in the mail subject
    #[serde(default = "defaults::projects_name")]
    pub name: String,

    /// First line of the mail body
    #[serde(default = "defaults::projects_headline")]
    pub headline: String,

    /// API root; the search endpoint is `records/1.0/search/` below it
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    #[serde(default = "defaults::dataset")]
    pub dataset: String,

    /// Maximum rows requested per keyword
    #[serde(default = "defaults::rows")]
    pub rows: u32,

    /// Detail page URL, `{id}` is replaced by the record id
    #[serde(default = "defaults::detail_url_template")]
    pub detail_url_template: String,

    /// Seen-Set file name inside the storage directory
    #[serde(default = "defaults::projects_state_file")]
    pub state_file: String,

    #[serde(default)]
    pub retention: Retention,
}

impl ProjectsConfig {
    /// Full URL of the record search endpoint.
    pub fn search_endpoint(&self) -> Result<Url> {
        let base = if self.api_base.ends_with('/') {
            self.api_base.clone()
        } else {
            format!("{}/", self.api_base)
        };
        Ok(Url::parse(&base)?.join("records/1.0/search/")?)
    }
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            name: defaults::projects_name(),
            headline: defaults::projects_headline(),
            api_base: defaults::api_base(),
            dataset: defaults::dataset(),
            rows: defaults::rows(),
            detail_url_template: defaults::detail_url_template(),
            state_file: defaults::projects_state_file(),
            retention: Retention::default(),
        }
    }
}

mod defaults {
    pub fn keywords() -> Vec<String> {
        ["IEL", "IEL ENR", "IEL exploitation", "Moalic"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Mail defaults
    pub fn smtp_host() -> String {
        "smtp.gmail.com".into()
    }
    pub fn smtp_port() -> u16 {
        587
    }

    // Page pipeline defaults
    pub fn page_name() -> String {
        "Côtes-d'Armor".into()
    }
    pub fn page_headline() -> String {
        "Nouveaux résultats trouvés sur cotes-darmor.gouv.fr :".into()
    }
    pub fn page_url() -> String {
        "https://www.cotes-darmor.gouv.fr/Publications/Publications-legales/Enquetes-publiques"
            .into()
    }
    pub fn page_state_file() -> String {
        "previous_results.json".into()
    }

    // Projects pipeline defaults
    pub fn projects_name() -> String {
        "Projets-Environnement".into()
    }
    pub fn projects_headline() -> String {
        "Nouveaux projets trouvés sur projets-environnement.gouv.fr :".into()
    }
    pub fn api_base() -> String {
        "https://www.projets-environnement.gouv.fr/api".into()
    }
    pub fn dataset() -> String {
        "projets-environnement".into()
    }
    pub fn rows() -> u32 {
        100
    }
    pub fn detail_url_template() -> String {
        "https://www.projets-environnement.gouv.fr/pages/fiche-projet/?tx_eaprojets_pi1[fiche]={id}"
            .into()
    }
    pub fn projects_state_file() -> String {
        "previous_results_projets.json".into()
    }
}
