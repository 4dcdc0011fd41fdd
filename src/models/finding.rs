//! Matched records and their identity keys.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Fixed-order tuple deciding whether two findings are the same item.
///
/// Serialized as a JSON array of exactly three strings; any other arity
/// fails to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(pub [String; 3]);

impl IdentityKey {
    pub fn new(a: impl Into<String>, b: impl Into<String>, c: impl Into<String>) -> Self {
        Self([a.into(), b.into(), c.into()])
    }
}

/// Every identity key observed as of the end of a run.
pub type SeenSet = BTreeSet<IdentityKey>;

/// A keyword hit on a text node of the watched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMatch {
    /// Trimmed text of the matching node
    pub text: String,
    /// Absolute URL of the enclosing link
    pub url: String,
    pub keyword: String,
}

/// A record returned by the project search API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub keyword: String,
    pub title: String,
    pub description: String,
    pub commune: String,
    pub departement: String,
    /// Detail page built from `record_id`
    pub url: String,
    pub record_id: String,
}

/// One matched item produced by a source during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Page(PageMatch),
    Project(ProjectRecord),
}

impl Finding {
    /// Key used for deduplication. Fields outside it are display-only.
    pub fn identity(&self) -> IdentityKey {
        match self {
            Finding::Page(m) => IdentityKey::new(&m.text, &m.url, &m.keyword),
            Finding::Project(p) => IdentityKey::new(&p.title, &p.commune, &p.departement),
        }
    }

    /// Human-readable field block used in the notification body.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        match self {
            Finding::Page(m) => {
                let _ = writeln!(out, "Mot-clé trouvé : {}", m.keyword);
                let _ = writeln!(out, "Texte : {}", m.text);
                let _ = writeln!(out, "URL : {}", m.url);
            }
            Finding::Project(p) => {
                let _ = writeln!(out, "Mot-clé trouvé : {}", p.keyword);
                let _ = writeln!(out, "Titre : {}", p.title);
                let _ = writeln!(out, "Description : {}", p.description);
                let _ = writeln!(out, "Commune : {}", p.commune);
                let _ = writeln!(out, "Département : {}", p.departement);
                let _ = writeln!(out, "URL : {}", p.url);
            }
        }
        out
    }
}

impl From<PageMatch> for Finding {
    fn from(m: PageMatch) -> Self {
        Finding::Page(m)
    }
}

impl From<ProjectRecord> for Finding {
    fn from(p: ProjectRecord) -> Self {
        Finding::Project(p)
    }
}
