//! Local filesystem Seen-Set storage.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml                     # Watcher configuration
//! ├── previous_results.json           # Seen-Set of the page pipeline
//! └── previous_results_projets.json   # Seen-Set of the projects pipeline
//! ```
//!
//! Each Seen-Set file is a JSON array of arrays of three strings.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{IdentityKey, SeenSet};

/// One Seen-Set file on local disk.
#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    /// Store backed by `{root_dir}/{file_name}`.
    pub fn new(root_dir: impl AsRef<Path>, file_name: &str) -> Self {
        Self {
            path: root_dir.as_ref().join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the Seen-Set.
    ///
    /// A missing file is an empty set. A file that cannot be read or parsed
    /// (bad JSON, wrong tuple length, non-string members) is logged and also
    /// treated as empty.
    pub async fn load(&self) -> SeenSet {
        match self.try_load().await {
            Ok(Some(seen)) => {
                log::debug!("Loaded {} seen keys from {}", seen.len(), self.path.display());
                seen
            }
            Ok(None) => {
                log::info!("No previous results at {}", self.path.display());
                SeenSet::new()
            }
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable previous results at {}: {}",
                    self.path.display(),
                    e
                );
                SeenSet::new()
            }
        }
    }

    /// Load the Seen-Set, returning `None` if the file doesn't exist.
    pub async fn try_load(&self) -> Result<Option<SeenSet>> {
        match self.read_bytes().await? {
            Some(bytes) => {
                let rows: Vec<IdentityKey> = serde_json::from_slice(&bytes)?;
                Ok(Some(rows.into_iter().collect()))
            }
            None => Ok(None),
        }
    }

    /// Overwrite the file with the given Seen-Set.
    pub async fn save(&self, seen: &SeenSet) -> Result<()> {
        let rows: Vec<&IdentityKey> = seen.iter().collect();
        let bytes = serde_json::to_vec(&rows)?;
        self.write_bytes(&bytes).await
    }

    /// Sibling temp file: the full file name plus `.tmp`, so stores that
    /// differ only by extension never share one.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_set() -> SeenSet {
        [
            IdentityKey::new("IEL ENR signs contract", "https://example.org/a", "IEL ENR"),
            IdentityKey::new("Parc éolien", "Plémet", "22"),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = SeenStore::new(tmp.path(), "previous_results.json");

        assert!(store.try_load().await.unwrap().is_none());
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = SeenStore::new(tmp.path(), "previous_results.json");

        store.save(&sample_set()).await.unwrap();
        assert_eq!(store.load().await, sample_set());
    }

    #[tokio::test]
    async fn test_save_load_save_is_stable() {
        let tmp = TempDir::new().unwrap();
        let store = SeenStore::new(tmp.path(), "previous_results.json");

        store.save(&sample_set()).await.unwrap();
        let first = std::fs::read(store.path()).unwrap();

        let loaded = store.load().await;
        store.save(&loaded).await.unwrap();
        let second = std::fs::read(store.path()).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_file_format_is_array_of_arrays() {
        let tmp = TempDir::new().unwrap();
        let store = SeenStore::new(tmp.path(), "previous_results.json");

        let seen: SeenSet = [IdentityKey::new("t", "u", "k")].into_iter().collect();
        store.save(&seen).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"[["t","u","k"]]"#);
    }

    #[tokio::test]
    async fn test_reads_legacy_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("previous_results_projets.json"),
            r#"[["Parc éolien", "Plémet", "22"], ["Parc éolien", "Plémet", "22"]]"#,
        )
        .unwrap();
        let store = SeenStore::new(tmp.path(), "previous_results_projets.json");

        let seen = store.load().await;
        assert_eq!(seen.len(), 1);
        assert!(seen.contains(&IdentityKey::new("Parc éolien", "Plémet", "22")));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("previous_results.json"), "{not json").unwrap();
        let store = SeenStore::new(tmp.path(), "previous_results.json");

        assert!(store.try_load().await.is_err());
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_tuple_length_is_empty() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("previous_results.json"),
            r#"[["a","b","c"],["only","two"]]"#,
        )
        .unwrap();
        let store = SeenStore::new(tmp.path(), "previous_results.json");

        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_non_string_member_is_empty() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("previous_results.json"), r#"[["a","b",22]]"#).unwrap();
        let store = SeenStore::new(tmp.path(), "previous_results.json");

        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_storage_dir() {
        let tmp = TempDir::new().unwrap();
        let store = SeenStore::new(tmp.path().join("nested"), "previous_results.json");

        store.save(&sample_set()).await.unwrap();
        assert!(store.path().exists());
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_stores_differing_by_extension_do_not_share_temp_file() {
        let tmp = TempDir::new().unwrap();
        let json = SeenStore::new(tmp.path(), "results.json");
        let txt = SeenStore::new(tmp.path(), "results.txt");
        assert_ne!(json.tmp_path(), txt.tmp_path());
        assert_eq!(json.tmp_path(), tmp.path().join("results.json.tmp"));

        let other: SeenSet = [IdentityKey::new("t", "u", "k")].into_iter().collect();
        let sample = sample_set();
        let (a, b) = tokio::join!(json.save(&sample), txt.save(&other));
        a.unwrap();
        b.unwrap();

        assert_eq!(json.load().await, sample_set());
        assert_eq!(txt.load().await, other);
        assert!(!json.tmp_path().exists());
        assert!(!txt.tmp_path().exists());
    }
}
