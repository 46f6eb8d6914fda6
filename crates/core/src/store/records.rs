//! Typed records kept in the [`PersistentStore`].
//!
//! - Manifest history: manifest URL to every generation seen for it, oldest first.
//! - Page association: page URL to the manifest URL it declared most recently.

use super::{ObjectStore, PersistentStore};
use crate::Error;
use crate::cache::GenerationId;
use crate::manifest::ParsedManifest;
use serde::{Deserialize, Serialize};

/// One observed revision of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestGenerationRecord {
    pub hash: GenerationId,
    pub parsed: ParsedManifest,
}

/// Generations known for one manifest URL, in discovery order.
///
/// No two records share a hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestHistory(Vec<ManifestGenerationRecord>);

impl ManifestHistory {
    pub fn contains(&self, hash: &GenerationId) -> bool {
        self.0.iter().any(|record| &record.hash == hash)
    }

    /// Append `record` unless a record with the same hash already exists.
    ///
    /// Returns whether the record was added.
    pub fn push_unique(&mut self, record: ManifestGenerationRecord) -> bool {
        if self.contains(&record.hash) {
            return false;
        }
        self.0.push(record);
        true
    }

    pub fn latest(&self) -> Option<&ManifestGenerationRecord> {
        self.0.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestGenerationRecord> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Read the history for `manifest_url`, empty if none was recorded.
pub async fn read_history<S: PersistentStore + ?Sized>(store: &S, manifest_url: &str) -> Result<ManifestHistory, Error> {
    match store.get(ObjectStore::ManifestHistory, manifest_url).await? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(ManifestHistory::default()),
    }
}

/// Replace the stored history for `manifest_url`.
pub async fn write_history<S: PersistentStore + ?Sized>(
    store: &S, manifest_url: &str, history: &ManifestHistory,
) -> Result<(), Error> {
    let json = serde_json::to_string(history)?;
    store.put(ObjectStore::ManifestHistory, manifest_url, json).await
}

/// Record that `page_url` belongs to `manifest_url`.
pub async fn associate_page<S: PersistentStore + ?Sized>(
    store: &S, page_url: &str, manifest_url: &str,
) -> Result<(), Error> {
    let json = serde_json::to_string(manifest_url)?;
    store.put(ObjectStore::PageAssociation, page_url, json).await
}

/// Every `(page URL, manifest URL)` association.
pub async fn page_associations<S: PersistentStore + ?Sized>(store: &S) -> Result<Vec<(String, String)>, Error> {
    store
        .entries(ObjectStore::PageAssociation)
        .await?
        .into_iter()
        .map(|(page, json)| -> Result<(String, String), Error> { Ok((page, serde_json::from_str(&json)?)) })
        .collect()
}

/// Pages currently associated with `manifest_url`.
pub async fn pages_for_manifest<S: PersistentStore + ?Sized>(
    store: &S, manifest_url: &str,
) -> Result<Vec<String>, Error> {
    let pages = page_associations(store)
        .await?
        .into_iter()
        .filter(|(_, manifest)| manifest == manifest_url)
        .map(|(page, _)| page)
        .collect();
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StoreDb;

    fn record(hash: &str) -> ManifestGenerationRecord {
        ManifestGenerationRecord { hash: GenerationId::new(hash), parsed: ParsedManifest::default() }
    }

    #[test]
    fn test_push_unique_dedups_by_hash() {
        let mut history = ManifestHistory::default();
        assert!(history.push_unique(record("h1")));
        assert!(history.push_unique(record("h2")));
        assert!(!history.push_unique(record("h1")));

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().hash.as_str(), "h2");
    }

    #[tokio::test]
    async fn test_read_missing_history_is_empty() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let history = read_history(&db, "https://x.test/m.appcache").await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_history_round_trip_keeps_order() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let mut history = ManifestHistory::default();
        history.push_unique(record("h2"));
        history.push_unique(record("h1"));

        write_history(&db, "https://x.test/m.appcache", &history).await.unwrap();

        let stored = read_history(&db, "https://x.test/m.appcache").await.unwrap();
        let hashes: Vec<_> = stored.iter().map(|r| r.hash.as_str().to_string()).collect();
        assert_eq!(hashes, vec!["h2", "h1"]);
    }

    #[tokio::test]
    async fn test_pages_for_manifest() {
        let db = StoreDb::open_in_memory().await.unwrap();
        associate_page(&db, "https://x.test/a", "https://x.test/m1").await.unwrap();
        associate_page(&db, "https://x.test/b", "https://x.test/m2").await.unwrap();
        associate_page(&db, "https://x.test/c", "https://x.test/m1").await.unwrap();

        let pages = pages_for_manifest(&db, "https://x.test/m1").await.unwrap();
        assert_eq!(pages, vec!["https://x.test/a", "https://x.test/c"]);
    }

    #[tokio::test]
    async fn test_association_last_write_wins() {
        let db = StoreDb::open_in_memory().await.unwrap();
        associate_page(&db, "https://x.test/a", "https://x.test/m1").await.unwrap();
        associate_page(&db, "https://x.test/a", "https://x.test/m2").await.unwrap();

        assert!(pages_for_manifest(&db, "https://x.test/m1").await.unwrap().is_empty());
        let all = page_associations(&db).await.unwrap();
        assert_eq!(all, vec![("https://x.test/a".to_string(), "https://x.test/m2".to_string())]);
    }

    #[tokio::test]
    async fn test_corrupt_history_is_store_error() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.put(ObjectStore::ManifestHistory, "https://x.test/m", "not json".into())
            .await
            .unwrap();

        let err = read_history(&db, "https://x.test/m").await.unwrap_err();
        assert_eq!(err.code(), "STORE_ERROR");
    }
}
