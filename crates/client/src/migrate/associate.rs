//! Associating a page with a manifest.

use super::Migrator;
use crate::fetch::Fetcher;
use appshift_core::store::records;
use appshift_core::{ContentCache, Error, GenerationId, PersistentStore};

impl<F, S, C> Migrator<F, S, C>
where
    F: Fetcher,
    S: PersistentStore,
    C: ContentCache,
{
    /// Record that `page_url` uses `manifest_url` and cache the page in `generation`.
    ///
    /// The association write and the page fetch run together and both finish
    /// before this returns; the call fails if either failed. The page itself follows the same per-URL rules as any other
    /// generation entry.
    pub async fn associate(&self, page_url: &str, manifest_url: &str, generation: &GenerationId) -> Result<(), Error> {
        let (written, populated) = tokio::join!(
            records::associate_page(&self.store, page_url, manifest_url),
            self.populate(generation, [page_url])
        );
        written?;
        let report = populated?;

        tracing::info!(
            page = page_url,
            manifest = manifest_url,
            generation = %generation,
            cached = report.stored + report.carried_forward > 0,
            "page associated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{body_in, cached_body, migrator, read_only_migrator};
    use crate::fetch::mock::MockFetcher;
    use appshift_core::{Error, GenerationId};
    use std::time::Duration;
    use appshift_core::store::records;

    const MANIFEST_URL: &str = "https://x.test/m.appcache";
    const PAGE_URL: &str = "https://x.test/page.html";

    #[tokio::test]
    async fn test_associate_writes_mapping_and_caches_page() {
        let fetcher = MockFetcher::new();
        fetcher.respond(PAGE_URL, 200, "<html></html>");
        let migrator = migrator(fetcher).await;
        let generation = GenerationId::new("g1");

        migrator.associate(PAGE_URL, MANIFEST_URL, &generation).await.unwrap();

        let associations = records::page_associations(migrator.store()).await.unwrap();
        assert_eq!(associations, vec![(PAGE_URL.to_string(), MANIFEST_URL.to_string())]);
        assert_eq!(cached_body(&migrator, &generation, PAGE_URL).await.as_deref(), Some("<html></html>"));
    }

    #[tokio::test]
    async fn test_associate_overwrites_previous_manifest() {
        let fetcher = MockFetcher::new();
        fetcher.respond(PAGE_URL, 200, "page");
        let migrator = migrator(fetcher).await;

        migrator
            .associate(PAGE_URL, "https://x.test/old.appcache", &GenerationId::new("g1"))
            .await
            .unwrap();
        migrator.associate(PAGE_URL, MANIFEST_URL, &GenerationId::new("g2")).await.unwrap();

        assert!(records::pages_for_manifest(migrator.store(), "https://x.test/old.appcache").await.unwrap().is_empty());
        assert_eq!(records::pages_for_manifest(migrator.store(), MANIFEST_URL).await.unwrap(), vec![PAGE_URL]);
    }

    #[tokio::test]
    async fn test_associate_survives_page_fetch_failure() {
        let fetcher = MockFetcher::new();
        fetcher.fail(PAGE_URL);
        let migrator = migrator(fetcher).await;
        let generation = GenerationId::new("g1");

        migrator.associate(PAGE_URL, MANIFEST_URL, &generation).await.unwrap();

        assert!(cached_body(&migrator, &generation, PAGE_URL).await.is_none());
        assert_eq!(records::pages_for_manifest(migrator.store(), MANIFEST_URL).await.unwrap(), vec![PAGE_URL]);
    }

    #[tokio::test]
    async fn test_association_write_failure_is_fatal_but_page_is_cached() {
        let fetcher = MockFetcher::new();
        fetcher
            .respond(PAGE_URL, 200, "page")
            .delay(PAGE_URL, Duration::from_millis(50));
        let (migrator, cache) = read_only_migrator(fetcher).await;
        let generation = GenerationId::new("g1");

        let result = migrator.associate(PAGE_URL, MANIFEST_URL, &generation).await;

        assert!(matches!(result, Err(Error::StoreTransaction(_))), "{result:?}");
        assert_eq!(body_in(&cache, &generation, PAGE_URL).await.as_deref(), Some("page"));
    }
}
