//! Building a new generation for a changed manifest.

use super::Migrator;
use crate::fetch::{Fetcher, resolve};
use appshift_core::store::records;
use appshift_core::{
    ContentCache, Error, GenerationId, ManifestGenerationRecord, ManifestHistory, ManifestParser, ParsedManifest,
    PersistentStore,
};
use std::collections::{BTreeMap, BTreeSet};

/// Make every URL of `manifest` absolute against `base`.
///
/// Covers `cache`, `network` (keeping the `*` wildcard) and both sides of
/// `fallback`.
pub fn resolve_manifest(base: &str, manifest: ParsedManifest) -> Result<ParsedManifest, Error> {
    let resolve_all = |urls: Vec<String>| -> Result<Vec<String>, Error> {
        urls.iter().map(|url| resolve(base, url).map_err(Error::from)).collect()
    };

    let fallback: BTreeMap<String, String> = manifest
        .fallback
        .iter()
        .map(|(namespace, target)| -> Result<(String, String), Error> {
            Ok((resolve(base, namespace)?, resolve(base, target)?))
        })
        .collect::<Result<_, _>>()?;

    Ok(ParsedManifest {
        cache: resolve_all(manifest.cache)?,
        network: resolve_all(manifest.network)?,
        fallback,
        settings: manifest.settings,
    })
}

impl<F, S, C> Migrator<F, S, C>
where
    F: Fetcher,
    S: PersistentStore,
    C: ContentCache,
{
    /// Record `text` as generation `hash` of `manifest_url` and populate it.
    ///
    /// The history write and the content population start together and both
    /// run to completion. The call fails if either failed, reporting the
    /// history error first.
    pub async fn build(
        &self, manifest_url: &str, hash: GenerationId, text: &str, mut history: ManifestHistory,
    ) -> Result<GenerationId, Error> {
        let parsed = resolve_manifest(manifest_url, self.parser.parse(text)?)?;
        let targets = self.target_urls(manifest_url, &parsed).await?;

        if !history.push_unique(ManifestGenerationRecord { hash: hash.clone(), parsed }) {
            tracing::debug!(generation = %hash, "generation already recorded");
        }

        let (written, populated) = tokio::join!(
            records::write_history(&self.store, manifest_url, &history),
            self.populate(&hash, &targets)
        );
        written?;
        let report = populated?;

        tracing::info!(
            manifest = manifest_url,
            generation = %hash,
            targets = targets.len(),
            stored = report.stored,
            carried_forward = report.carried_forward,
            skipped = report.skipped,
            absent = report.absent,
            "generation built"
        );

        Ok(hash)
    }

    /// URLs a new generation of `manifest_url` must hold.
    ///
    /// The manifest's cache entries and fallback targets, plus every page
    /// previously associated with `manifest_url` whether or not the manifest
    /// still lists it.
    pub async fn target_urls(&self, manifest_url: &str, parsed: &ParsedManifest) -> Result<BTreeSet<String>, Error> {
        let mut targets: BTreeSet<String> = parsed.cache.iter().cloned().collect();
        targets.extend(parsed.fallback_targets().map(str::to_string));
        targets.extend(records::pages_for_manifest(&self.store, manifest_url).await?);
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{body_in, cached_body, migrator, read_only_migrator};
    use super::*;
    use crate::fetch::mock::MockFetcher;
    use appshift_core::cache::manifest_generation_id;
    use appshift_core::{AppcacheParser, Sha256Hasher};
    use std::time::Duration;

    const MANIFEST_URL: &str = "https://x.test/m.appcache";
    const MANIFEST: &str = "CACHE MANIFEST\nCACHE:\n/a.js\nFALLBACK:\n/x.html /offline.html\n";

    #[test]
    fn test_resolve_manifest() {
        let mut manifest = ParsedManifest {
            cache: vec!["a.js".into()],
            network: vec!["*".into(), "api/".into()],
            ..Default::default()
        };
        manifest.fallback.insert("/".into(), "offline.html".into());

        let resolved = resolve_manifest("https://x.test/app/m.appcache", manifest).unwrap();

        assert_eq!(resolved.cache, vec!["https://x.test/app/a.js"]);
        assert_eq!(resolved.network, vec!["*", "https://x.test/app/api/"]);
        assert_eq!(
            resolved.fallback.get("https://x.test/").map(String::as_str),
            Some("https://x.test/app/offline.html")
        );
    }

    #[test]
    fn test_resolve_manifest_malformed_base() {
        let manifest = ParsedManifest { cache: vec!["a.js".into()], ..Default::default() };
        let result = resolve_manifest("relative/m.appcache", manifest);
        assert!(matches!(result, Err(Error::MalformedUrl(_))));
    }

    #[tokio::test]
    async fn test_end_to_end_manifest() {
        let fetcher = MockFetcher::new();
        fetcher
            .respond(MANIFEST_URL, 200, MANIFEST)
            .respond("https://x.test/a.js", 200, "a")
            .respond("https://x.test/offline.html", 200, "offline");
        let migrator = migrator(fetcher).await;

        let parsed = resolve_manifest(MANIFEST_URL, AppcacheParser.parse(MANIFEST).unwrap()).unwrap();
        let targets = migrator.target_urls(MANIFEST_URL, &parsed).await.unwrap();
        assert!(targets.contains("https://x.test/a.js"));
        assert!(targets.contains("https://x.test/offline.html"));

        let hash = migrator.check(MANIFEST_URL).await.unwrap();

        let history = records::read_history(migrator.store(), MANIFEST_URL).await.unwrap();
        let record = history.latest().unwrap();
        assert_eq!(record.hash, hash);
        assert_eq!(record.parsed, parsed);
        assert_eq!(cached_body(&migrator, &hash, "https://x.test/a.js").await.as_deref(), Some("a"));
        assert_eq!(cached_body(&migrator, &hash, "https://x.test/offline.html").await.as_deref(), Some("offline"));
        // Fallback namespaces are not fetched.
        assert_eq!(migrator.fetcher().requests_for("https://x.test/x.html"), 0);
    }

    #[tokio::test]
    async fn test_associated_pages_are_carried_forward() {
        let page = "https://x.test/page.html";
        let fetcher = MockFetcher::new();
        fetcher
            .respond(MANIFEST_URL, 200, "CACHE MANIFEST\n/a.js\n")
            .respond("https://x.test/a.js", 200, "a")
            .respond(page, 200, "page v1");
        let migrator = migrator(fetcher).await;

        let first = migrator.migrate(page, MANIFEST_URL).await.unwrap();

        migrator
            .fetcher()
            .respond(MANIFEST_URL, 200, "CACHE MANIFEST\n/b.js\n")
            .respond("https://x.test/b.js", 200, "b")
            .respond(page, 200, "page v2");
        let second = migrator.check(MANIFEST_URL).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(cached_body(&migrator, &second, page).await.as_deref(), Some("page v2"));
        assert_eq!(cached_body(&migrator, &second, "https://x.test/b.js").await.as_deref(), Some("b"));
        assert!(cached_body(&migrator, &second, "https://x.test/a.js").await.is_none());
        assert_eq!(cached_body(&migrator, &first, page).await.as_deref(), Some("page v1"));
    }

    #[tokio::test]
    async fn test_pages_of_other_manifests_are_not_targets() {
        let fetcher = MockFetcher::new();
        let migrator = migrator(fetcher).await;
        records::associate_page(migrator.store(), "https://x.test/mine", MANIFEST_URL)
            .await
            .unwrap();
        records::associate_page(migrator.store(), "https://x.test/theirs", "https://x.test/other.appcache")
            .await
            .unwrap();

        let targets = migrator.target_urls(MANIFEST_URL, &ParsedManifest::default()).await.unwrap();

        assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec!["https://x.test/mine"]);
    }

    #[tokio::test]
    async fn test_build_does_not_duplicate_known_hash() {
        let fetcher = MockFetcher::new();
        let migrator = migrator(fetcher).await;
        let hash = GenerationId::new("h1");
        let mut history = ManifestHistory::default();
        history.push_unique(ManifestGenerationRecord { hash: hash.clone(), parsed: ParsedManifest::default() });

        migrator.build(MANIFEST_URL, hash, "CACHE MANIFEST\n", history).await.unwrap();

        let stored = records::read_history(migrator.store(), MANIFEST_URL).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_history_write_failure_is_fatal() {
        let fetcher = MockFetcher::new();
        fetcher
            .respond(MANIFEST_URL, 200, MANIFEST)
            .respond("https://x.test/a.js", 200, "a")
            .respond("https://x.test/offline.html", 200, "offline");
        let (migrator, _cache) = read_only_migrator(fetcher).await;

        let result = migrator.check(MANIFEST_URL).await;

        assert!(matches!(result, Err(Error::StoreTransaction(_))), "{result:?}");
    }

    #[tokio::test]
    async fn test_population_finishes_when_history_write_fails() {
        let fetcher = MockFetcher::new();
        fetcher
            .respond(MANIFEST_URL, 200, MANIFEST)
            .respond("https://x.test/a.js", 200, "a")
            .delay("https://x.test/a.js", Duration::from_millis(50))
            .respond("https://x.test/offline.html", 200, "offline");
        let (migrator, cache) = read_only_migrator(fetcher).await;
        let hash = manifest_generation_id(&Sha256Hasher, MANIFEST_URL, MANIFEST);

        let result = migrator.build(MANIFEST_URL, hash.clone(), MANIFEST, ManifestHistory::default()).await;

        assert!(matches!(result, Err(Error::StoreTransaction(_))));
        assert_eq!(body_in(&cache, &hash, "https://x.test/a.js").await.as_deref(), Some("a"));
        assert_eq!(body_in(&cache, &hash, "https://x.test/offline.html").await.as_deref(), Some("offline"));
    }
}
