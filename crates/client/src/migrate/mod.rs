//! Migration from a cache manifest to versioned cache generations.
//!
//! A page load runs [`Migrator::check`] to find (or create) the generation for
//! the manifest it declares, then [`Migrator::associate`] to record the page
//! against that manifest. Generations are append-only: a failed migration
//! leaves earlier generations untouched.
//!
//! History writes and content population are started together and are not
//! coordinated, so either can complete without the other.

mod associate;
mod generation;
mod populate;
mod version;

pub use generation::resolve_manifest;
pub use populate::{PopulationReport, UrlOutcome};

use crate::fetch::{DEFAULT_MARKER_HEADER, Fetcher};
use appshift_core::{AppcacheParser, ContentCache, Error, GenerationId, Hasher, ManifestParser, PersistentStore, Sha256Hasher};

/// Drives manifest migrations over a fetcher, a persistent store and a content cache.
pub struct Migrator<F, S, C> {
    fetcher: F,
    store: S,
    cache: C,
    hasher: Box<dyn Hasher>,
    parser: Box<dyn ManifestParser>,
    marker_header: String,
}

impl<F, S, C> Migrator<F, S, C>
where
    F: Fetcher,
    S: PersistentStore,
    C: ContentCache,
{
    pub fn new(fetcher: F, store: S, cache: C) -> Self {
        Self {
            fetcher,
            store,
            cache,
            hasher: Box::new(Sha256Hasher),
            parser: Box::new(AppcacheParser),
            marker_header: DEFAULT_MARKER_HEADER.to_string(),
        }
    }

    pub fn with_hasher(mut self, hasher: impl Hasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn with_parser(mut self, parser: impl ManifestParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn with_marker_header(mut self, name: impl Into<String>) -> Self {
        self.marker_header = name.into();
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Bring the generation for `manifest_url` up to date and associate `page_url` with it.
    pub async fn migrate(&self, page_url: &str, manifest_url: &str) -> Result<GenerationId, Error> {
        let hash = self.check(manifest_url).await?;
        self.associate(page_url, manifest_url, &hash).await?;
        Ok(hash)
    }
}
