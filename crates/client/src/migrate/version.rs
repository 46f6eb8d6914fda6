//! Detecting whether a manifest revision is already known.

use super::Migrator;
use crate::fetch::{FetchRequest, Fetcher};
use appshift_core::cache::manifest_generation_id;
use appshift_core::store::records;
use appshift_core::{ContentCache, Error, GenerationId, PersistentStore};

impl<F, S, C> Migrator<F, S, C>
where
    F: Fetcher,
    S: PersistentStore,
    C: ContentCache,
{
    /// Return the generation for the manifest currently served at `manifest_url`.
    ///
    /// The manifest is fetched while its history is read. A revision already in
    /// the history is returned without touching the content cache; otherwise a
    /// new generation is built.
    ///
    /// # Errors
    ///
    /// `Error::ManifestFetch` if the manifest cannot be fetched or is not served
    /// with a 2xx status. Parse and store failures from building a new
    /// generation are passed through.
    pub async fn check(&self, manifest_url: &str) -> Result<GenerationId, Error> {
        let ((hash, text), history) = tokio::try_join!(
            self.fetch_manifest(manifest_url),
            records::read_history(&self.store, manifest_url)
        )?;

        if history.contains(&hash) {
            tracing::info!(manifest = manifest_url, generation = %hash, "manifest unchanged");
            return Ok(hash);
        }

        tracing::info!(
            manifest = manifest_url,
            generation = %hash,
            known = history.len(),
            "new manifest revision"
        );
        self.build(manifest_url, hash, &text, history).await
    }

    async fn fetch_manifest(&self, manifest_url: &str) -> Result<(GenerationId, String), Error> {
        let request = FetchRequest::tooling(manifest_url, &self.marker_header);
        let response = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|e| Error::ManifestFetch(format!("{manifest_url}: {e}")))?;

        if !response.ok() {
            return Err(Error::ManifestFetch(format!(
                "{manifest_url}: status {}",
                response.status.as_u16()
            )));
        }

        let text = response.text();
        let hash = manifest_generation_id(self.hasher.as_ref(), manifest_url, &text);
        Ok((hash, text))
    }
}
