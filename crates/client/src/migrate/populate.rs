//! Filling a generation with responses.
//!
//! Each URL is fetched independently. What ends up in the generation:
//!
//! | fetch result                   | generation entry               |
//! |--------------------------------|--------------------------------|
//! | `Cache-Control: no-store`      | none                           |
//! | 2xx                            | the response                   |
//! | 404 or 410                     | none                           |
//! | other status, network failure  | newest copy from any generation, if one exists |

use super::Migrator;
use crate::fetch::{FetchRequest, Fetcher};
use appshift_core::{CacheHandle, ContentCache, Error, GenerationId, PersistentStore};
use futures_util::future::join_all;
use reqwest::StatusCode;

/// What happened to a single URL during population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlOutcome {
    /// Fetched and stored.
    Stored,
    /// Fetch failed; copied from an earlier generation.
    CarriedForward,
    /// Response marked `no-store`.
    SkippedNoStore,
    /// 404 or 410.
    SkippedMissing,
    /// Fetch failed and no earlier copy exists.
    Absent,
}

/// Per-outcome URL counts for one population run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulationReport {
    pub stored: usize,
    pub carried_forward: usize,
    /// `no-store` responses and 404/410s
    pub skipped: usize,
    pub absent: usize,
}

impl PopulationReport {
    fn record(&mut self, outcome: UrlOutcome) {
        match outcome {
            UrlOutcome::Stored => self.stored += 1,
            UrlOutcome::CarriedForward => self.carried_forward += 1,
            UrlOutcome::SkippedNoStore | UrlOutcome::SkippedMissing => self.skipped += 1,
            UrlOutcome::Absent => self.absent += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.stored + self.carried_forward + self.skipped + self.absent
    }
}

impl<F, S, C> Migrator<F, S, C>
where
    F: Fetcher,
    S: PersistentStore,
    C: ContentCache,
{
    /// Populate `generation` with `urls`.
    ///
    /// Every URL is processed to completion before this returns. Fetch failures
    /// never fail the call; a content cache error does, after all URLs settle.
    pub async fn populate<I>(&self, generation: &GenerationId, urls: I) -> Result<PopulationReport, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let handle = self.cache.open(generation).await?;
        let urls: Vec<String> = urls.into_iter().map(|url| url.as_ref().to_string()).collect();

        let outcomes = join_all(urls.iter().map(|url| self.populate_url(&handle, url))).await;

        let mut report = PopulationReport::default();
        for outcome in outcomes {
            report.record(outcome?);
        }
        Ok(report)
    }

    async fn populate_url(&self, handle: &C::Handle, url: &str) -> Result<UrlOutcome, Error> {
        let request = FetchRequest::tooling(url, &self.marker_header).manual_redirects();

        match self.fetcher.fetch(&request).await {
            Ok(response) if response.is_no_store() => {
                tracing::debug!(url, "skipping no-store response");
                return Ok(UrlOutcome::SkippedNoStore);
            }
            Ok(response) if response.ok() => {
                handle.write(url, &response.into_cached()).await?;
                tracing::debug!(url, generation = %handle.generation(), "stored");
                return Ok(UrlOutcome::Stored);
            }
            Ok(response) if matches!(response.status, StatusCode::NOT_FOUND | StatusCode::GONE) => {
                tracing::debug!(url, status = response.status.as_u16(), "resource gone, leaving it out");
                return Ok(UrlOutcome::SkippedMissing);
            }
            Ok(response) => {
                tracing::warn!(url, status = response.status.as_u16(), "unexpected status, using earlier copy");
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "fetch failed, using earlier copy");
            }
        }

        match self.cache.match_any_generation(url).await? {
            Some(previous) => {
                handle.write(url, &previous).await?;
                tracing::debug!(url, generation = %handle.generation(), "carried forward");
                Ok(UrlOutcome::CarriedForward)
            }
            None => {
                tracing::debug!(url, "no earlier copy");
                Ok(UrlOutcome::Absent)
            }
        }
    }
}
