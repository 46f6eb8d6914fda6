//! Client code for appshift.
//!
//! This crate provides the HTTP fetch layer, manifest URL resolution, page
//! inspection and the migration engine that moves a page from its cache
//! manifest onto versioned cache generations.

pub mod fetch;
pub mod migrate;
pub mod page;

pub use fetch::{FetchClient, FetchConfig, FetchRequest, FetchResponse, Fetcher};
pub use migrate::{Migrator, PopulationReport, UrlOutcome, resolve_manifest};
pub use page::{DeclaredPage, inspect_page, manifest_reference, manifest_url_for_page};
