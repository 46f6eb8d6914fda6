//! Core types and shared functionality for appshift.
//!
//! This crate provides:
//! - The manifest generation data model and error taxonomy
//! - Collaborator traits for hashing, manifest parsing, the persistent
//!   key/value store and the versioned content cache
//! - SQLite-backed implementations of the store and the content cache
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;
pub mod store;

pub use cache::{CacheHandle, CachedResponse, ContentCache, GenerationId, Hasher, Sha256Hasher, StoreDb};
pub use config::AppConfig;
pub use error::Error;
pub use manifest::{AppcacheParser, ManifestParser, ParsedManifest};
pub use store::{ManifestGenerationRecord, ManifestHistory, ObjectStore, PersistentStore};
