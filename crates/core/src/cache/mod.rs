//! Versioned, content-addressed response cache.
//!
//! Responses are grouped into generations named by a [`GenerationId`]. A
//! generation is written once while it is being populated and is never
//! pruned by this crate. Lookups can target one generation through a
//! [`CacheHandle`] or search every generation for the newest entry.
//!
//! - SHA-256 generation identifiers
//! - SQLite storage with automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::StoreDb;
pub use generations::{CachedResponse, GenerationHandle, GenerationSummary};
pub use hash::{GenerationId, Hasher, Sha256Hasher, manifest_generation_id};

use async_trait::async_trait;

/// Content-addressable storage of request-key to response pairs, grouped by generation.
#[async_trait]
pub trait ContentCache: Send + Sync {
    type Handle: CacheHandle;

    /// Open (creating if needed) the generation named `generation`.
    async fn open(&self, generation: &GenerationId) -> Result<Self::Handle, Error>;

    /// Find the most recently stored response for `request_key` in any generation.
    async fn match_any_generation(&self, request_key: &str) -> Result<Option<CachedResponse>, Error>;
}

/// Access to a single generation of a [`ContentCache`].
#[async_trait]
pub trait CacheHandle: Send + Sync {
    fn generation(&self) -> &GenerationId;

    /// Store `response` under `request_key`, replacing any previous entry in this generation.
    async fn write(&self, request_key: &str, response: &CachedResponse) -> Result<(), Error>;

    async fn read(&self, request_key: &str) -> Result<Option<CachedResponse>, Error>;
}
