//! Generation identifiers derived from manifest content.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque identifier of a cache generation.
///
/// Produced by a [`Hasher`] over the manifest URL and manifest text, and used
/// as the name of the content cache generation it describes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationId(String);

impl GenerationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GenerationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Deterministic digest of a string.
pub trait Hasher: Send + Sync {
    fn digest(&self, text: &str) -> GenerationId;
}

/// Lower-case hex SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn digest(&self, text: &str) -> GenerationId {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        GenerationId(hex::encode(hasher.finalize()))
    }
}

/// Compute the generation identifier for a manifest.
///
/// The URL is part of the digest so that identical manifests served from
/// different locations map to distinct generations.
pub fn manifest_generation_id(hasher: &dyn Hasher, manifest_url: &str, text: &str) -> GenerationId {
    let mut input = String::with_capacity(manifest_url.len() + text.len());
    input.push_str(manifest_url);
    input.push_str(text);
    hasher.digest(&input)
}
