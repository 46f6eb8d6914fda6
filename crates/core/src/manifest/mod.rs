//! Cache manifest model.
//!
//! A manifest lists the resources a page needs offline (`CACHE`), the ones that
//! must always come from the network (`NETWORK`), and substitutes to serve when
//! a resource under a prefix is unavailable (`FALLBACK`).

mod parser;

pub use parser::AppcacheParser;

use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wildcard entry of the `NETWORK` section. Never resolved as a URL.
pub const NETWORK_WILDCARD: &str = "*";

/// Structured form of a manifest.
///
/// Entries are stored as written by the parser; once a manifest has been
/// recorded in a generation history every URL in it is absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedManifest {
    pub cache: Vec<String>,
    pub network: Vec<String>,
    pub fallback: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<String>,
}

impl ParsedManifest {
    /// Fallback targets, in key order.
    pub fn fallback_targets(&self) -> impl Iterator<Item = &str> {
        self.fallback.values().map(String::as_str)
    }
}

/// Turns manifest text into a [`ParsedManifest`].
pub trait ManifestParser: Send + Sync {
    /// # Errors
    ///
    /// Returns `Error::MalformedManifest` if the text lacks the manifest header.
    fn parse(&self, text: &str) -> Result<ParsedManifest, Error>;
}
