//! Parser for the classic cache manifest format.

use super::{ManifestParser, ParsedManifest};
use crate::Error;

const SIGNATURE: &str = "CACHE MANIFEST";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Cache,
    Network,
    Fallback,
    Settings,
    Unknown,
}

impl Section {
    fn from_header(line: &str) -> Option<Self> {
        match line {
            "CACHE:" => Some(Section::Cache),
            "NETWORK:" => Some(Section::Network),
            "FALLBACK:" => Some(Section::Fallback),
            "SETTINGS:" => Some(Section::Settings),
            // Only a colon-free name followed by one trailing colon is a header.
            _ if line.find(':') == Some(line.len() - 1) => Some(Section::Unknown),
            _ => None,
        }
    }
}

/// Default [`ManifestParser`].
///
/// Entries are kept verbatim (relative URLs stay relative); unknown sections
/// are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppcacheParser;

impl ManifestParser for AppcacheParser {
    fn parse(&self, text: &str) -> Result<ParsedManifest, Error> {
        let mut lines = text.split("\r\n").flat_map(|chunk| chunk.split(['\r', '\n']));

        let header = lines.next().unwrap_or_default();
        check_header(header)?;

        let mut manifest = ParsedManifest::default();
        let mut section = Section::Cache;

        for line in lines.map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(next) = Section::from_header(line) {
                section = next;
                continue;
            }

            match section {
                Section::Cache => manifest.cache.push(line.to_string()),
                Section::Network => manifest.network.push(line.to_string()),
                Section::Settings => manifest.settings.push(line.to_string()),
                Section::Fallback => {
                    let mut tokens = line.split(' ').filter(|t| !t.is_empty());
                    if let (Some(namespace), Some(target)) = (tokens.next(), tokens.next()) {
                        manifest.fallback.insert(namespace.to_string(), target.to_string());
                    }
                }
                Section::Unknown => {}
            }
        }

        Ok(manifest)
    }
}

fn check_header(line: &str) -> Result<(), Error> {
    let Some(rest) = line.strip_prefix(SIGNATURE) else {
        return Err(Error::MalformedManifest(format!("invalid cache manifest header: {line}")));
    };
    match rest.chars().next() {
        None | Some(' ') | Some('\t') => Ok(()),
        Some(_) => Err(Error::MalformedManifest(format!("invalid cache manifest header: {line}"))),
    }
}
