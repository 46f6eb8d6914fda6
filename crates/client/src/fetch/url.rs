//! URL resolution and canonicalization.

use std::borrow::Cow;

use appshift_core::Error;
use appshift_core::manifest::NETWORK_WILDCARD;
use url::Url;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::Empty => Error::InvalidInput(err.to_string()),
            _ => Error::MalformedUrl(err.to_string()),
        }
    }
}

/// Resolve `relative` against `base`, returning the absolute URL.
///
/// The network wildcard `*` is returned unchanged.
pub fn resolve(base: &str, relative: &str) -> Result<String, UrlError> {
    if relative == NETWORK_WILDCARD {
        return Ok(relative.to_string());
    }

    Url::parse(base)
        .map_err(|e| UrlError::InvalidUrl(format!("{base}: {e}")))?
        .join(relative)
        .map(String::from)
        .map_err(|e| UrlError::InvalidUrl(format!("{relative}: {e}")))
}

/// Canonical form of a page URL, used as its association key.
///
/// Surrounding whitespace is trimmed, a missing scheme becomes `https`, and
/// the fragment is dropped. `url` already lowercases hosts of http(s) URLs.
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UrlError::Empty);
    }

    let with_scheme: Cow<'_, str> =
        if input.contains("://") { Cow::Borrowed(input) } else { Cow::Owned(format!("https://{input}")) };
    let mut page = Url::parse(&with_scheme).map_err(|e| UrlError::InvalidUrl(format!("{input}: {e}")))?;

    if !matches!(page.scheme(), "http" | "https") {
        return Err(UrlError::UnsupportedScheme(page.scheme().to_string()));
    }
    page.set_fragment(None);

    Ok(page)
}
