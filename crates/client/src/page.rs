//! Reading the manifest declaration of a page.

use crate::fetch::url::resolve;
use crate::fetch::{FetchRequest, Fetcher};
use appshift_core::Error;
use scraper::{Html, Selector};

/// A fetched page and the manifest it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredPage {
    /// URL the page was served from after redirects, without fragment.
    pub page_url: String,
    pub manifest_url: Option<String>,
}

/// The raw `manifest` attribute of the document's `<html>` element.
///
/// Returns `None` if the attribute is missing or blank.
pub fn manifest_reference(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("html[manifest]").expect("invalid selector");

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("manifest"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Absolute manifest URL declared by the page at `page_url`, if any.
pub fn manifest_url_for_page(page_url: &str, html: &str) -> Result<Option<String>, Error> {
    manifest_reference(html)
        .map(|reference| resolve(page_url, &reference).map_err(Error::from))
        .transpose()
}

/// Fetch `page_url` and read the manifest it declares.
///
/// The reference is resolved against the URL the page was finally served
/// from, which is also the page's association key.
///
/// # Errors
///
/// Transport errors from the fetcher, `Error::HttpError` for a non-2xx page.
pub async fn inspect_page<F>(fetcher: &F, page_url: &str) -> Result<DeclaredPage, Error>
where
    F: Fetcher + ?Sized,
{
    let response = fetcher.fetch(&FetchRequest::new(page_url)).await?;
    if !response.ok() {
        return Err(Error::HttpError(format!("{page_url}: status {}", response.status.as_u16())));
    }

    let mut served_from = response.final_url.clone();
    served_from.set_fragment(None);
    let page_url = String::from(served_from);
    if page_url != response.url.as_str() {
        tracing::debug!(requested = %response.url, page = %page_url, "page was redirected");
    }

    let manifest_url = manifest_url_for_page(&page_url, &response.text())?;
    Ok(DeclaredPage { page_url, manifest_url })
}
