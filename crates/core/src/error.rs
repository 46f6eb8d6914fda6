//! Unified error types for appshift.
//!
//! Structural failures (manifest fetch, manifest syntax, store writes, URL
//! resolution) are fatal to a migration. Per-URL fetch failures during content
//! population are absorbed by the engine and never reach callers.

use tokio_rusqlite::rusqlite;

/// Unified error types for the appshift workspace.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty page URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The manifest could not be fetched.
    #[error("MANIFEST_FETCH_FAILED: {0}")]
    ManifestFetch(String),

    /// The manifest text is not a valid cache manifest.
    #[error("MALFORMED_MANIFEST: {0}")]
    MalformedManifest(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// A store transaction could not be completed (record encoding, commit).
    #[error("STORE_ERROR: {0}")]
    StoreTransaction(String),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A URL could not be parsed or resolved.
    #[error("MALFORMED_URL: {0}")]
    MalformedUrl(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Network or HTTP transport error.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),
}

impl Error {
    /// Stable error code, matching the prefix of the display string.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::ManifestFetch(_) => "MANIFEST_FETCH_FAILED",
            Error::MalformedManifest(_) => "MALFORMED_MANIFEST",
            Error::Database(_) | Error::StoreTransaction(_) | Error::MigrationFailed(_) => "STORE_ERROR",
            Error::MalformedUrl(_) => "MALFORMED_URL",
            Error::FetchTimeout(_) => "FETCH_TIMEOUT",
            Error::FetchTooLarge(_) => "FETCH_TOO_LARGE",
            Error::HttpError(_) => "HTTP_ERROR",
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::StoreTransaction(format!("record encoding: {err}"))
    }
}
