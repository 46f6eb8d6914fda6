//! Generation storage on top of [`StoreDb`].

use super::connection::StoreDb;
use super::{CacheHandle, ContentCache, GenerationId};
use crate::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// A stored HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// URL the response was served from
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A generation and the number of responses stored in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub id: GenerationId,
    pub created_at: String,
    pub entries: u64,
}

/// Handle to one generation inside a [`StoreDb`].
#[derive(Debug, Clone)]
pub struct GenerationHandle {
    db: StoreDb,
    generation: GenerationId,
}

type ResponseRow = (String, u16, String, Vec<u8>);

fn read_response_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResponseRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode_response((url, status, headers_json, body): ResponseRow) -> Result<CachedResponse, Error> {
    let headers = serde_json::from_str(&headers_json)?;
    Ok(CachedResponse { url, status, headers, body })
}

#[async_trait]
impl ContentCache for StoreDb {
    type Handle = GenerationHandle;

    async fn open(&self, generation: &GenerationId) -> Result<GenerationHandle, Error> {
        let id = generation.as_str().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (id, created_at) VALUES (?1, ?2)",
                    params![id, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(GenerationHandle { db: self.clone(), generation: generation.clone() })
    }

    async fn match_any_generation(&self, request_key: &str) -> Result<Option<CachedResponse>, Error> {
        let key = request_key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT response_url, status, headers_json, body FROM generation_entries
                         WHERE request_key = ?1 ORDER BY seq DESC LIMIT 1",
                        params![key],
                        read_response_row,
                    )
                    .optional()?;
                row.map(decode_response).transpose()
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheHandle for GenerationHandle {
    fn generation(&self) -> &GenerationId {
        &self.generation
    }

    async fn write(&self, request_key: &str, response: &CachedResponse) -> Result<(), Error> {
        let generation = self.generation.as_str().to_string();
        let key = request_key.to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                // REPLACE re-inserts the row, so the entry gets a fresh seq and
                // becomes the newest match for its key.
                conn.execute(
                    "INSERT OR REPLACE INTO generation_entries
                        (generation, request_key, response_url, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![generation, key, response.url, response.status, headers_json, response.body, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn read(&self, request_key: &str) -> Result<Option<CachedResponse>, Error> {
        let generation = self.generation.as_str().to_string();
        let key = request_key.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT response_url, status, headers_json, body FROM generation_entries
                         WHERE generation = ?1 AND request_key = ?2",
                        params![generation, key],
                        read_response_row,
                    )
                    .optional()?;
                row.map(decode_response).transpose()
            })
            .await
            .map_err(Error::from)
    }
}

impl StoreDb {
    /// List all generations in creation order.
    pub async fn generations(&self) -> Result<Vec<GenerationSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.id, g.created_at,
                        (SELECT COUNT(*) FROM generation_entries e WHERE e.generation = g.id)
                     FROM generations g ORDER BY g.rowid",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(GenerationSummary {
                        id: GenerationId::new(row.get::<_, String>(0)?),
                        created_at: row.get(1)?,
                        entries: row.get::<_, i64>(2)? as u64,
                    })
                })?;
                let summaries = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }
}
