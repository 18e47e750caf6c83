//! Entry read/write operations.
//!
//! Entries are keyed by request identity within a store. Each entry carries
//! a monotonically increasing sequence number, which is the insertion-order
//! ledger used by eviction. Re-putting a key moves it to the newest position.

use super::connection::CacheDb;
use super::hash::request_key;
use crate::request::Request;
use crate::response::{Response, ResponseHead};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

type EntryRow = (i64, String, Vec<u8>);

fn decode(row: EntryRow) -> Result<Response, Error> {
    let (status, headers_json, body) = row;
    let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status} out of range")))?;
    let headers: Vec<(String, String)> =
        serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
    Ok(Response::from_parts(ResponseHead { status, headers }, body))
}

/// A response flattened into column values, ready to insert.
pub(crate) struct EncodedEntry {
    pub(crate) key_hash: String,
    method: String,
    url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl EncodedEntry {
    /// Consumes the response body; fails with `BodyUsed` if it was already read.
    pub(crate) fn encode(request: &Request, response: Response) -> Result<Self, Error> {
        let head = response.head();
        let body = response.into_body()?.to_vec();
        let headers_json =
            serde_json::to_string(&head.headers).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;

        Ok(Self {
            key_hash: request_key(request),
            method: request.method().to_string(),
            url: request.url().to_string(),
            status: i64::from(head.status),
            headers_json,
            body,
        })
    }
}

/// Register `store` if needed, then replace any entry with the same key.
///
/// Runs inside the caller's transaction.
pub(crate) fn insert_entry(conn: &rusqlite::Connection, store: &str, entry: &EncodedEntry, now: &str) -> Result<(), Error> {
    conn.execute("INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)", params![store, now])?;
    conn.execute("DELETE FROM entries WHERE store = ?1 AND key_hash = ?2", params![store, entry.key_hash])?;
    conn.execute(
        "INSERT INTO entries (store, key_hash, method, url, status, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![store, entry.key_hash, entry.method, entry.url, entry.status, entry.headers_json, entry.body, now],
    )?;
    Ok(())
}

impl CacheDb {
    /// Write a response into a store under the request's identity.
    ///
    /// Creates the store if it doesn't exist. Consumes the response body, so
    /// callers that still need the payload must pass a duplicate.
    pub async fn put(&self, store: &str, request: &Request, response: Response) -> Result<(), Error> {
        let entry = EncodedEntry::encode(request, response)?;
        let store = store.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                insert_entry(&tx, &store, &entry, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request in one store.
    pub async fn match_in(&self, store: &str, request: &Request) -> Result<Option<Response>, Error> {
        let store = store.to_string();
        let key_hash = request_key(request);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT status, headers_json, body FROM entries WHERE store = ?1 AND key_hash = ?2",
                    params![store, key_hash],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                );
                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode).transpose()
    }

    /// Look up a request across every store, oldest store first.
    pub async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key_hash = request_key(request);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT e.status, e.headers_json, e.body
                    FROM entries e JOIN stores s ON s.name = e.store
                    WHERE e.key_hash = ?1
                    ORDER BY s.id ASC LIMIT 1",
                    params![key_hash],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                );
                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode).transpose()
    }

    /// Request URLs stored in `store`, oldest first.
    pub async fn keys(&self, store: &str) -> Result<Vec<String>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE store = ?1 ORDER BY seq ASC")?;
                let urls = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in `store`.
    pub async fn count(&self, store: &str) -> Result<usize, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns false if it wasn't present.
    pub async fn delete_entry(&self, store: &str, request: &Request) -> Result<bool, Error> {
        let store = store.to_string();
        let key_hash = request_key(request);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM entries WHERE store = ?1 AND key_hash = ?2", params![store, key_hash])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
