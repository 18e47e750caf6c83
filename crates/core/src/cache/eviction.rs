//! Oldest-first eviction against a per-store entry budget.
//!
//! Bounded writes trim the store and insert in one transaction, so a store
//! never holds more than `budget` entries once a write completes, whatever
//! the number of concurrent writers. Replacing an existing key does not
//! grow the store and evicts nothing.

use super::connection::CacheDb;
use super::entries::{EncodedEntry, insert_entry};
use crate::request::Request;
use crate::response::Response;
use crate::Error;
use tokio_rusqlite::{params, rusqlite};

/// Delete the oldest entries of `store` until it holds at most `keep`.
fn trim_oldest(conn: &rusqlite::Connection, store: &str, keep: i64) -> Result<u64, Error> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
    if count <= keep {
        return Ok(0);
    }

    let deleted = conn.execute(
        "DELETE FROM entries WHERE seq IN (
            SELECT seq FROM entries WHERE store = ?1 ORDER BY seq ASC LIMIT ?2
        )",
        params![store, count - keep],
    )?;
    Ok(deleted as u64)
}

/// Make room for `entry` unless it replaces a key already in the store.
fn make_room(conn: &rusqlite::Connection, store: &str, entry: &EncodedEntry, budget: usize) -> Result<u64, Error> {
    let replacing: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM entries WHERE store = ?1 AND key_hash = ?2)",
        params![store, entry.key_hash],
        |row| row.get(0),
    )?;
    if replacing {
        return Ok(0);
    }
    trim_oldest(conn, store, budget as i64 - 1)
}

impl CacheDb {
    /// Make room for one more entry in `store`.
    ///
    /// `None` means the store is unbounded and nothing is deleted.
    /// Returns the number of deleted entries.
    pub async fn enforce_budget(&self, store: &str, budget: Option<usize>) -> Result<u64, Error> {
        let Some(budget) = budget else {
            return Ok(0);
        };
        let store = store.to_string();

        let deleted = self
            .conn
            .call(move |conn| -> Result<u64, Error> { trim_oldest(conn, &store, budget as i64 - 1) })
            .await
            .map_err(Error::from)?;

        if deleted > 0 {
            tracing::debug!(deleted, budget, "evicted oldest entries");
        }

        Ok(deleted)
    }

    /// Evict as needed and write one entry, atomically.
    ///
    /// Returns the number of evicted entries.
    pub async fn put_bounded(
        &self, store: &str, request: &Request, response: Response, budget: Option<usize>,
    ) -> Result<u64, Error> {
        let entry = EncodedEntry::encode(request, response)?;
        self.put_all_bounded(store, vec![entry], budget).await
    }

    /// Write a batch of responses in one transaction, evicting as each lands.
    ///
    /// Either every entry is written or none is. Returns the number of
    /// evicted entries.
    pub async fn put_batch_bounded(
        &self, store: &str, batch: Vec<(Request, Response)>, budget: Option<usize>,
    ) -> Result<u64, Error> {
        let entries = batch
            .into_iter()
            .map(|(request, response)| EncodedEntry::encode(&request, response))
            .collect::<Result<Vec<_>, _>>()?;
        self.put_all_bounded(store, entries, budget).await
    }

    async fn put_all_bounded(&self, store: &str, entries: Vec<EncodedEntry>, budget: Option<usize>) -> Result<u64, Error> {
        let store = store.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let evicted = self
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut evicted = 0;
                for entry in &entries {
                    if let Some(budget) = budget {
                        evicted += make_room(&tx, &store, entry, budget)?;
                    }
                    insert_entry(&tx, &store, entry, &now)?;
                }
                tx.commit()?;
                Ok(evicted)
            })
            .await
            .map_err(Error::from)?;

        if evicted > 0 {
            tracing::debug!(evicted, ?budget, "evicted oldest entries");
        }

        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::response::Response;

    async fn fill(db: &CacheDb, store: &str, n: usize) {
        for i in 0..n {
            let req = Request::get(&format!("https://casa.example/img/{i}.webp")).unwrap();
            db.put(store, &req, Response::new(200, Vec::new(), "img")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_unbounded_store_skips() {
        let db = CacheDb::open_in_memory().await.unwrap();
        fill(&db, "v1-static", 5).await;

        assert_eq!(db.enforce_budget("v1-static", None).await.unwrap(), 0);
        assert_eq!(db.count("v1-static").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_under_budget_deletes_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        fill(&db, "v1-image", 3).await;

        assert_eq!(db.enforce_budget("v1-image", Some(4)).await.unwrap(), 0);
        assert_eq!(db.count("v1-image").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_at_budget_makes_room_for_one() {
        let db = CacheDb::open_in_memory().await.unwrap();
        fill(&db, "v1-image", 4).await;

        assert_eq!(db.enforce_budget("v1-image", Some(4)).await.unwrap(), 1);
        assert_eq!(
            db.keys("v1-image").await.unwrap(),
            vec![
                "https://casa.example/img/1.webp",
                "https://casa.example/img/2.webp",
                "https://casa.example/img/3.webp",
            ]
        );
    }

    #[tokio::test]
    async fn test_over_budget_trims_oldest() {
        let db = CacheDb::open_in_memory().await.unwrap();
        fill(&db, "v1-dynamic", 10).await;

        assert_eq!(db.enforce_budget("v1-dynamic", Some(5)).await.unwrap(), 6);
        let keys = db.keys("v1-dynamic").await.unwrap();
        assert_eq!(keys.len(), 4);
        assert_eq!(keys[0], "https://casa.example/img/6.webp");
    }

    #[tokio::test]
    async fn test_budget_is_per_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        fill(&db, "v1-image", 3).await;
        fill(&db, "v1-dynamic", 3).await;

        db.enforce_budget("v1-image", Some(1)).await.unwrap();
        assert_eq!(db.count("v1-image").await.unwrap(), 0);
        assert_eq!(db.count("v1-dynamic").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_put_bounded_at_budget_evicts_oldest() {
        let db = CacheDb::open_in_memory().await.unwrap();
        fill(&db, "v1-image", 3).await;

        let req = Request::get("https://casa.example/img/nueva.webp").unwrap();
        let evicted = db.put_bounded("v1-image", &req, Response::new(200, Vec::new(), "img"), Some(3)).await.unwrap();
        assert_eq!(evicted, 1);
        assert_eq!(
            db.keys("v1-image").await.unwrap(),
            vec![
                "https://casa.example/img/1.webp",
                "https://casa.example/img/2.webp",
                "https://casa.example/img/nueva.webp",
            ]
        );
    }

    #[tokio::test]
    async fn test_put_bounded_replacing_key_evicts_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        fill(&db, "v1-image", 3).await;

        let req = Request::get("https://casa.example/img/1.webp").unwrap();
        let evicted = db.put_bounded("v1-image", &req, Response::new(200, Vec::new(), "img2"), Some(3)).await.unwrap();
        assert_eq!(evicted, 0);
        assert_eq!(
            db.keys("v1-image").await.unwrap(),
            vec![
                "https://casa.example/img/0.webp",
                "https://casa.example/img/2.webp",
                "https://casa.example/img/1.webp",
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_bounded_writers_respect_budget() {
        let db = CacheDb::open_in_memory().await.unwrap();

        let writers = (0..20).map(|i| {
            let db = db.clone();
            tokio::spawn(async move {
                let req = Request::get(&format!("https://casa.example/img/{i}.webp")).unwrap();
                db.put_bounded("v1-image", &req, Response::new(200, Vec::new(), "img"), Some(5)).await.unwrap();
            })
        });
        for writer in writers.collect::<Vec<_>>() {
            writer.await.unwrap();
        }

        assert_eq!(db.count("v1-image").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_batch_applies_budget() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let batch = ["/", "/manifest.json", "/icon.png"]
            .iter()
            .map(|path| {
                let req = Request::get(&format!("https://casa.example{path}")).unwrap();
                (req, Response::new(200, Vec::new(), "x"))
            })
            .collect();

        assert_eq!(db.put_batch_bounded("v1-static", batch, Some(2)).await.unwrap(), 1);
        assert_eq!(
            db.keys("v1-static").await.unwrap(),
            vec!["https://casa.example/manifest.json", "https://casa.example/icon.png"]
        );
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut used = Response::new(200, Vec::new(), "y");
        used.take_body().unwrap();
        let batch = vec![
            (Request::get("https://casa.example/").unwrap(), Response::new(200, Vec::new(), "x")),
            (Request::get("https://casa.example/app.css").unwrap(), used),
        ];

        assert!(matches!(db.put_batch_bounded("v1-static", batch, None).await, Err(Error::BodyUsed)));
        assert_eq!(db.count("v1-static").await.unwrap(), 0);
        assert!(!db.has_store("v1-static").await.unwrap());
    }
}
