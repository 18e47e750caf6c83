//! Store registry operations.
//!
//! Stores are created lazily by name and enumerated in creation order.
//! Deleting a store removes all of its entries.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Entry count and payload size of one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoreStats {
    pub name: String,
    pub entries: u64,
    pub body_bytes: u64,
}

impl CacheDb {
    /// Open a store, creating it if it doesn't exist.
    pub async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a store exists.
    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List every store name in creation order.
    pub async fn list_stores(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and all of its entries.
    ///
    /// Returns false if no such store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry count and body size for every store, in creation order.
    pub async fn store_stats(&self) -> Result<Vec<StoreStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<StoreStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT s.name, COUNT(e.seq), COALESCE(SUM(LENGTH(e.body)), 0)
                    FROM stores s LEFT JOIN entries e ON e.store = s.name
                    GROUP BY s.id ORDER BY s.id ASC",
                )?;
                let stats = stmt
                    .query_map([], |row| {
                        Ok(StoreStats {
                            name: row.get(0)?,
                            entries: row.get::<_, i64>(1)? as u64,
                            body_bytes: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_store_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("casa-v1-static").await.unwrap();
        db.open_store("casa-v1-static").await.unwrap();

        assert!(db.has_store("casa-v1-static").await.unwrap());
        assert_eq!(db.list_stores().await.unwrap(), vec!["casa-v1-static".to_string()]);
    }

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["b-static", "a-image", "c-dynamic"] {
            db.open_store(name).await.unwrap();
        }
        assert_eq!(db.list_stores().await.unwrap(), vec!["b-static", "a-image", "c-dynamic"]);
    }

    #[tokio::test]
    async fn test_delete_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("casa-v1-image").await.unwrap();

        assert!(db.delete_store("casa-v1-image").await.unwrap());
        assert!(!db.delete_store("casa-v1-image").await.unwrap());
        assert!(!db.has_store("casa-v1-image").await.unwrap());
    }

    #[tokio::test]
    async fn test_stats_for_empty_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("casa-v1-dynamic").await.unwrap();

        let stats = db.store_stats().await.unwrap();
        assert_eq!(stats, vec![StoreStats { name: "casa-v1-dynamic".into(), entries: 0, body_bytes: 0 }]);
    }
}
