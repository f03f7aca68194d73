//! SQLite Backend Module
//!
//! Durable backend on a single SQLite file accessed through tokio-rusqlite,
//! so entries survive process restarts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use tokio_rusqlite::{params, Connection};
use tracing::info;

use crate::cache::{BackendError, DurableBackend, Partition, StoredRecord};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cache_partitions (
         name TEXT PRIMARY KEY
     );
     CREATE TABLE IF NOT EXISTS cache_entries (
         partition TEXT NOT NULL REFERENCES cache_partitions(name) ON DELETE CASCADE,
         key TEXT NOT NULL,
         payload TEXT NOT NULL,
         created_at INTEGER NOT NULL,
         expires_at INTEGER NOT NULL,
         PRIMARY KEY (partition, key)
     );";

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite-backed durable storage.
///
/// The connection is opened by the first `open` call; every other operation
/// fails until then.
#[derive(Debug)]
pub struct SqliteBackend {
    location: Location,
    conn: OnceCell<Connection>,
}

impl SqliteBackend {
    /// Backend on the SQLite file at `path`, created on open if missing.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            location: Location::File(path.as_ref().to_path_buf()),
            conn: OnceCell::new(),
        }
    }

    /// Backend on a private in-memory database, for tests.
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: OnceCell::new(),
        }
    }

    fn connection(&self) -> Result<&Connection, BackendError> {
        self.conn
            .get()
            .ok_or_else(|| BackendError("database is not open".to_string()))
    }

    async fn connect(&self) -> Result<Connection, BackendError> {
        let conn = match &self.location {
            Location::File(path) => Connection::open(path.clone()).await,
            Location::Memory => Connection::open_in_memory().await,
        }
        .map_err(|e| BackendError(e.to_string()))?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(PRAGMAS)?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(|e| BackendError(e.to_string()))?;

        if let Location::File(path) = &self.location {
            info!("Opened cache database at {}", path.display());
        }
        Ok(conn)
    }
}

#[async_trait]
impl DurableBackend for SqliteBackend {
    async fn open(&self, partitions: &[Partition]) -> Result<(), BackendError> {
        let conn = self.conn.get_or_try_init(|| self.connect()).await?;
        let names: Vec<&'static str> = partitions.iter().map(|p| p.name()).collect();

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            for name in &names {
                tx.execute(
                    "INSERT OR IGNORE INTO cache_partitions (name) VALUES (?1)",
                    params![name],
                )?;
            }
            tx.commit()
        })
        .await
        .map_err(|e| BackendError(e.to_string()))
    }

    async fn get(
        &self,
        partition: Partition,
        key: &str,
    ) -> Result<Option<StoredRecord>, BackendError> {
        let key = key.to_string();
        let partition = partition.name();
        self.connection()?
            .call(move |conn| -> Result<Option<StoredRecord>, rusqlite::Error> {
                conn.query_row(
                    "SELECT payload, created_at, expires_at FROM cache_entries
                     WHERE partition = ?1 AND key = ?2",
                    params![partition, key],
                    |row| {
                        Ok(StoredRecord {
                            payload: row.get(0)?,
                            created_at: row.get(1)?,
                            expires_at: row.get(2)?,
                        })
                    },
                )
                .optional()
            })
            .await
            .map_err(|e| BackendError(e.to_string()))
    }

    async fn put(
        &self,
        partition: Partition,
        key: &str,
        record: StoredRecord,
    ) -> Result<(), BackendError> {
        let key = key.to_string();
        let partition = partition.name();
        self.connection()?
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO cache_entries (partition, key, payload, created_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(partition, key) DO UPDATE SET
                         payload = excluded.payload,
                         created_at = excluded.created_at,
                         expires_at = excluded.expires_at",
                    params![
                        partition,
                        key,
                        record.payload,
                        record.created_at,
                        record.expires_at
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| BackendError(e.to_string()))
    }

    async fn delete(&self, partition: Partition, key: &str) -> Result<(), BackendError> {
        let key = key.to_string();
        let partition = partition.name();
        self.connection()?
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "DELETE FROM cache_entries WHERE partition = ?1 AND key = ?2",
                    params![partition, key],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| BackendError(e.to_string()))
    }

    async fn delete_if_expires_at(
        &self,
        partition: Partition,
        key: &str,
        expires_at: i64,
    ) -> Result<bool, BackendError> {
        let key = key.to_string();
        let partition = partition.name();
        self.connection()?
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let removed = conn.execute(
                    "DELETE FROM cache_entries
                     WHERE partition = ?1 AND key = ?2 AND expires_at = ?3",
                    params![partition, key, expires_at],
                )?;
                Ok(removed > 0)
            })
            .await
            .map_err(|e| BackendError(e.to_string()))
    }

    async fn clear(&self, partition: Partition) -> Result<(), BackendError> {
        let partition = partition.name();
        self.connection()?
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "DELETE FROM cache_entries WHERE partition = ?1",
                    params![partition],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| BackendError(e.to_string()))
    }

    async fn count(&self, partition: Partition) -> Result<usize, BackendError> {
        let partition = partition.name();
        let count = self
            .connection()?
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE partition = ?1",
                    params![partition],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(|e| BackendError(e.to_string()))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
