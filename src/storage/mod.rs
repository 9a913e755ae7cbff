pub mod repository;

use std::path::Path;

use rusqlite_migration::{Migrations, M};

use crate::error::{Error, Result};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
                       PRAGMA foreign_keys=ON;
                       PRAGMA busy_timeout=5000;";

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!("migrations/001_initial.sql"))])
}

/// SQLite store holding imported CRM records and configuration.
///
/// File-backed stores keep a writer and a reader connection over WAL so
/// reports can load while an import is in flight. An in-memory store is
/// private to its connection, so both handles point at the same one.
#[derive(Clone)]
pub struct Database {
    writer: tokio_rusqlite::Connection,
    reader: tokio_rusqlite::Connection,
}

impl Database {
    /// Open `~/.crmkpi/crmkpi.db`, creating the directory if needed.
    pub async fn open() -> Result<Self> {
        let dir = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?
            .join(".crmkpi");
        std::fs::create_dir_all(&dir)?;
        Self::open_at(dir.join("crmkpi.db")).await
    }

    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("opening database at {}", path.display());

        let writer = tokio_rusqlite::Connection::open(&path).await?;
        prepare(&writer, true).await?;
        let reader = tokio_rusqlite::Connection::open(&path).await?;
        prepare(&reader, false).await?;

        Ok(Self { writer, reader })
    }

    pub async fn open_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        prepare(&conn, true).await?;
        Ok(Self {
            reader: conn.clone(),
            writer: conn,
        })
    }

    /// Connection for imports and config changes.
    pub fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.writer
    }

    /// Connection for report snapshots.
    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        &self.reader
    }
}

/// Apply connection pragmas, and bring the schema up to date on the
/// connection that owns writes.
async fn prepare(conn: &tokio_rusqlite::Connection, migrate: bool) -> Result<()> {
    conn.call(|conn| conn.execute_batch(PRAGMAS)).await?;
    if migrate {
        conn.call(|conn| migrations().to_latest(conn))
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;
    }
    Ok(())
}
