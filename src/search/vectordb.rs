//! Index storage using SQLite
//!
//! Each build is written as an immutable generation holding both the vector
//! blob and its row table. A `current` row points every collection at its
//! live generation; swapping that pointer inside one transaction is what
//! makes rebuilds atomic for concurrent readers.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::index::{Metric, VectorIndex};
use crate::core::error::{Result, SearchError};

/// Maps an index row back to the record it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub row: usize,
    /// Workbook owning the record (differs per row for `All`)
    pub collection: String,
    pub id: String,
}

/// A built index and its row table. Always stored and loaded together.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedCollection {
    pub index: VectorIndex,
    pub entries: Vec<IndexEntry>,
    pub embedder: String,
    pub built_at: DateTime<Utc>,
}

impl IndexedCollection {
    pub fn rows(&self) -> usize {
        self.entries.len()
    }
}

/// Index statistics
#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    pub collection: String,
    pub rows: usize,
    pub dimension: usize,
    pub metric: String,
    pub embedder: String,
    pub built_at: DateTime<Utc>,
}

/// Persistent store of built indexes
pub struct IndexStore {
    conn: Connection,
}

impl IndexStore {
    /// Open or create database at path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- One immutable row per build
            CREATE TABLE IF NOT EXISTS generations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                metric TEXT NOT NULL,
                row_count INTEGER NOT NULL,
                embedder TEXT NOT NULL,
                built_at INTEGER NOT NULL,
                vectors BLOB NOT NULL,
                row_map TEXT NOT NULL  -- JSON array of IndexEntry
            );

            -- Live generation per collection
            CREATE TABLE IF NOT EXISTS current (
                collection TEXT PRIMARY KEY,
                generation INTEGER NOT NULL REFERENCES generations(id)
            );

            CREATE INDEX IF NOT EXISTS idx_generations_collection ON generations(collection);
            "#,
        )?;

        Ok(())
    }

    /// Make `built` the live index for `collection`.
    ///
    /// Insert, repoint and cleanup commit together; on any error the
    /// previous generation stays current.
    pub fn replace(&mut self, collection: &str, built: &IndexedCollection) -> Result<()> {
        let row_map = serde_json::to_string(&built.entries)?;
        let blob = built.index.to_blob();

        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO generations (collection, dimension, metric, row_count, embedder, built_at, vectors, row_map)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                collection,
                built.index.dimension() as i64,
                built.index.metric().as_str(),
                built.index.len() as i64,
                built.embedder,
                built.built_at.timestamp_millis(),
                blob,
                row_map,
            ],
        )?;
        let generation = tx.last_insert_rowid();

        tx.execute(
            r#"
            INSERT INTO current (collection, generation) VALUES (?1, ?2)
            ON CONFLICT(collection) DO UPDATE SET generation = excluded.generation
            "#,
            params![collection, generation],
        )?;

        tx.execute(
            "DELETE FROM generations WHERE collection = ?1 AND id != ?2",
            params![collection, generation],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Load the live index for `collection`, if one was ever built.
    pub fn load(&self, collection: &str) -> Result<Option<IndexedCollection>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT g.dimension, g.metric, g.row_count, g.embedder, g.built_at, g.vectors, g.row_map
                FROM current c
                JOIN generations g ON g.id = c.generation
                WHERE c.collection = ?1
                "#,
                params![collection],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((dimension, metric, row_count, embedder, built_at, blob, row_map)) = row else {
            return Ok(None);
        };

        let corrupt = |reason: String| SearchError::corrupt(collection, reason);

        let metric: Metric = metric.parse().map_err(corrupt)?;
        let index = VectorIndex::from_blob(&blob, row_count as usize, dimension as usize, metric)
            .map_err(|e| corrupt(e.to_string()))?;

        let entries: Vec<IndexEntry> = serde_json::from_str(&row_map)
            .map_err(|e| corrupt(format!("unreadable row table: {}", e)))?;
        if entries.len() != index.len() {
            return Err(corrupt(format!(
                "row table has {} entries for {} vectors",
                entries.len(),
                index.len()
            )));
        }
        if let Some(entry) = entries.iter().enumerate().find(|(i, e)| e.row != *i) {
            return Err(corrupt(format!("row table out of order at row {}", entry.0)));
        }

        let built_at = DateTime::from_timestamp_millis(built_at)
            .ok_or_else(|| corrupt(format!("bad build timestamp {}", built_at)))?;

        Ok(Some(IndexedCollection {
            index,
            entries,
            embedder,
            built_at,
        }))
    }

    /// Drop every generation of `collection`. Returns whether one was live.
    pub fn remove(&mut self, collection: &str) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM current WHERE collection = ?1", params![collection])?;
        tx.execute("DELETE FROM generations WHERE collection = ?1", params![collection])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Summaries of every live index, by collection name.
    pub fn stats(&self) -> Result<Vec<IndexSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.collection, g.row_count, g.dimension, g.metric, g.embedder, g.built_at
            FROM current c
            JOIN generations g ON g.id = c.generation
            ORDER BY c.collection
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (collection, rows, dimension, metric, embedder, built_at) = row?;
            result.push(IndexSummary {
                collection,
                rows: rows as usize,
                dimension: dimension as usize,
                metric,
                embedder,
                built_at: DateTime::from_timestamp_millis(built_at).unwrap_or_default(),
            });
        }
        Ok(result)
    }
}
