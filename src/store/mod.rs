//! SQLite record storage for snapshots, files, and chunks.
//!
//! Three tables:
//! - snapshots: id, timestamp, directory_size, technique
//! - files: snapshot_id, path, digest, content (content NULL under the chunked technique)
//! - chunks: snapshot_id, path, seq, digest, content
//!
//! A files row exists for every captured file under both techniques; it is the
//! per-snapshot path index. Chunk bytes are keyed by (snapshot_id, path, seq)
//! and must be read back in ascending seq order for reassembly to be correct.
//!
//! Paths are BLOBs holding the raw OS path bytes, not TEXT: filenames on unix
//! are arbitrary bytes, and a lossy UTF-8 conversion would corrupt them.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::technique::Technique;

/// Snapshot metadata stored in database
#[derive(Debug, Clone)]
pub struct SnapshotRecord {
    pub id: i64,
    pub timestamp: i64,
    pub directory_size: u64,
    pub technique: Technique,
}

/// One captured file. Content is present under the whole-file technique and
/// NULL under chunked, where the bytes live in chunk rows instead.
#[derive(Debug)]
pub struct FileRecord {
    pub id: i64,
    pub snapshot_id: i64,
    /// Raw OS path bytes, relative to the snapshot root.
    pub path: Vec<u8>,
    pub digest: String,
    pub content: Option<Vec<u8>>,
}

/// One chunk of a chunked file, identified by its 0-based sequence number.
#[derive(Debug)]
pub struct ChunkRecord {
    pub snapshot_id: i64,
    /// Raw OS path bytes, relative to the snapshot root.
    pub path: Vec<u8>,
    pub seq: i64,
    pub digest: String,
    pub content: Vec<u8>,
}

/// Get the database path (~/.local/share/snapvault/snapvault.db or platform equivalent)
fn default_db_path() -> Result<PathBuf> {
    let data_dir = directories::ProjectDirs::from("", "", "snapvault")
        .ok_or_else(|| Error::Config("could not determine data directory".to_string()))?
        .data_dir()
        .to_path_buf();

    std::fs::create_dir_all(&data_dir).map_err(|e| Error::io(&data_dir, e))?;
    Ok(data_dir.join("snapvault.db"))
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            directory_size INTEGER NOT NULL,
            technique TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            snapshot_id INTEGER NOT NULL,
            path BLOB NOT NULL,
            digest TEXT NOT NULL,
            content BLOB,
            FOREIGN KEY(snapshot_id) REFERENCES snapshots(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS chunks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            snapshot_id INTEGER NOT NULL,
            path BLOB NOT NULL,
            seq INTEGER NOT NULL,
            digest TEXT NOT NULL,
            content BLOB NOT NULL,
            FOREIGN KEY(snapshot_id) REFERENCES snapshots(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_files_snapshot_id ON files(snapshot_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_chunks_snapshot_path ON chunks(snapshot_id, path)",
        [],
    )?;

    Ok(())
}

/// Database handle. Open once per command, reuse across all operations.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open() -> Result<Self> {
        Self::open_at(&default_db_path()?)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;
        Ok(Store { conn })
    }

    /// Create the parent snapshot row. Must succeed before any file or chunk
    /// record is written for it.
    pub fn create_snapshot(
        &self,
        timestamp: i64,
        directory_size: u64,
        technique: Technique,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO snapshots (timestamp, directory_size, technique)
             VALUES (?1, ?2, ?3)",
            params![
                timestamp,
                i64::try_from(directory_size).unwrap_or(i64::MAX),
                technique.as_str()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_snapshot(&self, id: i64) -> Result<Option<SnapshotRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, directory_size, technique
             FROM snapshots
             WHERE id = ?1",
        )?;

        let mut rows = stmt.query(params![id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(snapshot_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// List all snapshots, oldest first.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, directory_size, technique
             FROM snapshots
             ORDER BY id ASC",
        )?;

        let snapshots = stmt
            .query_map([], snapshot_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(snapshots)
    }

    pub fn insert_file(
        &self,
        snapshot_id: i64,
        path: &[u8],
        digest: &str,
        content: Option<&[u8]>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO files (snapshot_id, path, digest, content)
             VALUES (?1, ?2, ?3, ?4)",
            params![snapshot_id, path, digest, content],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_chunk(
        &self,
        snapshot_id: i64,
        path: &[u8],
        seq: i64,
        digest: &str,
        content: &[u8],
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO chunks (snapshot_id, path, seq, digest, content)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![snapshot_id, path, seq, digest, content],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Load file records for a snapshot, ordered by path for stable output.
    pub fn get_files(&self, snapshot_id: i64) -> Result<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, snapshot_id, path, digest, content
             FROM files
             WHERE snapshot_id = ?1
             ORDER BY path ASC",
        )?;

        let files = stmt
            .query_map(params![snapshot_id], file_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    /// Load the chunks of one file in ascending sequence order. This ordering
    /// is the reassembly contract; callers must write chunks in the order
    /// returned here.
    pub fn get_chunks(&self, snapshot_id: i64, path: &[u8]) -> Result<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT snapshot_id, path, seq, digest, content
             FROM chunks
             WHERE snapshot_id = ?1 AND path = ?2
             ORDER BY seq ASC",
        )?;

        let chunks = stmt
            .query_map(params![snapshot_id, path], chunk_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(chunks)
    }

    /// Delete a snapshot and every file and chunk record referencing it, in one
    /// transaction so no orphaned rows survive a partial failure.
    pub fn delete_snapshot(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM chunks WHERE snapshot_id = ?1", params![id])?;
        tx.execute("DELETE FROM files WHERE snapshot_id = ?1", params![id])?;
        tx.execute("DELETE FROM snapshots WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    /// Bytes stored for one snapshot: file content plus chunk data.
    pub fn stored_size(&self, snapshot_id: i64) -> Result<u64> {
        let files: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(content)), 0) FROM files WHERE snapshot_id = ?1",
            params![snapshot_id],
            |row| row.get(0),
        )?;
        let chunks: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(content)), 0) FROM chunks WHERE snapshot_id = ?1",
            params![snapshot_id],
            |row| row.get(0),
        )?;
        Ok(files.max(0) as u64 + chunks.max(0) as u64)
    }

    /// Bytes stored across all snapshots.
    pub fn total_stored_size(&self) -> Result<u64> {
        let files: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(content)), 0) FROM files",
            [],
            |row| row.get(0),
        )?;
        let chunks: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(content)), 0) FROM chunks",
            [],
            |row| row.get(0),
        )?;
        Ok(files.max(0) as u64 + chunks.max(0) as u64)
    }

    /// Every file record across all snapshots, including chunked ones whose
    /// content is NULL. Used by the integrity check.
    pub fn all_files(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, snapshot_id, path, digest, content
             FROM files
             ORDER BY snapshot_id ASC, path ASC",
        )?;

        let files = stmt
            .query_map([], file_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    /// Every chunk record across all snapshots. Used by the integrity check.
    pub fn all_chunks(&self) -> Result<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT snapshot_id, path, seq, digest, content
             FROM chunks
             ORDER BY snapshot_id ASC, path ASC, seq ASC",
        )?;

        let chunks = stmt
            .query_map([], chunk_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(chunks)
    }
}

fn snapshot_from_row(row: &rusqlite::Row) -> rusqlite::Result<SnapshotRecord> {
    let technique_str: String = row.get(3)?;
    // a tag we cannot interpret means we cannot restore the snapshot
    // correctly; fail the row instead of guessing a technique
    let technique = technique_str.parse::<Technique>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(SnapshotRecord {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        directory_size: row.get::<_, i64>(2)?.max(0) as u64,
        technique,
    })
}

fn file_from_row(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        snapshot_id: row.get(1)?,
        path: row.get(2)?,
        digest: row.get(3)?,
        content: row.get(4)?,
    })
}

fn chunk_from_row(row: &rusqlite::Row) -> rusqlite::Result<ChunkRecord> {
    Ok(ChunkRecord {
        snapshot_id: row.get(0)?,
        path: row.get(1)?,
        seq: row.get(2)?,
        digest: row.get(3)?,
        content: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open_at(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn create_and_get_snapshot() {
        let (_dir, store) = temp_store();
        let id = store
            .create_snapshot(1_700_000_000, 4096, Technique::WholeFile)
            .unwrap();

        let record = store.get_snapshot(id).unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.timestamp, 1_700_000_000);
        assert_eq!(record.directory_size, 4096);
        assert_eq!(record.technique, Technique::WholeFile);
    }

    #[test]
    fn get_snapshot_absent_is_none() {
        let (_dir, store) = temp_store();
        assert!(store.get_snapshot(99).unwrap().is_none());
    }

    #[test]
    fn chunks_come_back_in_seq_order_regardless_of_insert_order() {
        let (_dir, store) = temp_store();
        let id = store.create_snapshot(0, 0, Technique::Chunked).unwrap();

        store.insert_chunk(id, b"a.bin", 2, "d2", b"third").unwrap();
        store.insert_chunk(id, b"a.bin", 0, "d0", b"first").unwrap();
        store.insert_chunk(id, b"a.bin", 1, "d1", b"second").unwrap();

        let chunks = store.get_chunks(id, b"a.bin").unwrap();
        let seqs: Vec<i64> = chunks.iter().map(|c| c.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(chunks[0].content, b"first");
        assert_eq!(chunks[2].content, b"third");
    }

    #[test]
    fn chunks_are_scoped_to_their_path() {
        let (_dir, store) = temp_store();
        let id = store.create_snapshot(0, 0, Technique::Chunked).unwrap();

        store.insert_chunk(id, b"a.bin", 0, "da", b"aaa").unwrap();
        store.insert_chunk(id, b"b.bin", 0, "db", b"bbb").unwrap();

        let chunks = store.get_chunks(id, b"a.bin").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, b"aaa");
    }

    #[test]
    fn delete_snapshot_removes_all_dependent_rows() {
        let (_dir, mut store) = temp_store();
        let id = store.create_snapshot(0, 0, Technique::Chunked).unwrap();
        store.insert_file(id, b"a.bin", "d", None).unwrap();
        store.insert_chunk(id, b"a.bin", 0, "d0", b"data").unwrap();

        store.delete_snapshot(id).unwrap();

        assert!(store.get_snapshot(id).unwrap().is_none());
        assert!(store.get_files(id).unwrap().is_empty());
        assert!(store.get_chunks(id, b"a.bin").unwrap().is_empty());
    }

    #[test]
    fn delete_leaves_other_snapshots_alone() {
        let (_dir, mut store) = temp_store();
        let keep = store.create_snapshot(0, 0, Technique::WholeFile).unwrap();
        let drop_id = store.create_snapshot(1, 0, Technique::WholeFile).unwrap();
        store.insert_file(keep, b"k.txt", "dk", Some(b"keep")).unwrap();
        store.insert_file(drop_id, b"d.txt", "dd", Some(b"drop")).unwrap();

        store.delete_snapshot(drop_id).unwrap();

        assert_eq!(store.get_files(keep).unwrap().len(), 1);
        assert!(store.get_snapshot(keep).unwrap().is_some());
    }

    #[test]
    fn stored_size_sums_file_and_chunk_bytes() {
        let (_dir, store) = temp_store();
        let a = store.create_snapshot(0, 0, Technique::WholeFile).unwrap();
        store.insert_file(a, b"x.txt", "d", Some(b"12345")).unwrap();

        let b = store.create_snapshot(1, 0, Technique::Chunked).unwrap();
        store.insert_file(b, b"y.bin", "d", None).unwrap();
        store.insert_chunk(b, b"y.bin", 0, "d0", b"123").unwrap();
        store.insert_chunk(b, b"y.bin", 1, "d1", b"45").unwrap();

        assert_eq!(store.stored_size(a).unwrap(), 5);
        assert_eq!(store.stored_size(b).unwrap(), 5);
        assert_eq!(store.total_stored_size().unwrap(), 10);
    }

    #[test]
    fn stored_size_of_empty_snapshot_is_zero() {
        let (_dir, store) = temp_store();
        let id = store.create_snapshot(0, 0, Technique::Chunked).unwrap();
        assert_eq!(store.stored_size(id).unwrap(), 0);
    }

    #[test]
    fn unknown_technique_tag_is_a_row_error() {
        let (_dir, store) = temp_store();
        store
            .conn
            .execute(
                "INSERT INTO snapshots (timestamp, directory_size, technique)
                 VALUES (1, 2, 'zip')",
                [],
            )
            .unwrap();
        let id = store.conn.last_insert_rowid();

        assert!(store.get_snapshot(id).is_err());
        assert!(store.list_snapshots().is_err());
    }

    #[test]
    fn paths_are_stored_as_raw_bytes() {
        let (_dir, store) = temp_store();
        let id = store.create_snapshot(0, 0, Technique::Chunked).unwrap();

        let path: &[u8] = b"bad-\xff-name.txt";
        store.insert_file(id, path, "d", None).unwrap();
        store.insert_chunk(id, path, 0, "d0", b"data").unwrap();

        let files = store.get_files(id).unwrap();
        assert_eq!(files[0].path, path);

        let chunks = store.get_chunks(id, path).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].path, path);
    }

    #[test]
    fn list_snapshots_returns_all_in_creation_order() {
        let (_dir, store) = temp_store();
        let first = store.create_snapshot(10, 1, Technique::WholeFile).unwrap();
        let second = store.create_snapshot(20, 2, Technique::Chunked).unwrap();

        let listed = store.list_snapshots().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first);
        assert_eq!(listed[1].id, second);
        assert_eq!(listed[1].technique, Technique::Chunked);
    }
}
