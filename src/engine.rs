//! Snapshot engine: capture, restore, prune, list, check.
//!
//! One engine instance owns the store handle and a fixed technique; every
//! snapshot it takes uses that technique, while restore always follows the
//! technique recorded on the snapshot being restored. All I/O is plain
//! sequential blocking calls; each record insert is durable on its own, so an
//! aborted walk leaves a prefix of complete records for the operator to prune.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::hash;
use crate::store::{SnapshotRecord, Store};
use crate::technique::Technique;

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// A snapshot row paired with the bytes currently stored for it. Stored size
/// is distinct from directory_size, which is the tree size at capture time.
#[derive(Debug)]
pub struct SnapshotSummary {
    pub record: SnapshotRecord,
    pub stored_size: u64,
}

/// A stored record whose recomputed digest no longer matches. The path is
/// lossily decoded for display only; stored path bytes are never mangled.
#[derive(Debug)]
pub struct Corruption {
    pub snapshot_id: i64,
    pub path: String,
    pub detail: String,
}

pub struct SnapshotEngine {
    store: Store,
    technique: Technique,
    chunk_size: usize,
}

impl SnapshotEngine {
    pub fn new(store: Store, technique: Technique, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".to_string()));
        }
        Ok(SnapshotEngine {
            store,
            technique,
            chunk_size,
        })
    }

    /// Capture every regular file under `target` into a new snapshot and
    /// return its id.
    ///
    /// A single walk collects paths and sizes; the snapshot row is created
    /// from the summed size before any file or chunk record is written.
    /// Symlinks and special files are skipped, consistently, in both the size
    /// sum and the capture.
    pub fn take_snapshot(&self, target: &Path) -> Result<i64> {
        if !target.is_dir() {
            return Err(Error::io(
                target,
                std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
            ));
        }

        let files = collect_regular_files(target)?;
        let directory_size: u64 = files.iter().map(|(_, size)| size).sum();
        let timestamp = chrono::Utc::now().timestamp();

        let snapshot_id = self
            .store
            .create_snapshot(timestamp, directory_size, self.technique)?;

        for (rel_path, _) in &files {
            let abs_path = target.join(rel_path);
            let content = fs::read(&abs_path).map_err(|e| Error::io(&abs_path, e))?;
            let rel = path_to_bytes(rel_path)?;

            match self.technique {
                Technique::WholeFile => {
                    let digest = hash::digest(&content);
                    self.store
                        .insert_file(snapshot_id, &rel, &digest, Some(&content))?;
                }
                Technique::Chunked => {
                    // the files row carries no bytes here; it records the path
                    // (so empty files survive) and the whole-file digest
                    let digest = hash::digest(&content);
                    self.store.insert_file(snapshot_id, &rel, &digest, None)?;

                    for (seq, chunk) in content.chunks(self.chunk_size).enumerate() {
                        let chunk_digest = hash::digest(chunk);
                        self.store.insert_chunk(
                            snapshot_id,
                            &rel,
                            seq as i64,
                            &chunk_digest,
                            chunk,
                        )?;
                    }
                }
            }
        }

        Ok(snapshot_id)
    }

    /// Reconstruct every captured file of `snapshot_id` under `output_dir`,
    /// byte-for-byte.
    pub fn restore_snapshot(&self, snapshot_id: i64, output_dir: &Path) -> Result<()> {
        let snapshot = self
            .store
            .get_snapshot(snapshot_id)?
            .ok_or(Error::SnapshotNotFound(snapshot_id))?;

        for file in self.store.get_files(snapshot_id)? {
            let dest = output_dir.join(bytes_to_path(&file.path)?);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }

            match snapshot.technique {
                Technique::WholeFile => {
                    let content = file.content.as_deref().unwrap_or(&[]);
                    fs::write(&dest, content).map_err(|e| Error::io(&dest, e))?;
                }
                Technique::Chunked => {
                    // chunks arrive sorted by seq; writing them in that order
                    // is what makes the reassembly byte-identical
                    let chunks = self.store.get_chunks(snapshot_id, &file.path)?;
                    let mut out = fs::File::create(&dest).map_err(|e| Error::io(&dest, e))?;
                    for chunk in chunks {
                        out.write_all(&chunk.content)
                            .map_err(|e| Error::io(&dest, e))?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Delete a snapshot and all its file and chunk records.
    pub fn prune_snapshot(&mut self, snapshot_id: i64) -> Result<()> {
        if self.store.get_snapshot(snapshot_id)?.is_none() {
            return Err(Error::SnapshotNotFound(snapshot_id));
        }
        self.store.delete_snapshot(snapshot_id)
    }

    /// All snapshots, each with its stored size.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>> {
        let mut summaries = Vec::new();
        for record in self.store.list_snapshots()? {
            let stored_size = self.store.stored_size(record.id)?;
            summaries.push(SnapshotSummary {
                record,
                stored_size,
            });
        }
        Ok(summaries)
    }

    pub fn total_stored_size(&self) -> Result<u64> {
        self.store.total_stored_size()
    }

    /// Recompute the digest of every stored record, returning the ones that no
    /// longer match. Whole-file rows are hashed directly; chunked rows are
    /// verified by hashing their chunks in seq order against the recorded
    /// whole-file digest, which also catches missing, extra, or reordered
    /// chunks whose individual digests are still intact.
    pub fn check_integrity(&self) -> Result<Vec<Corruption>> {
        let mut corrupted = Vec::new();

        for file in self.store.all_files()? {
            let computed = match &file.content {
                Some(content) => hash::digest(content),
                None => {
                    let chunks = self.store.get_chunks(file.snapshot_id, &file.path)?;
                    hash::digest_parts(chunks.iter().map(|c| c.content.as_slice()))
                }
            };

            if computed != file.digest {
                let detail = if file.content.is_some() {
                    format!("file digest mismatch (stored {})", file.digest)
                } else {
                    format!("reassembled file digest mismatch (stored {})", file.digest)
                };
                corrupted.push(Corruption {
                    snapshot_id: file.snapshot_id,
                    path: String::from_utf8_lossy(&file.path).into_owned(),
                    detail,
                });
            }
        }

        for chunk in self.store.all_chunks()? {
            let computed = hash::digest(&chunk.content);
            if computed != chunk.digest {
                corrupted.push(Corruption {
                    snapshot_id: chunk.snapshot_id,
                    path: String::from_utf8_lossy(&chunk.path).into_owned(),
                    detail: format!("chunk {} digest mismatch (stored {})", chunk.seq, chunk.digest),
                });
            }
        }

        Ok(corrupted)
    }
}

/// Raw bytes of a relative path, for lossless storage. Unix filenames are
/// arbitrary bytes; a lossy UTF-8 conversion here would restore files under
/// corrupted names.
#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Result<Vec<u8>> {
    use std::os::unix::ffi::OsStrExt;
    Ok(path.as_os_str().as_bytes().to_vec())
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Result<Vec<u8>> {
    match path.to_str() {
        Some(s) => Ok(s.as_bytes().to_vec()),
        None => Err(Error::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, "non-UTF-8 path"),
        )),
    }
}

#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> Result<PathBuf> {
    use std::os::unix::ffi::OsStringExt;
    Ok(PathBuf::from(std::ffi::OsString::from_vec(bytes.to_vec())))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> Result<PathBuf> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(PathBuf::from(s)),
        Err(_) => Err(Error::io(
            PathBuf::from(String::from_utf8_lossy(bytes).into_owned()),
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "stored path is not valid UTF-8 on this platform",
            ),
        )),
    }
}

/// Walk `target` and return (relative path, size) for every regular file.
/// Symlinks are not followed; directories and special files contribute nothing.
fn collect_regular_files(target: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(target).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(target).to_path_buf();
            match e.into_io_error() {
                Some(io) => Error::io(path, io),
                None => Error::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::Other, "walk failed"),
                ),
            }
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = entry
            .metadata()
            .map_err(|e| match e.into_io_error() {
                Some(io) => Error::io(entry.path(), io),
                None => Error::io(
                    entry.path(),
                    std::io::Error::new(std::io::ErrorKind::Other, "stat failed"),
                ),
            })?;

        let rel = entry
            .path()
            .strip_prefix(target)
            .unwrap_or(entry.path())
            .to_path_buf();

        files.push((rel, metadata.len()));
    }

    Ok(files)
}
