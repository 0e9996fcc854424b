//! Vector store: a SQLite database loaded with the `sqlite-vec` extension,
//! substituting for the LanceDB-style columnar directory named in the storage
//! layout contract. Serves ANN search by vector, path-glob filtering, id lookups,
//! and bulk deletion, all serialized by a per-store mutex.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use rusqlite::Connection;
use rusqlite::params;
use tokio::sync::Mutex;
use uuid::Uuid;
use zerocopy::AsBytes;

use crate::error::Error;
use crate::error::Result;
use crate::types::Chunk;

/// Insert batch ceiling (§5 resource ceilings).
const INSERT_BATCH_SIZE: usize = 500;
/// Search `k` is clamped into this range.
const SEARCH_K_RANGE: std::ops::RangeInclusive<usize> = 1..=50;
/// `search_by_path`'s `limit` is clamped into this range.
const SEARCH_BY_PATH_LIMIT_RANGE: std::ops::RangeInclusive<usize> = 1..=100;
/// `list_files` scans at most `limit * LIST_FILES_SCAN_MULTIPLIER` rows before
/// falling back to an unbounded scan.
const LIST_FILES_SCAN_MULTIPLIER: usize = 10;
/// Row count above which `create_vector_index` records IVF-PQ parameters instead
/// of treating the table as brute-force-searched.
const IVF_PQ_ROW_THRESHOLD: u64 = 10_000;
/// A lockfile candidate older than this is considered abandoned by a crashed
/// writer and safe to remove, matching the metadata journal's staleness window.
const STALE_LOCKFILE_THRESHOLD: Duration = Duration::from_secs(300);

/// Recommended IVF-PQ index parameters, or brute force below the row threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStrategy {
    BruteForce,
    IvfPq {
        partitions: u32,
        sub_vectors: u32,
        distance: Distance,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    L2,
}

pub struct VectorStore {
    conn: Arc<Mutex<Connection>>,
    dir: PathBuf,
    dim: usize,
}

impl VectorStore {
    /// Open (creating if absent) the store directory and its SQLite file, register
    /// the `sqlite-vec` extension, and reclaim any stale lockfile left by a crashed
    /// prior writer.
    pub async fn open(dir: &Path, dim: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        reclaim_stale_lockfiles(dir)?;

        let db_path = dir.join("index.sqlite3");
        let dir_owned = dir.to_path_buf();
        // sqlite-vec registers itself as an auto-extension so every connection
        // opened afterwards (including this one) picks up the vec0 module.
        unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        }
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = Connection::open(&db_path).map_err(|err| Error::IndexCorrupt {
                reason: format!("failed to open vector store at {}", db_path.display()),
                source: Some(Box::new(err)),
            })?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.busy_timeout(Duration::from_secs(5))?;

            init_schema(&conn, dim)?;
            Ok(conn)
        })
        .await
        .map_err(|err| Error::IndexCorrupt {
            reason: "vector store open task panicked".to_string(),
            source: Some(Box::new(err)),
        })??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dir: dir_owned,
            dim,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Insert chunk records in batches of at most 500. Fails with an empty-schema
    /// error if there is nothing to insert and the table was never created.
    pub async fn insert(&self, records: &[Chunk]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        for rec in records {
            if rec.vector.len() != self.dim {
                return Err(Error::DimensionMismatch {
                    expected: self.dim,
                    actual: rec.vector.len(),
                });
            }
            if rec.start_line > rec.end_line {
                return Err(Error::IndexCorrupt {
                    reason: format!(
                        "chunk for {} has start_line {} > end_line {}",
                        rec.path, rec.start_line, rec.end_line
                    ),
                    source: None,
                });
            }
        }

        let guard = self.conn.lock().await;
        for batch in records.chunks(INSERT_BATCH_SIZE) {
            let batch = batch.to_vec();
            insert_batch(&guard, &batch)?;
        }
        tracing::debug!(count = records.len(), "inserted chunks");
        Ok(())
    }

    /// Approximate nearest-neighbor search. `k` is clamped into `[1, 50]`.
    /// Distance-to-similarity is `score = 1 / (1 + distance)` for L2.
    pub async fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>> {
        if query_vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: query_vector.len(),
            });
        }
        let k = (*SEARCH_K_RANGE.start()).max(k.min(*SEARCH_K_RANGE.end()));

        let guard = self.conn.lock().await;
        let is_empty: bool = guard
            .query_row("SELECT NOT EXISTS(SELECT 1 FROM chunks_vec)", [], |row| {
                row.get(0)
            })
            .unwrap_or(true);
        if is_empty {
            return Ok(Vec::new());
        }

        let query_bytes = query_vector.as_bytes().to_vec();
        let mut stmt = guard.prepare(
            "SELECT c.id, c.path, c.text, c.start_line, c.end_line, c.content_hash, c.chunk_hash, v.distance
             FROM chunks_vec v
             JOIN chunks c ON c.rowid = v.rowid
             WHERE v.embedding MATCH ?1 AND k = ?2
             ORDER BY v.distance ASC",
        )?;
        let rows = stmt.query_map(params![query_bytes, k as i64], |row| {
            let id: String = row.get(0)?;
            let distance: f64 = row.get(7)?;
            Ok((
                Chunk {
                    id: Uuid::parse_str(&id).unwrap_or(Uuid::nil()),
                    path: row.get(1)?,
                    text: row.get(2)?,
                    vector: Vec::new(),
                    start_line: row.get(3)?,
                    end_line: row.get(4)?,
                    content_hash: row.get(5)?,
                    chunk_hash: row.get(6)?,
                },
                distance as f32,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (chunk, distance) = row?;
            let score = 1.0 / (1.0 + distance);
            results.push((chunk, score));
        }
        Ok(results)
    }

    /// Translate `glob` to a safe LIKE pattern and return de-duplicated,
    /// lexicographically sorted matching paths, bounded by `limit`, which is
    /// clamped into `[1, 100]`.
    pub async fn search_by_path(&self, glob: &str, limit: usize) -> Result<Vec<String>> {
        let limit =
            (*SEARCH_BY_PATH_LIMIT_RANGE.start()).max(limit.min(*SEARCH_BY_PATH_LIMIT_RANGE.end()));
        let like_pattern = glob_to_like(glob)?;
        let guard = self.conn.lock().await;
        let mut stmt = guard.prepare(
            "SELECT DISTINCT path FROM chunks WHERE path LIKE ?1 ESCAPE '\\' ORDER BY path LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![like_pattern, limit as i64], |row| row.get(0))?;
        let mut paths = Vec::new();
        for row in rows {
            paths.push(row?);
        }
        Ok(paths)
    }

    /// Look up chunks by id. Malformed (non-UUID-v4-shaped) ids are silently
    /// dropped rather than erroring.
    pub async fn get_by_ids(&self, ids: &[Uuid]) -> Result<std::collections::HashMap<Uuid, Chunk>> {
        let valid_ids: Vec<Uuid> = ids.iter().filter(|id| is_well_formed_v4(id)).copied().collect();
        if valid_ids.is_empty() {
            return Ok(std::collections::HashMap::new());
        }

        let guard = self.conn.lock().await;
        let placeholders = valid_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT id, path, text, start_line, end_line, content_hash, chunk_hash FROM chunks WHERE id IN ({placeholders})"
        );
        let mut stmt = guard.prepare(&sql)?;
        let id_strings: Vec<String> = valid_ids.iter().map(|id| id.to_string()).collect();
        let params: Vec<&dyn rusqlite::ToSql> =
            id_strings.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(params.as_slice(), |row| {
            let id: String = row.get(0)?;
            Ok((
                id.clone(),
                Chunk {
                    id: Uuid::parse_str(&id).unwrap_or(Uuid::nil()),
                    path: row.get(1)?,
                    text: row.get(2)?,
                    vector: Vec::new(),
                    start_line: row.get(3)?,
                    end_line: row.get(4)?,
                    content_hash: row.get(5)?,
                    chunk_hash: row.get(6)?,
                },
            ))
        })?;

        let mut out = std::collections::HashMap::new();
        for row in rows {
            let (id_str, chunk) = row?;
            if let Ok(id) = Uuid::parse_str(&id_str) {
                out.insert(id, chunk);
            }
        }
        Ok(out)
    }

    /// Delete all chunks for `path`. Returns the number of rows deleted.
    pub async fn delete_by_path(&self, path: &str) -> Result<usize> {
        let guard = self.conn.lock().await;
        let rowids: Vec<i64> = {
            let mut stmt = guard.prepare("SELECT rowid FROM chunks WHERE path = ?1")?;
            let rows = stmt.query_map(params![path], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<i64>>>()?
        };
        for rowid in &rowids {
            guard.execute("DELETE FROM chunks_vec WHERE rowid = ?1", params![rowid])?;
        }
        let deleted = guard.execute("DELETE FROM chunks WHERE path = ?1", params![path])?;
        Ok(deleted)
    }

    /// Delete chunks by id set. Returns the number of rows deleted.
    pub async fn delete_by_ids(&self, ids: &[Uuid]) -> Result<usize> {
        let valid_ids: Vec<Uuid> = ids.iter().filter(|id| is_well_formed_v4(id)).copied().collect();
        if valid_ids.is_empty() {
            return Ok(0);
        }
        let guard = self.conn.lock().await;
        let mut total = 0usize;
        for id in valid_ids {
            let rowid: Option<i64> = guard
                .query_row(
                    "SELECT rowid FROM chunks WHERE id = ?1",
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .ok();
            if let Some(rowid) = rowid {
                guard.execute("DELETE FROM chunks_vec WHERE rowid = ?1", params![rowid])?;
                total += guard.execute("DELETE FROM chunks WHERE rowid = ?1", params![rowid])?;
            }
        }
        Ok(total)
    }

    /// Unique path enumeration, bounded by `limit * 10` rows scanned; falls back
    /// to an unbounded scan only if the bounded query fails.
    pub async fn list_files(&self, limit: usize) -> Result<Vec<String>> {
        let guard = self.conn.lock().await;
        let scan_cap = limit.saturating_mul(LIST_FILES_SCAN_MULTIPLIER);
        let bounded = guard
            .prepare(
                "SELECT DISTINCT path FROM (SELECT path FROM chunks LIMIT ?1) ORDER BY path LIMIT ?2",
            )
            .and_then(|mut stmt| {
                let rows = stmt.query_map(params![scan_cap as i64, limit as i64], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<Vec<String>>>()
            });

        match bounded {
            Ok(paths) => Ok(paths),
            Err(err) => {
                tracing::warn!(error = %err, "bounded list_files scan failed, falling back to unbounded scan");
                let mut stmt =
                    guard.prepare("SELECT DISTINCT path FROM chunks ORDER BY path LIMIT ?1")?;
                let rows = stmt.query_map(params![limit as i64], |row| row.get(0))?;
                Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
            }
        }
    }

    pub async fn count(&self) -> Result<u64> {
        let guard = self.conn.lock().await;
        let count: i64 = guard.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub async fn storage_size_bytes(&self) -> Result<u64> {
        let path = self.dir.join("index.sqlite3");
        Ok(std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0))
    }

    /// Decide an ANN index strategy from the current row count. `sqlite-vec`'s
    /// `vec0` table is itself brute-force only as of the version pinned here;
    /// this records the parameters a true IVF-PQ index would use without
    /// changing the actual scan strategy (see SPEC_FULL.md §4.1 note).
    pub async fn create_vector_index(&self) -> Result<IndexStrategy> {
        let rows = self.count().await?;
        if rows <= IVF_PQ_ROW_THRESHOLD {
            return Ok(IndexStrategy::BruteForce);
        }
        let partitions = (rows as f64).sqrt().round().clamp(1.0, 256.0) as u32;
        let sub_vectors = if self.dim % 16 == 0 {
            (self.dim / 16) as u32
        } else if self.dim % 8 == 0 {
            (self.dim / 8) as u32
        } else {
            1
        };
        Ok(IndexStrategy::IvfPq {
            partitions,
            sub_vectors,
            distance: Distance::L2,
        })
    }
}

fn init_schema(conn: &Connection, dim: usize) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            text TEXT NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            chunk_hash TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_chunks_path ON chunks(path);",
    )?;

    let existing_dim = parse_vec0_dimension(conn);
    if let Some(existing) = existing_dim {
        if existing != dim {
            tracing::warn!(existing, requested = dim, "vector dimension changed, recreating table");
            conn.execute_batch("DROP TABLE IF EXISTS chunks_vec;")?;
        }
    }
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS chunks_vec USING vec0(embedding float[{dim}]);"
    ))?;
    Ok(())
}

fn parse_vec0_dimension(conn: &Connection) -> Option<usize> {
    let sql: String = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE name = 'chunks_vec'",
            [],
            |row| row.get(0),
        )
        .ok()?;
    let start = sql.find("float[")? + "float[".len();
    let end = sql[start..].find(']')? + start;
    sql[start..end].parse().ok()
}

fn insert_batch(conn: &Connection, batch: &[Chunk]) -> Result<()> {
    for rec in batch {
        conn.execute(
            "INSERT INTO chunks (id, path, text, start_line, end_line, content_hash, chunk_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                rec.id.to_string(),
                rec.path,
                rec.text,
                rec.start_line,
                rec.end_line,
                rec.content_hash,
                rec.chunk_hash,
            ],
        )?;
        let rowid = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO chunks_vec (rowid, embedding) VALUES (?1, ?2)",
            params![rowid, rec.vector.as_bytes()],
        )?;
    }
    Ok(())
}

/// Filters a UUID against the version-4 variant-bit shape without assuming the
/// string parsed to a v4 came from `Uuid::new_v4` specifically.
fn is_well_formed_v4(id: &Uuid) -> bool {
    id.get_version_num() == 4
}

/// Escapes a value for safe interpolation into a `WHERE ... = '...'` clause:
/// doubles single quotes and rejects control characters / comment sequences.
fn escape_sql_value(value: &str) -> Result<String> {
    if value.contains("--") || value.contains("/*") || value.contains("*/") {
        return Err(Error::InvalidPattern {
            pattern: value.to_string(),
            reason: "contains a disallowed comment sequence".to_string(),
        });
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(Error::InvalidPattern {
            pattern: value.to_string(),
            reason: "contains control characters".to_string(),
        });
    }
    Ok(value.replace('\'', "''"))
}

/// Translates a glob (`*`, `**`, `?`) into a SQL LIKE pattern, escaping literal
/// `%`, `_`, and `[` runs with a backslash so they are matched verbatim.
fn glob_to_like(glob: &str) -> Result<String> {
    escape_sql_value(glob)?;
    let mut out = String::with_capacity(glob.len());
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                }
                out.push('%');
            }
            '?' => out.push('_'),
            '%' | '_' | '[' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn reclaim_stale_lockfiles(dir: &Path) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(()),
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let is_lock = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext == "lock" || ext == "lck");
        if !is_lock {
            continue;
        }
        let Ok(metadata) = entry.metadata() else { continue };
        let Ok(modified) = metadata.modified() else { continue };
        let Ok(age) = SystemTime::now().duration_since(modified) else { continue };
        if age < STALE_LOCKFILE_THRESHOLD {
            continue;
        }
        // Acknowledge the irreducible window between this open-for-write and the
        // unlink below: acceptable because multi-writer is unsupported.
        if std::fs::OpenOptions::new().write(true).open(&path).is_ok() {
            let _ = std::fs::remove_file(&path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "vector_store.test.rs"]
mod tests;
