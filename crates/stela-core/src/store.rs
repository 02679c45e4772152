//! CommitStore — SQLite WAL persistence for the commit log
//!
//! Content-addressed storage keyed by signature, with:
//! - WAL mode: concurrent non-blocking reads while the writer runs
//! - Append-only rows: inserts and age-based deletes, never updates
//! - Duplicate detection: a signature collision is a typed, non-fatal error
//! - Indexed retrieval: by recency, by identity, by reply target
//!
//! The reply target of a `"post"` record is extracted once at insert into its
//! own indexed column, so parent lookups are an index probe instead of a scan
//! over every post. Observable semantics are unchanged: exact match, no
//! duplicates, dangling references return an empty set.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::commit::{Commit, Timestamp};
use crate::config::{IdentityScheme, RetentionField};
use crate::error::StoreError;

const COMMIT_COLUMNS: &str =
    "signature, public_key, address, kind, data, nonce, commit_at_ms, created_at_ms, updated_at_ms";

/// Aggregate counters for the ledger statistics read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStats {
    /// Total stored commits
    pub total_entries: u64,
    /// Distinct submitting identities (addresses)
    pub total_identities: u64,
    /// Admission time of the oldest stored commit, if any
    pub oldest_created_at: Option<Timestamp>,
}

/// Durable, content-addressed storage for admitted commits.
///
/// A single SQLite connection behind a mutex; WAL mode keeps readers
/// non-blocking at the SQLite level and the busy timeout bounds lock waits,
/// which surface as [`StoreError::Unavailable`] instead of hanging.
pub struct CommitStore {
    conn: Mutex<Connection>,
}

impl CommitStore {
    /// Open (or create) the commit database in WAL mode.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stela_core::CommitStore;
    /// let store = CommitStore::open("./data/commits.db").unwrap();
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("creating db directory: {e}")))?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Idempotent DDL migration
    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS commits (
                signature        TEXT PRIMARY KEY,
                public_key       TEXT NOT NULL,
                address          TEXT NOT NULL,
                kind             TEXT NOT NULL,
                data             TEXT,
                nonce            INTEGER NOT NULL,
                parent_signature TEXT,
                commit_at_ms     INTEGER,
                created_at_ms    INTEGER NOT NULL,
                updated_at_ms    INTEGER NOT NULL
            );

            -- recency listing
            CREATE INDEX IF NOT EXISTS idx_commits_created_at
                ON commits(created_at_ms DESC);

            -- identity queries, both schemes
            CREATE INDEX IF NOT EXISTS idx_commits_address
                ON commits(address, created_at_ms DESC);
            CREATE INDEX IF NOT EXISTS idx_commits_public_key
                ON commits(public_key, created_at_ms DESC);

            -- reply-target probe; only posts carry a parent
            CREATE INDEX IF NOT EXISTS idx_commits_parent
                ON commits(parent_signature) WHERE parent_signature IS NOT NULL;
            ",
        )?;
        Ok(())
    }

    /// Insert an admitted commit. Atomic: a signature collision fails with
    /// [`StoreError::DuplicateKey`] and leaves the existing record untouched.
    pub fn insert(&self, commit: &Commit) -> Result<(), StoreError> {
        let result = self.conn.lock().execute(
            "INSERT INTO commits
             (signature, public_key, address, kind, data, nonce, parent_signature,
              commit_at_ms, created_at_ms, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                commit.signature,
                commit.public_key,
                commit.address,
                commit.kind,
                commit.data,
                commit.nonce,
                commit.parent_signature(),
                commit.commit_at.map(|t| t.timestamp_millis()),
                commit.created_at.timestamp_millis(),
                commit.updated_at.timestamp_millis(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateKey(commit.signature.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch a commit by its signature.
    pub fn get_by_signature(&self, signature: &str) -> Result<Option<Commit>, StoreError> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            &format!("SELECT {COMMIT_COLUMNS} FROM commits WHERE signature = ?1"),
            params![signature],
            row_to_commit,
        );
        optional(result)
    }

    /// Most recent commits, `created_at` descending, 1-based page.
    ///
    /// Ties on `created_at` break on `signature` so paging is deterministic.
    /// Page parameters are caller-trusted; boundaries are enforced by the
    /// query surface.
    pub fn list_recent(&self, page: u32, per_page: u32) -> Result<Vec<Commit>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMIT_COLUMNS} FROM commits
             ORDER BY created_at_ms DESC, signature ASC
             LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt.query_map(params![per_page as i64, offset(page, per_page)], row_to_commit)?;
        collect(rows)
    }

    /// Commits submitted by one identity, same ordering and paging as
    /// [`list_recent`](Self::list_recent).
    ///
    /// The identity matches on `address`; with
    /// [`IdentityScheme::AddressWithPublicKeyFallback`] an empty result is
    /// retried against the raw `publicKey`, keeping pre-address clients
    /// working.
    pub fn list_by_identity(
        &self,
        identity: &str,
        page: u32,
        per_page: u32,
        scheme: IdentityScheme,
    ) -> Result<Vec<Commit>, StoreError> {
        let by_address = self.list_by_column("address", identity, page, per_page)?;
        if !by_address.is_empty() || scheme == IdentityScheme::AddressOnly {
            return Ok(by_address);
        }
        self.list_by_column("public_key", identity, page, per_page)
    }

    fn list_by_column(
        &self,
        column: &str,
        value: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Commit>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMIT_COLUMNS} FROM commits
             WHERE {column} = ?1
             ORDER BY created_at_ms DESC, signature ASC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt.query_map(
            params![value, per_page as i64, offset(page, per_page)],
            row_to_commit,
        )?;
        collect(rows)
    }

    /// All `"post"` commits replying to the given signature.
    ///
    /// The reference is not referential: a dangling target, or a target held
    /// by a non-post record, simply yields an empty set.
    pub fn list_by_parent(&self, parent_signature: &str) -> Result<Vec<Commit>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMIT_COLUMNS} FROM commits
             WHERE parent_signature = ?1
             ORDER BY created_at_ms ASC, signature ASC"
        ))?;
        let rows = stmt.query_map(params![parent_signature], row_to_commit)?;
        collect(rows)
    }

    /// All distinct submitting identities (addresses), sorted.
    pub fn distinct_identities(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT DISTINCT address FROM commits ORDER BY address")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        collect(rows)
    }

    /// Total number of stored commits.
    pub fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM commits", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Number of distinct submitting identities.
    pub fn count_distinct_identities(&self) -> Result<u64, StoreError> {
        let n: i64 = self.conn.lock().query_row(
            "SELECT COUNT(DISTINCT address) FROM commits",
            [],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// The oldest stored commit by admission time, if any.
    pub fn oldest(&self) -> Result<Option<Commit>, StoreError> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            &format!(
                "SELECT {COMMIT_COLUMNS} FROM commits
                 ORDER BY created_at_ms ASC, signature ASC LIMIT 1"
            ),
            [],
            row_to_commit,
        );
        optional(result)
    }

    /// A uniformly random stored commit, if any.
    pub fn random(&self) -> Result<Option<Commit>, StoreError> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            &format!("SELECT {COMMIT_COLUMNS} FROM commits ORDER BY RANDOM() LIMIT 1"),
            [],
            row_to_commit,
        );
        optional(result)
    }

    /// Delete every commit whose chosen timestamp is strictly before
    /// `cutoff`. Returns the number of deleted rows.
    pub fn delete_older_than(
        &self,
        cutoff: DateTime<Utc>,
        field: RetentionField,
    ) -> Result<usize, StoreError> {
        let column = match field {
            RetentionField::CreatedAt => "created_at_ms",
            RetentionField::UpdatedAt => "updated_at_ms",
        };
        let deleted = self.conn.lock().execute(
            &format!("DELETE FROM commits WHERE {column} < ?1"),
            params![cutoff.timestamp_millis()],
        )?;
        Ok(deleted)
    }

    /// Counters for the statistics read: totals plus the oldest admission
    /// time.
    pub fn stats(&self) -> Result<LedgerStats, StoreError> {
        Ok(LedgerStats {
            total_entries: self.count()?,
            total_identities: self.count_distinct_identities()?,
            oldest_created_at: self.oldest()?.map(|c| c.created_at),
        })
    }
}

fn offset(page: u32, per_page: u32) -> i64 {
    (page.saturating_sub(1) as i64) * per_page as i64
}

fn optional<T>(result: rusqlite::Result<T>) -> Result<Option<T>, StoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn collect<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, StoreError> {
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

fn row_to_commit(row: &rusqlite::Row<'_>) -> rusqlite::Result<Commit> {
    let commit_at_ms: Option<i64> = row.get(6)?;
    Ok(Commit {
        signature: row.get(0)?,
        public_key: row.get(1)?,
        address: row.get(2)?,
        kind: row.get(3)?,
        data: row.get(4)?,
        nonce: row.get(5)?,
        commit_at: commit_at_ms.and_then(DateTime::from_timestamp_millis),
        created_at: timestamp(row.get(7)?),
        updated_at: timestamp(row.get(8)?),
    })
}

fn timestamp(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}
