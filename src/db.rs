use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{ffi, Connection, ErrorCode};
use tracing::{debug, warn};

use crate::roles::normalize_role;

/// Open a SQLite database, creating its parent directory first.
pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .with_context(|| format!("Database at {:?} is not usable", path))?;
    Ok(conn)
}

/// Outcome of a single role insert. Inserts never fail the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleInsert {
    Inserted,
    Duplicate,
    /// Schema could not be ensured, nothing was attempted.
    Skipped,
    Failed,
}

/// Relational store of (name, role) pairs in `movieroles`.
pub struct RoleStore {
    conn: Connection,
}

impl RoleStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = connect(path).context("Role store unavailable")?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Create `movieroles` if missing. Failure is logged, not raised.
    pub fn ensure_schema(&self) -> bool {
        let result = self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS movieroles (
                name VARCHAR(100) NOT NULL,
                role VARCHAR(100) NOT NULL,
                PRIMARY KEY (name, role)
            );",
        );
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Error while creating movieroles table: {}", e);
                false
            }
        }
    }

    /// Insert one pair under its canonical role. Each insert commits on its own.
    pub fn insert(&self, name: &str, role: &str) -> RoleInsert {
        let role = normalize_role(role);

        if !self.ensure_schema() {
            return RoleInsert::Skipped;
        }

        let result = self.conn.execute(
            "INSERT INTO movieroles (name, role) VALUES (?1, ?2)",
            rusqlite::params![name, role],
        );
        match result {
            Ok(_) => RoleInsert::Inserted,
            Err(e) if is_duplicate_key(&e) => {
                debug!("Duplicate role pair ({}, {}), skipping", name, role);
                RoleInsert::Duplicate
            }
            Err(e) => {
                warn!("Error while inserting role pair ({}, {}): {}", name, role, e);
                RoleInsert::Failed
            }
        }
    }

    /// Distinct names recorded for the canonical form of `role`.
    pub fn names_for_role(&self, role: &str) -> Result<Vec<String>> {
        let role = normalize_role(role);
        if !self.ensure_schema() {
            anyhow::bail!("movieroles table is unavailable");
        }
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM movieroles WHERE role = ?1 ORDER BY name")?;
        let rows = stmt
            .query_map([role], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    pub fn count(&self) -> Result<usize> {
        if !self.ensure_schema() {
            anyhow::bail!("movieroles table is unavailable");
        }
        let n: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM movieroles", [], |r| r.get(0))?;
        Ok(n)
    }

    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("Failed to close role store")
    }
}

fn is_duplicate_key(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
