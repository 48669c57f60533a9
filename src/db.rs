use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

use crate::contact::{ContactRecord, StoredContact};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot open contact database {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("cannot create database directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Local SQLite table of saved contacts. Append-only: rows are never
/// updated or deleted.
pub struct ContactStore {
    conn: Connection,
}

impl ContactStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        debug!("Opened contact store at {:?}", path);
        Ok(ContactStore { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(ContactStore {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Creates the `contacts` table if it is missing. Safe to call on every start.
    pub fn initialize(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS contacts (
                id    INTEGER PRIMARY KEY AUTOINCREMENT,
                name  TEXT NOT NULL,
                title TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE
            );
            ",
        )?;
        Ok(())
    }

    // ── Writes ──

    /// Inserts every record, one outcome per record in input order.
    ///
    /// A duplicate email only marks that record as [`InsertOutcome::Duplicate`];
    /// the rest of the batch still goes in. The batch is committed before
    /// returning. Any other SQLite failure rolls the whole batch back.
    pub fn insert_all(&self, records: &[ContactRecord]) -> Result<InsertReport, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut outcomes = Vec::with_capacity(records.len());
        {
            let mut stmt =
                tx.prepare("INSERT INTO contacts (name, title, email) VALUES (?1, ?2, ?3)")?;
            for r in records {
                match stmt.insert(rusqlite::params![r.name, r.title, r.email]) {
                    Ok(id) => outcomes.push(InsertOutcome::Inserted(StoredContact {
                        id,
                        record: r.clone(),
                    })),
                    Err(e) if is_unique_violation(&e) => {
                        debug!("Duplicate email {}: {}", r.email, e);
                        outcomes.push(InsertOutcome::Duplicate {
                            email: r.email.clone(),
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        tx.commit()?;

        let report = InsertReport { outcomes };
        debug!(
            "Saved {} contacts ({} duplicates skipped)",
            report.inserted(),
            report.duplicates()
        );
        Ok(report)
    }

    // ── Reads ──

    pub fn all(&self) -> Result<Vec<StoredContact>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, title, email FROM contacts ORDER BY id")?;
        let rows = stmt
            .query_map([], row_to_contact)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<StoredContact>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, title, email FROM contacts WHERE email = ?1",
                [email],
                row_to_contact,
            )
            .optional()?;
        Ok(row)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM contacts", [], |r| r.get(0))?;
        Ok(n)
    }
}

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredContact> {
    Ok(StoredContact {
        id: row.get(0)?,
        record: ContactRecord {
            name: row.get(1)?,
            title: row.get(2)?,
            email: row.get(3)?,
        },
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ── Batch report ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(StoredContact),
    Duplicate { email: String },
}

/// Per-record results of one [`ContactStore::insert_all`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub outcomes: Vec<InsertOutcome>,
}

impl InsertReport {
    pub fn inserted(&self) -> usize {
        self.saved().count()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicate_emails().count()
    }

    pub fn saved(&self) -> impl Iterator<Item = &StoredContact> {
        self.outcomes.iter().filter_map(|o| match o {
            InsertOutcome::Inserted(c) => Some(c),
            InsertOutcome::Duplicate { .. } => None,
        })
    }

    pub fn duplicate_emails(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match o {
            InsertOutcome::Duplicate { email } => Some(email.as_str()),
            InsertOutcome::Inserted(_) => None,
        })
    }
}
