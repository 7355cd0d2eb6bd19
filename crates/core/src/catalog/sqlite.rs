//! SQLite-backed item catalog implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Params};

use super::{remote_path, CatalogError, ItemCatalog, ItemStatus, RemoteItem};
use crate::listing::{EntryKind, RemoteEntry};

const ITEM_COLUMNS: &str = "id, host, source_dir, name, remote_path, kind, size_bytes, status,
    attempts, first_seen_at, transfer_started_at, transferred_at, moved_to, moved_at,
    source_removed_at";

/// SQLite-backed item catalog.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Create a new SQLite catalog, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CatalogError::Database(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            -- One row per remote path per host
            CREATE TABLE IF NOT EXISTS remote_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                source_dir TEXT NOT NULL,
                name TEXT NOT NULL,
                remote_path TEXT NOT NULL,
                kind TEXT NOT NULL,
                size_bytes INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                first_seen_at TEXT NOT NULL,
                transfer_started_at TEXT,
                transferred_at TEXT,
                moved_to TEXT,
                moved_at TEXT,
                source_removed_at TEXT,
                UNIQUE(host, remote_path)
            );

            CREATE INDEX IF NOT EXISTS idx_remote_items_status ON remote_items(host, status);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Internal("catalog connection lock poisoned".to_string()))
    }

    fn query_items<P: Params>(&self, sql: &str, params: P) -> Result<Vec<RemoteItem>, CatalogError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let rows = stmt.query_map(params, Self::row_to_item).map_err(db_err)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row.map_err(db_err)?);
        }
        Ok(items)
    }

    /// Runs a single-row update, mapping "no row touched" to `NotFound`.
    fn update_one<P: Params>(&self, id: i64, sql: &str, params: P) -> Result<(), CatalogError> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(sql, params).map_err(db_err)?;
        if rows_affected == 0 {
            return Err(CatalogError::NotFound(format!("item {}", id)));
        }
        Ok(())
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<RemoteItem> {
        let kind: String = row.get(5)?;
        let status: String = row.get(7)?;
        let size_bytes: i64 = row.get(6)?;
        let first_seen_at: String = row.get(9)?;

        Ok(RemoteItem {
            id: row.get(0)?,
            host: row.get(1)?,
            source_dir: row.get(2)?,
            name: row.get(3)?,
            remote_path: row.get(4)?,
            kind: EntryKind::parse(&kind).unwrap_or(EntryKind::File),
            size_bytes: u64::try_from(size_bytes).unwrap_or(0),
            status: ItemStatus::parse(&status).unwrap_or(ItemStatus::Pending),
            attempts: row.get(8)?,
            first_seen_at: parse_timestamp(&first_seen_at).unwrap_or_else(Utc::now),
            transfer_started_at: optional_timestamp(row.get(10)?),
            transferred_at: optional_timestamp(row.get(11)?),
            moved_to: row.get(12)?,
            moved_at: optional_timestamp(row.get(13)?),
            source_removed_at: optional_timestamp(row.get(14)?),
        })
    }
}

impl ItemCatalog for SqliteCatalog {
    fn record_seen(
        &self,
        host: &str,
        source_dir: &str,
        entries: &[RemoteEntry],
    ) -> Result<u32, CatalogError> {
        let conn = self.conn()?;
        let now_str = Utc::now().to_rfc3339();
        let mut new_count = 0;

        for entry in entries {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO remote_items
                        (host, source_dir, name, remote_path, kind, size_bytes, status, first_seen_at)
                     VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)",
                    params![
                        host,
                        source_dir,
                        &entry.name,
                        remote_path(source_dir, &entry.name),
                        entry.kind.as_str(),
                        i64::try_from(entry.size_bytes).unwrap_or(i64::MAX),
                        &now_str,
                    ],
                )
                .map_err(db_err)?;

            if inserted > 0 {
                new_count += 1;
            } else {
                // Size may still grow while the item is being uploaded
                conn.execute(
                    "UPDATE remote_items SET size_bytes = ?
                     WHERE host = ? AND remote_path = ? AND status = 'pending'",
                    params![
                        i64::try_from(entry.size_bytes).unwrap_or(i64::MAX),
                        host,
                        remote_path(source_dir, &entry.name),
                    ],
                )
                .map_err(db_err)?;
            }
        }

        Ok(new_count)
    }

    fn candidates(&self, host: &str, max_retries: u32) -> Result<Vec<RemoteItem>, CatalogError> {
        self.query_items(
            &format!(
                "SELECT {} FROM remote_items
                 WHERE host = ? AND status IN ('pending', 'failed') AND attempts < ?
                 ORDER BY first_seen_at, id",
                ITEM_COLUMNS
            ),
            params![host, max_retries],
        )
    }

    fn in_status(&self, host: &str, status: ItemStatus) -> Result<Vec<RemoteItem>, CatalogError> {
        self.query_items(
            &format!(
                "SELECT {} FROM remote_items WHERE host = ? AND status = ? ORDER BY id",
                ITEM_COLUMNS
            ),
            params![host, status.as_str()],
        )
    }

    fn awaiting_move(&self, host: &str) -> Result<Vec<RemoteItem>, CatalogError> {
        self.query_items(
            &format!(
                "SELECT {} FROM remote_items
                 WHERE host = ? AND status = 'transferred' AND moved_at IS NULL
                 ORDER BY id",
                ITEM_COLUMNS
            ),
            params![host],
        )
    }

    fn awaiting_source_removal(&self, host: &str) -> Result<Vec<RemoteItem>, CatalogError> {
        self.query_items(
            &format!(
                "SELECT {} FROM remote_items
                 WHERE host = ? AND status = 'transferred' AND source_removed_at IS NULL
                 ORDER BY id",
                ITEM_COLUMNS
            ),
            params![host],
        )
    }

    fn get(&self, id: i64) -> Result<RemoteItem, CatalogError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM remote_items WHERE id = ?", ITEM_COLUMNS),
            params![id],
            Self::row_to_item,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => CatalogError::NotFound(format!("item {}", id)),
            _ => db_err(e),
        })
    }

    fn mark_transferring(&self, id: i64) -> Result<(), CatalogError> {
        self.update_one(
            id,
            "UPDATE remote_items
             SET status = 'transferring', attempts = attempts + 1, transfer_started_at = ?
             WHERE id = ?",
            params![Utc::now().to_rfc3339(), id],
        )
    }

    fn mark_transferred(&self, id: i64) -> Result<(), CatalogError> {
        self.update_one(
            id,
            "UPDATE remote_items SET status = 'transferred', transferred_at = ? WHERE id = ?",
            params![Utc::now().to_rfc3339(), id],
        )
    }

    fn mark_failed(&self, id: i64) -> Result<(), CatalogError> {
        self.update_one(
            id,
            "UPDATE remote_items SET status = 'failed' WHERE id = ?",
            params![id],
        )
    }

    fn mark_moved(&self, id: i64, destination: &Path) -> Result<(), CatalogError> {
        self.update_one(
            id,
            "UPDATE remote_items SET moved_to = ?, moved_at = ? WHERE id = ?",
            params![
                destination.to_string_lossy().into_owned(),
                Utc::now().to_rfc3339(),
                id
            ],
        )
    }

    fn mark_source_removed(&self, id: i64) -> Result<(), CatalogError> {
        self.update_one(
            id,
            "UPDATE remote_items SET source_removed_at = ? WHERE id = ?",
            params![Utc::now().to_rfc3339(), id],
        )
    }
}

fn db_err(e: rusqlite::Error) -> CatalogError {
    CatalogError::Database(e.to_string())
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn optional_timestamp(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().and_then(parse_timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{dir_entry, file_entry};

    fn create_test_catalog() -> SqliteCatalog {
        SqliteCatalog::in_memory().unwrap()
    }

    #[test]
    fn test_record_seen_counts_new_items_only() {
        let catalog = create_test_catalog();
        let entries = vec![
            dir_entry("Show S01"),
            file_entry("movie.mkv", 100),
        ];

        assert_eq!(catalog.record_seen("h", "/in", &entries).unwrap(), 2);
        assert_eq!(catalog.record_seen("h", "/in", &entries).unwrap(), 0);
        // Same path on another host is a different item
        assert_eq!(catalog.record_seen("other", "/in", &entries).unwrap(), 2);

        let items = catalog.candidates("h", 5).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].remote_path, "/in/Show S01");
        assert_eq!(items[0].kind, EntryKind::Directory);
        assert_eq!(items[0].status, ItemStatus::Pending);
        assert_eq!(items[0].attempts, 0);
    }

    #[test]
    fn test_pending_size_is_refreshed() {
        let catalog = create_test_catalog();
        catalog
            .record_seen("h", "/in", &[file_entry("growing.iso", 100)])
            .unwrap();
        let mut bigger = file_entry("growing.iso", 100);
        bigger.size_bytes = 5000;
        catalog.record_seen("h", "/in", &[bigger]).unwrap();

        let items = catalog.in_status("h", ItemStatus::Pending).unwrap();
        assert_eq!(items[0].size_bytes, 5000);
    }

    #[test]
    fn test_lifecycle() {
        let catalog = create_test_catalog();
        catalog
            .record_seen("h", "/in/", &[file_entry("a", 100)])
            .unwrap();
        let id = catalog.candidates("h", 5).unwrap()[0].id;

        catalog.mark_transferring(id).unwrap();
        let item = catalog.get(id).unwrap();
        assert_eq!(item.remote_path, "/in/a");
        assert_eq!(item.status, ItemStatus::Transferring);
        assert_eq!(item.attempts, 1);
        assert!(item.transfer_started_at.is_some());
        assert!(catalog.candidates("h", 5).unwrap().is_empty());

        catalog.mark_transferred(id).unwrap();
        assert_eq!(catalog.awaiting_move("h").unwrap().len(), 1);
        assert_eq!(catalog.awaiting_source_removal("h").unwrap().len(), 1);

        catalog.mark_source_removed(id).unwrap();
        assert!(catalog.awaiting_source_removal("h").unwrap().is_empty());

        catalog.mark_moved(id, Path::new("/final/a")).unwrap();
        assert!(catalog.awaiting_move("h").unwrap().is_empty());

        let item = catalog.get(id).unwrap();
        assert_eq!(item.moved_to.as_deref(), Some("/final/a"));
        assert!(item.moved_at.is_some());
        assert!(item.source_removed_at.is_some());
    }

    #[test]
    fn test_failed_items_retry_until_max() {
        let catalog = create_test_catalog();
        catalog
            .record_seen("h", "/in", &[file_entry("flaky", 100)])
            .unwrap();
        let id = catalog.candidates("h", 2).unwrap()[0].id;

        catalog.mark_transferring(id).unwrap();
        catalog.mark_failed(id).unwrap();
        assert_eq!(catalog.candidates("h", 2).unwrap().len(), 1);

        catalog.mark_transferring(id).unwrap();
        catalog.mark_failed(id).unwrap();
        assert!(catalog.candidates("h", 2).unwrap().is_empty());
        assert_eq!(catalog.in_status("h", ItemStatus::Failed).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_item() {
        let catalog = create_test_catalog();
        assert!(matches!(catalog.get(42), Err(CatalogError::NotFound(_))));
        assert!(matches!(
            catalog.mark_failed(42),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("locomotive.db");

        {
            let catalog = SqliteCatalog::new(&path).unwrap();
            catalog
                .record_seen("h", "/in", &[file_entry("a", 100)])
                .unwrap();
        }

        let catalog = SqliteCatalog::new(&path).unwrap();
        assert_eq!(catalog.candidates("h", 5).unwrap().len(), 1);
    }
}
