//! Crash reporter metadata store

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::Result;

/// Key/value store backing the crash reporter's user info.
///
/// Values are JSON documents. Every write replaces the previous value under
/// the same key; nothing is merged.
pub struct CrashStore {
    conn: Arc<Mutex<Connection>>,
}

impl CrashStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL mode so a crash mid-write keeps the last committed entry
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Replace the user info entry stored under `key`
    pub fn set_user_info(&self, key: &str, value: &Value) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let updated_at = Utc::now().to_rfc3339();

        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO crash_user_info (key, value, updated_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![key, json, updated_at],
            )?;
            Ok(())
        })?;

        tracing::debug!(key = %key, "Updated crash user info");

        Ok(())
    }

    pub fn user_info(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self.with_connection(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM crash_user_info WHERE key = ?1",
                    [key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// All user info entries, keyed and sorted by name
    pub fn all_user_info(&self) -> Result<BTreeMap<String, Value>> {
        let rows: Vec<(String, String)> = self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM crash_user_info")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        let mut entries = BTreeMap::new();
        for (key, json) in rows {
            match serde_json::from_str(&json) {
                Ok(value) => {
                    entries.insert(key, value);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping unreadable crash user info");
                }
            }
        }

        Ok(entries)
    }

    pub fn remove_user_info(&self, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM crash_user_info WHERE key = ?1", [key])?;
            Ok(())
        })
    }
}

impl Clone for CrashStore {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_open_in_memory() {
        let store = CrashStore::open_in_memory().unwrap();
        store
            .with_connection(|conn| {
                let count: i32 =
                    conn.query_row("SELECT COUNT(*) FROM crash_user_info", [], |row| row.get(0))?;
                assert_eq!(count, 0);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_last_write_wins() {
        let store = CrashStore::open_in_memory().unwrap();

        store
            .set_user_info("Resource", &json!({ "network": "wifi0", "session": "a" }))
            .unwrap();
        store
            .set_user_info("Resource", &json!({ "session": "b" }))
            .unwrap();

        // Second write replaces the first entirely; no field survives
        let value = store.user_info("Resource").unwrap().unwrap();
        assert_eq!(value, json!({ "session": "b" }));
        assert_eq!(store.all_user_info().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_key() {
        let store = CrashStore::open_in_memory().unwrap();
        assert!(store.user_info("Resource").unwrap().is_none());
    }

    #[test]
    fn test_remove_user_info() {
        let store = CrashStore::open_in_memory().unwrap();
        store.set_user_info("Resource", &json!(1)).unwrap();
        store.set_user_info("Build", &json!("1.0")).unwrap();

        store.remove_user_info("Resource").unwrap();

        let all = store.all_user_info().unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["Build"]);
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("crash.db");

        {
            let store = CrashStore::open(&path).unwrap();
            store
                .set_user_info("Resource", &json!({ "model": "x86_64" }))
                .unwrap();
        }

        let reopened = CrashStore::open(&path).unwrap();
        let value = reopened.user_info("Resource").unwrap().unwrap();
        assert_eq!(value["model"], "x86_64");
    }

    #[test]
    fn test_undecodable_row_is_an_error() {
        let store = CrashStore::open_in_memory().unwrap();
        store.set_user_info("Build", &json!("1.0")).unwrap();
        store
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO crash_user_info (key, value, updated_at) VALUES ('Resource', x'00ff', '')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        assert!(matches!(
            store.all_user_info(),
            Err(crate::StorageError::Database(_))
        ));
    }
}
