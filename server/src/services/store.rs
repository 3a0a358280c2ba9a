use crate::db::Db;
use crate::error::StoreError;
use rusqlite::{params, OptionalExtension};

/// The three records the ledger persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKey {
    CurrentPeriod,
    SeasonStandings,
    LastReset,
}

impl RecordKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKey::CurrentPeriod => "current_period",
            RecordKey::SeasonStandings => "season_standings",
            RecordKey::LastReset => "last_reset",
        }
    }
}

/// Durable key/value persistence for ledger records.
pub trait LedgerStore: Send + Sync {
    fn load(&self, key: RecordKey) -> Result<Option<String>, StoreError>;

    fn save(&self, key: RecordKey, value: &str) -> Result<(), StoreError>;

    /// Writes every record or none of them.
    fn save_all(&self, records: &[(RecordKey, String)]) -> Result<(), StoreError>;
}

impl LedgerStore for Db {
    fn load(&self, key: RecordKey) -> Result<Option<String>, StoreError> {
        Ok(self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM ledger_records WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()
        })?)
    }

    fn save(&self, key: RecordKey, value: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| upsert(conn, key, value))?;
        tracing::debug!(key = key.as_str(), "saved ledger record");
        Ok(())
    }

    fn save_all(&self, records: &[(RecordKey, String)]) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            for (key, value) in records {
                upsert(&tx, *key, value)?;
            }
            tx.commit()
        })?;
        tracing::debug!(records = records.len(), "saved ledger records");
        Ok(())
    }
}

fn upsert(conn: &rusqlite::Connection, key: RecordKey, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO ledger_records (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key.as_str(), value],
    )?;
    Ok(())
}
