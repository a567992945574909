//! Override Store - operator-predetermined winners.
//!
//! Lives in its own database file with no foreign keys into the ledger.
//! Entries are matched against the live pool only when a draw stops.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use gala_types::{OverrideEntry, OverrideState, ParticipantId, PrizeId};

use crate::OverrideBackend;
use crate::sqlite_util::{open_memory_db, open_secure_db};

pub struct OverrideDb {
    db: Connection,
}

impl std::fmt::Debug for OverrideDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideDb").finish_non_exhaustive()
    }
}

impl OverrideDb {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS entries (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            prize_id TEXT NOT NULL,
            participant_id TEXT NOT NULL,
            UNIQUE (prize_id, participant_id)
        );

        CREATE TABLE IF NOT EXISTS flags (
            key TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );
    ";

    const ACTIVATED_KEY: &'static str = "activated";

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = open_secure_db(path)
            .with_context(|| format!("Failed to open cache at {}", path.display()))?;
        Self::initialize(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(open_memory_db()?)
    }

    fn initialize(db: Connection) -> Result<Self> {
        db.execute_batch(Self::SCHEMA)
            .context("Failed to create cache schema")?;
        Ok(Self { db })
    }

    fn activated(&self) -> Result<bool> {
        let value: Option<i64> = self
            .db
            .query_row(
                "SELECT value FROM flags WHERE key = ?1",
                params![Self::ACTIVATED_KEY],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read cache flags")?;
        Ok(value.unwrap_or(0) != 0)
    }
}

impl OverrideBackend for OverrideDb {
    fn load(&self) -> Result<OverrideState> {
        let mut stmt = self
            .db
            .prepare("SELECT prize_id, participant_id FROM entries ORDER BY seq ASC")
            .context("Failed to prepare cache query")?;
        let rows = stmt
            .query_map([], |row| {
                let prize_id: String = row.get(0)?;
                let participant_id: String = row.get(1)?;
                Ok(OverrideEntry::new(
                    PrizeId::new(prize_id),
                    ParticipantId::new(participant_id),
                ))
            })
            .context("Failed to query cache entries")?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.context("Failed to read cache entry")?);
        }
        Ok(OverrideState {
            activated: self.activated()?,
            entries,
        })
    }

    fn insert(&mut self, entry: &OverrideEntry) -> Result<bool> {
        let changed = self
            .db
            .execute(
                "INSERT OR IGNORE INTO entries (prize_id, participant_id) VALUES (?1, ?2)",
                params![entry.prize_id.as_str(), entry.participant_id.as_str()],
            )
            .context("Failed to insert cache entry")?;
        Ok(changed == 1)
    }

    fn delete(&mut self, entry: &OverrideEntry) -> Result<bool> {
        let changed = self
            .db
            .execute(
                "DELETE FROM entries WHERE prize_id = ?1 AND participant_id = ?2",
                params![entry.prize_id.as_str(), entry.participant_id.as_str()],
            )
            .context("Failed to delete cache entry")?;
        Ok(changed > 0)
    }

    fn delete_for_prize(&mut self, prize_id: &PrizeId) -> Result<usize> {
        self.db
            .execute(
                "DELETE FROM entries WHERE prize_id = ?1",
                params![prize_id.as_str()],
            )
            .context("Failed to clear cache entries for prize")
    }

    fn clear(&mut self) -> Result<()> {
        let tx = self
            .db
            .transaction()
            .context("Failed to start cache transaction")?;
        tx.execute("DELETE FROM entries", [])
            .context("Failed to clear cache entries")?;
        tx.execute(
            "INSERT INTO flags (key, value) VALUES (?1, 0)
             ON CONFLICT(key) DO UPDATE SET value = 0",
            params![Self::ACTIVATED_KEY],
        )
        .context("Failed to reset cache flags")?;
        tx.commit().context("Failed to commit cache clear")?;
        Ok(())
    }

    fn set_activated(&mut self, activated: bool) -> Result<()> {
        self.db
            .execute(
                "INSERT INTO flags (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![Self::ACTIVATED_KEY, i64::from(activated)],
            )
            .context("Failed to write cache flags")?;
        Ok(())
    }
}
