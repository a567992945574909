//! Ledger Store - durable roster and prize ledger.
//!
//! Participants, prizes and recorded winners live in one SQLite database so a
//! batch of winners can be committed in a single transaction: either every
//! participant of the batch is marked and appended to the prize, or nothing is.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension, Transaction, params};

use gala_types::{
    NonEmptyString, Participant, ParticipantId, Prize, PrizeId, Quota, WinRecord, WinnerCommit,
};

use crate::LedgerBackend;
use crate::sqlite_util::{from_millis, open_memory_db, open_secure_db, to_millis};

/// SQLite-backed roster and prize ledger.
pub struct LedgerDb {
    db: Connection,
}

impl std::fmt::Debug for LedgerDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerDb").finish_non_exhaustive()
    }
}

impl LedgerDb {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS participants (
            id TEXT PRIMARY KEY,
            seq INTEGER NOT NULL,
            name TEXT NOT NULL,
            department TEXT NOT NULL DEFAULT '',
            photo_ref TEXT,
            won_prize_id TEXT,
            won_at INTEGER,
            CHECK ((won_prize_id IS NULL) = (won_at IS NULL))
        );

        CREATE TABLE IF NOT EXISTS prizes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            quota INTEGER NOT NULL CHECK (quota >= 1),
            sort_order INTEGER NOT NULL,
            include_winners INTEGER NOT NULL DEFAULT 0,
            is_temporary INTEGER NOT NULL DEFAULT 0
        );

        -- Recorded winners per prize, in draw order
        CREATE TABLE IF NOT EXISTS prize_winners (
            prize_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            participant_id TEXT NOT NULL,
            -- NULL only for winners imported without a matching win record
            won_at INTEGER,
            PRIMARY KEY (prize_id, participant_id),
            FOREIGN KEY (prize_id) REFERENCES prizes(id) ON DELETE CASCADE,
            FOREIGN KEY (participant_id) REFERENCES participants(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_participants_seq
        ON participants(seq);

        CREATE INDEX IF NOT EXISTS idx_prize_winners_position
        ON prize_winners(prize_id, position);
    ";

    /// Open or create the ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = open_secure_db(path)
            .with_context(|| format!("Failed to open ledger at {}", path.display()))?;
        Self::initialize(db)
    }

    /// Open an in-memory ledger (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(open_memory_db()?)
    }

    fn initialize(db: Connection) -> Result<Self> {
        db.execute_batch(Self::SCHEMA)
            .context("Failed to create ledger schema")?;
        ensure_winner_won_at(&db)?;
        Ok(Self { db })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.db
    }

    fn insert_participants(tx: &Transaction<'_>, participants: &[Participant]) -> Result<()> {
        for (seq, p) in participants.iter().enumerate() {
            if p.id.is_blank() {
                bail!("participant at row {} has a blank id", seq + 1);
            }
            let (won_prize_id, won_at) = match p.win() {
                Some(win) => (Some(win.prize_id.as_str()), Some(to_millis(win.won_at))),
                None => (None, None),
            };
            tx.execute(
                "INSERT INTO participants
                    (id, seq, name, department, photo_ref, won_prize_id, won_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    p.id.as_str(),
                    seq as i64,
                    p.name.as_str(),
                    &p.department,
                    p.photo_ref.as_deref(),
                    won_prize_id,
                    won_at
                ],
            )
            .with_context(|| format!("Failed to insert participant {}", p.id))?;
        }
        Ok(())
    }

    fn insert_prize(tx: &Transaction<'_>, prize: &Prize) -> Result<()> {
        tx.execute(
            "INSERT INTO prizes (id, name, quota, sort_order, include_winners, is_temporary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                prize.id.as_str(),
                prize.name.as_str(),
                prize.quota.get() as i64,
                i64::from(prize.order),
                prize.include_winners,
                prize.is_temporary
            ],
        )
        .with_context(|| format!("Failed to insert prize {}", prize.id))?;
        for (position, winner) in prize.winners().iter().enumerate() {
            tx.execute(
                "INSERT INTO prize_winners (prize_id, position, participant_id)
                 VALUES (?1, ?2, ?3)",
                params![prize.id.as_str(), position as i64, winner.as_str()],
            )
            .with_context(|| format!("Failed to record winner {winner} for prize {}", prize.id))?;
        }
        Ok(())
    }

    fn load_winners(&self) -> Result<HashMap<String, Vec<ParticipantId>>> {
        let mut stmt = self
            .db
            .prepare(
                "SELECT prize_id, participant_id FROM prize_winners
                 ORDER BY prize_id ASC, position ASC",
            )
            .context("Failed to prepare winner query")?;
        let rows = stmt
            .query_map([], |row| {
                let prize_id: String = row.get(0)?;
                let participant_id: String = row.get(1)?;
                Ok((prize_id, participant_id))
            })
            .context("Failed to query winners")?;

        let mut winners: HashMap<String, Vec<ParticipantId>> = HashMap::new();
        for row in rows {
            let (prize_id, participant_id) = row.context("Failed to read winner row")?;
            winners
                .entry(prize_id)
                .or_default()
                .push(ParticipantId::new(participant_id));
        }
        Ok(winners)
    }
}

/// Migration: per-winner timestamps for databases created before they existed.
fn ensure_winner_won_at(db: &Connection) -> Result<()> {
    let mut stmt = db
        .prepare("PRAGMA table_info(prize_winners)")
        .context("Failed to inspect prize_winners schema")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .context("Failed to query prize_winners columns")?;
    for name in columns {
        if name.context("Failed to read column name")? == "won_at" {
            return Ok(());
        }
    }
    db.execute_batch(
        "ALTER TABLE prize_winners ADD COLUMN won_at INTEGER;
         UPDATE prize_winners SET won_at = (
            SELECT p.won_at FROM participants p
            WHERE p.id = prize_winners.participant_id
              AND p.won_prize_id = prize_winners.prize_id
         );",
    )
    .context("Failed to add won_at column to prize_winners")?;
    Ok(())
}

impl LedgerBackend for LedgerDb {
    fn list_participants(&self) -> Result<Vec<Participant>> {
        let mut stmt = self
            .db
            .prepare(
                "SELECT id, name, department, photo_ref, won_prize_id, won_at
                 FROM participants
                 ORDER BY seq ASC",
            )
            .context("Failed to prepare participant query")?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let name: String = row.get(1)?;
                let department: String = row.get(2)?;
                let photo_ref: Option<String> = row.get(3)?;
                let won_prize_id: Option<String> = row.get(4)?;
                let won_at: Option<i64> = row.get(5)?;
                Ok((id, name, department, photo_ref, won_prize_id, won_at))
            })
            .context("Failed to query participants")?;

        let mut participants = Vec::new();
        for row in rows {
            let (id, name, department, photo_ref, won_prize_id, won_at) =
                row.context("Failed to read participant row")?;
            let name = NonEmptyString::new(name)
                .with_context(|| format!("Participant {id} has an empty name"))?;
            let win = match (won_prize_id, won_at) {
                (Some(prize_id), Some(at)) => Some(WinRecord {
                    prize_id: PrizeId::new(prize_id),
                    won_at: from_millis(at)?,
                }),
                _ => None,
            };
            let mut participant = Participant::new(ParticipantId::new(id), name, department);
            participant.photo_ref = photo_ref;
            participants.push(participant.with_win(win));
        }
        Ok(participants)
    }

    fn list_prizes(&self) -> Result<Vec<Prize>> {
        let mut winners = self.load_winners()?;
        let mut stmt = self
            .db
            .prepare(
                "SELECT id, name, quota, sort_order, include_winners, is_temporary
                 FROM prizes
                 ORDER BY sort_order ASC, id ASC",
            )
            .context("Failed to prepare prize query")?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let name: String = row.get(1)?;
                let quota: i64 = row.get(2)?;
                let order: i64 = row.get(3)?;
                let include_winners: bool = row.get(4)?;
                let is_temporary: bool = row.get(5)?;
                Ok((id, name, quota, order, include_winners, is_temporary))
            })
            .context("Failed to query prizes")?;

        let mut prizes = Vec::new();
        for row in rows {
            let (id, name, quota, order, include_winners, is_temporary) =
                row.context("Failed to read prize row")?;
            let name =
                NonEmptyString::new(name).with_context(|| format!("Prize {id} has an empty name"))?;
            let quota = u32::try_from(quota)
                .ok()
                .and_then(|q| Quota::new(q).ok())
                .ok_or_else(|| anyhow!("Prize {id} has an invalid quota {quota}"))?;
            let recorded = winners.remove(&id).unwrap_or_default();
            let mut prize = Prize::new(PrizeId::new(id), name, quota)
                .with_order(u32::try_from(order).unwrap_or(u32::MAX))
                .with_include_winners(include_winners)
                .with_temporary(is_temporary);
            prize
                .record_winners(&recorded)
                .with_context(|| format!("Stored winners for prize {} are invalid", prize.id))?;
            prizes.push(prize);
        }
        Ok(prizes)
    }

    fn commit_winners(&mut self, commit: &WinnerCommit) -> Result<()> {
        let tx = self
            .db
            .transaction()
            .context("Failed to start commit transaction")?;

        let quota: Option<i64> = tx
            .query_row(
                "SELECT quota FROM prizes WHERE id = ?1",
                params![commit.prize_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read prize quota")?;
        let Some(quota) = quota else {
            bail!("Unknown prize {}", commit.prize_id);
        };

        let existing: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM prize_winners WHERE prize_id = ?1",
                params![commit.prize_id.as_str()],
                |row| row.get(0),
            )
            .context("Failed to count recorded winners")?;
        let attempted = existing + commit.winners.len() as i64;
        if attempted > quota {
            bail!(
                "Prize {} would hold {attempted} winners but its quota is {quota}",
                commit.prize_id
            );
        }

        let won_at = to_millis(commit.won_at);
        for (offset, winner) in commit.winners.iter().enumerate() {
            let changed = tx
                .execute(
                    "UPDATE participants SET won_prize_id = ?1, won_at = ?2 WHERE id = ?3",
                    params![commit.prize_id.as_str(), won_at, winner.as_str()],
                )
                .with_context(|| format!("Failed to mark participant {winner}"))?;
            if changed != 1 {
                bail!("Unknown participant {winner}");
            }
            tx.execute(
                "INSERT INTO prize_winners (prize_id, position, participant_id, won_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    commit.prize_id.as_str(),
                    existing + offset as i64,
                    winner.as_str(),
                    won_at
                ],
            )
            .with_context(|| format!("Failed to append winner {winner}"))?;
        }

        // Dropping an uncommitted transaction rolls it back, so every early
        // return above leaves both tables untouched.
        tx.commit().context("Failed to commit winners")?;
        Ok(())
    }

    fn restore(&mut self, participants: &[Participant], prizes: &[Prize]) -> Result<()> {
        let tx = self
            .db
            .transaction()
            .context("Failed to start restore transaction")?;
        tx.execute_batch(
            "DELETE FROM prize_winners; DELETE FROM prizes; DELETE FROM participants;",
        )
        .context("Failed to clear ledger tables")?;
        Self::insert_participants(&tx, participants)?;
        for prize in prizes {
            Self::insert_prize(&tx, prize)?;
        }
        tx.execute(
            "UPDATE prize_winners SET won_at = (
                SELECT p.won_at FROM participants p
                WHERE p.id = prize_winners.participant_id
                  AND p.won_prize_id = prize_winners.prize_id
             )",
            [],
        )
        .context("Failed to restore winner timestamps")?;
        tx.commit().context("Failed to commit restore")?;
        Ok(())
    }

    fn save_prize(&mut self, prize: &Prize) -> Result<()> {
        self.db
            .execute(
                "INSERT INTO prizes (id, name, quota, sort_order, include_winners, is_temporary)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    quota = excluded.quota,
                    sort_order = excluded.sort_order,
                    include_winners = excluded.include_winners,
                    is_temporary = excluded.is_temporary",
                params![
                    prize.id.as_str(),
                    prize.name.as_str(),
                    prize.quota.get() as i64,
                    i64::from(prize.order),
                    prize.include_winners,
                    prize.is_temporary
                ],
            )
            .with_context(|| format!("Failed to save prize {}", prize.id))?;
        Ok(())
    }

    fn delete_prize(&mut self, prize_id: &PrizeId) -> Result<()> {
        self.db
            .execute(
                "DELETE FROM prizes WHERE id = ?1",
                params![prize_id.as_str()],
            )
            .with_context(|| format!("Failed to delete prize {prize_id}"))?;
        Ok(())
    }

    fn reorder_prizes(&mut self, order: &[PrizeId]) -> Result<()> {
        let tx = self
            .db
            .transaction()
            .context("Failed to start reorder transaction")?;
        for (index, id) in order.iter().enumerate() {
            tx.execute(
                "UPDATE prizes SET sort_order = ?1 WHERE id = ?2",
                params![index as i64, id.as_str()],
            )
            .with_context(|| format!("Failed to reorder prize {id}"))?;
        }
        tx.commit().context("Failed to commit prize order")?;
        Ok(())
    }

    fn reset_prize(&mut self, prize_id: &PrizeId) -> Result<()> {
        let tx = self
            .db
            .transaction()
            .context("Failed to start reset transaction")?;
        tx.execute(
            "DELETE FROM prize_winners WHERE prize_id = ?1",
            params![prize_id.as_str()],
        )
        .context("Failed to clear prize winners")?;
        // A participant whose latest win pointed here falls back to their most
        // recent remaining win; without one the record is cleared.
        tx.execute(
            "UPDATE participants SET
                won_prize_id = (
                    SELECT pw.prize_id FROM prize_winners pw
                    WHERE pw.participant_id = participants.id
                    ORDER BY pw.won_at IS NULL, pw.won_at DESC, pw.rowid DESC
                    LIMIT 1
                ),
                won_at = (
                    SELECT COALESCE(pw.won_at, participants.won_at) FROM prize_winners pw
                    WHERE pw.participant_id = participants.id
                    ORDER BY pw.won_at IS NULL, pw.won_at DESC, pw.rowid DESC
                    LIMIT 1
                )
             WHERE won_prize_id = ?1",
            params![prize_id.as_str()],
        )
        .context("Failed to rewind participant wins")?;
        tx.commit().context("Failed to commit prize reset")?;
        Ok(())
    }

    fn reset_all(&mut self) -> Result<()> {
        let tx = self
            .db
            .transaction()
            .context("Failed to start reset transaction")?;
        tx.execute_batch(
            "DELETE FROM prize_winners;
             UPDATE participants SET won_prize_id = NULL, won_at = NULL;",
        )
        .context("Failed to reset all winners")?;
        tx.commit().context("Failed to commit reset")?;
        Ok(())
    }
}
