//! Durable storage for Gala.
//!
//! This crate provides:
//! - The roster and prize ledger (one SQLite database, atomic winner commits)
//! - The override registry (a separate SQLite database, never exported)
//! - JSON snapshots for standard export/import of roster and prizes
//!
//! # Architecture
//!
//! ```text
//! LedgerBackend ── LedgerDb   (ledger.db: participants, prizes, prize_winners)
//! OverrideBackend ─ OverrideDb (render-cache.db: entries, flags)
//! LedgerSnapshot  (export/import; participants + prizes only)
//! ```
//!
//! The draw engine consumes the two traits, so tests and alternative hosts can
//! substitute their own implementations.

mod ledger_db;
mod override_db;
mod snapshot;
mod sqlite_util;

use anyhow::Result;

use gala_types::{OverrideEntry, OverrideState, Participant, Prize, PrizeId, WinnerCommit};

pub use ledger_db::LedgerDb;
pub use override_db::OverrideDb;
pub use snapshot::{LedgerSnapshot, SNAPSHOT_VERSION};

/// File name of the ledger database inside the data directory.
pub const LEDGER_DB_FILE: &str = "ledger.db";
/// File name of the override database inside the data directory.
pub const OVERRIDE_DB_FILE: &str = "render-cache.db";

/// Roster and prize ledger persistence.
pub trait LedgerBackend: Send {
    /// All participants in roster order.
    fn list_participants(&self) -> Result<Vec<Participant>>;

    /// All prizes in presentation order, with recorded winners.
    fn list_prizes(&self) -> Result<Vec<Prize>>;

    /// Record a batch of winners on the roster and the prize, all or nothing.
    ///
    /// Must be durable before returning `Ok`.
    fn commit_winners(&mut self, commit: &WinnerCommit) -> Result<()>;

    /// Replace roster and prizes wholesale in one transaction.
    fn restore(&mut self, participants: &[Participant], prizes: &[Prize]) -> Result<()>;

    /// Insert or update a prize's metadata (recorded winners are untouched).
    fn save_prize(&mut self, prize: &Prize) -> Result<()>;

    fn delete_prize(&mut self, prize_id: &PrizeId) -> Result<()>;

    /// Persist presentation order; `order[i]` gets position `i`.
    fn reorder_prizes(&mut self, order: &[PrizeId]) -> Result<()>;

    /// Clear a prize's winners and the win records pointing at it.
    fn reset_prize(&mut self, prize_id: &PrizeId) -> Result<()>;

    /// Clear every recorded win.
    fn reset_all(&mut self) -> Result<()>;
}

/// Override registry persistence.
pub trait OverrideBackend: Send {
    fn load(&self) -> Result<OverrideState>;

    /// Returns `false` when the pair was already registered.
    fn insert(&mut self, entry: &OverrideEntry) -> Result<bool>;

    /// Returns `false` when the pair was not registered.
    fn delete(&mut self, entry: &OverrideEntry) -> Result<bool>;

    fn delete_for_prize(&mut self, prize_id: &PrizeId) -> Result<usize>;

    /// Remove every entry and deactivate.
    fn clear(&mut self) -> Result<()>;

    fn set_activated(&mut self, activated: bool) -> Result<()>;
}
