//! Core engine for Gala - the draw state machine and its coordinator.
//!
//! [`DrawEngine`] is the single owner of a draw session. It holds in-memory
//! mirrors of the roster, prize ledger and override registry, writes through
//! to the stores in `gala-store`, and drives
//! `idle -> rolling -> stopping -> showing -> idle`.
//!
//! Timers run as tokio tasks that only signal; every mutation of durable state
//! happens on the coordinator, inside [`DrawEngine::tick`] or
//! [`DrawEngine::wait_for_reveal`].

use std::collections::VecDeque;

use rand::rngs::StdRng;

pub use gala_store::{self, LedgerBackend, LedgerSnapshot, OverrideBackend};
pub use gala_types::{
    DrawStatus, NonEmptyString, OverrideEntry, Participant, ParticipantId, Prize, PrizeId, Quota,
};

mod admin;
mod config;
mod draw;
mod error;
mod history;
mod init;
mod ledger;
mod overrides;
mod pool;
mod roster;
mod schedule;
mod selection;
mod state;

pub use config::{
    ConfigError, DrawConfig, DrawSettings, GalaConfig, StorageConfig, config_path,
    expand_env_vars, persist_batch_size_at,
};
pub use error::DrawError;
pub use history::{PrizeWinners, WinnerEntry};
pub use init::resolve_data_dir;
pub use ledger::PrizeLedger;
pub use overrides::OverrideRegistry;
pub use pool::{Pool, resolve_pool};
pub use roster::{Roster, RosterError};
pub use selection::{SelectionError, sample_distinct, select};
pub use state::{DataDir, DataDirSource, DrawEvent, Transition};

use state::DrawSession;

/// Coordinator for one ceremony.
pub struct DrawEngine {
    settings: DrawSettings,
    backend: Box<dyn LedgerBackend>,
    roster: Roster,
    ledger: PrizeLedger,
    overrides: OverrideRegistry,
    session: DrawSession,
    /// Count of the most recent draw; survives `close`.
    requested_count: usize,
    /// Prize cursor for [`DrawEngine::toggle`].
    selected: usize,
    rng: StdRng,
    rolling_frame: Vec<ParticipantId>,
    last_failure: Option<DrawError>,
    events: VecDeque<DrawEvent>,
}

impl std::fmt::Debug for DrawEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawEngine")
            .field("status", &self.status())
            .field("participants", &self.roster.len())
            .field("prizes", &self.ledger.len())
            .finish_non_exhaustive()
    }
}

impl DrawEngine {
    #[must_use]
    pub fn settings(&self) -> &DrawSettings {
        &self.settings
    }

    #[must_use]
    pub fn status(&self) -> DrawStatus {
        self.session.status()
    }

    #[must_use]
    pub fn active_prize(&self) -> Option<&PrizeId> {
        self.session.prize()
    }

    #[must_use]
    pub fn requested_count(&self) -> usize {
        self.requested_count
    }

    /// Winners computed at stop time; `Some` while stopping or showing.
    #[must_use]
    pub fn pending_winners(&self) -> Option<&[ParticipantId]> {
        self.session.winners()
    }

    /// Latest rolling preview frame. Display only.
    #[must_use]
    pub fn rolling_frame(&self) -> &[ParticipantId] {
        &self.rolling_frame
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<&DrawError> {
        self.last_failure.as_ref()
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn ledger(&self) -> &PrizeLedger {
        &self.ledger
    }

    #[must_use]
    pub fn overrides(&self) -> &OverrideRegistry {
        &self.overrides
    }

    #[must_use]
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.roster.get(id)
    }

    #[must_use]
    pub fn prize(&self, id: &PrizeId) -> Option<&Prize> {
        self.ledger.get(id)
    }

    #[must_use]
    pub fn remaining_quota(&self, prize_id: &PrizeId) -> Option<usize> {
        self.ledger.get(prize_id).map(Prize::remaining)
    }

    #[must_use]
    pub fn pool(&self, prize_id: &PrizeId) -> Option<Pool<'_>> {
        self.ledger
            .get(prize_id)
            .map(|prize| resolve_pool(&self.roster, prize))
    }

    #[must_use]
    pub fn pool_size(&self, prize_id: &PrizeId) -> Option<usize> {
        self.pool(prize_id).map(|pool| pool.len())
    }

    /// Largest batch the operator may request: bounded by remaining quota,
    /// pool size and the configured batch limit.
    #[must_use]
    pub fn max_draw_count(&self, prize_id: &PrizeId) -> Option<usize> {
        let prize = self.ledger.get(prize_id)?;
        let pool = resolve_pool(&self.roster, prize).len();
        Some(prize.remaining().min(pool).min(self.settings.max_batch))
    }

    #[must_use]
    pub fn selected_prize(&self) -> Option<&Prize> {
        self.ledger.get_index(self.selected)
    }

    /// All winners, most recent first.
    #[must_use]
    pub fn winners_by_recency(&self) -> Vec<WinnerEntry<'_>> {
        history::winners_by_recency(&self.roster, &self.ledger)
    }

    /// Winners grouped per prize in prize order.
    #[must_use]
    pub fn winners_by_prize(&self) -> Vec<PrizeWinners<'_>> {
        history::winners_by_prize(&self.roster, &self.ledger)
    }

    #[must_use]
    pub fn export_snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::capture(
            self.roster.as_slice().to_vec(),
            self.ledger.as_slice().to_vec(),
        )
    }
}
