//! Override registry: an in-memory view written through to its own store.

use anyhow::Result;

use gala_store::OverrideBackend;
use gala_types::{OverrideEntry, OverrideSnapshot, OverrideState, ParticipantId, PrizeId};

pub struct OverrideRegistry {
    state: OverrideState,
    backend: Box<dyn OverrideBackend>,
}

impl std::fmt::Debug for OverrideRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideRegistry").finish_non_exhaustive()
    }
}

impl OverrideRegistry {
    pub fn load(backend: Box<dyn OverrideBackend>) -> Result<Self> {
        let state = backend.load()?;
        Ok(Self { state, backend })
    }

    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.state.activated
    }

    /// Participants registered for `prize_id`, in registration order.
    #[must_use]
    pub fn list_for(&self, prize_id: &PrizeId) -> Vec<ParticipantId> {
        self.state.for_prize(prize_id)
    }

    #[must_use]
    pub fn has_overrides(&self, prize_id: &PrizeId) -> bool {
        self.state.entries.iter().any(|e| &e.prize_id == prize_id)
    }

    #[must_use]
    pub fn contains(&self, entry: &OverrideEntry) -> bool {
        self.state.entries.contains(entry)
    }

    /// The view a draw for `prize_id` consumes at stop time.
    #[must_use]
    pub fn snapshot_for(&self, prize_id: &PrizeId) -> OverrideSnapshot {
        if self.state.activated {
            OverrideSnapshot::active(self.list_for(prize_id))
        } else {
            OverrideSnapshot::inactive()
        }
    }

    /// Returns `false` if the pair was already registered.
    pub fn add(&mut self, entry: OverrideEntry) -> Result<bool> {
        if self.contains(&entry) {
            return Ok(false);
        }
        let inserted = self.backend.insert(&entry)?;
        if inserted {
            self.state.entries.push(entry);
        }
        Ok(inserted)
    }

    pub fn remove(&mut self, entry: &OverrideEntry) -> Result<bool> {
        let removed = self.backend.delete(entry)?;
        self.state.entries.retain(|e| e != entry);
        Ok(removed)
    }

    pub fn clear_for_prize(&mut self, prize_id: &PrizeId) -> Result<usize> {
        let removed = self.backend.delete_for_prize(prize_id)?;
        self.state.entries.retain(|e| &e.prize_id != prize_id);
        Ok(removed)
    }

    /// Remove every entry and deactivate.
    pub fn clear_all(&mut self) -> Result<()> {
        self.backend.clear()?;
        self.state = OverrideState::default();
        Ok(())
    }

    pub fn set_activated(&mut self, activated: bool) -> Result<()> {
        self.backend.set_activated(activated)?;
        self.state.activated = activated;
        Ok(())
    }
}
