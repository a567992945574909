//! Administrative actions: roster and prize maintenance, the prize cursor and
//! override management.
//!
//! Roster and ledger changes are accepted only while idle and are written
//! through to the backend before the mirrors change.

use gala_store::LedgerSnapshot;
use gala_types::{
    NonEmptyString, OverrideEntry, Participant, ParticipantId, Prize, PrizeId, Quota,
};

use crate::ledger::PrizeLedger;
use crate::roster::Roster;
use crate::state::{DrawSession, Transition};
use crate::{DrawEngine, DrawError};

impl DrawEngine {
    fn ensure_idle(&self) -> Result<(), DrawError> {
        if matches!(self.session, DrawSession::Idle) {
            Ok(())
        } else {
            Err(DrawError::Busy(self.status()))
        }
    }

    fn require_prize(&self, prize_id: &PrizeId) -> Result<&Prize, DrawError> {
        self.ledger
            .get(prize_id)
            .ok_or_else(|| DrawError::UnknownPrize(prize_id.clone()))
    }

    /// Replace the whole roster. All recorded winners are cleared, since they
    /// may refer to people no longer present.
    pub fn replace_roster(&mut self, participants: Vec<Participant>) -> Result<(), DrawError> {
        self.ensure_idle()?;
        let participants = participants
            .into_iter()
            .map(|mut p| {
                p.clear_win();
                p
            })
            .collect();
        let roster = Roster::new(participants)?;
        let prizes = self.ledger.cleared();

        self.backend
            .restore(roster.as_slice(), &prizes)
            .map_err(|e| DrawError::store(&e))?;
        tracing::info!(participants = roster.len(), "Roster replaced");

        self.roster = roster;
        self.ledger = PrizeLedger::new(prizes);
        Ok(())
    }

    /// Replace roster and prizes with the contents of a snapshot.
    pub fn import_snapshot(&mut self, snapshot: &LedgerSnapshot) -> Result<(), DrawError> {
        self.ensure_idle()?;
        snapshot.validate().map_err(|e| DrawError::store(&e))?;
        let roster = Roster::new(snapshot.participants.clone())?;
        let ledger = PrizeLedger::new(snapshot.prizes.clone());

        self.backend
            .restore(roster.as_slice(), ledger.as_slice())
            .map_err(|e| DrawError::store(&e))?;
        tracing::info!(
            participants = roster.len(),
            prizes = ledger.len(),
            "Snapshot imported"
        );

        self.roster = roster;
        self.ledger = ledger;
        self.clamp_selection();
        Ok(())
    }

    /// Append a prize at the end of the order.
    pub fn add_prize(
        &mut self,
        name: NonEmptyString,
        quota: Quota,
        include_winners: bool,
        temporary: bool,
    ) -> Result<PrizeId, DrawError> {
        self.ensure_idle()?;
        let order = u32::try_from(self.ledger.len()).unwrap_or(u32::MAX);
        let prize = Prize::new(PrizeId::generate(), name, quota)
            .with_order(order)
            .with_include_winners(include_winners)
            .with_temporary(temporary);

        self.backend
            .save_prize(&prize)
            .map_err(|e| DrawError::store(&e))?;
        tracing::info!(prize = %prize.id, name = %prize.name, quota = quota.get(), "Prize added");

        let id = prize.id.clone();
        self.ledger.push(prize);
        Ok(id)
    }

    /// Remove a prize that has no recorded winners.
    pub fn remove_prize(&mut self, prize_id: &PrizeId) -> Result<(), DrawError> {
        self.ensure_idle()?;
        if !self.require_prize(prize_id)?.winners().is_empty() {
            return Err(DrawError::PrizeHasWinners(prize_id.clone()));
        }

        let mut next = self.ledger.clone();
        next.remove(prize_id);
        self.backend
            .delete_prize(prize_id)
            .map_err(|e| DrawError::store(&e))?;
        self.backend
            .reorder_prizes(&next.order())
            .map_err(|e| DrawError::store(&e))?;
        tracing::info!(prize = %prize_id, "Prize removed");

        self.ledger = next;
        self.clamp_selection();
        Ok(())
    }

    /// Move a prize to position `to` (clamped to the end).
    pub fn move_prize(&mut self, prize_id: &PrizeId, to: usize) -> Result<(), DrawError> {
        self.ensure_idle()?;
        let from = self
            .ledger
            .position(prize_id)
            .ok_or_else(|| DrawError::UnknownPrize(prize_id.clone()))?;
        let to = to.min(self.ledger.len().saturating_sub(1));
        if from == to {
            return Ok(());
        }

        let selected = self.selected_prize().map(|p| p.id.clone());
        let mut next = self.ledger.clone();
        next.move_prize(from, to);
        self.backend
            .reorder_prizes(&next.order())
            .map_err(|e| DrawError::store(&e))?;
        tracing::info!(prize = %prize_id, from, to, "Prize moved");

        self.ledger = next;
        if let Some(index) = selected.and_then(|id| self.ledger.position(&id)) {
            self.selected = index;
        }
        Ok(())
    }

    /// Clear a prize's winners. A participant whose latest win was this prize
    /// falls back to their most recent remaining win, so they stay out of
    /// pools that exclude winners.
    pub fn reset_prize(&mut self, prize_id: &PrizeId) -> Result<(), DrawError> {
        self.ensure_idle()?;
        let cleared = self.require_prize(prize_id)?.winners().len();
        self.backend
            .reset_prize(prize_id)
            .map_err(|e| DrawError::store(&e))?;

        // Earlier win times live only in the store.
        self.reload()?;
        tracing::info!(prize = %prize_id, cleared, "Prize reset");
        Ok(())
    }

    pub fn reset_all(&mut self) -> Result<(), DrawError> {
        self.ensure_idle()?;
        self.backend.reset_all().map_err(|e| DrawError::store(&e))?;
        self.ledger.reset_all();
        self.roster.clear_all_wins();
        tracing::info!("All winners reset");
        Ok(())
    }

    pub fn select_next_prize(&mut self) -> Transition {
        self.step_selection(true)
    }

    pub fn select_previous_prize(&mut self) -> Transition {
        self.step_selection(false)
    }

    fn step_selection(&mut self, forward: bool) -> Transition {
        let len = self.ledger.len();
        if len == 0 || !matches!(self.session, DrawSession::Idle) {
            return Transition::Ignored;
        }
        self.selected = if forward {
            (self.selected + 1) % len
        } else {
            (self.selected + len - 1) % len
        };
        Transition::Applied
    }

    pub fn select_prize(&mut self, prize_id: &PrizeId) -> Result<Transition, DrawError> {
        let index = self
            .ledger
            .position(prize_id)
            .ok_or_else(|| DrawError::UnknownPrize(prize_id.clone()))?;
        if !matches!(self.session, DrawSession::Idle) {
            return Ok(Transition::Ignored);
        }
        self.selected = index;
        Ok(Transition::Applied)
    }

    /// One-key flow: start on the selected prize, stop, or close.
    ///
    /// From idle the count is `desired` capped at the prize's remaining quota;
    /// a filled prize is not started.
    pub fn toggle(&mut self, desired: usize) -> Result<Transition, DrawError> {
        match self.session {
            DrawSession::Idle => {
                let prize = self.selected_prize().ok_or(DrawError::NoPrizes)?;
                let remaining = prize.remaining();
                if remaining == 0 {
                    tracing::debug!(prize = %prize.id, "toggle ignored: quota filled");
                    return Ok(Transition::Ignored);
                }
                let prize_id = prize.id.clone();
                self.start(&prize_id, desired.min(remaining))
            }
            DrawSession::Rolling(_) => Ok(self.stop()),
            DrawSession::Showing(_) => Ok(self.close()),
            DrawSession::Stopping(_) => Ok(Transition::Ignored),
        }
    }

    /// Register an override. Allowed in any state; takes effect at the next
    /// stop. Returns `false` if the pair was already registered.
    pub fn add_override(
        &mut self,
        prize_id: &PrizeId,
        participant_id: &ParticipantId,
    ) -> Result<bool, DrawError> {
        self.require_prize(prize_id)?;
        if !self.roster.contains(participant_id) {
            return Err(DrawError::UnknownParticipant(participant_id.clone()));
        }
        let entry = OverrideEntry::new(prize_id.clone(), participant_id.clone());
        let added = self
            .overrides
            .add(entry)
            .map_err(|e| DrawError::store(&e))?;
        tracing::debug!(added, "Cache entry registered");
        Ok(added)
    }

    pub fn remove_override(
        &mut self,
        prize_id: &PrizeId,
        participant_id: &ParticipantId,
    ) -> Result<bool, DrawError> {
        let entry = OverrideEntry::new(prize_id.clone(), participant_id.clone());
        self.overrides
            .remove(&entry)
            .map_err(|e| DrawError::store(&e))
    }

    pub fn clear_overrides_for_prize(&mut self, prize_id: &PrizeId) -> Result<usize, DrawError> {
        self.overrides
            .clear_for_prize(prize_id)
            .map_err(|e| DrawError::store(&e))
    }

    /// Remove every override and deactivate.
    pub fn clear_overrides(&mut self) -> Result<(), DrawError> {
        self.overrides
            .clear_all()
            .map_err(|e| DrawError::store(&e))
    }

    pub fn set_overrides_activated(&mut self, activated: bool) -> Result<(), DrawError> {
        self.overrides
            .set_activated(activated)
            .map_err(|e| DrawError::store(&e))
    }
}
