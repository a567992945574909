use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{NonEmptyString, ParticipantId, PrizeId, Quota};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrizeError {
    #[error("prize {prize} would hold {attempted} winners but its quota is {quota}")]
    QuotaExceeded {
        prize: PrizeId,
        quota: usize,
        attempted: usize,
    },
    #[error("participant {participant} is already recorded under prize {prize}")]
    DuplicateWinner {
        prize: PrizeId,
        participant: ParticipantId,
    },
}

/// A prize tier.
///
/// `winners` is private so that every mutation goes through
/// [`Prize::record_winners`], which enforces `winners.len() <= quota`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrizeRecord", into = "PrizeRecord")]
pub struct Prize {
    pub id: PrizeId,
    pub name: NonEmptyString,
    pub quota: Quota,
    pub order: u32,
    /// Winners of other prizes stay eligible for this one.
    pub include_winners: bool,
    /// Added during the ceremony. No effect on drawing.
    pub is_temporary: bool,
    winners: Vec<ParticipantId>,
}

#[derive(Serialize, Deserialize)]
struct PrizeRecord {
    id: PrizeId,
    name: NonEmptyString,
    quota: Quota,
    order: u32,
    #[serde(default)]
    include_winners: bool,
    #[serde(default)]
    is_temporary: bool,
    #[serde(default)]
    winners: Vec<ParticipantId>,
}

impl TryFrom<PrizeRecord> for Prize {
    type Error = PrizeError;

    fn try_from(record: PrizeRecord) -> Result<Self, Self::Error> {
        let mut prize = Prize::new(record.id, record.name, record.quota)
            .with_order(record.order)
            .with_include_winners(record.include_winners)
            .with_temporary(record.is_temporary);
        prize.record_winners(&record.winners)?;
        Ok(prize)
    }
}

impl From<Prize> for PrizeRecord {
    fn from(prize: Prize) -> Self {
        Self {
            id: prize.id,
            name: prize.name,
            quota: prize.quota,
            order: prize.order,
            include_winners: prize.include_winners,
            is_temporary: prize.is_temporary,
            winners: prize.winners,
        }
    }
}

impl Prize {
    #[must_use]
    pub fn new(id: PrizeId, name: NonEmptyString, quota: Quota) -> Self {
        Self {
            id,
            name,
            quota,
            order: 0,
            include_winners: false,
            is_temporary: false,
            winners: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_include_winners(mut self, include_winners: bool) -> Self {
        self.include_winners = include_winners;
        self
    }

    #[must_use]
    pub fn with_temporary(mut self, is_temporary: bool) -> Self {
        self.is_temporary = is_temporary;
        self
    }

    /// Recorded winners, in draw order.
    #[must_use]
    pub fn winners(&self) -> &[ParticipantId] {
        &self.winners
    }

    #[must_use]
    pub fn has_winner(&self, id: &ParticipantId) -> bool {
        self.winners.contains(id)
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.quota.get().saturating_sub(self.winners.len())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Check that `batch` could be appended without breaking the quota or
    /// recording anyone twice under this prize.
    pub fn check_winners(&self, batch: &[ParticipantId]) -> Result<(), PrizeError> {
        let attempted = self.winners.len() + batch.len();
        if attempted > self.quota.get() {
            return Err(PrizeError::QuotaExceeded {
                prize: self.id.clone(),
                quota: self.quota.get(),
                attempted,
            });
        }
        for (i, id) in batch.iter().enumerate() {
            if self.winners.contains(id) || batch[..i].contains(id) {
                return Err(PrizeError::DuplicateWinner {
                    prize: self.id.clone(),
                    participant: id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Append a batch of winners, all or nothing.
    pub fn record_winners(&mut self, batch: &[ParticipantId]) -> Result<(), PrizeError> {
        self.check_winners(batch)?;
        self.winners.extend_from_slice(batch);
        Ok(())
    }

    pub fn clear_winners(&mut self) {
        self.winners.clear();
    }

    /// Drop a single participant from the winner list (administrative reset).
    pub fn remove_winner(&mut self, id: &ParticipantId) -> bool {
        let before = self.winners.len();
        self.winners.retain(|w| w != id);
        before != self.winners.len()
    }
}
