use thiserror::Error;

use gala_types::{DrawStatus, ParticipantId, PrizeError, PrizeId};

use crate::roster::RosterError;
use crate::selection::SelectionError;

/// Errors surfaced by [`DrawEngine`](crate::DrawEngine) operations.
///
/// Illegal state transitions are not errors; they are ignored and reported as
/// [`Transition::Ignored`](crate::Transition::Ignored).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("pool has {available} eligible participants, cannot draw {requested}")]
    InsufficientPool { available: usize, requested: usize },
    #[error("draw count must be at least 1")]
    InvalidCount,
    #[error("unknown prize: {0}")]
    UnknownPrize(PrizeId),
    #[error("unknown participant: {0}")]
    UnknownParticipant(ParticipantId),
    #[error("no prizes configured")]
    NoPrizes,
    #[error("not allowed while the draw is {0}")]
    Busy(DrawStatus),
    #[error("prize {0} already has recorded winners")]
    PrizeHasWinners(PrizeId),
    #[error("invalid roster: {0}")]
    InvalidRoster(#[from] RosterError),
    #[error("commit for prize {prize} failed: {message}")]
    CommitFailed { prize: PrizeId, message: String },
    #[error("storage error: {message}")]
    Store { message: String },
}

impl DrawError {
    pub(crate) fn store(err: &anyhow::Error) -> Self {
        DrawError::Store {
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn commit(prize: &PrizeId, message: impl Into<String>) -> Self {
        DrawError::CommitFailed {
            prize: prize.clone(),
            message: message.into(),
        }
    }

    pub(crate) fn rejected_commit(err: &PrizeError) -> Self {
        let prize = match err {
            PrizeError::QuotaExceeded { prize, .. } | PrizeError::DuplicateWinner { prize, .. } => {
                prize
            }
        };
        DrawError::commit(prize, err.to_string())
    }
}

impl From<SelectionError> for DrawError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::InvalidCount => DrawError::InvalidCount,
            SelectionError::InsufficientPool {
                available,
                requested,
            } => DrawError::InsufficientPool {
                available,
                requested,
            },
        }
    }
}
