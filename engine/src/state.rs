//! Draw session states.
//!
//! Each state owns exactly the resources it needs. Replacing the state drops
//! them, which cancels the rolling ticker or the pending reveal.

use std::path::PathBuf;

use gala_types::{DrawStatus, ParticipantId, PrizeId};

use crate::schedule::{RevealTimer, RollingTicker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirSource {
    /// `[storage] data_dir` from the config file.
    Configured,
    System,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct DataDir {
    pub path: PathBuf,
    pub source: DataDirSource,
}

impl DataDir {
    #[must_use]
    pub fn join(&self, child: &str) -> PathBuf {
        self.path.join(child)
    }
}

pub(crate) struct RollingDraw {
    pub(crate) prize: PrizeId,
    pub(crate) count: usize,
    pub(crate) ticker: Option<RollingTicker>,
}

pub(crate) struct StoppingDraw {
    pub(crate) prize: PrizeId,
    pub(crate) winners: Vec<ParticipantId>,
    pub(crate) reveal: RevealTimer,
}

pub(crate) struct ShowingDraw {
    pub(crate) prize: PrizeId,
    pub(crate) winners: Vec<ParticipantId>,
}

#[derive(Default)]
pub(crate) enum DrawSession {
    #[default]
    Idle,
    Rolling(RollingDraw),
    Stopping(StoppingDraw),
    Showing(ShowingDraw),
}

impl DrawSession {
    pub(crate) fn status(&self) -> DrawStatus {
        match self {
            DrawSession::Idle => DrawStatus::Idle,
            DrawSession::Rolling(_) => DrawStatus::Rolling,
            DrawSession::Stopping(_) => DrawStatus::Stopping,
            DrawSession::Showing(_) => DrawStatus::Showing,
        }
    }

    pub(crate) fn prize(&self) -> Option<&PrizeId> {
        match self {
            DrawSession::Idle => None,
            DrawSession::Rolling(draw) => Some(&draw.prize),
            DrawSession::Stopping(draw) => Some(&draw.prize),
            DrawSession::Showing(draw) => Some(&draw.prize),
        }
    }

    pub(crate) fn winners(&self) -> Option<&[ParticipantId]> {
        match self {
            DrawSession::Stopping(draw) => Some(&draw.winners),
            DrawSession::Showing(draw) => Some(&draw.winners),
            DrawSession::Idle | DrawSession::Rolling(_) => None,
        }
    }
}

/// Outcome of a state-machine request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Not legal from the current state; nothing changed.
    Ignored,
}

impl Transition {
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// Delivered by [`DrawEngine::tick`](crate::DrawEngine::tick) once a reveal is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawEvent {
    /// Winners committed and now showing.
    Revealed {
        prize: PrizeId,
        winners: Vec<ParticipantId>,
    },
    /// Nothing was recorded; the session is idle again.
    CommitFailed(crate::DrawError),
}
