use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{NonEmptyString, ParticipantId, PrizeId};

/// Where and when a participant won.
///
/// Bundling the prize and the timestamp keeps "has won", "won prize" and
/// "won at" from drifting apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinRecord {
    pub prize_id: PrizeId,
    pub won_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: NonEmptyString,
    #[serde(default)]
    pub department: String,
    /// Opaque reference to a presentation asset (photo file name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    win: Option<WinRecord>,
}

impl Participant {
    #[must_use]
    pub fn new(id: ParticipantId, name: NonEmptyString, department: impl Into<String>) -> Self {
        Self {
            id,
            name,
            department: department.into(),
            photo_ref: None,
            win: None,
        }
    }

    #[must_use]
    pub fn with_photo(mut self, photo_ref: impl Into<String>) -> Self {
        self.photo_ref = Some(photo_ref.into());
        self
    }

    /// Restore a participant that already carries a win (store hydration).
    #[must_use]
    pub fn with_win(mut self, win: Option<WinRecord>) -> Self {
        self.win = win;
        self
    }

    #[must_use]
    pub fn has_won(&self) -> bool {
        self.win.is_some()
    }

    #[must_use]
    pub fn win(&self) -> Option<&WinRecord> {
        self.win.as_ref()
    }

    #[must_use]
    pub fn won_prize_id(&self) -> Option<&PrizeId> {
        self.win.as_ref().map(|w| &w.prize_id)
    }

    #[must_use]
    pub fn won_at(&self) -> Option<DateTime<Utc>> {
        self.win.as_ref().map(|w| w.won_at)
    }

    /// Record a win. A later win (re-entry prize) replaces the earlier record.
    pub fn record_win(&mut self, prize_id: PrizeId, won_at: DateTime<Utc>) {
        self.win = Some(WinRecord { prize_id, won_at });
    }

    pub fn clear_win(&mut self) {
        self.win = None;
    }
}
