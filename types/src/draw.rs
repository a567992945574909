use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ParticipantId, PrizeId};

/// Observable phase of the draw session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawStatus {
    #[default]
    Idle,
    Rolling,
    Stopping,
    Showing,
}

impl DrawStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DrawStatus::Idle => "idle",
            DrawStatus::Rolling => "rolling",
            DrawStatus::Stopping => "stopping",
            DrawStatus::Showing => "showing",
        }
    }
}

impl std::fmt::Display for DrawStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-predetermined (prize, participant) pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub prize_id: PrizeId,
    pub participant_id: ParticipantId,
}

impl OverrideEntry {
    #[must_use]
    pub fn new(prize_id: PrizeId, participant_id: ParticipantId) -> Self {
        Self {
            prize_id,
            participant_id,
        }
    }
}

/// Full override registry contents plus the global switch.
///
/// Entries keep insertion order; that order is the precedence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideState {
    pub activated: bool,
    pub entries: Vec<OverrideEntry>,
}

impl OverrideState {
    /// Override participants for one prize, in registration order.
    #[must_use]
    pub fn for_prize(&self, prize_id: &PrizeId) -> Vec<ParticipantId> {
        self.entries
            .iter()
            .filter(|e| &e.prize_id == prize_id)
            .map(|e| e.participant_id.clone())
            .collect()
    }
}

/// The override view the selection algorithm consumes: captured for one
/// prize at the moment the draw stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSnapshot {
    pub activated: bool,
    pub participants: Vec<ParticipantId>,
}

impl OverrideSnapshot {
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active(participants: Vec<ParticipantId>) -> Self {
        Self {
            activated: true,
            participants,
        }
    }
}

/// One batch of winners to be written atomically to roster and ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerCommit {
    pub prize_id: PrizeId,
    pub winners: Vec<ParticipantId>,
    pub won_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_prize_keeps_registration_order() {
        let state = OverrideState {
            activated: true,
            entries: vec![
                OverrideEntry::new("gold".into(), "c".into()),
                OverrideEntry::new("silver".into(), "x".into()),
                OverrideEntry::new("gold".into(), "a".into()),
            ],
        };
        assert_eq!(
            state.for_prize(&"gold".into()),
            vec![ParticipantId::new("c"), ParticipantId::new("a")]
        );
        assert!(state.for_prize(&"bronze".into()).is_empty());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DrawStatus::Showing).unwrap(),
            "\"showing\""
        );
    }
}
