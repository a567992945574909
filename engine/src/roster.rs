//! In-memory mirror of the participant roster.

use std::collections::HashMap;

use thiserror::Error;

use gala_types::{Participant, ParticipantId, WinnerCommit};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("participant at row {row} has a blank id")]
    BlankId { row: usize },
    #[error("duplicate participant id {0}")]
    DuplicateId(ParticipantId),
}

/// Participants in roster order, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    participants: Vec<Participant>,
    index: HashMap<ParticipantId, usize>,
}

impl Roster {
    pub fn new(participants: Vec<Participant>) -> Result<Self, RosterError> {
        let mut index = HashMap::with_capacity(participants.len());
        for (row, participant) in participants.iter().enumerate() {
            if participant.id.is_blank() {
                return Err(RosterError::BlankId { row });
            }
            if index.insert(participant.id.clone(), row).is_some() {
                return Err(RosterError::DuplicateId(participant.id.clone()));
            }
        }
        Ok(Self {
            participants,
            index,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Participant] {
        &self.participants
    }

    #[must_use]
    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.index.get(id).map(|&row| &self.participants[row])
    }

    #[must_use]
    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.index.contains_key(id)
    }

    pub fn winners(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.has_won())
    }

    /// First id in `ids` that is not on the roster.
    pub(crate) fn first_unknown<'a>(&self, ids: &'a [ParticipantId]) -> Option<&'a ParticipantId> {
        ids.iter().find(|id| !self.contains(id))
    }

    pub(crate) fn apply_commit(&mut self, commit: &WinnerCommit) {
        for id in &commit.winners {
            if let Some(&row) = self.index.get(id) {
                self.participants[row].record_win(commit.prize_id.clone(), commit.won_at);
            }
        }
    }

    pub(crate) fn clear_all_wins(&mut self) {
        for participant in &mut self.participants {
            participant.clear_win();
        }
    }
}
