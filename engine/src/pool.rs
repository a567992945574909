//! Pool resolution: who is eligible for a prize right now.

use gala_types::{Participant, ParticipantId, Prize};

use crate::roster::Roster;

/// Participants eligible for one prize, in roster order.
#[derive(Debug, Clone)]
pub struct Pool<'a> {
    members: Vec<&'a Participant>,
}

impl<'a> Pool<'a> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn members(&self) -> &[&'a Participant] {
        &self.members
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ParticipantId> {
        self.members.iter().map(|p| p.id.clone()).collect()
    }
}

/// Prizes that exclude winners draw from everyone who has not won anything.
/// Prizes that include winners draw from everyone not already recorded under
/// that same prize.
#[must_use]
pub fn resolve_pool<'a>(roster: &'a Roster, prize: &Prize) -> Pool<'a> {
    let members = roster
        .iter()
        .filter(|p| {
            if prize.include_winners {
                !prize.has_winner(&p.id)
            } else {
                !p.has_won()
            }
        })
        .collect();
    Pool { members }
}
