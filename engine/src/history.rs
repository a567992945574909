//! Read-only views over recorded winners.

use chrono::{DateTime, Utc};

use gala_types::{Participant, Prize};

use crate::ledger::PrizeLedger;
use crate::roster::Roster;

#[derive(Debug, Clone, Copy)]
pub struct WinnerEntry<'a> {
    pub participant: &'a Participant,
    /// `None` if the win points at a prize that no longer exists.
    pub prize: Option<&'a Prize>,
    pub won_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PrizeWinners<'a> {
    pub prize: &'a Prize,
    pub winners: Vec<&'a Participant>,
}

/// All winners, most recent first.
#[must_use]
pub fn winners_by_recency<'a>(roster: &'a Roster, ledger: &'a PrizeLedger) -> Vec<WinnerEntry<'a>> {
    let mut entries: Vec<WinnerEntry<'a>> = roster
        .iter()
        .filter_map(|participant| {
            let win = participant.win()?;
            Some(WinnerEntry {
                participant,
                prize: ledger.get(&win.prize_id),
                won_at: win.won_at,
            })
        })
        .collect();
    entries.sort_by(|a, b| b.won_at.cmp(&a.won_at));
    entries
}

/// Winners grouped per prize, in prize order and draw order. Prizes without
/// winners are omitted.
#[must_use]
pub fn winners_by_prize<'a>(roster: &'a Roster, ledger: &'a PrizeLedger) -> Vec<PrizeWinners<'a>> {
    ledger
        .iter()
        .filter(|prize| !prize.winners().is_empty())
        .map(|prize| PrizeWinners {
            prize,
            winners: prize.winners().iter().filter_map(|id| roster.get(id)).collect(),
        })
        .collect()
}
