//! Shared test utilities and fixtures
//!
//! Every fixture works against a real data directory so the tests exercise
//! the same SQLite files the console opens.

#![allow(dead_code)]

use std::path::Path;

use gala_engine::{
    DrawEngine, DrawEvent, DrawSettings, NonEmptyString, Participant, ParticipantId, Prize,
    PrizeId, Quota,
};
use gala_store::{LEDGER_DB_FILE, LedgerBackend, LedgerDb};

pub fn person(id: &str, department: &str) -> Participant {
    Participant::new(
        ParticipantId::new(id),
        NonEmptyString::new(format!("Guest {id}")).unwrap(),
        department,
    )
}

pub fn people(ids: &[&str]) -> Vec<Participant> {
    ids.iter().map(|id| person(id, "Operations")).collect()
}

pub fn prize(id: &str, quota: u32, order: u32) -> Prize {
    Prize::new(
        PrizeId::new(id),
        NonEmptyString::new(format!("Prize {id}")).unwrap(),
        Quota::new(quota).unwrap(),
    )
    .with_order(order)
}

pub fn ids(raw: &[&str]) -> Vec<ParticipantId> {
    raw.iter().map(|id| ParticipantId::new(*id)).collect()
}

/// Write a roster and prize list straight into the ledger database.
pub fn seed(dir: &Path, participants: &[Participant], prizes: &[Prize]) {
    let mut db = LedgerDb::open(dir.join(LEDGER_DB_FILE)).expect("open ledger for seeding");
    db.restore(participants, prizes).expect("seed ledger");
}

pub fn open(dir: &Path, settings: DrawSettings) -> DrawEngine {
    DrawEngine::open(settings, dir).expect("open engine")
}

/// Seeded settings with no suspense delay and no ticker.
pub fn immediate(seed: u64) -> DrawSettings {
    DrawSettings::immediate().with_seed(seed)
}

/// Run a whole draw and return the revealed winners. Leaves the engine idle.
pub fn draw(engine: &mut DrawEngine, prize_id: &PrizeId, count: usize) -> Vec<ParticipantId> {
    assert!(engine.start(prize_id, count).unwrap().is_applied());
    assert!(engine.stop().is_applied());
    let event = engine.tick().expect("reveal event");
    let DrawEvent::Revealed { winners, .. } = event else {
        panic!("expected a reveal");
    };
    assert!(engine.close().is_applied());
    winners
}
