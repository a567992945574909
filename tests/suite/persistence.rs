//! Durability of commits, resets and overrides across restarts.

use std::time::Duration;

use gala_engine::{DrawSettings, DrawStatus, PrizeId};
use gala_store::{OVERRIDE_DB_FILE, OverrideBackend, OverrideDb};
use tempfile::tempdir;

use crate::common::{draw, ids, immediate, open, people, prize, seed};

#[test]
fn committed_winners_survive_restart() {
    let dir = tempdir().unwrap();
    seed(
        dir.path(),
        &people(&["a", "b", "c", "d"]),
        &[prize("gold", 2, 0), prize("silver", 2, 1)],
    );
    let gold = PrizeId::new("gold");

    let winners = {
        let mut engine = open(dir.path(), immediate(1));
        draw(&mut engine, &gold, 2)
    };

    let engine = open(dir.path(), immediate(2));
    assert_eq!(engine.prize(&gold).unwrap().winners(), winners.as_slice());
    for id in &winners {
        let participant = engine.participant(id).unwrap();
        assert_eq!(participant.won_prize_id(), Some(&gold));
        assert!(participant.won_at().is_some());
    }
    assert_eq!(engine.pool_size(&PrizeId::new("silver")), Some(2));
}

#[tokio::test]
async fn abort_before_reveal_records_nothing() {
    let dir = tempdir().unwrap();
    seed(dir.path(), &people(&["a", "b", "c"]), &[prize("gold", 1, 0)]);
    let gold = PrizeId::new("gold");

    {
        let settings = DrawSettings::immediate()
            .with_seed(4)
            .with_reveal_delay(Duration::from_secs(60));
        let mut engine = open(dir.path(), settings);
        engine.start(&gold, 1).unwrap();
        engine.stop();
        assert_eq!(engine.status(), DrawStatus::Stopping);
        assert!(engine.abort().is_applied());
        assert!(engine.tick().is_none());
    }

    let engine = open(dir.path(), immediate(4));
    assert!(engine.prize(&gold).unwrap().winners().is_empty());
    assert!(engine.winners_by_recency().is_empty());
}

#[test]
fn reset_prize_is_durable() {
    let dir = tempdir().unwrap();
    seed(
        dir.path(),
        &people(&["a", "b", "c", "d"]),
        &[prize("gold", 1, 0), prize("silver", 1, 1)],
    );
    let gold = PrizeId::new("gold");
    let silver = PrizeId::new("silver");

    let silver_winner = {
        let mut engine = open(dir.path(), immediate(8));
        draw(&mut engine, &gold, 1);
        let silver_winner = draw(&mut engine, &silver, 1);
        engine.reset_prize(&gold).unwrap();
        silver_winner
    };

    let engine = open(dir.path(), immediate(8));
    assert!(engine.prize(&gold).unwrap().winners().is_empty());
    assert_eq!(engine.prize(&silver).unwrap().winners(), silver_winner.as_slice());
    assert_eq!(engine.winners_by_recency().len(), 1);
}

#[test]
fn overrides_live_in_their_own_store() {
    let dir = tempdir().unwrap();
    seed(dir.path(), &people(&["a", "b", "c"]), &[prize("gold", 1, 0)]);
    let gold = PrizeId::new("gold");

    {
        let mut engine = open(dir.path(), immediate(6));
        assert!(engine.add_override(&gold, &ids(&["b"])[0]).unwrap());
        engine.set_overrides_activated(true).unwrap();
    }

    let cache = OverrideDb::open(dir.path().join(OVERRIDE_DB_FILE)).unwrap();
    let state = cache.load().unwrap();
    assert!(state.activated);
    assert_eq!(state.for_prize(&gold), ids(&["b"]));

    let engine = open(dir.path(), immediate(6));
    assert!(engine.overrides().is_activated());
    assert_eq!(engine.overrides().list_for(&gold), ids(&["b"]));
}
