//! End-to-end draw ceremonies against on-disk stores.

use std::collections::HashSet;
use std::time::Duration;

use gala_engine::{DrawError, DrawEvent, DrawSettings, DrawStatus, PrizeId, Transition};
use tempfile::tempdir;

use crate::common::{draw, ids, immediate, open, people, prize, seed};

#[test]
fn quota_filled_across_two_draws_without_repeats() {
    let dir = tempdir().unwrap();
    seed(
        dir.path(),
        &people(&["a", "b", "c", "d", "e"]),
        &[prize("gold", 3, 0)],
    );
    let mut engine = open(dir.path(), immediate(11));
    let gold = PrizeId::new("gold");

    let first = draw(&mut engine, &gold, 2);
    assert_eq!(engine.remaining_quota(&gold), Some(1));
    assert_eq!(engine.pool_size(&gold), Some(3));

    let second = draw(&mut engine, &gold, 1);
    let all: HashSet<_> = first.iter().chain(&second).collect();
    assert_eq!(all.len(), 3);
    assert_eq!(engine.remaining_quota(&gold), Some(0));

    // The commit refuses to overfill a completed prize.
    engine.start(&gold, 1).unwrap();
    engine.stop();
    let Some(DrawEvent::CommitFailed(err)) = engine.tick() else {
        panic!("expected a failed commit");
    };
    assert!(matches!(err, DrawError::CommitFailed { .. }));
    assert_eq!(engine.status(), DrawStatus::Idle);
    assert_eq!(engine.prize(&gold).unwrap().winners().len(), 3);
}

#[test]
fn override_guarantees_winner_when_activated() {
    let dir = tempdir().unwrap();
    seed(
        dir.path(),
        &people(&["a", "b", "c", "d", "e"]),
        &[prize("gold", 2, 0)],
    );
    let gold = PrizeId::new("gold");

    for seed_value in 0..20 {
        let mut engine = open(dir.path(), immediate(seed_value));
        engine.reset_all().unwrap();
        engine.add_override(&gold, &ids(&["c"])[0]).unwrap();
        engine.set_overrides_activated(true).unwrap();

        let winners = draw(&mut engine, &gold, 2);
        assert_eq!(winners[0], ids(&["c"])[0]);
        assert_eq!(winners.len(), 2);
        assert_ne!(winners[0], winners[1]);
    }
}

#[test]
fn insufficient_pool_rejected_at_start() {
    let dir = tempdir().unwrap();
    seed(dir.path(), &people(&["a", "b"]), &[prize("gold", 3, 0)]);
    let mut engine = open(dir.path(), immediate(3));

    let err = engine.start(&PrizeId::new("gold"), 3).unwrap_err();
    assert_eq!(
        err,
        DrawError::InsufficientPool {
            available: 2,
            requested: 3,
        }
    );
    assert_eq!(engine.status(), DrawStatus::Idle);
}

#[test]
fn close_is_idempotent() {
    let dir = tempdir().unwrap();
    seed(dir.path(), &people(&["a", "b"]), &[prize("gold", 1, 0)]);
    let mut engine = open(dir.path(), immediate(5));

    assert_eq!(engine.close(), Transition::Ignored);
    draw(&mut engine, &PrizeId::new("gold"), 1);
    assert_eq!(engine.close(), Transition::Ignored);
    assert_eq!(engine.status(), DrawStatus::Idle);
}

#[tokio::test]
async fn timed_reveal_runs_through_every_state() {
    let dir = tempdir().unwrap();
    seed(
        dir.path(),
        &people(&["a", "b", "c", "d"]),
        &[prize("gold", 2, 0)],
    );
    let settings = DrawSettings::default()
        .with_seed(9)
        .with_reveal_delay(Duration::from_millis(30))
        .with_roll_interval(Duration::from_millis(5));
    let mut engine = open(dir.path(), settings);
    let gold = PrizeId::new("gold");

    engine.start(&gold, 2).unwrap();
    assert_eq!(engine.status(), DrawStatus::Rolling);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(engine.tick().is_none());
    assert!(!engine.rolling_frame().is_empty());

    engine.stop();
    assert_eq!(engine.status(), DrawStatus::Stopping);
    let pending = engine.pending_winners().unwrap().to_vec();
    // Nothing is durable until the reveal.
    assert!(engine.prize(&gold).unwrap().winners().is_empty());

    let event = engine.wait_for_reveal().await;
    assert_eq!(
        event,
        Some(DrawEvent::Revealed {
            prize: gold.clone(),
            winners: pending.clone(),
        })
    );
    assert_eq!(engine.status(), DrawStatus::Showing);
    assert_eq!(engine.prize(&gold).unwrap().winners(), pending.as_slice());

    engine.close();
    assert_eq!(engine.status(), DrawStatus::Idle);
    assert_eq!(engine.requested_count(), 2);
}

/// Every participant's win flag matches the prize lists, and their recorded
/// prize is one that lists them.
fn assert_wins_consistent(engine: &gala_engine::DrawEngine) {
    for participant in engine.roster().iter() {
        let listed: Vec<&PrizeId> = engine
            .ledger()
            .iter()
            .filter(|prize| prize.winners().contains(&participant.id))
            .map(|prize| &prize.id)
            .collect();
        assert_eq!(
            participant.has_won(),
            !listed.is_empty(),
            "win flag for {} disagrees with prize lists {listed:?}",
            participant.id
        );
        if let Some(won) = participant.won_prize_id() {
            assert!(listed.contains(&won), "{} points at {won}", participant.id);
        }
    }
}

#[test]
fn no_double_win_across_excluding_prizes_with_resets() {
    let roster = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
    let excluding = ["gold", "silver", "bronze"];
    let bonus = PrizeId::new("bonus");
    let encore = PrizeId::new("encore");
    let silver = PrizeId::new("silver");

    for run in 1..=8 {
        let dir = tempdir().unwrap();
        seed(
            dir.path(),
            &people(&roster),
            &[
                prize("gold", 2, 0),
                prize("bonus", 4, 1).with_include_winners(true),
                prize("silver", 3, 2),
                prize("encore", 3, 3).with_include_winners(true),
                prize("bronze", 2, 4),
            ],
        );
        let mut engine = open(dir.path(), immediate(run));

        draw(&mut engine, &PrizeId::new("gold"), 2);
        draw(&mut engine, &bonus, 4);
        draw(&mut engine, &silver, 3);
        assert_wins_consistent(&engine);
        engine.reset_prize(&bonus).unwrap();
        assert_wins_consistent(&engine);
        draw(&mut engine, &encore, 3);
        engine.reset_prize(&silver).unwrap();
        assert_wins_consistent(&engine);
        draw(&mut engine, &silver, 3);
        draw(&mut engine, &PrizeId::new("bronze"), 2);
        engine.reset_prize(&encore).unwrap();
        assert_wins_consistent(&engine);
        drop(engine);

        let engine = open(dir.path(), immediate(run));
        assert_wins_consistent(&engine);
        let mut seen = HashSet::new();
        for id in excluding {
            for winner in engine.prize(&PrizeId::new(id)).unwrap().winners() {
                assert!(seen.insert(winner.clone()), "{winner} won twice (run {run})");
            }
        }
        assert_eq!(seen.len(), 7);
    }
}
