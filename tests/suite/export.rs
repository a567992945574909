//! Standard export and import of the roster and prize ledger.

use gala_engine::{DrawError, LedgerSnapshot, PrizeId};
use gala_types::Participant;
use tempfile::tempdir;

use crate::common::{draw, ids, immediate, open, people, person, prize, seed};

#[test]
fn export_carries_no_override_data() {
    let dir = tempdir().unwrap();
    seed(dir.path(), &people(&["a", "b", "c"]), &[prize("gold", 1, 0)]);
    let gold = PrizeId::new("gold");
    let mut engine = open(dir.path(), immediate(2));
    engine.add_override(&gold, &ids(&["c"])[0]).unwrap();
    engine.set_overrides_activated(true).unwrap();
    draw(&mut engine, &gold, 1);

    let path = dir.path().join("out").join("export.json");
    engine.export_snapshot().write_to(&path).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, ["exported_at", "participants", "prizes", "version"]);
    assert!(!raw.contains("activated"));
    assert!(!raw.contains("override"));

    let snapshot = LedgerSnapshot::read_from(&path).unwrap();
    assert_eq!(snapshot.participants.len(), 3);
    assert_eq!(snapshot.prizes[0].winners(), ids(&["c"]).as_slice());
}

#[test]
fn import_replaces_data_and_keeps_winners() {
    let source = tempdir().unwrap();
    seed(
        source.path(),
        &people(&["a", "b", "c", "d"]),
        &[prize("gold", 2, 0)],
    );
    let gold = PrizeId::new("gold");
    let mut engine = open(source.path(), immediate(12));
    let winners = draw(&mut engine, &gold, 2);
    let path = source.path().join("export.json");
    engine.export_snapshot().write_to(&path).unwrap();

    let target = tempdir().unwrap();
    seed(target.path(), &people(&["x"]), &[prize("other", 1, 0)]);
    let mut fresh = open(target.path(), immediate(12));
    fresh
        .import_snapshot(&LedgerSnapshot::read_from(&path).unwrap())
        .unwrap();

    assert_eq!(fresh.roster().len(), 4);
    assert!(fresh.prize(&PrizeId::new("other")).is_none());
    assert_eq!(fresh.prize(&gold).unwrap().winners(), winners.as_slice());
    assert_eq!(fresh.pool_size(&gold), Some(2));
    drop(fresh);

    // Imported data is durable.
    let reopened = open(target.path(), immediate(12));
    assert_eq!(reopened.roster().len(), 4);
}

#[test]
fn roster_with_duplicate_ids_rejected() {
    let dir = tempdir().unwrap();
    seed(dir.path(), &people(&["a"]), &[]);
    let mut engine = open(dir.path(), immediate(1));

    let duplicated: Vec<Participant> = vec![person("a", "Sales"), person("a", "Finance")];
    let err = engine.replace_roster(duplicated).unwrap_err();
    assert!(matches!(err, DrawError::InvalidRoster(_)));
    assert_eq!(engine.roster().len(), 1);
}
