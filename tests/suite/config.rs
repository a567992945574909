//! Config file loading and batch-size persistence.

use std::fs;
use std::time::Duration;

use gala_engine::{ConfigError, DrawSettings, GalaConfig, persist_batch_size_at};
use tempfile::tempdir;

#[test]
fn missing_config_is_not_an_error() {
    let dir = tempdir().unwrap();
    let loaded = GalaConfig::load_from(&dir.path().join("config.toml")).unwrap();
    assert!(loaded.is_none());
    assert_eq!(DrawSettings::from_config(None), DrawSettings::default());
}

#[test]
fn settings_read_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[draw]\nreveal_delay_ms = 250\nmax_batch = 4\nbatch_size = 9\nseed = 42\n",
    )
    .unwrap();

    let config = GalaConfig::load_from(&path).unwrap();
    let settings = DrawSettings::from_config(config.as_ref());
    assert_eq!(settings.reveal_delay, Duration::from_millis(250));
    assert_eq!(settings.max_batch, 4);
    assert_eq!(settings.batch_size, 4);
    assert_eq!(settings.seed, Some(42));
}

#[test]
fn malformed_config_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[draw\nreveal_delay_ms = ").unwrap();

    let err = GalaConfig::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert_eq!(err.path(), &path);
}

#[test]
fn persisted_batch_size_keeps_comments() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "# ceremony settings\n[draw]\nreveal_delay_ms = 900\n").unwrap();

    persist_batch_size_at(&path, 3).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("# ceremony settings"));
    assert!(content.contains("reveal_delay_ms = 900"));
    let config = GalaConfig::load_from(&path).unwrap().unwrap();
    assert_eq!(config.draw.unwrap().batch_size, Some(3));
}
