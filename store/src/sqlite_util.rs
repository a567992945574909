//! Shared SQLite and secure-filesystem helpers for the Gala stores.
//!
//! Both stores open through [`open_secure_db`] so they share pragmas and
//! file permissions. Win times are stored as Unix milliseconds.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::fs::OpenOptions;
use std::path::Path;

/// Open a SQLite database file, creating its directory if needed.
///
/// On Unix the data directory ends up owner-only (0o700) when we own it, and
/// the database file is always 0o600, including when it already existed.
pub(crate) fn open_secure_db(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        #[cfg(unix)]
        restrict_owned_dir(dir)?;
    }

    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);
    drop(
        options
            .open(path)
            .with_context(|| format!("Failed to create database file {}", path.display()))?,
    );
    #[cfg(unix)]
    set_mode(path, 0o600)?;

    let db = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    apply_pragmas(&db)?;
    Ok(db)
}

pub(crate) fn open_memory_db() -> Result<Connection> {
    let db = Connection::open_in_memory().context("Failed to open in-memory database")?;
    apply_pragmas(&db)?;
    Ok(db)
}

fn apply_pragmas(db: &Connection) -> Result<()> {
    // FULL sync: a commit is durable before it is reported successful.
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL; PRAGMA foreign_keys=ON;")
        .context("Failed to set database pragmas")
}

/// Drop group and other access from a directory we own. Shared directories
/// owned by someone else are left alone.
#[cfg(unix)]
fn restrict_owned_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    let meta = std::fs::metadata(dir)
        .with_context(|| format!("Failed to stat data directory {}", dir.display()))?;
    // SAFETY: getuid has no preconditions and cannot fail.
    let owned = meta.uid() == unsafe { libc::getuid() };
    if owned && meta.permissions().mode() & 0o077 != 0 {
        set_mode(dir, 0o700)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set mode {mode:o} on {}", path.display()))
}

pub(crate) fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| anyhow!("stored timestamp out of range: {millis}"))
}
