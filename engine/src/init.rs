//! Engine construction and data directory resolution.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;

use gala_store::{LEDGER_DB_FILE, LedgerBackend, LedgerDb, OVERRIDE_DB_FILE, OverrideBackend, OverrideDb};

use crate::config::{DrawSettings, GalaConfig};
use crate::ledger::PrizeLedger;
use crate::overrides::OverrideRegistry;
use crate::roster::Roster;
use crate::state::{DataDir, DataDirSource, DrawSession};
use crate::{DrawEngine, DrawError};

/// Where the ledger and cache databases live.
///
/// A configured `[storage] data_dir` wins; otherwise the platform data
/// directory, otherwise `./.gala` in the working directory.
#[must_use]
pub fn resolve_data_dir(config: Option<&GalaConfig>) -> DataDir {
    if let Some(path) = config.and_then(GalaConfig::data_dir) {
        return DataDir {
            path,
            source: DataDirSource::Configured,
        };
    }
    match dirs::data_local_dir() {
        Some(path) => DataDir {
            path: path.join("gala"),
            source: DataDirSource::System,
        },
        None => DataDir {
            path: PathBuf::from(".").join(".gala"),
            source: DataDirSource::Fallback,
        },
    }
}

impl DrawEngine {
    /// Load mirrors from the given stores.
    pub fn new(
        settings: DrawSettings,
        backend: Box<dyn LedgerBackend>,
        overrides: Box<dyn OverrideBackend>,
    ) -> Result<Self, DrawError> {
        let participants = backend
            .list_participants()
            .map_err(|e| DrawError::store(&e))?;
        let prizes = backend.list_prizes().map_err(|e| DrawError::store(&e))?;
        let roster = Roster::new(participants)?;
        let ledger = PrizeLedger::new(prizes);
        let overrides = OverrideRegistry::load(overrides).map_err(|e| DrawError::store(&e))?;

        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random()),
        };

        tracing::info!(
            participants = roster.len(),
            prizes = ledger.len(),
            seeded = settings.seed.is_some(),
            "Draw engine loaded"
        );

        Ok(Self {
            requested_count: settings.batch_size,
            settings,
            backend,
            roster,
            ledger,
            overrides,
            session: DrawSession::Idle,
            selected: 0,
            rng,
            rolling_frame: Vec::new(),
            last_failure: None,
            events: VecDeque::new(),
        })
    }

    /// Open (or create) the ledger and cache databases under `data_dir`.
    pub fn open(settings: DrawSettings, data_dir: &Path) -> Result<Self, DrawError> {
        let ledger_path = data_dir.join(LEDGER_DB_FILE);
        let ledger = LedgerDb::open(&ledger_path).map_err(|e| DrawError::store(&e))?;
        let cache_path = data_dir.join(OVERRIDE_DB_FILE);
        let cache = OverrideDb::open(&cache_path).map_err(|e| DrawError::store(&e))?;
        tracing::debug!(path = %data_dir.display(), "Opened data directory");
        Self::new(settings, Box::new(ledger), Box::new(cache))
    }

    /// In-memory stores; nothing touches disk.
    pub fn open_in_memory(settings: DrawSettings) -> Result<Self, DrawError> {
        let ledger = LedgerDb::open_in_memory().map_err(|e| DrawError::store(&e))?;
        let cache = OverrideDb::open_in_memory().map_err(|e| DrawError::store(&e))?;
        Self::new(settings, Box::new(ledger), Box::new(cache))
    }

    /// Rebuild the roster and ledger mirrors from the backend.
    pub(crate) fn reload(&mut self) -> Result<(), DrawError> {
        let participants = self
            .backend
            .list_participants()
            .map_err(|e| DrawError::store(&e))?;
        let prizes = self
            .backend
            .list_prizes()
            .map_err(|e| DrawError::store(&e))?;
        self.roster = Roster::new(participants)?;
        self.ledger = PrizeLedger::new(prizes);
        self.clamp_selection();
        Ok(())
    }

    pub(crate) fn clamp_selection(&mut self) {
        if self.selected >= self.ledger.len() {
            self.selected = self.ledger.len().saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_data_dir_wins() {
        let config: GalaConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/var/lib/gala"
            "#,
        )
        .unwrap();
        let dir = resolve_data_dir(Some(&config));
        assert_eq!(dir.path, PathBuf::from("/var/lib/gala"));
        assert_eq!(dir.source, DataDirSource::Configured);
        assert_eq!(dir.join("ledger.db"), PathBuf::from("/var/lib/gala/ledger.db"));
    }

    #[test]
    fn unconfigured_data_dir_is_not_tagged_configured() {
        let config: GalaConfig = toml::from_str("[draw]\nbatch_size = 2\n").unwrap();
        assert_ne!(resolve_data_dir(Some(&config)).source, DataDirSource::Configured);
        assert_ne!(resolve_data_dir(None).source, DataDirSource::Configured);
    }

    #[test]
    fn open_creates_both_databases() {
        let dir = tempfile::tempdir().unwrap();
        let engine = DrawEngine::open(DrawSettings::immediate(), dir.path()).unwrap();
        assert!(engine.roster().is_empty());
        assert!(dir.path().join(LEDGER_DB_FILE).exists());
        assert!(dir.path().join(OVERRIDE_DB_FILE).exists());
    }
}
