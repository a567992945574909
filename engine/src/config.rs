use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const DEFAULT_REVEAL_DELAY_MS: u64 = 1500;
pub const DEFAULT_ROLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_ROLLING_PREVIEW: usize = 5;
pub const DEFAULT_MAX_BATCH: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct GalaConfig {
    pub draw: Option<DrawConfig>,
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DrawConfig {
    /// Suspense delay between stop and reveal. Zero reveals immediately.
    pub reveal_delay_ms: Option<u64>,
    /// Rolling display refresh period. Zero disables the ticker.
    pub roll_interval_ms: Option<u64>,
    /// Names shown per rolling frame.
    pub rolling_preview: Option<usize>,
    /// Upper bound on winners drawn in one batch.
    pub max_batch: Option<usize>,
    /// Last batch size chosen by the operator.
    pub batch_size: Option<usize>,
    /// Fixed seed for reproducible draws (rehearsals).
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the ledger and cache databases. Supports `${VAR}`.
    pub data_dir: Option<String>,
}

/// Resolved draw timing and batching, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawSettings {
    pub reveal_delay: Duration,
    pub roll_interval: Duration,
    pub rolling_preview: usize,
    pub max_batch: usize,
    pub batch_size: usize,
    pub seed: Option<u64>,
}

impl Default for DrawSettings {
    fn default() -> Self {
        Self {
            reveal_delay: Duration::from_millis(DEFAULT_REVEAL_DELAY_MS),
            roll_interval: Duration::from_millis(DEFAULT_ROLL_INTERVAL_MS),
            rolling_preview: DEFAULT_ROLLING_PREVIEW,
            max_batch: DEFAULT_MAX_BATCH,
            batch_size: 1,
            seed: None,
        }
    }
}

impl DrawSettings {
    #[must_use]
    pub fn from_config(config: Option<&GalaConfig>) -> Self {
        let defaults = Self::default();
        let Some(draw) = config.and_then(|cfg| cfg.draw.as_ref()) else {
            return defaults;
        };

        let max_batch = draw.max_batch.filter(|n| *n > 0).unwrap_or(defaults.max_batch);
        Self {
            reveal_delay: draw
                .reveal_delay_ms
                .map_or(defaults.reveal_delay, Duration::from_millis),
            roll_interval: draw
                .roll_interval_ms
                .map_or(defaults.roll_interval, Duration::from_millis),
            rolling_preview: draw.rolling_preview.unwrap_or(defaults.rolling_preview),
            max_batch,
            batch_size: draw.batch_size.unwrap_or(1).clamp(1, max_batch),
            seed: draw.seed,
        }
    }

    /// No suspense delay and no rolling ticker; reveals happen inside `stop`.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            reveal_delay: Duration::ZERO,
            roll_interval: Duration::ZERO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay = delay;
        self
    }

    #[must_use]
    pub fn with_roll_interval(mut self, interval: Duration) -> Self {
        self.roll_interval = interval;
        self
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

impl GalaConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Configured data directory with `${VAR}` references expanded.
    #[must_use]
    pub fn data_dir(&self) -> Option<PathBuf> {
        let raw = self.storage.as_ref()?.data_dir.as_deref()?;
        let expanded = expand_env_vars(raw);
        let trimmed = expanded.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// Persist the operator's batch size to the config file.
    pub fn persist_batch_size(batch_size: usize) -> std::io::Result<()> {
        let Some(path) = config_path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config path",
            ));
        };
        persist_batch_size_at(&path, batch_size)
    }
}

/// Uses `toml_edit` to preserve comments and formatting.
/// Creates the config file and parent directory if they don't exist.
pub fn persist_batch_size_at(path: &Path, batch_size: usize) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};
        let metadata = fs::metadata(parent)?;
        let our_uid = unsafe { libc::getuid() };
        if metadata.uid() == our_uid {
            let mode = metadata.permissions().mode() & 0o777;
            if mode & 0o077 != 0 {
                fs::set_permissions(parent, fs::Permissions::from_mode(0o700))?;
            }
        }
    }

    let content = if path.exists() {
        fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    if !doc.contains_key("draw") {
        doc["draw"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let value = i64::try_from(batch_size)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    doc["draw"]["batch_size"] = toml_edit::value(value);

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(doc.to_string().as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".gala").join("config.toml"))
}
