//! Standard data export of the roster and prize ledger.
//!
//! A snapshot carries participants and prizes only. Override entries and the
//! activation flag have no field here and never reach an exported file.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use gala_types::{Participant, Prize};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub participants: Vec<Participant>,
    pub prizes: Vec<Prize>,
}

impl LedgerSnapshot {
    #[must_use]
    pub fn capture(participants: Vec<Participant>, prizes: Vec<Prize>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            participants,
            prizes,
        }
    }

    /// Check cross-references that serde alone cannot: unique ids and
    /// winners that point at roster members holding a matching win.
    pub fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            bail!("Unsupported snapshot version {}", self.version);
        }

        let mut participant_ids = HashSet::new();
        for p in &self.participants {
            if p.id.is_blank() {
                bail!("Snapshot contains a participant with a blank id");
            }
            if !participant_ids.insert(&p.id) {
                bail!("Duplicate participant id {}", p.id);
            }
        }

        let mut prize_ids = HashSet::new();
        for prize in &self.prizes {
            if !prize_ids.insert(&prize.id) {
                bail!("Duplicate prize id {}", prize.id);
            }
            for winner in prize.winners() {
                if !participant_ids.contains(winner) {
                    bail!("Prize {} lists unknown winner {winner}", prize.id);
                }
            }
        }

        for p in &self.participants {
            if let Some(prize_id) = p.won_prize_id() {
                let listed = self
                    .prizes
                    .iter()
                    .any(|prize| &prize.id == prize_id && prize.has_winner(&p.id));
                if !listed {
                    bail!(
                        "Participant {} claims prize {prize_id} but is not listed as its winner",
                        p.id
                    );
                }
            }
        }
        Ok(())
    }

    /// Write the snapshot atomically (temp file in the target directory, then rename).
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

        let bytes = serde_json::to_vec_pretty(self).context("Failed to serialize snapshot")?;
        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        tmp.write_all(&bytes)
            .context("Failed to write snapshot temp file")?;
        tmp.as_file()
            .sync_all()
            .context("Failed to sync snapshot temp file")?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to persist snapshot to {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            participants = self.participants.len(),
            prizes = self.prizes.len(),
            "Snapshot exported"
        );
        Ok(())
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
