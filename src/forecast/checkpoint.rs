//! Keyed on-disk store for trained forecasting models.
//!
//! Checkpoints are addressed by a content fingerprint of the training
//! inputs, so a model trained for one coin or feature configuration is
//! never silently reused for another. A checkpoint that fails to
//! deserialize is treated as absent and the caller retrains.

use super::lstm::LstmNetwork;
use super::scaler::MinMaxScaler;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A persisted model together with the scaler it was trained under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub scaler: MinMaxScaler,
    pub model: LstmNetwork,
}

/// Filesystem-backed checkpoint store.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Fingerprint of (feature-set signature, look-back length,
    /// training-window fingerprint) as a hex SHA-256 digest.
    pub fn fingerprint(
        features: &[String],
        lookback: usize,
        rows: usize,
        first_date: NaiveDate,
        last_date: NaiveDate,
    ) -> String {
        let mut hasher = Sha256::new();
        for feature in features {
            hasher.update(feature.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(lookback.to_le_bytes());
        hasher.update(rows.to_le_bytes());
        hasher.update(first_date.to_string().as_bytes());
        hasher.update(last_date.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.model", key))
    }

    /// Load the checkpoint for a fingerprint. A missing file returns
    /// None silently; an unreadable or corrupt file is logged and also
    /// treated as absent so the caller falls back to retraining.
    pub fn load(&self, key: &str) -> Option<Checkpoint> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read checkpoint {}: {}", path.display(), e);
                return None;
            }
        };

        match bincode::deserialize::<Checkpoint>(&bytes) {
            Ok(checkpoint) => {
                debug!("Loaded checkpoint {}", path.display());
                Some(checkpoint)
            }
            Err(e) => {
                warn!(
                    "Checkpoint {} is corrupt ({}), discarding and retraining",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Persist a checkpoint, overwriting any prior one for the same
    /// fingerprint. Concurrent writers race last-write-wins.
    pub fn save(&self, key: &str, checkpoint: &Checkpoint) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let bytes = bincode::serialize(checkpoint)?;
        std::fs::write(&path, bytes)?;
        debug!("Saved checkpoint {}", path.display());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
