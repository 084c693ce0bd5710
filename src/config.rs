use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Tuning knobs of the pose tracker. Defaults match the reference behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// A keypoint counts in the distance only if its confidence is strictly above this.
    pub confidence_threshold: f64,
    /// Added to the distance for every keypoint pair that fails the threshold.
    pub missing_keypoint_penalty: f64,
    /// Shortlist size of the nearest-candidate selector.
    pub neighbours: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.1,
            missing_keypoint_penalty: 1000.0,
            neighbours: 3,
        }
    }
}

impl TrackerConfig {
    /// Load from a JSON file. Missing fields fall back to their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: TrackerConfig = serde_json::from_str(&data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.neighbours == 0 {
            return Err(Error::InvalidConfig("neighbours must be at least 1".into()));
        }
        if self.missing_keypoint_penalty.is_nan() || self.missing_keypoint_penalty < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "missing_keypoint_penalty must be non-negative, got {}",
                self.missing_keypoint_penalty
            )));
        }
        if self.confidence_threshold.is_nan() {
            return Err(Error::InvalidConfig("confidence_threshold is NaN".into()));
        }
        Ok(())
    }
}
