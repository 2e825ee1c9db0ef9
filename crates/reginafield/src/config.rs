use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};
use crate::schema;
use crate::scoring::ScoreWeights;

/// Column keys the pipeline reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnKeys {
    pub candidate: String,
    pub motif: String,
    pub entropy: String,
    pub curvature: String,
    pub x: String,
    pub y: String,
    pub royal_index: String,
    pub hilbert: String,
    pub anomaly_score: String,
    pub entropy_tier: String,
    pub curvature_tier: String,
    pub shell_index: String,
    pub is_royal: String,
    pub ray_projection: String,
    pub zone: String,
    pub anomaly_band: String,
    pub composite_score: String,
}

impl Default for ColumnKeys {
    fn default() -> Self {
        Self {
            candidate: schema::CANDIDATE.to_string(),
            motif: schema::MOTIF_SUM.to_string(),
            entropy: schema::ENTROPY.to_string(),
            curvature: schema::CURVATURE.to_string(),
            x: schema::PCA_X.to_string(),
            y: schema::PCA_Y.to_string(),
            royal_index: schema::ROYAL_INDEX.to_string(),
            hilbert: schema::HILBERT_MAG.to_string(),
            anomaly_score: schema::ANOMALY_SCORE.to_string(),
            entropy_tier: schema::ENTROPY_TIER.to_string(),
            curvature_tier: schema::CURVATURE_TIER.to_string(),
            shell_index: schema::SHELL_INDEX.to_string(),
            is_royal: schema::IS_ROYAL.to_string(),
            ray_projection: schema::RAY_PROJECTION.to_string(),
            zone: schema::ZONE.to_string(),
            anomaly_band: schema::ANOMALY_BAND.to_string(),
            composite_score: schema::COMPOSITE_SCORE.to_string(),
        }
    }
}

impl ColumnKeys {
    /// Input columns a master table must carry under these keys.
    pub fn required_master(&self) -> [&str; 6] {
        [
            self.candidate.as_str(),
            self.motif.as_str(),
            self.entropy.as_str(),
            self.curvature.as_str(),
            self.x.as_str(),
            self.y.as_str(),
        ]
    }
}

/// Configuration for a full field run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Column naming.
    pub columns: ColumnKeys,
    /// Quantile tiers for entropy.
    pub entropy_bins: usize,
    /// Quantile tiers for |curvature|.
    pub curvature_bins: usize,
    /// Radial shells in projected space.
    pub shells: usize,
    /// Anomaly bands, used only when the anomaly column is present.
    pub anomaly_bands: usize,
    /// Explicit score weights; uniform weights when absent.
    pub weights: Option<ScoreWeights>,
    /// Include the harmonic magnitude in the score when the column exists.
    pub use_hilbert: bool,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            columns: ColumnKeys::default(),
            entropy_bins: 4,
            curvature_bins: 4,
            shells: 5,
            anomaly_bands: 5,
            weights: None,
            use_hilbert: true,
        }
    }
}

impl FieldConfig {
    /// Parse and validate a JSON configuration. Absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FieldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject bin counts of zero.
    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("entropy_bins", self.entropy_bins),
            ("curvature_bins", self.curvature_bins),
            ("shells", self.shells),
            ("anomaly_bands", self.anomaly_bands),
        ];
        for (name, count) in counts {
            if count == 0 {
                return Err(FieldError::Config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}
