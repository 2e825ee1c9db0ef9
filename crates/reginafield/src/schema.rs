//! Column keys and required-column validation.
//!
//! Loaders hand over tables that already passed these checks; the pipeline runs
//! them again so a malformed table fails before any stage does work.

use crate::error::Result;
use crate::table::Table;

/// Candidate identifier.
pub const CANDIDATE: &str = "Candidate";
/// Motif strength.
pub const MOTIF_SUM: &str = "MotifSum";
/// Entropy.
pub const ENTROPY: &str = "Entropy";
/// Signed curvature.
pub const CURVATURE: &str = "Curvature";
/// First projected coordinate.
pub const PCA_X: &str = "PCA_X";
/// Second projected coordinate.
pub const PCA_Y: &str = "PCA_Y";
/// Royal designation index (optional input).
pub const ROYAL_INDEX: &str = "RoyalIndex";
/// Harmonic magnitude (optional input).
pub const HILBERT_MAG: &str = "HilbertMag";
/// Anomaly score (optional input).
pub const ANOMALY_SCORE: &str = "AnomalyScore";

/// Derived radius.
pub const RADIUS: &str = "Radius";
/// Derived entropy tier.
pub const ENTROPY_TIER: &str = "EntropyTier";
/// Derived curvature tier.
pub const CURVATURE_TIER: &str = "CurvatureTier";
/// Derived shell bucket.
pub const SHELL_INDEX: &str = "ShellIndex";
/// Derived royal flag.
pub const IS_ROYAL: &str = "IsRoyal";
/// Derived projection onto the extremal ray.
pub const RAY_PROJECTION: &str = "RayProjection";
/// Derived attractor zone.
pub const ZONE: &str = "Zone";
/// Derived anomaly band.
pub const ANOMALY_BAND: &str = "AnomalyBand";
/// Derived composite score.
pub const COMPOSITE_SCORE: &str = "CompositeScore";

/// Columns every master table must carry.
pub const REQUIRED_MASTER_COLUMNS: [&str; 6] =
    [CANDIDATE, MOTIF_SUM, ENTROPY, CURVATURE, PCA_X, PCA_Y];

/// Columns every royal table must carry.
pub const REQUIRED_ROYAL_COLUMNS: [&str; 2] = [CANDIDATE, ROYAL_INDEX];

/// Check the master table against [`REQUIRED_MASTER_COLUMNS`].
pub fn validate_master(table: &Table) -> Result<()> {
    table.require(&REQUIRED_MASTER_COLUMNS, "master table")
}

/// Check the royal table against [`REQUIRED_ROYAL_COLUMNS`].
pub fn validate_royal(table: &Table) -> Result<()> {
    table.require(&REQUIRED_ROYAL_COLUMNS, "royal table")
}
