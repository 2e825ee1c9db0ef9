//! # Regina Field: candidate classification and structural scoring
//!
//! Classifies numeric candidate records by derived geometric and statistical
//! features and ranks them by a normalized composite score.
//!
//! This crate provides:
//! - Quantile tiers with degeneracy-safe bin edges
//! - Radial shells in projected space
//! - Royal designation and the extremal ray
//! - Precedence-ordered attractor zones and anomaly bands
//! - A weighted composite score in `[0, 1]` and its ranking
//! - A staged pipeline driven by a serde configuration
//!
//! Every operation takes a [`Table`] by reference and returns a new one.

#![deny(unsafe_code)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod binning;
pub mod config;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod royal;
pub mod schema;
pub mod scoring;
pub mod shells;
pub mod table;
pub mod zones;

// Re-exports for convenience
pub use binning::BinEdges;
pub use config::{ColumnKeys, FieldConfig};
pub use error::{FieldError, Result};
pub use features::{
    add_curvature_tiers, add_entropy_tiers, add_quantile_tier, add_radius, add_standard_tiers,
    TierTransform,
};
pub use pipeline::{FieldPipeline, FieldReport, PipelineStage, PipelineStats};
pub use royal::{
    attach_royal_status, estimate_extremal_ray_direction, filter_royal, flag_royal_from_index,
    project_onto_extremal_ray, RayDirection,
};
pub use scoring::{composite_structural_score, rank_by_structural_score, ScoreWeights};
pub use shells::add_shell_index;
pub use table::{Column, Table};
pub use zones::{
    classify_attractor_zones, label_anomaly_bands, zone_counts, Zone, ZoneThresholds, ZONE_RULES,
};

/// Version of the Regina Field library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
