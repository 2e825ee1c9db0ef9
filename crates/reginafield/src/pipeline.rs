//! Field analysis pipeline orchestrator.
//!
//! Runs the stages in a fixed order over one master table:
//! 1. Validate: required columns are present
//! 2. Features: entropy and curvature tiers
//! 3. Shells: radial shell index
//! 4. Royal: royal flags, extremal ray and projection
//! 5. Zones: attractor zone per candidate
//! 6. Anomaly: anomaly bands, when an anomaly score is supplied
//! 7. Score: composite structural score
//!
//! Each stage consumes the previous stage's table. A failing stage aborts the
//! run and leaves [`FieldPipeline::current_stage`] pointing at it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FieldConfig;
use crate::error::Result;
use crate::features::{add_curvature_tiers, add_entropy_tiers};
use crate::royal::{
    attach_royal_status, estimate_extremal_ray_direction, flag_royal_from_index,
    project_onto_extremal_ray, RayDirection,
};
use crate::scoring::{composite_structural_score, rank_by_structural_score};
use crate::shells::add_shell_index;
use crate::table::Table;
use crate::zones::{classify_attractor_zones_detailed, label_anomaly_bands, zone_counts, Zone, ZoneThresholds};

/// Pipeline stage identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Validate,
    Features,
    Shells,
    Royal,
    Zones,
    Anomaly,
    Score,
    Complete,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Validate => write!(f, "Validate"),
            PipelineStage::Features => write!(f, "Features"),
            PipelineStage::Shells => write!(f, "Shells"),
            PipelineStage::Royal => write!(f, "Royal"),
            PipelineStage::Zones => write!(f, "Zones"),
            PipelineStage::Anomaly => write!(f, "Anomaly"),
            PipelineStage::Score => write!(f, "Score"),
            PipelineStage::Complete => write!(f, "Complete"),
        }
    }
}

/// Statistics collected during a run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    pub rows: usize,
    pub royal: usize,
    pub anomaly_banded: bool,
    pub hilbert_scored: bool,
    pub zone_counts: BTreeMap<Zone, usize>,
}

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct FieldReport {
    /// Master table with every derived column.
    pub table: Table,
    /// Extremal ray, when any royal rows were flagged.
    pub ray_direction: Option<RayDirection>,
    /// Statistics the zone rules compared against.
    pub thresholds: ZoneThresholds,
    pub stats: PipelineStats,
    score_key: String,
}

impl FieldReport {
    /// Rows ordered by composite score, best first.
    pub fn ranked(&self) -> Result<Table> {
        rank_by_structural_score(&self.table, &self.score_key, false)
    }
}

/// The field analysis pipeline
pub struct FieldPipeline {
    config: FieldConfig,
    current_stage: PipelineStage,
}

impl FieldPipeline {
    /// Create a pipeline with the given configuration
    pub fn new(config: FieldConfig) -> Self {
        FieldPipeline {
            config,
            current_stage: PipelineStage::Validate,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// Last stage entered; after a failed run, the stage that failed
    pub fn current_stage(&self) -> PipelineStage {
        self.current_stage
    }

    fn enter(&mut self, stage: PipelineStage) {
        self.current_stage = stage;
        debug!(%stage, "Entering stage");
    }

    /// Run every stage over `master`, joining `royal` designations when given.
    #[tracing::instrument(skip(self, master, royal), fields(rows = master.n_rows(), royal_table = royal.is_some()))]
    pub fn run(&mut self, master: &Table, royal: Option<&Table>) -> Result<FieldReport> {
        info!(rows = master.n_rows(), "Starting field run");
        let keys = self.config.columns.clone();
        let mut stats = PipelineStats {
            rows: master.n_rows(),
            ..Default::default()
        };

        self.enter(PipelineStage::Validate);
        self.config.validate()?;
        master.require(&keys.required_master(), "master table")?;
        if let Some(royal) = royal {
            royal.require(&[keys.candidate.as_str(), keys.royal_index.as_str()], "royal table")?;
        }

        self.enter(PipelineStage::Features);
        let table = add_entropy_tiers(
            master,
            &keys.entropy,
            self.config.entropy_bins,
            &keys.entropy_tier,
            None,
        )?;
        let table = add_curvature_tiers(
            &table,
            &keys.curvature,
            self.config.curvature_bins,
            &keys.curvature_tier,
            None,
        )?;

        self.enter(PipelineStage::Shells);
        let table = add_shell_index(&table, &keys.x, &keys.y, self.config.shells, &keys.shell_index)?;

        self.enter(PipelineStage::Royal);
        let flagged = match royal {
            Some(royal) => Some(attach_royal_status(
                &table,
                royal,
                &keys.candidate,
                &keys.royal_index,
                &keys.is_royal,
            )?),
            None if table.has_column(&keys.royal_index) => Some(flag_royal_from_index(
                &table,
                &keys.royal_index,
                &keys.is_royal,
            )?),
            None => {
                debug!("No royal designations, skipping extremal ray");
                None
            }
        };
        let (table, ray_direction) = match flagged {
            Some(table) => {
                stats.royal = table.bools(&keys.is_royal)?.iter().filter(|f| **f).count();
                let direction =
                    estimate_extremal_ray_direction(&table, &keys.x, &keys.y, &keys.is_royal)?;
                let table =
                    project_onto_extremal_ray(&table, direction, &keys.x, &keys.y, &keys.ray_projection)?;
                (table, Some(direction))
            }
            None => (table, None),
        };

        self.enter(PipelineStage::Zones);
        let (table, thresholds) = classify_attractor_zones_detailed(
            &table,
            &keys.entropy,
            &keys.curvature,
            &keys.motif,
            &keys.x,
            &keys.y,
            &keys.zone,
        )?;

        self.enter(PipelineStage::Anomaly);
        let table = if table.has_column(&keys.anomaly_score) {
            stats.anomaly_banded = true;
            label_anomaly_bands(
                &table,
                &keys.anomaly_score,
                &keys.anomaly_band,
                self.config.anomaly_bands,
            )?
        } else {
            table
        };

        self.enter(PipelineStage::Score);
        let hilbert_key = (self.config.use_hilbert && table.has_column(&keys.hilbert))
            .then_some(keys.hilbert.as_str());
        stats.hilbert_scored = hilbert_key.is_some();
        let table = composite_structural_score(
            &table,
            &keys.motif,
            &keys.entropy,
            &keys.curvature,
            hilbert_key,
            self.config.weights.as_ref(),
            &keys.composite_score,
        )?;

        stats.zone_counts = zone_counts(&table, &keys.zone)?;
        self.enter(PipelineStage::Complete);
        info!(
            rows = stats.rows,
            royal = stats.royal,
            primary = stats.zone_counts.get(&Zone::Primary).copied().unwrap_or(0),
            "Field run complete"
        );

        Ok(FieldReport {
            table,
            ray_direction,
            thresholds,
            stats,
            score_key: keys.composite_score,
        })
    }
}

impl Default for FieldPipeline {
    fn default() -> Self {
        Self::new(FieldConfig::default())
    }
}
