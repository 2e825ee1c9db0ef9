//! Attractor zone classification and anomaly banding.
//!
//! Zones are assigned by an ordered rule list applied to a working label
//! buffer. The order is part of the contract:
//!
//! | # | Zone           | Scope           | Predicate                                              |
//! |---|----------------|-----------------|--------------------------------------------------------|
//! | 1 | CurvatureBasin | every row       | `|c| <= P20(|c|)`                                      |
//! | 2 | Primary        | every row       | `c <= P20(c)`, `P25(e) <= e <= P75(e)`, `r >= P80(r)`  |
//! | 3 | Resonance      | still `General` | `m >= P90(m)`, `P25(e) <= e <= P75(e)`                 |
//! | 4 | Secondary      | still `General` | `c <= P50(c)`, `r >= P50(r)`                           |
//!
//! Rules 1 and 2 overwrite whatever is in the buffer, so a row matching both
//! ends up `Primary`. Rules 3 and 4 only touch rows nobody has claimed yet.
//! Reordering the list changes results.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binning::{default_labels, label_buckets, quantile_sorted, sorted_present, BinEdges};
use crate::error::{FieldError, Result};
use crate::features::radius_of;
use crate::schema::RADIUS;
use crate::table::{Column, Table};

/// Attractor zone of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Zone {
    /// Low curvature, mid entropy, far from the origin.
    Primary,
    /// Below-median curvature, above-median radius.
    Secondary,
    /// Strong motif with mid entropy.
    Resonance,
    /// Near-zero curvature.
    CurvatureBasin,
    /// No specific rule fired.
    General,
}

impl Zone {
    /// Every zone, in declaration order.
    pub const ALL: [Zone; 5] = [
        Zone::Primary,
        Zone::Secondary,
        Zone::Resonance,
        Zone::CurvatureBasin,
        Zone::General,
    ];

    /// Label stored in the zone column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Primary => "Primary",
            Zone::Secondary => "Secondary",
            Zone::Resonance => "Resonance",
            Zone::CurvatureBasin => "CurvatureBasin",
            Zone::General => "General",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self> {
        Zone::ALL
            .into_iter()
            .find(|z| z.as_str() == s)
            .ok_or_else(|| FieldError::InvalidParameter(format!("unknown zone label '{s}'")))
    }
}

/// Quantile statistics the zone rules compare against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneThresholds {
    /// P20 of curvature
    pub curvature_low: f64,
    /// P50 of curvature
    pub curvature_mid: f64,
    /// P25 of entropy
    pub entropy_low: f64,
    /// P75 of entropy
    pub entropy_high: f64,
    /// P90 of motif strength
    pub motif_high: f64,
    /// P50 of radius
    pub radius_mid: f64,
    /// P80 of radius
    pub radius_high: f64,
    /// P20 of |curvature|
    pub abs_curvature_small: f64,
}

impl ZoneThresholds {
    /// Compute the statistics from the per-row samples.
    ///
    /// An empty input gives `NaN` thresholds, which no predicate satisfies.
    pub fn from_samples(samples: &[ZoneSample]) -> Self {
        let at = |sorted: &[f64], q: f64| quantile_sorted(sorted, q).unwrap_or(f64::NAN);

        let curvature = present(samples, |s| s.curvature);
        let abs_curvature = present(samples, |s| s.curvature.abs());
        let entropy = present(samples, |s| s.entropy);
        let motif = present(samples, |s| s.motif);
        let radius = present(samples, |s| s.radius);

        Self {
            curvature_low: at(&curvature, 0.2),
            curvature_mid: at(&curvature, 0.5),
            entropy_low: at(&entropy, 0.25),
            entropy_high: at(&entropy, 0.75),
            motif_high: at(&motif, 0.9),
            radius_mid: at(&radius, 0.5),
            radius_high: at(&radius, 0.8),
            abs_curvature_small: at(&abs_curvature, 0.2),
        }
    }

    fn entropy_mid(&self, entropy: f64) -> bool {
        entropy >= self.entropy_low && entropy <= self.entropy_high
    }
}

fn present(samples: &[ZoneSample], field: impl Fn(&ZoneSample) -> f64) -> Vec<f64> {
    sorted_present(&samples.iter().map(field).collect::<Vec<_>>())
}

/// The per-row values the zone rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneSample {
    pub entropy: f64,
    pub curvature: f64,
    pub motif: f64,
    pub radius: f64,
}

/// Which rows a rule may relabel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    /// Overwrites whatever label the row currently has.
    Unconditional,
    /// Only relabels rows still marked [`Zone::General`].
    OnlyGeneral,
}

/// One entry of the precedence-ordered rule list.
#[derive(Clone, Copy)]
pub struct ZoneRule {
    pub zone: Zone,
    pub scope: RuleScope,
    pub predicate: fn(&ZoneSample, &ZoneThresholds) -> bool,
}

impl fmt::Debug for ZoneRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneRule")
            .field("zone", &self.zone)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

fn is_curvature_basin(s: &ZoneSample, t: &ZoneThresholds) -> bool {
    s.curvature.abs() <= t.abs_curvature_small
}

fn is_primary(s: &ZoneSample, t: &ZoneThresholds) -> bool {
    s.curvature <= t.curvature_low && t.entropy_mid(s.entropy) && s.radius >= t.radius_high
}

fn is_resonance(s: &ZoneSample, t: &ZoneThresholds) -> bool {
    s.motif >= t.motif_high && t.entropy_mid(s.entropy)
}

fn is_secondary(s: &ZoneSample, t: &ZoneThresholds) -> bool {
    s.curvature <= t.curvature_mid && s.radius >= t.radius_mid
}

/// Zone rules in the order they are applied. Do not reorder.
pub const ZONE_RULES: [ZoneRule; 4] = [
    ZoneRule {
        zone: Zone::CurvatureBasin,
        scope: RuleScope::Unconditional,
        predicate: is_curvature_basin,
    },
    ZoneRule {
        zone: Zone::Primary,
        scope: RuleScope::Unconditional,
        predicate: is_primary,
    },
    ZoneRule {
        zone: Zone::Resonance,
        scope: RuleScope::OnlyGeneral,
        predicate: is_resonance,
    },
    ZoneRule {
        zone: Zone::Secondary,
        scope: RuleScope::OnlyGeneral,
        predicate: is_secondary,
    },
];

/// Run [`ZONE_RULES`] over `samples` against precomputed thresholds.
pub fn classify_with_thresholds(samples: &[ZoneSample], thresholds: &ZoneThresholds) -> Vec<Zone> {
    let mut zones = vec![Zone::General; samples.len()];
    for rule in ZONE_RULES.iter() {
        for (zone, sample) in zones.iter_mut().zip(samples) {
            if rule.scope == RuleScope::OnlyGeneral && *zone != Zone::General {
                continue;
            }
            if (rule.predicate)(sample, thresholds) {
                *zone = rule.zone;
            }
        }
    }
    zones
}

/// Zone of every row, the thresholds that produced it and the radius.
fn zone_assignment(
    table: &Table,
    entropy_key: &str,
    curvature_key: &str,
    motif_key: &str,
    x_key: &str,
    y_key: &str,
) -> Result<(Vec<Zone>, ZoneThresholds, Vec<f64>)> {
    let entropy = table.float_values(entropy_key)?;
    let curvature = table.float_values(curvature_key)?;
    let motif = table.float_values(motif_key)?;
    let radius = radius_of(table, x_key, y_key)?.to_vec();

    let samples: Vec<ZoneSample> = (0..table.n_rows())
        .map(|i| ZoneSample {
            entropy: entropy[i],
            curvature: curvature[i],
            motif: motif[i],
            radius: radius[i],
        })
        .collect();

    let thresholds = ZoneThresholds::from_samples(&samples);
    let zones = classify_with_thresholds(&samples, &thresholds);
    Ok((zones, thresholds, radius))
}

/// Label every row with exactly one attractor zone.
///
/// Writes the zone label to `out_key` and (re)writes the `Radius` column.
pub fn classify_attractor_zones(
    table: &Table,
    entropy_key: &str,
    curvature_key: &str,
    motif_key: &str,
    x_key: &str,
    y_key: &str,
    out_key: &str,
) -> Result<Table> {
    classify_attractor_zones_detailed(table, entropy_key, curvature_key, motif_key, x_key, y_key, out_key)
        .map(|(table, _)| table)
}

/// [`classify_attractor_zones`], also returning the thresholds it used.
#[tracing::instrument(skip(table), fields(rows = table.n_rows()))]
pub fn classify_attractor_zones_detailed(
    table: &Table,
    entropy_key: &str,
    curvature_key: &str,
    motif_key: &str,
    x_key: &str,
    y_key: &str,
    out_key: &str,
) -> Result<(Table, ZoneThresholds)> {
    let (zones, thresholds, radius) =
        zone_assignment(table, entropy_key, curvature_key, motif_key, x_key, y_key)?;
    debug!(?thresholds, "Zone thresholds");

    let labels = zones.iter().map(|z| Some(z.as_str().to_string())).collect();
    let table = table
        .with_column(out_key, Column::Label(labels))?
        .with_column(RADIUS, Column::from(radius))?;
    Ok((table, thresholds))
}

/// Rows per zone in a labelled table. Every zone appears, possibly with zero.
pub fn zone_counts(table: &Table, zone_key: &str) -> Result<BTreeMap<Zone, usize>> {
    let mut counts: BTreeMap<Zone, usize> = Zone::ALL.into_iter().map(|z| (z, 0)).collect();
    for label in table.labels(zone_key)?.iter().flatten() {
        *counts.entry(label.parse::<Zone>()?).or_insert(0) += 1;
    }
    Ok(counts)
}

/// Ordinal anomaly bands `"0".."n_bands-1"` from quantiles of the raw score.
#[tracing::instrument(skip(table), fields(rows = table.n_rows()))]
pub fn label_anomaly_bands(
    table: &Table,
    score_key: &str,
    out_key: &str,
    n_bands: usize,
) -> Result<Table> {
    let scores = table.float_values(score_key)?.to_vec();
    let edges = BinEdges::from_values(&scores, n_bands)?;
    if edges.nudged() > 0 {
        debug!(nudged = edges.nudged(), "Anomaly score has collapsed bands");
    }
    let bands = label_buckets(&edges.bucketize(&scores), &default_labels("", n_bands), n_bands)?;
    table.with_column(out_key, Column::Label(bands))
}
