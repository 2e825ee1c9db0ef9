//! End-to-end tests for the reginafield crate.
//!
//! These run whole candidate tables through the individual stages and the
//! pipeline, checking the properties that must hold for any input: bin edges
//! stay strictly ordered, every row gets exactly one zone, scores stay inside
//! the unit interval and nothing mutates its input.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use reginafield::binning::BinEdges;
use reginafield::{
    add_shell_index, add_standard_tiers, attach_royal_status, classify_attractor_zones,
    composite_structural_score, rank_by_structural_score, Column, FieldConfig, FieldPipeline,
    PipelineStage, Table, Zone,
};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Random master table; `levels` > 0 quantizes values so ties are common.
fn random_master(rng: &mut StdRng, rows: usize, levels: u32) -> Table {
    let mut draw = |lo: f64, hi: f64| -> Vec<f64> {
        (0..rows)
            .map(|_| {
                let v: f64 = rng.gen_range(lo..hi);
                if levels > 0 {
                    (v * levels as f64).round() / levels as f64
                } else {
                    v
                }
            })
            .collect()
    };
    let motif = draw(0.0, 50.0);
    let entropy = draw(0.0, 3.0);
    let curvature = draw(-2.0, 2.0);
    let x = draw(-5.0, 5.0);
    let y = draw(-5.0, 5.0);

    Table::from_columns(vec![
        ("Candidate", Column::from((0..rows as i64).collect::<Vec<_>>())),
        ("MotifSum", Column::from(motif)),
        ("Entropy", Column::from(entropy)),
        ("Curvature", Column::from(curvature)),
        ("PCA_X", Column::from(x)),
        ("PCA_Y", Column::from(y)),
    ])
    .unwrap()
}

fn zones_of(table: &Table, key: &str) -> Vec<Zone> {
    table
        .labels(key)
        .unwrap()
        .iter()
        .map(|l| l.as_deref().expect("zone is total").parse().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Binning properties
// ---------------------------------------------------------------------------

#[test]
fn edges_strictly_increasing_for_any_bin_count() {
    let mut rng = StdRng::seed_from_u64(7);
    for trial in 0..50 {
        let rows = rng.gen_range(1..40);
        let distinct = rng.gen_range(1..4);
        let values: Vec<f64> = (0..rows)
            .map(|_| rng.gen_range(0..distinct) as f64 * 1e6)
            .collect();
        for n_bins in 1..=10 {
            let edges = BinEdges::from_values(&values, n_bins).unwrap();
            assert!(edges.is_strictly_increasing(), "trial {trial}, {n_bins} bins");
            assert_eq!(edges.n_bins(), n_bins);
            for bucket in edges.bucketize(&values) {
                assert!(matches!(bucket, Some(b) if b < n_bins));
            }
        }
    }
}

#[test]
fn every_finite_row_gets_a_tier_and_shell() {
    let mut rng = StdRng::seed_from_u64(11);
    for levels in [0, 2, 10] {
        let t = random_master(&mut rng, 64, levels);
        let t = add_standard_tiers(&t).unwrap();
        let t = add_shell_index(&t, "PCA_X", "PCA_Y", 5, "ShellIndex").unwrap();

        for tier in t.labels("EntropyTier").unwrap() {
            assert!(matches!(tier.as_deref(), Some("T0" | "T1" | "T2" | "T3")));
        }
        for tier in t.labels("CurvatureTier").unwrap() {
            assert!(matches!(tier.as_deref(), Some("C0" | "C1" | "C2" | "C3")));
        }
        assert!(t
            .buckets("ShellIndex")
            .unwrap()
            .iter()
            .all(|s| matches!(s, Some(s) if *s < 5)));
    }
}

// ---------------------------------------------------------------------------
// Zones and scoring
// ---------------------------------------------------------------------------

#[test]
fn precedence_scenario() {
    let t = Table::from_columns(vec![
        ("Curvature", Column::from(vec![0.01, 5.0, -0.02, 3.0, 0.0])),
        ("Entropy", Column::from(vec![0.7; 5])),
        ("MotifSum", Column::from(vec![0.0, 0.0, 0.0, 0.0, 100.0])),
        ("PCA_X", Column::from(vec![0.0, 0.0, 0.0, 0.0, 10.0])),
        ("PCA_Y", Column::from(vec![0.0, 0.0, 0.0, 0.0, 10.0])),
    ])
    .unwrap();
    let t = classify_attractor_zones(&t, "Entropy", "Curvature", "MotifSum", "PCA_X", "PCA_Y", "Zone")
        .unwrap();
    assert_eq!(
        zones_of(&t, "Zone"),
        vec![
            Zone::Secondary,
            Zone::General,
            Zone::Secondary,
            Zone::General,
            Zone::CurvatureBasin,
        ]
    );
}

#[test]
fn zones_total_and_deterministic_on_random_tables() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..20 {
        let t = random_master(&mut rng, 48, 0);
        let once = classify_attractor_zones(&t, "Entropy", "Curvature", "MotifSum", "PCA_X", "PCA_Y", "Zone")
            .unwrap();
        let twice = classify_attractor_zones(&once, "Entropy", "Curvature", "MotifSum", "PCA_X", "PCA_Y", "Zone")
            .unwrap();
        let zones = zones_of(&once, "Zone");
        assert_eq!(zones.len(), 48);
        assert_eq!(zones, zones_of(&twice, "Zone"));
        // at least the smallest |curvature| is a basin unless Primary took it
        assert!(zones
            .iter()
            .any(|z| matches!(z, Zone::CurvatureBasin | Zone::Primary)));
    }
}

#[test]
fn composite_score_in_unit_interval() {
    let mut rng = StdRng::seed_from_u64(31);
    for levels in [0, 1, 4] {
        let t = random_master(&mut rng, 32, levels);
        let t = composite_structural_score(&t, "MotifSum", "Entropy", "Curvature", None, None, "CompositeScore")
            .unwrap();
        for v in t.float_values("CompositeScore").unwrap().iter() {
            assert!((0.0..=1.0).contains(v), "score {v} out of range");
        }
    }
}

#[test]
fn ranking_scenario() {
    let t = Table::from_columns(vec![
        ("Candidate", Column::from(vec![0_i64, 1, 2])),
        ("CompositeScore", Column::from(vec![0.2, 0.9, 0.5])),
    ])
    .unwrap();
    let ranked = rank_by_structural_score(&t, "CompositeScore", false).unwrap();
    assert_eq!(ranked.key_values("Candidate").unwrap(), vec![1, 2, 0]);
}

#[test]
fn royal_join_scenario() {
    let master = Table::from_columns(vec![("Candidate", Column::from(vec![1_i64, 2, 3]))]).unwrap();
    let royal = Table::from_columns(vec![
        ("Candidate", Column::from(vec![2_i64])),
        ("RoyalIndex", Column::from(vec![0.5])),
    ])
    .unwrap();
    let t = attach_royal_status(&master, &royal, "Candidate", "RoyalIndex", "IsRoyal").unwrap();
    assert_eq!(t.bools("IsRoyal").unwrap(), &[false, true, false]);
    assert!(!master.has_column("IsRoyal"));
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[test]
fn pipeline_end_to_end_with_royals() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(42);
    let master = random_master(&mut rng, 100, 0);
    let royal = Table::from_columns(vec![
        ("Candidate", Column::from(vec![3_i64, 17, 58, 91])),
        ("RoyalIndex", Column::from(vec![1.0, 2.0, 3.0, 4.0])),
    ])
    .unwrap();

    let mut pipeline = FieldPipeline::default();
    let report = pipeline.run(&master, Some(&royal)).unwrap();

    assert_eq!(pipeline.current_stage(), PipelineStage::Complete);
    assert_eq!(report.stats.rows, 100);
    assert_eq!(report.stats.royal, 4);
    assert_eq!(report.stats.zone_counts.values().sum::<usize>(), 100);
    let ray = report.ray_direction.expect("royal rows were flagged");
    assert!(ray.is_zero() || (ray.norm() - 1.0).abs() < 1e-10);

    let ranked = report.ranked().unwrap();
    assert_eq!(ranked.n_rows(), 100);
    let scores = ranked.float_values("CompositeScore").unwrap();
    assert!((scores[0] - 1.0).abs() < 1e-10);
    assert!(scores.iter().zip(scores.iter().skip(1)).all(|(a, b)| a >= b));

    // the input table is untouched
    assert_eq!(master.n_columns(), 6);
}

#[test]
fn pipeline_with_custom_column_keys() {
    init_tracing();
    let config = FieldConfig::from_json_str(
        r#"{
            "columns": {"x": "PC1", "y": "PC2", "zone": "Attractor"},
            "shells": 3,
            "weights": {"motif": 1.0, "curvature": 2.0}
        }"#,
    )
    .unwrap();

    let mut rng = StdRng::seed_from_u64(5);
    let base = random_master(&mut rng, 30, 0);
    let master = Table::from_columns(vec![
        ("Candidate", base.column("Candidate").unwrap().clone()),
        ("MotifSum", base.column("MotifSum").unwrap().clone()),
        ("Entropy", base.column("Entropy").unwrap().clone()),
        ("Curvature", base.column("Curvature").unwrap().clone()),
        ("PC1", base.column("PCA_X").unwrap().clone()),
        ("PC2", base.column("PCA_Y").unwrap().clone()),
    ])
    .unwrap();

    let report = FieldPipeline::new(config).run(&master, None).unwrap();
    assert!(report.table.has_column("Attractor"));
    assert!(!report.table.has_column("Zone"));
    assert!(report
        .table
        .buckets("ShellIndex")
        .unwrap()
        .iter()
        .all(|s| matches!(s, Some(s) if *s < 3)));
}

#[test]
fn pipeline_flags_royals_from_existing_index() {
    let mut rng = StdRng::seed_from_u64(9);
    let master = random_master(&mut rng, 10, 0);
    let index: Vec<f64> = (0..10)
        .map(|i| if i % 4 == 0 { i as f64 } else { f64::NAN })
        .collect();
    let master = master.with_column("RoyalIndex", Column::from(index)).unwrap();

    let report = FieldPipeline::default().run(&master, None).unwrap();
    assert_eq!(report.stats.royal, 3);
    assert!(report.table.has_column("RayProjection"));
}

#[test]
fn pipeline_rejects_incomplete_royal_table() {
    let mut rng = StdRng::seed_from_u64(13);
    let master = random_master(&mut rng, 10, 0);
    let royal = Table::from_columns(vec![("Candidate", Column::from(vec![1_i64]))]).unwrap();

    let mut pipeline = FieldPipeline::default();
    let err = pipeline.run(&master, Some(&royal)).unwrap_err();
    assert!(err.is_schema());
    assert_eq!(pipeline.current_stage(), PipelineStage::Validate);
}
