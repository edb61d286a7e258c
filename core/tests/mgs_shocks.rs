//! Integration tests for the MGS-shock simulator.
//!
//! 1. A zero-variance normal shock leaves grade, PD and RWA untouched
//! 2. Shocks stay in [-3, 3] and grades in [1, 26]
//! 3. Clamping at both ends of the grade scale
//! 4. Incomplete grade tables, off-table PDs and malformed distributions
//!    fail up front
//! 5. Same seed, same record

use rwa_stress_core::{
    config::ShockDistribution,
    error::StressError,
    grades::{GradeRow, GradeScale, PdPoint},
    mgs_shock::{median, MgsShockSimulator},
    portfolio::{Facility, Obligor, Portfolio},
    simulator::StressSimulator,
};

fn pd_mid(grade: i32) -> f64 {
    0.0003 * (1.25f64).powi(grade - 1)
}

fn full_scale() -> GradeScale {
    let rows = (1..=26)
        .map(|g| GradeRow {
            mgs: g,
            pd_low: pd_mid(g) * 0.9,
            pd_mid: pd_mid(g),
            pd_high: pd_mid(g) * 1.1,
            bucket: format!("B{}", (g - 1) / 6),
        })
        .collect();
    GradeScale::new(rows).unwrap()
}

fn graded_portfolio(grades: &[i32], scale: &GradeScale) -> Portfolio {
    let obligors: Vec<Obligor> = grades
        .iter()
        .enumerate()
        .map(|(i, &g)| Obligor {
            cis_code: format!("CIS{i:04}"),
            pd: pd_mid(g),
            mgs: Some(g),
            bucket: None,
            ead: 1_000_000.0 + i as f64,
        })
        .collect();
    let facilities = obligors
        .iter()
        .map(|o| Facility {
            cis_code: o.cis_code.clone(),
            pd: o.pd,
            lgd: 0.45,
            ead: o.ead,
            maturity: 2.5,
            mgs: o.mgs,
        })
        .collect();
    Portfolio::new(obligors, facilities, scale).unwrap()
}

fn spread_grades(n: usize) -> Vec<i32> {
    (0..n).map(|i| (i % 26) as i32 + 1).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Worked example
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn zero_variance_shock_leaves_obligor_untouched() {
    let scale = full_scale();
    let p = graded_portfolio(&[13], &scale);
    let shock = ShockDistribution::Normal { mean: 0.0, std_dev: 0.0 };
    let sim = MgsShockSimulator::new(&p, &scale, shock, PdPoint::Mid).unwrap();

    for seed in 0..10 {
        let outcome = sim.shock_trial(seed).unwrap();
        assert_eq!(outcome.shocks, vec![0]);
        assert_eq!(outcome.grades, vec![13]);
        assert_eq!(outcome.pds, vec![p.obligors()[0].pd]);

        let record = sim.run_trial(seed).unwrap();
        assert_eq!(record.shock_median, 0.0);
        assert_eq!(record.shock_mean, 0.0);
        assert_eq!(record.mean_pd_new, record.mean_pd);
        assert!((record.rwa_new - record.rwa).abs() <= 1e-9 * record.rwa);
        assert_eq!(record.histogram.count(0), 1);
        assert_eq!(record.histogram.total(), 1);
    }
}

#[test]
fn baseline_pd_off_the_grade_table_is_invalid_input() {
    let scale = full_scale();
    let obligor = Obligor {
        cis_code: "OFFTABLE".into(),
        pd: 0.02,
        mgs: Some(13),
        bucket: None,
        ead: 1.0,
    };
    let facility = Facility {
        cis_code: "OFFTABLE".into(),
        pd: 0.02,
        lgd: 0.45,
        ead: 1.0,
        maturity: 2.5,
        mgs: Some(13),
    };
    let p = Portfolio::new(vec![obligor], vec![facility], &scale).unwrap();
    let shock = ShockDistribution::Normal { mean: 0.0, std_dev: 0.0 };
    let err = MgsShockSimulator::new(&p, &scale, shock, PdPoint::Mid).err().unwrap();
    assert!(
        matches!(err, StressError::InvalidInput { ref record, .. } if record == "OFFTABLE"),
        "got {err:?}"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Ranges and clamping
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn shocks_and_grades_stay_in_range() {
    let scale = full_scale();
    let p = graded_portfolio(&spread_grades(260), &scale);
    let distributions = [
        ShockDistribution::Uniform,
        ShockDistribution::Normal { mean: 0.0, std_dev: 1.5 },
        ShockDistribution::Normal { mean: 1.0, std_dev: 10.0 },
    ];

    for distribution in distributions {
        let sim = MgsShockSimulator::new(&p, &scale, distribution, PdPoint::Mid).unwrap();
        for seed in 0..20 {
            let outcome = sim.shock_trial(seed).unwrap();
            assert!(outcome.shocks.iter().all(|s| (-3..=3).contains(s)), "{distribution:?}");
            assert!(outcome.grades.iter().all(|g| (1..=26).contains(g)), "{distribution:?}");
        }
    }
}

#[test]
fn uniform_shocks_cover_every_bin() {
    let scale = full_scale();
    let p = graded_portfolio(&spread_grades(700), &scale);
    let sim = MgsShockSimulator::new(&p, &scale, ShockDistribution::Uniform, PdPoint::Mid).unwrap();
    let record = sim.run_trial(1).unwrap();

    assert_eq!(record.histogram.total(), 700);
    for (shock, count) in record.histogram.iter() {
        assert!(count > 0, "shock {shock} never drawn");
    }
    assert!(record.shock_mean.abs() < 0.5);
}

#[test]
fn upgrades_clamp_at_grade_one() {
    let scale = full_scale();
    let p = graded_portfolio(&[1, 2, 5], &scale);
    let shock = ShockDistribution::Normal { mean: -10.0, std_dev: 0.0 };
    let sim = MgsShockSimulator::new(&p, &scale, shock, PdPoint::Mid).unwrap();
    let outcome = sim.shock_trial(0).unwrap();

    assert_eq!(outcome.shocks, vec![-3, -3, -3]);
    assert_eq!(outcome.grades, vec![1, 1, 2]);
    assert_eq!(sim.run_trial(0).unwrap().histogram.count(-3), 3);
}

#[test]
fn downgrades_clamp_at_grade_twenty_six() {
    let scale = full_scale();
    let p = graded_portfolio(&[20, 24, 26], &scale);
    let shock = ShockDistribution::Normal { mean: 10.0, std_dev: 0.0 };
    let sim = MgsShockSimulator::new(&p, &scale, shock, PdPoint::Mid).unwrap();
    let outcome = sim.shock_trial(0).unwrap();

    assert_eq!(outcome.shocks, vec![3, 3, 3]);
    assert_eq!(outcome.grades, vec![23, 26, 26]);
    assert_eq!(outcome.pds, vec![pd_mid(23), pd_mid(26), pd_mid(26)]);

    let record = sim.run_trial(0).unwrap();
    assert!(record.rwa_new > record.rwa, "downgrades must raise capital");
    assert!(record.weighted_pd_new > record.weighted_pd);
}

#[test]
fn pd_point_selects_the_grade_table_column() {
    let scale = full_scale();
    let p = graded_portfolio(&[10], &scale);
    let shock = ShockDistribution::Normal { mean: 0.0, std_dev: 0.0 };

    let high = MgsShockSimulator::new(&p, &scale, shock, PdPoint::High).unwrap();
    assert_eq!(high.shock_trial(0).unwrap().pds, vec![scale.row(10).unwrap().pd_high]);

    let low = MgsShockSimulator::new(&p, &scale, shock, PdPoint::Low).unwrap();
    assert_eq!(low.shock_trial(0).unwrap().pds, vec![scale.row(10).unwrap().pd_low]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn incomplete_grade_table_is_fatal() {
    let full = full_scale();
    let p = graded_portfolio(&[5], &full);
    let partial = GradeScale::new(
        (1..=25)
            .map(|g| full.row(g).unwrap().clone())
            .collect(),
    )
    .unwrap();

    let err = MgsShockSimulator::new(&p, &partial, ShockDistribution::Uniform, PdPoint::Mid)
        .err()
        .expect("grade 26 is missing");
    assert!(matches!(err, StressError::MissingGradeMapping { grade: 26 }), "got {err:?}");
}

#[test]
fn negative_std_dev_is_invalid_input() {
    let scale = full_scale();
    let p = graded_portfolio(&[5], &scale);
    let shock = ShockDistribution::Normal { mean: 0.0, std_dev: -1.0 };
    let err = MgsShockSimulator::new(&p, &scale, shock, PdPoint::Mid).err().unwrap();
    assert!(matches!(err, StressError::InvalidInput { .. }), "got {err:?}");
}

#[test]
fn obligor_without_grade_is_invalid_input() {
    let scale = full_scale();
    let obligor = Obligor {
        cis_code: "NOGRADE".into(),
        pd: 0.01,
        mgs: None,
        bucket: Some("B0".into()),
        ead: 1.0,
    };
    let facility = Facility {
        cis_code: "NOGRADE".into(),
        pd: 0.01,
        lgd: 0.45,
        ead: 1.0,
        maturity: 1.0,
        mgs: None,
    };
    let p = Portfolio::new(vec![obligor], vec![facility], &scale).unwrap();
    let err = MgsShockSimulator::new(&p, &scale, ShockDistribution::Uniform, PdPoint::Mid)
        .err()
        .unwrap();
    assert!(matches!(err, StressError::InvalidInput { ref record, .. } if record == "NOGRADE"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Determinism and summaries
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn same_seed_produces_identical_records() {
    let scale = full_scale();
    let p = graded_portfolio(&spread_grades(100), &scale);
    let shock = ShockDistribution::Normal { mean: 0.0, std_dev: 1.5 };
    let sim = MgsShockSimulator::new(&p, &scale, shock, PdPoint::Mid).unwrap();
    for seed in [0, 7, 123] {
        assert_eq!(sim.run_trial(seed).unwrap(), sim.run_trial(seed).unwrap());
    }
    assert_ne!(sim.shock_trial(0).unwrap().shocks, sim.shock_trial(1).unwrap().shocks);
}

#[test]
fn median_of_shocks() {
    assert_eq!(median(&[3, -1, 2]), 2.0);
    assert_eq!(median(&[0, 1, -3, 2]), 0.5);
    assert_eq!(median(&[]), 0.0);
}
