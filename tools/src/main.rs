//! stress-runner: headless RWA stress simulation runner.
//!
//! Usage:
//!   stress-runner --data-dir ./data --approach both --trials 1000
//!   stress-runner --approach mgs-shock --shock normal --mean 0 --std-dev 1.5 --db results.db
//!   stress-runner --approach bucket-swaps --parallel
//!   stress-runner --json              (one JSON summary line per simulator)

use anyhow::Result;
use chrono::{DateTime, Utc};
use rwa_stress_core::{
    bucket_swap::BucketSwapSimulator,
    config::{ExecutionMode, ReferenceData, ShockDistribution, SimulationParams},
    mgs_shock::MgsShockSimulator,
    record::TrialRecord,
    runner::SimulationRunner,
    store::ResultStore,
    summary::DistributionSummary,
};
use serde::Serialize;
use std::{env, str::FromStr};

/// Machine-readable summary written with `--json`.
#[derive(Serialize)]
struct RunSummary<'a> {
    run_id: &'a str,
    simulator: &'a str,
    trials: usize,
    finished_at: DateTime<Utc>,
    rwa: Option<DistributionSummary>,
    weighted_pd: Option<DistributionSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Approach {
    BucketSwaps,
    MgsShock,
    Both,
}

impl Approach {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "bucket-swaps" => Ok(Self::BucketSwaps),
            "mgs-shock" => Ok(Self::MgsShock),
            "both" => Ok(Self::Both),
            other => anyhow::bail!("unknown approach '{other}' (bucket-swaps | mgs-shock | both)"),
        }
    }

    fn includes(&self, other: Approach) -> bool {
        *self == Approach::Both || *self == other
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let approach = Approach::parse(flag_value(&args, "--approach").unwrap_or("both"))?;
    let json = args.iter().any(|a| a == "--json");

    let params = apply_overrides(SimulationParams::load(data_dir)?, &args)?;
    let reference = ReferenceData::load(data_dir)?;

    if !json {
        println!("RWA stress: stress-runner");
        println!("  data_dir:  {data_dir}");
        println!("  db:        {db}");
        println!("  approach:  {approach:?}");
        println!("  trials:    {}", params.trial_count);
        println!("  shock:     {}", params.shock.label());
        println!("  execution: {:?}", params.execution);
        println!();
    }

    let store = ResultStore::open(db)?;
    store.migrate()?;

    let runner = SimulationRunner::new(params.trial_count).with_mode(params.execution);

    if approach.includes(Approach::BucketSwaps) {
        let simulator = BucketSwapSimulator::new(&reference.portfolio, &reference.matrix)?;
        let run_id = store.begin_run("bucket_swap", params.trial_count, &params)?;
        let records = runner.run(&simulator)?;
        store.append_bucket_swap_records(&run_id, &records)?;
        report(json, "bucket_swap", &run_id, &records)?;
    }

    if approach.includes(Approach::MgsShock) {
        let simulator = MgsShockSimulator::new(
            &reference.portfolio,
            &reference.grades,
            params.shock,
            params.pd_point,
        )?;
        let run_id = store.begin_run("mgs_shock", params.trial_count, &params)?;
        let records = runner.run(&simulator)?;
        store.append_mgs_shock_records(&run_id, &records)?;
        report(json, "mgs_shock", &run_id, &records)?;
    }

    log::info!("results written to {db}");
    Ok(())
}

/// Command-line flags override `simulation.json`.
fn apply_overrides(mut params: SimulationParams, args: &[String]) -> Result<SimulationParams> {
    if let Some(trials) = parse_flag::<u64>(args, "--trials")? {
        anyhow::ensure!(trials > 0, "--trials must be positive");
        params.trial_count = trials;
    }
    if args.iter().any(|a| a == "--parallel") {
        params.execution = ExecutionMode::Parallel;
    }

    let (default_mean, default_std) = match params.shock {
        ShockDistribution::Normal { mean, std_dev } => (mean, std_dev),
        ShockDistribution::Uniform => (0.0, 1.5),
    };
    let mean = parse_flag(args, "--mean")?.unwrap_or(default_mean);
    let std_dev = parse_flag(args, "--std-dev")?.unwrap_or(default_std);

    match flag_value(args, "--shock") {
        Some("uniform") | Some("linear") => params.shock = ShockDistribution::Uniform,
        Some("normal") => params.shock = ShockDistribution::Normal { mean, std_dev },
        Some(other) => anyhow::bail!("unknown shock approach '{other}' (uniform | normal)"),
        None => {
            if let ShockDistribution::Normal { .. } = params.shock {
                params.shock = ShockDistribution::Normal { mean, std_dev };
            }
        }
    }
    Ok(params)
}

fn report<R: TrialRecord>(json: bool, simulator: &str, run_id: &str, records: &[R]) -> Result<()> {
    if json {
        let summary = RunSummary {
            run_id,
            simulator,
            trials: records.len(),
            finished_at: Utc::now(),
            rwa: DistributionSummary::rwa(records),
            weighted_pd: DistributionSummary::weighted_pd(records),
        };
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        print_summary(simulator, run_id, records);
    }
    Ok(())
}

fn print_summary<R: TrialRecord>(simulator: &str, run_id: &str, records: &[R]) {
    println!("=== {} ===", simulator.to_uppercase());
    println!("  run_id:  {run_id}");
    println!("  trials:  {}", records.len());

    if let Some(rwa) = DistributionSummary::rwa(records) {
        println!(
            "  RWA:          start {:.1}M | median {:.1}M | p75 {:.1}M | uplift {:+.2}%",
            rwa.pre_stress_mean / 1e6,
            rwa.p50 / 1e6,
            rwa.p75 / 1e6,
            rwa.median_uplift() * 100.0
        );
    }
    if let Some(pd) = DistributionSummary::weighted_pd(records) {
        println!(
            "  Weighted PD:  start {:.3}% | median {:.3}% | p75 {:.3}%",
            pd.pre_stress_mean * 100.0,
            pd.p50 * 100.0,
            pd.p75 * 100.0
        );
    }
    println!();
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Parse a flag's value; a malformed or missing value is an error,
/// an absent flag is `None`.
fn parse_flag<T>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if args.last().is_some_and(|a| a == flag) {
        anyhow::bail!("{flag} needs a value");
    }
    flag_value(args, flag)
        .map(str::parse)
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid value for {flag}: {e}"))
}
