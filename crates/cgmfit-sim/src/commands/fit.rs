use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use cgmfit_mcmc::{run_fit, FitConfig, StopFlag};
use clap::Args;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct FitArgs {
    /// YAML configuration describing the fit.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for run artefacts (overrides `output.run_directory`).
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Override the master seed.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Override the worker thread count.
    #[arg(long)]
    pub threads: Option<usize>,
    /// Stop sampling after this many seconds and keep the committed steps.
    #[arg(long)]
    pub time_limit: Option<u64>,
}

pub fn run(args: &FitArgs) -> Result<(), Box<dyn Error>> {
    let mut config = FitConfig::load(&args.config)?;
    if let Some(out) = &args.out {
        config.output.run_directory = Some(out.clone());
    }
    if let Some(seed) = args.seed {
        config.sampler.seed_policy.master_seed = seed;
    }
    if let Some(threads) = args.threads {
        config.sampler.threads = threads;
    }

    let stop = StopFlag::new();
    if let Some(seconds) = args.time_limit {
        let timer = stop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            timer.request_stop();
        });
    }

    info!(config = %args.config.display(), "starting fit");
    let fit = run_fit(&config, &stop)?;
    let report = &fit.report;
    if report.interrupted {
        warn!(
            steps = report.steps_completed,
            "time limit reached; summary uses the partial chain"
        );
    }

    println!(
        "samples={} acceptance={:.3} discard={} thin={}",
        report.summary.samples, report.acceptance_fraction, report.cut.discard, report.cut.thin
    );
    for (label, summary) in &report.summary.parameters {
        println!(
            "{label} = {:.3} +{:.3} -{:.3}",
            summary.median, summary.upper, summary.lower
        );
    }
    if let Some(artefacts) = &fit.artefacts {
        println!("manifest: {}", artefacts.manifest.display());
    }
    Ok(())
}
