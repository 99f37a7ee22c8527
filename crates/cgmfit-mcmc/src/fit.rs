use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cgmfit_core::errors::{CgmError, ErrorInfo};
use cgmfit_core::{LogDensity, RunProvenance};
use cgmfit_grid::{ForwardModel, GridTable, Observation};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chain::{Chain, FlatSamples};
use crate::config::{
    ChainPolicy, DiagnosticsConfig, FitConfig, ObservationSource, OutputConfig, SamplerConfig,
};
use crate::diagnostics::{self, AutocorrEstimate, ChainCut, NonConvergence};
use crate::kernel::{EnsembleSampler, SamplerRun, StopFlag};
use crate::manifest::{stable_hash_string, RunManifest};
use crate::posterior::{BoxPrior, CloudPosterior, GaussianLikelihood, Posterior};
use crate::seeding;
use crate::summary::{self, PosteriorSummary};

/// Grid, observation and posterior assembled from a [`FitConfig`].
#[derive(Debug, Clone)]
pub struct PreparedFit {
    /// Model grid the forward model interpolates.
    pub grid: GridTable,
    /// Observed columns entering the likelihood.
    pub observation: Observation,
    /// Posterior density to sample.
    pub posterior: CloudPosterior,
}

impl PreparedFit {
    /// Loads the grid and observation and builds the posterior.
    pub fn from_config(config: &FitConfig) -> Result<Self, CgmError> {
        config.validate()?;
        let grid = GridTable::load(&config.grid, &config.ions)?;
        let observation = load_observation(&config.observation, &grid, &config.ions)?;
        observation.require_ions(&config.ions)?;
        let model = ForwardModel::from_grid(&grid, &config.ions, config.reference_log_metal)?;
        let likelihood = GaussianLikelihood::new(model, &observation)?;
        let posterior = Posterior::new(BoxPrior::new(config.prior)?, likelihood);
        info!(
            grid = %config.grid.display(),
            rows = grid.rows(),
            ions = config.ions.len(),
            "prepared fit"
        );
        Ok(Self {
            grid,
            observation,
            posterior,
        })
    }
}

fn load_observation(
    source: &ObservationSource,
    grid: &GridTable,
    ions: &[String],
) -> Result<Observation, CgmError> {
    match source {
        ObservationSource::Measured { path } => Observation::load_csv(path),
        ObservationSource::Inline { entries } => Observation::from_triples(
            entries
                .iter()
                .map(|record| (record.ion.clone(), record.column, record.sigma)),
        ),
        ObservationSource::Synthetic {
            grid: Some(path),
            reference_hden,
            sigma,
        } => {
            let truth = GridTable::load(path, ions)?;
            Observation::from_grid_row(&truth, ions, *reference_hden, *sigma)
        }
        ObservationSource::Synthetic {
            grid: None,
            reference_hden,
            sigma,
        } => Observation::from_grid_row(grid, ions, *reference_hden, *sigma),
    }
}

/// Sampler output after diagnostics, burn-in, thinning and summarising.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inference {
    /// Raw sampler output.
    pub run: SamplerRun,
    /// Autocorrelation estimate of the full chain.
    pub autocorr: AutocorrEstimate,
    /// Present when the chain is shorter than the tolerance requires.
    pub non_convergence: Option<NonConvergence>,
    /// Burn-in and stride that were applied.
    pub cut: ChainCut,
    /// Flattened posterior samples.
    pub samples: FlatSamples,
    /// Percentile summary of `samples`.
    pub summary: PosteriorSummary,
}

/// Samples `target` and reduces the chain to a posterior summary.
///
/// Stops early, keeping the committed steps, when `stop` is raised.
pub fn infer<D: LogDensity>(
    target: D,
    sampler: &SamplerConfig,
    policy: &ChainPolicy,
    diagnostics_config: &DiagnosticsConfig,
    stop: &StopFlag,
) -> Result<Inference, CgmError> {
    let initial =
        seeding::initial_positions(&sampler.init, sampler.walkers, sampler.seed_policy.master_seed)?;
    let ensemble = EnsembleSampler::new(target, sampler)?;
    let run = ensemble.run_until(&initial, sampler.steps, stop)?;
    info!(
        steps = run.steps_completed,
        acceptance = run.mean_acceptance(),
        interrupted = run.interrupted,
        "sampling finished"
    );

    let autocorr = diagnostics::integrated_time(&run.chain, diagnostics_config);
    let non_convergence = diagnostics::check_convergence(&autocorr, diagnostics_config);
    let cut = diagnostics::choose_cut(policy, &autocorr, run.steps_completed);
    let samples = run.chain.flatten(cut.discard, cut.thin)?;
    let summary = summary::summarize(&samples)?;
    Ok(Inference {
        run,
        autocorr,
        non_convergence,
        cut,
        samples,
        summary,
    })
}

/// Serializable result of a fit, written as `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Median and one-sigma uncertainties per parameter.
    pub summary: PosteriorSummary,
    /// Ensemble-averaged acceptance fraction.
    pub acceptance_fraction: f64,
    /// Acceptance fraction per walker.
    pub walker_acceptance: Vec<f64>,
    /// Autocorrelation estimate.
    pub autocorr: AutocorrEstimate,
    /// Present when the chain is too short for its autocorrelation time.
    pub non_convergence: Option<NonConvergence>,
    /// Burn-in and stride applied before summarising.
    pub cut: ChainCut,
    /// Steps committed to the chain.
    pub steps_completed: usize,
    /// Set when the run ended on a stop request.
    pub interrupted: bool,
    /// Hashes, seed and timestamp.
    pub provenance: RunProvenance,
}

/// Paths of the files written for a fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArtefacts {
    /// Flattened posterior samples.
    pub samples: PathBuf,
    /// Full chain dump.
    pub chain: PathBuf,
    /// Summary JSON.
    pub summary: PathBuf,
    /// Manifest JSON.
    pub manifest: PathBuf,
}

/// Everything produced by [`run_fit`].
#[derive(Debug, Clone)]
pub struct FitRun {
    /// Serializable report.
    pub report: FitReport,
    /// Full chain.
    pub chain: Chain,
    /// Posterior samples after burn-in and thinning.
    pub samples: FlatSamples,
    /// Written files, when an output directory is configured.
    pub artefacts: Option<RunArtefacts>,
}

/// Runs a complete fit described by `config`.
pub fn run_fit(config: &FitConfig, stop: &StopFlag) -> Result<FitRun, CgmError> {
    let PreparedFit {
        grid, posterior, ..
    } = PreparedFit::from_config(config)?;
    let grid_hash = grid.content_hash();
    let inference = infer(
        posterior,
        &config.sampler,
        &config.chain,
        &config.diagnostics,
        stop,
    )?;

    let provenance = RunProvenance {
        config_hash: stable_hash_string(config)?,
        grid_hash,
        seed: config.sampler.seed_policy.master_seed,
        created_at: Utc::now().to_rfc3339(),
        tool_versions: BTreeMap::from([(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        )]),
    };
    let report = FitReport {
        summary: inference.summary.clone(),
        acceptance_fraction: inference.run.mean_acceptance(),
        walker_acceptance: inference.run.acceptance_fractions(),
        autocorr: inference.autocorr.clone(),
        non_convergence: inference.non_convergence.clone(),
        cut: inference.cut,
        steps_completed: inference.run.steps_completed,
        interrupted: inference.run.interrupted,
        provenance,
    };

    let artefacts = match &config.output.run_directory {
        Some(dir) => Some(write_artefacts(dir, &config.output, config, &report, &inference)?),
        None => None,
    };

    let Inference { run, samples, .. } = inference;
    Ok(FitRun {
        report,
        chain: run.chain,
        samples,
        artefacts,
    })
}

fn write_artefacts(
    dir: &Path,
    output: &OutputConfig,
    config: &FitConfig,
    report: &FitReport,
    inference: &Inference,
) -> Result<RunArtefacts, CgmError> {
    fs::create_dir_all(dir).map_err(|err| CgmError::io("output-mkdir", dir, err))?;
    let artefacts = RunArtefacts {
        samples: dir.join(&output.samples_file),
        chain: dir.join(&output.chain_file),
        summary: dir.join(&output.summary_file),
        manifest: dir.join(&output.manifest_file),
    };

    inference.samples.write_csv(&artefacts.samples)?;
    inference.run.chain.write_csv(&artefacts.chain)?;
    let json = serde_json::to_string_pretty(report).map_err(|err| {
        CgmError::Serde(
            ErrorInfo::new("summary-serialize", err.to_string())
                .with_context("path", artefacts.summary.display().to_string()),
        )
    })?;
    fs::write(&artefacts.summary, json)
        .map_err(|err| CgmError::io("summary-write", &artefacts.summary, err))?;

    let manifest = RunManifest {
        schema: Default::default(),
        config: config.clone(),
        provenance: report.provenance.clone(),
        seed_label: config.sampler.seed_policy.label.clone(),
        steps_completed: report.steps_completed,
        interrupted: report.interrupted,
        files: vec![
            output.samples_file.clone(),
            output.chain_file.clone(),
            output.summary_file.clone(),
        ],
    };
    manifest.write(&artefacts.manifest)?;
    info!(dir = %dir.display(), "wrote run artefacts");
    Ok(artefacts)
}
