use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use cgmfit_core::errors::{CgmError, ErrorInfo};
use cgmfit_core::ParameterVector;
use cgmfit_grid::{ObservationRecord, DEFAULT_REFERENCE_LOG_METAL};
use serde::{Deserialize, Serialize};

/// YAML-configurable description of a complete fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// CSV grid table computed at `reference_log_metal`.
    pub grid: PathBuf,
    /// Ions entering the likelihood, in evaluation order.
    pub ions: Vec<String>,
    /// Metallicity of the grid (log, relative to solar).
    #[serde(default = "default_reference_log_metal")]
    pub reference_log_metal: f64,
    /// Where observed column densities come from.
    pub observation: ObservationSource,
    /// Flat prior box over `(log nH, log Z)`.
    #[serde(default)]
    pub prior: PriorBounds,
    /// Ensemble sampler settings.
    #[serde(default)]
    pub sampler: SamplerConfig,
    /// Burn-in and thinning policy applied before summarising.
    #[serde(default)]
    pub chain: ChainPolicy,
    /// Autocorrelation estimator settings.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// Artefact layout.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_reference_log_metal() -> f64 {
    DEFAULT_REFERENCE_LOG_METAL
}

impl FitConfig {
    /// Creates a configuration with every optional section at its default.
    pub fn new(grid: impl Into<PathBuf>, ions: Vec<String>, observation: ObservationSource) -> Self {
        Self {
            grid: grid.into(),
            ions,
            reference_log_metal: default_reference_log_metal(),
            observation,
            prior: PriorBounds::default(),
            sampler: SamplerConfig::default(),
            chain: ChainPolicy::default(),
            diagnostics: DiagnosticsConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Reads and validates a YAML configuration file.
    ///
    /// Relative grid and observation paths are resolved against the
    /// directory containing the file.
    pub fn load(path: &Path) -> Result<Self, CgmError> {
        let contents =
            fs::read_to_string(path).map_err(|err| CgmError::io("config-read", path, err))?;
        let mut config: FitConfig = serde_yaml::from_str(&contents).map_err(|err| {
            CgmError::Serde(
                ErrorInfo::new("config-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.grid);
        match &mut self.observation {
            ObservationSource::Measured { path } => resolve(path),
            ObservationSource::Synthetic {
                grid: Some(path), ..
            } => resolve(path),
            _ => {}
        }
        if let Some(dir) = self.output.run_directory.as_mut() {
            resolve(dir);
        }
    }

    /// Checks every option against its documented range.
    pub fn validate(&self) -> Result<(), CgmError> {
        if self.ions.is_empty() {
            return Err(CgmError::config("config-ions-empty", "at least one ion is required"));
        }
        let mut seen = BTreeSet::new();
        for ion in &self.ions {
            if !seen.insert(ion.as_str()) {
                return Err(CgmError::Config(
                    ErrorInfo::new("config-ions-duplicate", "ion listed more than once")
                        .with_context("ion", ion.clone()),
                ));
            }
        }
        if !self.reference_log_metal.is_finite() {
            return Err(CgmError::config(
                "config-reference-metal",
                "reference_log_metal must be finite",
            ));
        }
        self.observation.validate()?;
        self.prior.validate()?;
        self.sampler.validate()?;
        self.chain.validate()?;
        self.diagnostics.validate()
    }
}

/// Source of the observed column densities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ObservationSource {
    /// CSV file with `ion,column,sigma` rows.
    Measured {
        /// Path to the measurement CSV.
        path: PathBuf,
    },
    /// Measurements listed directly in the configuration.
    Inline {
        /// `(ion, column, sigma)` records.
        entries: Vec<ObservationRecord>,
    },
    /// "True" columns read from a grid row at an exact reference density.
    Synthetic {
        /// Grid holding the true model; defaults to the fit grid.
        #[serde(default)]
        grid: Option<PathBuf>,
        /// Linear density of the row to extract.
        #[serde(default = "default_reference_hden")]
        reference_hden: f64,
        /// Uncertainty (dex) assigned to every ion.
        #[serde(default = "default_synthetic_sigma")]
        sigma: f64,
    },
}

fn default_reference_hden() -> f64 {
    1e-4
}

fn default_synthetic_sigma() -> f64 {
    0.2
}

impl ObservationSource {
    fn validate(&self) -> Result<(), CgmError> {
        match self {
            ObservationSource::Synthetic {
                reference_hden,
                sigma,
                ..
            } => {
                if !(reference_hden.is_finite() && *reference_hden > 0.0) {
                    return Err(range_error("observation.reference_hden", "> 0", *reference_hden));
                }
                if !(sigma.is_finite() && *sigma > 0.0) {
                    return Err(range_error("observation.sigma", "> 0", *sigma));
                }
                Ok(())
            }
            ObservationSource::Inline { entries } if entries.is_empty() => Err(CgmError::config(
                "config-observation-empty",
                "inline observation lists no ions",
            )),
            _ => Ok(()),
        }
    }
}

/// Open interval `(lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Exclusive lower edge.
    pub lower: f64,
    /// Exclusive upper edge.
    pub upper: f64,
}

impl Bounds {
    /// Creates an interval.
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// True when `lower < value < upper`.
    pub fn contains(&self, value: f64) -> bool {
        self.lower < value && value < self.upper
    }

    fn validate(&self, name: &str) -> Result<(), CgmError> {
        if self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper {
            Ok(())
        } else {
            Err(CgmError::Config(
                ErrorInfo::new("config-bounds", "bounds must be finite with lower < upper")
                    .with_context("option", name)
                    .with_context("lower", self.lower.to_string())
                    .with_context("upper", self.upper.to_string()),
            ))
        }
    }
}

/// Flat prior support for each parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorBounds {
    /// Support of `log nH`.
    #[serde(default = "default_prior_log_nh")]
    pub log_nh: Bounds,
    /// Support of `log Z`.
    #[serde(default = "default_prior_log_z")]
    pub log_z: Bounds,
}

fn default_prior_log_nh() -> Bounds {
    Bounds::new(-6.0, -2.0)
}

fn default_prior_log_z() -> Bounds {
    Bounds::new(-2.0, 1.0)
}

impl Default for PriorBounds {
    fn default() -> Self {
        Self {
            log_nh: default_prior_log_nh(),
            log_z: default_prior_log_z(),
        }
    }
}

impl PriorBounds {
    /// True when `theta` lies strictly inside both intervals.
    pub fn contains(&self, theta: ParameterVector) -> bool {
        self.log_nh.contains(theta.log_nh) && self.log_z.contains(theta.log_z)
    }

    /// Validates both intervals.
    pub fn validate(&self) -> Result<(), CgmError> {
        self.log_nh.validate("prior.log_nh")?;
        self.log_z.validate("prior.log_z")
    }
}

/// Ensemble sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Number of walkers; even and at least twice the parameter count.
    #[serde(default = "default_walkers")]
    pub walkers: usize,
    /// Number of ensemble steps.
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Stretch-move scale `a`, strictly greater than one.
    #[serde(default = "default_stretch_scale")]
    pub stretch_scale: f64,
    /// Starting-position policy.
    #[serde(default)]
    pub init: WalkerInit,
    /// Master seed and label.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Worker threads for half-ensemble evaluation (0 selects the rayon default).
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_walkers() -> usize {
    50
}

fn default_steps() -> usize {
    3000
}

fn default_stretch_scale() -> f64 {
    2.0
}

fn default_threads() -> usize {
    1
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            walkers: default_walkers(),
            steps: default_steps(),
            stretch_scale: default_stretch_scale(),
            init: WalkerInit::default(),
            seed_policy: SeedPolicy::default(),
            threads: default_threads(),
        }
    }
}

impl SamplerConfig {
    /// Smallest admissible ensemble.
    pub const MIN_WALKERS: usize = 2 * ParameterVector::DIM;

    /// Validates walker count, step count, stretch scale and seeding policy.
    pub fn validate(&self) -> Result<(), CgmError> {
        if self.walkers < Self::MIN_WALKERS {
            return Err(CgmError::Config(
                ErrorInfo::new("config-walkers", "too few walkers for the ensemble")
                    .with_context("walkers", self.walkers.to_string())
                    .with_hint(format!("use at least {} walkers", Self::MIN_WALKERS)),
            ));
        }
        if self.walkers % 2 != 0 {
            return Err(CgmError::Config(
                ErrorInfo::new("config-walkers-odd", "walker count must be even")
                    .with_context("walkers", self.walkers.to_string())
                    .with_hint("the ensemble is split into two equal halves"),
            ));
        }
        if self.steps == 0 {
            return Err(CgmError::config("config-steps", "steps must be at least 1"));
        }
        if !(self.stretch_scale.is_finite() && self.stretch_scale > 1.0) {
            return Err(range_error("sampler.stretch_scale", "> 1", self.stretch_scale));
        }
        self.init.validate(self.walkers)
    }
}

/// Starting-position policy for the walkers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WalkerInit {
    /// Independent uniform draws inside a box.
    Uniform {
        /// Range of `log nH` draws.
        #[serde(default = "default_init_log_nh")]
        log_nh: Bounds,
        /// Range of `log Z` draws.
        #[serde(default = "default_prior_log_z")]
        log_z: Bounds,
    },
    /// Gaussian ball of standard deviation `radius` around `center`.
    Ball {
        /// Centre of the ball.
        center: ParameterVector,
        /// Per-component standard deviation.
        #[serde(default = "default_ball_radius")]
        radius: f64,
    },
    /// Caller-supplied positions, one per walker.
    Explicit {
        /// Starting positions.
        positions: Vec<ParameterVector>,
    },
}

fn default_init_log_nh() -> Bounds {
    Bounds::new(-5.0, -2.0)
}

fn default_ball_radius() -> f64 {
    1e-4
}

impl Default for WalkerInit {
    fn default() -> Self {
        WalkerInit::Uniform {
            log_nh: default_init_log_nh(),
            log_z: default_prior_log_z(),
        }
    }
}

impl WalkerInit {
    fn validate(&self, walkers: usize) -> Result<(), CgmError> {
        match self {
            WalkerInit::Uniform { log_nh, log_z } => {
                log_nh.validate("sampler.init.log_nh")?;
                log_z.validate("sampler.init.log_z")
            }
            WalkerInit::Ball { center, radius } => {
                if !center.is_finite() {
                    return Err(CgmError::config(
                        "config-init-center",
                        "ball centre must be finite",
                    ));
                }
                if !(radius.is_finite() && *radius > 0.0) {
                    return Err(range_error("sampler.init.radius", "> 0", *radius));
                }
                Ok(())
            }
            WalkerInit::Explicit { positions } => {
                if positions.len() != walkers {
                    return Err(CgmError::Config(
                        ErrorInfo::new("config-init-positions", "one position per walker required")
                            .with_context("walkers", walkers.to_string())
                            .with_context("positions", positions.len().to_string()),
                    ));
                }
                if let Some(index) = positions.iter().position(|p| !p.is_finite()) {
                    return Err(CgmError::Config(
                        ErrorInfo::new("config-init-positions", "walker position must be finite")
                            .with_context("walker", index.to_string()),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Burn-in and thinning policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChainPolicy {
    /// Derive burn-in and stride from the autocorrelation time.
    Auto {
        /// Burn-in length in units of the largest autocorrelation time.
        #[serde(default = "default_burn_factor")]
        burn_factor: f64,
        /// Thinning stride in units of the smallest autocorrelation time.
        #[serde(default = "default_thin_factor")]
        thin_factor: f64,
    },
    /// Fixed burn-in length and stride.
    Fixed {
        /// Steps dropped from the start of every walker.
        discard: usize,
        /// Keep every `thin`-th remaining step.
        #[serde(default = "default_thin")]
        thin: usize,
    },
}

fn default_burn_factor() -> f64 {
    5.0
}

fn default_thin_factor() -> f64 {
    0.5
}

fn default_thin() -> usize {
    1
}

impl Default for ChainPolicy {
    fn default() -> Self {
        ChainPolicy::Auto {
            burn_factor: default_burn_factor(),
            thin_factor: default_thin_factor(),
        }
    }
}

impl ChainPolicy {
    fn validate(&self) -> Result<(), CgmError> {
        match self {
            ChainPolicy::Auto {
                burn_factor,
                thin_factor,
            } => {
                if !(burn_factor.is_finite() && *burn_factor >= 0.0) {
                    return Err(range_error("chain.burn_factor", ">= 0", *burn_factor));
                }
                if !(thin_factor.is_finite() && *thin_factor >= 0.0) {
                    return Err(range_error("chain.thin_factor", ">= 0", *thin_factor));
                }
                Ok(())
            }
            ChainPolicy::Fixed { thin, .. } if *thin == 0 => {
                Err(CgmError::config("config-thin", "thin must be at least 1"))
            }
            ChainPolicy::Fixed { .. } => Ok(()),
        }
    }
}

/// Integrated autocorrelation time estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Sokal window constant: the window is the first lag `M >= c * tau(M)`.
    #[serde(default = "default_window_c")]
    pub window_c: f64,
    /// Chains shorter than `tolerance * tau` are flagged as unconverged.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_window_c() -> f64 {
    5.0
}

fn default_tolerance() -> f64 {
    50.0
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            window_c: default_window_c(),
            tolerance: default_tolerance(),
        }
    }
}

impl DiagnosticsConfig {
    fn validate(&self) -> Result<(), CgmError> {
        if !(self.window_c.is_finite() && self.window_c > 0.0) {
            return Err(range_error("diagnostics.window_c", "> 0", self.window_c));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(range_error("diagnostics.tolerance", "> 0", self.tolerance));
        }
        Ok(())
    }
}

/// Output directory layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts; nothing is written when unset.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Flattened posterior samples, relative to `run_directory`.
    #[serde(default = "default_samples_filename")]
    pub samples_file: PathBuf,
    /// Full chain dump, relative to `run_directory`.
    #[serde(default = "default_chain_filename")]
    pub chain_file: PathBuf,
    /// Summary JSON, relative to `run_directory`.
    #[serde(default = "default_summary_filename")]
    pub summary_file: PathBuf,
    /// Manifest JSON, relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
}

fn default_samples_filename() -> PathBuf {
    PathBuf::from("samples.csv")
}

fn default_chain_filename() -> PathBuf {
    PathBuf::from("chain.csv")
}

fn default_summary_filename() -> PathBuf {
    PathBuf::from("summary.json")
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            samples_file: default_samples_filename(),
            chain_file: default_chain_filename(),
            summary_file: default_summary_filename(),
            manifest_file: default_manifest_filename(),
        }
    }
}

fn range_error(option: &str, range: &str, value: f64) -> CgmError {
    CgmError::Config(
        ErrorInfo::new("config-range", "option outside its valid range")
            .with_context("option", option)
            .with_context("valid", range)
            .with_context("value", value.to_string()),
    )
}
