use std::fs;
use std::path::Path;

use cgmfit_core::errors::{CgmError, ErrorInfo};
use cgmfit_core::ParameterVector;
use serde::{Deserialize, Serialize};

/// Append-only record of every walker position and log density, step by step.
///
/// Storage is step-major; `get(walker, step)` addresses one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    walkers: usize,
    positions: Vec<ParameterVector>,
    log_probs: Vec<f64>,
}

/// One row of the chain dump.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainRecord {
    /// Walker index.
    pub walker: usize,
    /// Step index.
    pub step: usize,
    /// Density parameter.
    #[serde(rename = "log_nH")]
    pub log_nh: f64,
    /// Metallicity parameter.
    #[serde(rename = "log_Z")]
    pub log_z: f64,
    /// Log posterior density at the position.
    pub log_prob: f64,
}

impl Chain {
    /// Creates an empty chain for `walkers` walkers.
    pub fn new(walkers: usize) -> Self {
        Self {
            walkers,
            positions: Vec::new(),
            log_probs: Vec::new(),
        }
    }

    /// Appends the ensemble state after one step.
    pub fn push_step(
        &mut self,
        positions: &[ParameterVector],
        log_probs: &[f64],
    ) -> Result<(), CgmError> {
        if positions.len() != self.walkers || log_probs.len() != self.walkers {
            return Err(CgmError::Chain(
                ErrorInfo::new("chain-step-width", "step does not match the walker count")
                    .with_context("walkers", self.walkers.to_string())
                    .with_context("positions", positions.len().to_string())
                    .with_context("log_probs", log_probs.len().to_string()),
            ));
        }
        self.positions.extend_from_slice(positions);
        self.log_probs.extend_from_slice(log_probs);
        Ok(())
    }

    /// Number of walkers.
    pub fn walkers(&self) -> usize {
        self.walkers
    }

    /// Number of completed steps.
    pub fn steps(&self) -> usize {
        if self.walkers == 0 {
            0
        } else {
            self.positions.len() / self.walkers
        }
    }

    /// Position of `walker` after `step`.
    pub fn get(&self, walker: usize, step: usize) -> Option<ParameterVector> {
        self.index(walker, step).map(|idx| self.positions[idx])
    }

    /// Log density of `walker` after `step`.
    pub fn log_prob(&self, walker: usize, step: usize) -> Option<f64> {
        self.index(walker, step).map(|idx| self.log_probs[idx])
    }

    /// Values of parameter `param` along one walker's trajectory.
    pub fn walker_series(&self, walker: usize, param: usize) -> Vec<f64> {
        (0..self.steps())
            .filter_map(|step| self.get(walker, step).and_then(|p| p.get(param)))
            .collect()
    }

    fn index(&self, walker: usize, step: usize) -> Option<usize> {
        (walker < self.walkers && step < self.steps()).then(|| step * self.walkers + walker)
    }

    /// Drops the first `discard` steps of every walker, keeps every `thin`-th
    /// remaining step and concatenates walker by walker.
    ///
    /// `discard >= steps` and `thin == 0` are errors rather than empty results.
    pub fn flatten(&self, discard: usize, thin: usize) -> Result<FlatSamples, CgmError> {
        if thin == 0 {
            return Err(CgmError::Chain(ErrorInfo::new(
                "chain-zero-thin",
                "thinning stride must be at least 1",
            )));
        }
        let steps = self.steps();
        if discard >= steps {
            return Err(CgmError::Chain(
                ErrorInfo::new("chain-degenerate-discard", "burn-in removes every step")
                    .with_context("discard", discard.to_string())
                    .with_context("steps", steps.to_string())
                    .with_hint("run more steps or lower the burn-in"),
            ));
        }
        let mut samples = Vec::with_capacity(self.walkers * (steps - discard).div_ceil(thin));
        for walker in 0..self.walkers {
            for step in (discard..steps).step_by(thin) {
                samples.push(self.positions[step * self.walkers + walker]);
            }
        }
        Ok(FlatSamples { samples })
    }

    /// Rows of the chain dump, step by step.
    pub fn records(&self) -> impl Iterator<Item = ChainRecord> + '_ {
        self.positions
            .iter()
            .zip(&self.log_probs)
            .enumerate()
            .map(move |(idx, (theta, log_prob))| ChainRecord {
                walker: idx % self.walkers,
                step: idx / self.walkers,
                log_nh: theta.log_nh,
                log_z: theta.log_z,
                log_prob: *log_prob,
            })
    }

    /// Writes `walker,step,log_nH,log_Z,log_prob` rows.
    pub fn write_csv(&self, path: &Path) -> Result<(), CgmError> {
        let mut writer = csv_writer(path)?;
        for record in self.records() {
            writer
                .serialize(record)
                .map_err(|err| wrap_csv("chain-csv-write", path, err))?;
        }
        writer
            .flush()
            .map_err(|err| CgmError::io("chain-csv-flush", path, err))
    }
}

/// Posterior samples after burn-in and thinning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatSamples {
    samples: Vec<ParameterVector>,
}

impl FlatSamples {
    /// Wraps an explicit sample list.
    pub fn new(samples: Vec<ParameterVector>) -> Self {
        Self { samples }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples are held.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in flatten order.
    pub fn as_slice(&self) -> &[ParameterVector] {
        &self.samples
    }

    /// Values of one parameter across all samples.
    pub fn column(&self, param: usize) -> Vec<f64> {
        self.samples.iter().filter_map(|p| p.get(param)).collect()
    }

    /// Writes a `log_nH,log_Z` CSV.
    pub fn write_csv(&self, path: &Path) -> Result<(), CgmError> {
        let mut writer = csv_writer(path)?;
        writer
            .write_record(ParameterVector::LABELS)
            .map_err(|err| wrap_csv("samples-csv-write", path, err))?;
        for theta in &self.samples {
            writer
                .write_record(&[theta.log_nh.to_string(), theta.log_z.to_string()])
                .map_err(|err| wrap_csv("samples-csv-write", path, err))?;
        }
        writer
            .flush()
            .map_err(|err| CgmError::io("samples-csv-flush", path, err))
    }
}

fn csv_writer(path: &Path) -> Result<csv::Writer<fs::File>, CgmError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| CgmError::io("output-mkdir", parent, err))?;
    }
    csv::Writer::from_path(path).map_err(|err| wrap_csv("output-create", path, err))
}

fn wrap_csv(code: &str, path: &Path, err: csv::Error) -> CgmError {
    CgmError::Io(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}
