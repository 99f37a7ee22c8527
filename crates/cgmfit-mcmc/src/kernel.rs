use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cgmfit_core::errors::{CgmError, ErrorInfo};
use cgmfit_core::{LogDensity, ParameterVector};
use rand::Rng;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chain::Chain;
use crate::config::SamplerConfig;
use crate::determinism;

/// Goodman-Weare affine-invariant stretch move with scale `a`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StretchMove {
    scale: f64,
}

impl StretchMove {
    /// Creates the move; `scale` must be finite and greater than one.
    pub fn new(scale: f64) -> Result<Self, CgmError> {
        if !(scale.is_finite() && scale > 1.0) {
            return Err(CgmError::Config(
                ErrorInfo::new("stretch-scale", "stretch scale must exceed 1")
                    .with_context("scale", scale.to_string()),
            ));
        }
        Ok(Self { scale })
    }

    /// Stretch scale `a`.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Draws `z` from `g(z) ~ 1/sqrt(z)` on `[1/a, a]`.
    pub fn sample_z<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.gen();
        let root = (self.scale - 1.0) * u + 1.0;
        root * root / self.scale
    }

    /// Log acceptance ratio `(d - 1) ln z + log p(new) - log p(old)`.
    ///
    /// Non-finite proposal densities return `-inf`.
    pub fn log_acceptance(&self, z: f64, log_prob_old: f64, log_prob_new: f64) -> f64 {
        if !log_prob_new.is_finite() {
            return f64::NEG_INFINITY;
        }
        let dim = ParameterVector::DIM as f64;
        (dim - 1.0) * z.ln() + log_prob_new - log_prob_old
    }
}

/// Cooperative cancellation flag checked between ensemble steps.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the sampler to stop after the step in progress.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Output of a sampler run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerRun {
    /// Every committed step.
    pub chain: Chain,
    /// Accepted proposals per walker.
    pub accepted: Vec<usize>,
    /// Completed steps; equals the chain length.
    pub steps_completed: usize,
    /// Set when the run ended early on a stop request.
    pub interrupted: bool,
}

impl SamplerRun {
    /// Fraction of accepted proposals for each walker.
    pub fn acceptance_fractions(&self) -> Vec<f64> {
        if self.steps_completed == 0 {
            return vec![0.0; self.accepted.len()];
        }
        let steps = self.steps_completed as f64;
        self.accepted.iter().map(|&a| a as f64 / steps).collect()
    }

    /// Ensemble-averaged acceptance fraction.
    pub fn mean_acceptance(&self) -> f64 {
        let fractions = self.acceptance_fractions();
        if fractions.is_empty() {
            0.0
        } else {
            fractions.iter().sum::<f64>() / fractions.len() as f64
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Walker {
    position: ParameterVector,
    log_prob: f64,
    accepted: usize,
}

/// Affine-invariant ensemble sampler over a [`LogDensity`].
///
/// Each step updates the two halves of the ensemble in turn. Walkers in the
/// moving half are proposed in parallel against a frozen view of the other
/// half, and draw their randomness from a per-(step, walker) substream, so
/// the chain is identical for any thread count.
pub struct EnsembleSampler<D> {
    target: D,
    stretch: StretchMove,
    walkers: usize,
    master_seed: u64,
    pool: ThreadPool,
}

impl<D: LogDensity> EnsembleSampler<D> {
    /// Builds a sampler for `target` from validated settings.
    pub fn new(target: D, config: &SamplerConfig) -> Result<Self, CgmError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|err| CgmError::config("sampler-thread-pool", err.to_string()))?;
        Ok(Self {
            target,
            stretch: StretchMove::new(config.stretch_scale)?,
            walkers: config.walkers,
            master_seed: config.seed_policy.master_seed,
            pool,
        })
    }

    /// Density being sampled.
    pub fn target(&self) -> &D {
        &self.target
    }

    /// Number of walkers.
    pub fn walkers(&self) -> usize {
        self.walkers
    }

    /// Runs `steps` steps from `initial`.
    pub fn run(&self, initial: &[ParameterVector], steps: usize) -> Result<SamplerRun, CgmError> {
        self.run_until(initial, steps, &StopFlag::new())
    }

    /// Runs up to `steps` steps, returning the committed prefix if `stop`
    /// is raised.
    pub fn run_until(
        &self,
        initial: &[ParameterVector],
        steps: usize,
        stop: &StopFlag,
    ) -> Result<SamplerRun, CgmError> {
        if initial.len() != self.walkers {
            return Err(CgmError::Config(
                ErrorInfo::new("sampler-initial-width", "one initial position per walker required")
                    .with_context("walkers", self.walkers.to_string())
                    .with_context("positions", initial.len().to_string()),
            ));
        }

        let mut ensemble: Vec<Walker> = self.pool.install(|| {
            initial
                .par_iter()
                .map(|&position| Walker {
                    position,
                    log_prob: self.evaluate(position),
                    accepted: 0,
                })
                .collect()
        });
        let finite = ensemble.iter().filter(|w| w.log_prob.is_finite()).count();
        if finite == 0 {
            warn!(
                walkers = self.walkers,
                "no initial walker has finite log density"
            );
        }

        let mut chain = Chain::new(self.walkers);
        let mut interrupted = false;
        let split = self.walkers / 2;
        let log_every = (steps / 10).max(1);

        for step in 0..steps {
            if stop.is_stop_requested() {
                interrupted = true;
                info!(step, "stop requested, keeping committed steps");
                break;
            }
            let (first, second) = ensemble.split_at_mut(split);
            self.advance_half(first, 0, second, step);
            self.advance_half(second, split, first, step);

            let positions: Vec<ParameterVector> = ensemble.iter().map(|w| w.position).collect();
            let log_probs: Vec<f64> = ensemble.iter().map(|w| w.log_prob).collect();
            chain.push_step(&positions, &log_probs)?;

            if (step + 1) % log_every == 0 {
                let accepted: usize = ensemble.iter().map(|w| w.accepted).sum();
                debug!(
                    step = step + 1,
                    acceptance = accepted as f64 / ((step + 1) * self.walkers) as f64,
                    "ensemble progress"
                );
            }
        }

        let steps_completed = chain.steps();
        Ok(SamplerRun {
            chain,
            accepted: ensemble.iter().map(|w| w.accepted).collect(),
            steps_completed,
            interrupted,
        })
    }

    fn advance_half(&self, moving: &mut [Walker], offset: usize, frozen: &[Walker], step: usize) {
        let anchors: Vec<ParameterVector> = frozen.iter().map(|w| w.position).collect();
        self.pool.install(|| {
            moving
                .par_iter_mut()
                .enumerate()
                .for_each(|(idx, walker)| self.propose(walker, offset + idx, &anchors, step));
        });
    }

    fn propose(&self, walker: &mut Walker, index: usize, anchors: &[ParameterVector], step: usize) {
        if anchors.is_empty() {
            return;
        }
        let mut rng = determinism::move_rng(self.master_seed, step, index);
        let anchor = anchors[rng.gen_range(0..anchors.len())];
        let z = self.stretch.sample_z(&mut rng);
        let proposal = walker.position.stretch_from(anchor, z);
        let log_prob_new = self.evaluate(proposal);
        let log_accept = self
            .stretch
            .log_acceptance(z, walker.log_prob, log_prob_new);
        let u: f64 = rng.gen();
        if u.ln() < log_accept {
            walker.position = proposal;
            walker.log_prob = log_prob_new;
            walker.accepted += 1;
        }
    }

    fn evaluate(&self, theta: ParameterVector) -> f64 {
        if !theta.is_finite() {
            return f64::NEG_INFINITY;
        }
        let value = self.target.log_density(theta);
        if value.is_finite() {
            value
        } else {
            f64::NEG_INFINITY
        }
    }
}
