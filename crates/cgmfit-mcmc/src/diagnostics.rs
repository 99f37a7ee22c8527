use cgmfit_core::ParameterVector;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chain::Chain;
use crate::config::{ChainPolicy, DiagnosticsConfig};

/// Integrated autocorrelation time estimate for each parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocorrEstimate {
    /// `tau` per parameter, in steps. Infinite when the parameter never moved;
    /// written as `null` in JSON.
    #[serde(with = "unbounded::vec")]
    pub tau: Vec<f64>,
    /// Summation window chosen per parameter.
    pub window: Vec<usize>,
    /// Steps in the analysed chain.
    pub steps: usize,
    /// Set when the chain is at least `tolerance * tau` long for every parameter.
    pub converged: bool,
}

impl AutocorrEstimate {
    /// Largest finite `tau`, or infinity when none is finite.
    pub fn max_tau(&self) -> f64 {
        let max = self
            .tau
            .iter()
            .copied()
            .filter(|t| t.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if max.is_finite() {
            max
        } else {
            f64::INFINITY
        }
    }

    /// Smallest finite `tau`, or infinity when none is finite.
    pub fn min_tau(&self) -> f64 {
        self.tau
            .iter()
            .copied()
            .filter(|t| t.is_finite())
            .fold(f64::INFINITY, f64::min)
    }
}

/// Non-fatal report raised when the chain is too short for its autocorrelation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonConvergence {
    /// Steps that were run.
    pub steps: usize,
    /// Steps needed to reach `tolerance * max_tau`.
    #[serde(with = "unbounded")]
    pub required_steps: f64,
    /// Largest autocorrelation time.
    #[serde(with = "unbounded")]
    pub max_tau: f64,
}

/// Serde adapter for quantities that may be unbounded: infinity is written as
/// `null` and `null` reads back as infinity.
mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }

    pub mod vec {
        use serde::ser::SerializeSeq;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for value in values {
                seq.serialize_element(&value.is_finite().then_some(*value))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<f64>, D::Error> {
            let values = Vec::<Option<f64>>::deserialize(deserializer)?;
            Ok(values
                .into_iter()
                .map(|value| value.unwrap_or(f64::INFINITY))
                .collect())
        }
    }
}

/// Estimates `tau` for every parameter.
///
/// The autocorrelation function is averaged over walkers, then summed up to
/// the first lag `M` with `M >= c * tau(M)`. Walkers that never move are left
/// out of the average; if no walker moves `tau` is infinite.
pub fn integrated_time(chain: &Chain, config: &DiagnosticsConfig) -> AutocorrEstimate {
    let steps = chain.steps();
    let mut tau = Vec::with_capacity(ParameterVector::DIM);
    let mut window = Vec::with_capacity(ParameterVector::DIM);
    for param in 0..ParameterVector::DIM {
        let series: Vec<Vec<f64>> = (0..chain.walkers())
            .map(|walker| chain.walker_series(walker, param))
            .collect();
        let (t, m) = integrated_time_1d(&series, config.window_c);
        tau.push(t);
        window.push(m);
    }
    let max_tau = tau.iter().copied().fold(0.0_f64, f64::max);
    let converged = tau.iter().all(|t| t.is_finite())
        && (steps as f64) >= config.tolerance * max_tau;
    AutocorrEstimate {
        tau,
        window,
        steps,
        converged,
    }
}

fn integrated_time_1d(walkers: &[Vec<f64>], window_c: f64) -> (f64, usize) {
    let moving: Vec<(&[f64], f64, f64)> = walkers
        .iter()
        .filter_map(|series| {
            let n = series.len() as f64;
            let mean = series.iter().sum::<f64>() / n;
            let variance: f64 = series.iter().map(|x| (x - mean) * (x - mean)).sum();
            (variance > 0.0).then_some((series.as_slice(), mean, variance))
        })
        .collect();
    let n = walkers.first().map_or(0, Vec::len);
    if moving.is_empty() || n < 2 {
        return (f64::INFINITY, 0);
    }

    let mut partial = 1.0;
    for lag in 1..n {
        let rho: f64 = moving
            .iter()
            .map(|(series, mean, variance)| {
                series[..n - lag]
                    .iter()
                    .zip(&series[lag..])
                    .map(|(a, b)| (a - mean) * (b - mean))
                    .sum::<f64>()
                    / variance
            })
            .sum::<f64>()
            / moving.len() as f64;
        partial += 2.0 * rho;
        if lag as f64 >= window_c * partial {
            return (partial, lag);
        }
    }
    (partial, n - 1)
}

/// Emits a warning and returns the report when the chain is too short.
pub fn check_convergence(
    estimate: &AutocorrEstimate,
    config: &DiagnosticsConfig,
) -> Option<NonConvergence> {
    if estimate.converged {
        return None;
    }
    let max_tau = estimate.max_tau();
    let report = NonConvergence {
        steps: estimate.steps,
        required_steps: config.tolerance * max_tau,
        max_tau,
    };
    warn!(
        steps = report.steps,
        required = report.required_steps,
        tau = report.max_tau,
        "chain shorter than {} autocorrelation times; estimate may be unreliable",
        config.tolerance
    );
    Some(report)
}

/// Burn-in and stride applied to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainCut {
    /// Steps dropped per walker.
    pub discard: usize,
    /// Stride over the remaining steps.
    pub thin: usize,
    /// Set when the automatic burn-in was capped at half the chain.
    pub clamped: bool,
}

/// Resolves `policy` into a concrete burn-in and stride.
///
/// Automatic burn-in is capped at half the chain so that a short, unconverged
/// run still produces samples; fixed values are used as given.
pub fn choose_cut(policy: &ChainPolicy, estimate: &AutocorrEstimate, steps: usize) -> ChainCut {
    match policy {
        ChainPolicy::Fixed { discard, thin } => ChainCut {
            discard: *discard,
            thin: *thin,
            clamped: false,
        },
        ChainPolicy::Auto {
            burn_factor,
            thin_factor,
        } => {
            let cap = steps / 2;
            let max_tau = estimate.max_tau();
            let wanted = if max_tau.is_finite() {
                (burn_factor * max_tau).ceil() as usize
            } else {
                usize::MAX
            };
            let clamped = wanted > cap;
            if clamped {
                warn!(wanted, cap, "automatic burn-in capped at half the chain");
            }
            let min_tau = estimate.min_tau();
            let thin = if min_tau.is_finite() {
                ((thin_factor * min_tau).floor() as usize).max(1)
            } else {
                1
            };
            ChainCut {
                discard: wanted.min(cap),
                thin,
                clamped,
            }
        }
    }
}
