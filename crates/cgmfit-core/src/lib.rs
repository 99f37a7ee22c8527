#![deny(missing_docs)]
#![doc = "Core traits and data types shared by the cgmfit grid, sampler and CLI crates."]

pub mod errors;
mod params;
pub mod provenance;
pub mod rng;

pub use errors::{CgmError, ErrorInfo};
pub use params::ParameterVector;
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};

/// Log prior density over the fit parameters.
///
/// Returns `f64::NEG_INFINITY` outside the support.
pub trait LogPrior: Send + Sync {
    /// Evaluates the log prior at `theta`.
    fn log_prior(&self, theta: ParameterVector) -> f64;
}

/// Log likelihood of the observed data given the fit parameters.
pub trait LogLikelihood: Send + Sync {
    /// Evaluates the log likelihood at `theta`.
    fn log_likelihood(&self, theta: ParameterVector) -> f64;
}

/// Unnormalised log density explored by the ensemble sampler.
pub trait LogDensity: Send + Sync {
    /// Evaluates the log density at `theta`.
    ///
    /// Implementations may return `NaN`; the sampler treats every
    /// non-finite value as a rejected proposal.
    fn log_density(&self, theta: ParameterVector) -> f64;
}

impl<F> LogDensity for F
where
    F: Fn(ParameterVector) -> f64 + Send + Sync,
{
    fn log_density(&self, theta: ParameterVector) -> f64 {
        self(theta)
    }
}
