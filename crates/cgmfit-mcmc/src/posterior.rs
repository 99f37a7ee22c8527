use std::f64::consts::PI;

use cgmfit_core::errors::CgmError;
use cgmfit_core::{LogDensity, LogLikelihood, LogPrior, ParameterVector};
use cgmfit_grid::{ForwardModel, Observation};

use crate::config::PriorBounds;

/// Flat prior over an open box: zero inside, `-inf` on or outside the edges.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxPrior {
    bounds: PriorBounds,
}

impl BoxPrior {
    /// Creates the prior after validating the bounds.
    pub fn new(bounds: PriorBounds) -> Result<Self, CgmError> {
        bounds.validate()?;
        Ok(Self { bounds })
    }

    /// Support of the prior.
    pub fn bounds(&self) -> &PriorBounds {
        &self.bounds
    }
}

impl LogPrior for BoxPrior {
    fn log_prior(&self, theta: ParameterVector) -> f64 {
        if self.bounds.contains(theta) {
            0.0
        } else {
            f64::NEG_INFINITY
        }
    }
}

/// Independent Gaussian errors on log10 column densities.
///
/// `ln L = -1/2 * sum_i [ ln(2 pi sigma_i^2) + (log10 N_obs_i - log10 N_model_i)^2 / sigma_i^2 ]`
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianLikelihood {
    model: ForwardModel,
    log_observed: Vec<f64>,
    sigma: Vec<f64>,
    normalisation: f64,
}

impl GaussianLikelihood {
    /// Pairs the forward model with the measurements of the ions it predicts.
    ///
    /// Fails when an ion of the model has no measurement.
    pub fn new(model: ForwardModel, observation: &Observation) -> Result<Self, CgmError> {
        let measurements = observation.select(model.ions())?;
        let log_observed = measurements.iter().map(|m| m.log_column()).collect();
        let sigma: Vec<f64> = measurements.iter().map(|m| m.sigma).collect();
        let normalisation = sigma.iter().map(|s| (2.0 * PI * s * s).ln()).sum();
        Ok(Self {
            model,
            log_observed,
            sigma,
            normalisation,
        })
    }

    /// Forward model used for predictions.
    pub fn model(&self) -> &ForwardModel {
        &self.model
    }
}

impl LogLikelihood for GaussianLikelihood {
    fn log_likelihood(&self, theta: ParameterVector) -> f64 {
        let predicted = self.model.predict_log(theta);
        let chi2: f64 = predicted
            .iter()
            .zip(&self.log_observed)
            .zip(&self.sigma)
            .map(|((model, observed), sigma)| {
                let residual = observed - model;
                residual * residual / (sigma * sigma)
            })
            .sum();
        -0.5 * (self.normalisation + chi2)
    }
}

/// Prior plus likelihood.
///
/// The likelihood is only evaluated where the prior is finite.
#[derive(Debug, Clone)]
pub struct Posterior<P, L> {
    prior: P,
    likelihood: L,
}

impl<P, L> Posterior<P, L> {
    /// Combines a prior and likelihood.
    pub fn new(prior: P, likelihood: L) -> Self {
        Self { prior, likelihood }
    }

    /// Prior component.
    pub fn prior(&self) -> &P {
        &self.prior
    }

    /// Likelihood component.
    pub fn likelihood(&self) -> &L {
        &self.likelihood
    }
}

impl<P: LogPrior, L: LogLikelihood> LogDensity for Posterior<P, L> {
    fn log_density(&self, theta: ParameterVector) -> f64 {
        let lp = self.prior.log_prior(theta);
        if !lp.is_finite() {
            return f64::NEG_INFINITY;
        }
        lp + self.likelihood.log_likelihood(theta)
    }
}

/// Posterior used by the CLI fit: flat box prior with Gaussian log-column errors.
pub type CloudPosterior = Posterior<BoxPrior, GaussianLikelihood>;
