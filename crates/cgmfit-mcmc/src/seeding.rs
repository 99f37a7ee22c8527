use cgmfit_core::errors::{CgmError, ErrorInfo};
use cgmfit_core::{ParameterVector, RngHandle};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::config::WalkerInit;
use crate::determinism;

/// Draws one starting position per walker from `init`.
pub fn initial_positions(
    init: &WalkerInit,
    walkers: usize,
    master_seed: u64,
) -> Result<Vec<ParameterVector>, CgmError> {
    let mut rng = RngHandle::from_seed(determinism::init_seed(master_seed));
    let positions = match init {
        WalkerInit::Uniform { log_nh, log_z } => (0..walkers)
            .map(|_| {
                ParameterVector::new(
                    rng.gen_range(log_nh.lower..log_nh.upper),
                    rng.gen_range(log_z.lower..log_z.upper),
                )
            })
            .collect(),
        WalkerInit::Ball { center, radius } => (0..walkers)
            .map(|_| {
                let dx: f64 = rng.sample(StandardNormal);
                let dy: f64 = rng.sample(StandardNormal);
                ParameterVector::new(center.log_nh + radius * dx, center.log_z + radius * dy)
            })
            .collect(),
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
            positions.clone()
        }
    };
    Ok(positions)
}
