//! Least-squares density scan across grid rows.

use cgmfit_core::errors::CgmError;
use serde::{Deserialize, Serialize};

use crate::observation::Observation;
use crate::table::GridTable;

/// Residuals of every grid row against an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityScan {
    /// Grid densities, increasing.
    pub hden: Vec<f64>,
    /// Sum of squared linear column residuals per row.
    pub residuals: Vec<f64>,
    /// Density of the best-matching row.
    pub best_hden: f64,
    /// Residual at the best-matching row.
    pub best_residual: f64,
}

/// Finds the grid density whose columns best match `observation` in the
/// least-squares sense, `Σ_ions (model - observed)²` on linear columns.
///
/// This is a quick point estimate at the grid's reference metallicity, useful
/// to seed walkers or sanity-check a posterior.
pub fn find_density(
    grid: &GridTable,
    observation: &Observation,
    ions: &[String],
) -> Result<DensityScan, CgmError> {
    if ions.is_empty() {
        return Err(CgmError::schema(
            "scan-no-ions",
            "least-squares scan needs at least one ion",
        ));
    }
    grid.require_ions(ions)?;
    let measured = observation.select(ions.iter().map(String::as_str))?;

    let mut residuals = vec![0.0; grid.rows()];
    for (ion, measurement) in ions.iter().zip(&measured) {
        let column = grid.column(ion).unwrap_or_default();
        for (total, model) in residuals.iter_mut().zip(column) {
            *total += (model - measurement.column).powi(2);
        }
    }

    let (best_index, best_residual) = residuals
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, value)| !value.is_nan())
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| CgmError::schema("scan-all-nan", "every grid row produced a NaN residual"))?;
    if residuals.iter().any(|value| value.is_nan()) {
        tracing::warn!("least-squares scan ignored grid rows with NaN residuals");
    }

    Ok(DensityScan {
        hden: grid.hden().to_vec(),
        best_hden: grid.hden()[best_index],
        best_residual,
        residuals,
    })
}
