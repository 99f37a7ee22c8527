use cgmfit_core::errors::CgmError;
use cgmfit_core::ParameterVector;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::interp::{build_interpolator, InterpolatorSet};
use crate::table::GridTable;

/// Metallicity (log, relative to solar) at which grids are computed.
pub const DEFAULT_REFERENCE_LOG_METAL: f64 = -1.0;

/// Predicts ion column densities for arbitrary `(log nH, log Z)`.
///
/// Columns are interpolated at the grid's reference metallicity and then
/// scaled linearly by `10^(log_Z - reference_log_metal)`. The linear scaling
/// holds for metal ions only; hydrogen and helium columns passed through this
/// model are scaled as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardModel {
    interpolators: InterpolatorSet,
    reference_log_metal: f64,
}

impl ForwardModel {
    /// Wraps prebuilt interpolators.
    pub fn new(interpolators: InterpolatorSet, reference_log_metal: f64) -> Self {
        Self {
            interpolators,
            reference_log_metal,
        }
    }

    /// Builds interpolators for `ions` from `grid` and wraps them.
    pub fn from_grid(
        grid: &GridTable,
        ions: &[String],
        reference_log_metal: f64,
    ) -> Result<Self, CgmError> {
        Ok(Self::new(
            build_interpolator(grid, ions)?,
            reference_log_metal,
        ))
    }

    /// Reference metallicity of the underlying grid.
    pub fn reference_log_metal(&self) -> f64 {
        self.reference_log_metal
    }

    /// Interpolators backing the model.
    pub fn interpolators(&self) -> &InterpolatorSet {
        &self.interpolators
    }

    /// Ion names in prediction order.
    pub fn ions(&self) -> impl Iterator<Item = &str> {
        self.interpolators.ions()
    }

    /// Linear factor applied to every column at metallicity `log_z`.
    pub fn metal_scaling(&self, log_z: f64) -> f64 {
        10f64.powf(log_z) / 10f64.powf(self.reference_log_metal)
    }

    /// Predicted column density per ion.
    pub fn predict(&self, theta: ParameterVector) -> IndexMap<String, f64> {
        let scaling = self.metal_scaling(theta.log_z);
        self.interpolators
            .iter()
            .map(|(ion, interp)| {
                let column = 10f64.powf(interp.eval(theta.log_nh));
                (ion.to_string(), column * scaling)
            })
            .collect()
    }

    /// `log10` of the predicted column densities, in ion order.
    pub fn predict_log(&self, theta: ParameterVector) -> Vec<f64> {
        let scaling = self.metal_scaling(theta.log_z);
        self.interpolators
            .eval_all(theta.log_nh)
            .into_iter()
            .map(|log_column| (10f64.powf(log_column) * scaling).log10())
            .collect()
    }
}
