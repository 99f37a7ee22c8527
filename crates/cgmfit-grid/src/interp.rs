use cgmfit_core::errors::{CgmError, ErrorInfo};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::table::GridTable;

/// Piecewise-linear interpolant of `log10(column)` against `log10(hden)`.
///
/// Queries outside the sampled range are extrapolated linearly from the two
/// nearest boundary knots; evaluation never fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLogInterpolator {
    log_hden: Vec<f64>,
    log_column: Vec<f64>,
}

impl LogLogInterpolator {
    /// Builds an interpolant from knots already in log space.
    pub fn new(log_hden: Vec<f64>, log_column: Vec<f64>) -> Result<Self, CgmError> {
        if log_hden.len() != log_column.len() {
            return Err(CgmError::Schema(
                ErrorInfo::new("interp-length-mismatch", "knot arrays differ in length")
                    .with_context("x", log_hden.len().to_string())
                    .with_context("y", log_column.len().to_string()),
            ));
        }
        if log_hden.len() < 2 {
            return Err(CgmError::Schema(
                ErrorInfo::new("interp-too-few-knots", "interpolation needs two knots")
                    .with_context("knots", log_hden.len().to_string()),
            ));
        }
        if log_hden.windows(2).any(|pair| !(pair[0] < pair[1])) {
            return Err(CgmError::Schema(ErrorInfo::new(
                "interp-unsorted",
                "knot abscissae must be strictly increasing",
            )));
        }
        if log_column.iter().chain(&log_hden).any(|value| !value.is_finite()) {
            return Err(CgmError::Schema(ErrorInfo::new(
                "interp-non-finite",
                "knots must be finite",
            )));
        }
        Ok(Self {
            log_hden,
            log_column,
        })
    }

    /// Builds an interpolant from linear densities and column densities.
    pub fn from_linear(hden: &[f64], column: &[f64]) -> Result<Self, CgmError> {
        if let Some(bad) = column.iter().find(|value| !(**value > 0.0)) {
            return Err(CgmError::Schema(
                ErrorInfo::new("interp-nonpositive-column", "column densities must be positive")
                    .with_context("value", bad.to_string())
                    .with_hint("log-log interpolation is undefined for zero columns"),
            ));
        }
        Self::new(
            hden.iter().map(|value| value.log10()).collect(),
            column.iter().map(|value| value.log10()).collect(),
        )
    }

    /// Evaluates `log10(column)` at `log_nh`.
    pub fn eval(&self, log_nh: f64) -> f64 {
        let last = self.log_hden.len() - 2;
        let segment = self
            .log_hden
            .partition_point(|&knot| knot <= log_nh)
            .saturating_sub(1)
            .min(last);
        let (x0, x1) = (self.log_hden[segment], self.log_hden[segment + 1]);
        let (y0, y1) = (self.log_column[segment], self.log_column[segment + 1]);
        let t = (log_nh - x0) / (x1 - x0);
        y0 * (1.0 - t) + y1 * t
    }

    /// Sampled `log10(hden)` range `(min, max)`.
    pub fn domain(&self) -> (f64, f64) {
        (self.log_hden[0], self.log_hden[self.log_hden.len() - 1])
    }

    /// Knots as `(log10 hden, log10 column)` pairs.
    pub fn knots(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.log_hden
            .iter()
            .copied()
            .zip(self.log_column.iter().copied())
    }
}

/// One [`LogLogInterpolator`] per ion, in a fixed ion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatorSet {
    interpolators: IndexMap<String, LogLogInterpolator>,
}

impl InterpolatorSet {
    /// Ion names in evaluation order.
    pub fn ions(&self) -> impl Iterator<Item = &str> {
        self.interpolators.keys().map(String::as_str)
    }

    /// Number of ions.
    pub fn len(&self) -> usize {
        self.interpolators.len()
    }

    /// True when no ion is tracked.
    pub fn is_empty(&self) -> bool {
        self.interpolators.is_empty()
    }

    /// Interpolant for a single ion.
    pub fn get(&self, ion: &str) -> Option<&LogLogInterpolator> {
        self.interpolators.get(ion)
    }

    /// `log10(column)` for every ion at `log_nh`, in ion order.
    pub fn eval_all(&self, log_nh: f64) -> Vec<f64> {
        self.interpolators
            .values()
            .map(|interp| interp.eval(log_nh))
            .collect()
    }

    /// Iterates `(ion, interpolant)` pairs in ion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LogLogInterpolator)> {
        self.interpolators
            .iter()
            .map(|(ion, interp)| (ion.as_str(), interp))
    }
}

/// Fits one log-log interpolant per requested ion.
pub fn build_interpolator(grid: &GridTable, ions: &[String]) -> Result<InterpolatorSet, CgmError> {
    if ions.is_empty() {
        return Err(CgmError::schema(
            "interp-no-ions",
            "at least one ion is required to build interpolators",
        ));
    }
    grid.require_ions(ions)?;
    let mut interpolators = IndexMap::with_capacity(ions.len());
    for ion in ions {
        if interpolators.contains_key(ion) {
            return Err(CgmError::Schema(
                ErrorInfo::new("interp-duplicate-ion", "ion requested more than once")
                    .with_context("ion", ion.clone()),
            ));
        }
        let column = grid.column(ion).unwrap_or_default();
        let interp = LogLogInterpolator::from_linear(grid.hden(), column).map_err(|err| match err {
            CgmError::Schema(info) => CgmError::Schema(info.with_context("ion", ion.clone())),
            other => other,
        })?;
        interpolators.insert(ion.clone(), interp);
    }
    Ok(InterpolatorSet { interpolators })
}
