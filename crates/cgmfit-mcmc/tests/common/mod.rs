#![allow(dead_code)]

use std::fs;
use std::path::Path;

use cgmfit_core::ParameterVector;
use cgmfit_grid::{ForwardModel, GridTable, Observation, DEFAULT_REFERENCE_LOG_METAL};
use cgmfit_mcmc::{BoxPrior, CloudPosterior, GaussianLikelihood, Posterior, PriorBounds};
use indexmap::IndexMap;

pub const IONS: [&str; 3] = ["C+3", "Si+3", "O+5"];
pub const SLOPES: [f64; 3] = [-0.3, 0.5, -1.2];
pub const LOG_HDEN: [f64; 9] = [-6.0, -5.5, -5.0, -4.5, -4.0, -3.5, -3.0, -2.5, -2.0];
pub const HDEN_TEXT: [&str; 9] = [
    "1e-6", "3.1622776601683795e-6", "1e-5", "3.1622776601683795e-5", "1e-4",
    "3.1622776601683794e-4", "1e-3", "3.1622776601683794e-3", "1e-2",
];

pub fn ions() -> Vec<String> {
    IONS.iter().map(|s| s.to_string()).collect()
}

/// log10 column of `ion_idx` at the grid metallicity.
pub fn log_column(ion_idx: usize, log_hden: f64) -> f64 {
    13.0 + SLOPES[ion_idx] * (log_hden + 4.0)
}

/// Power-law grid: every ion is a straight line in log-log space.
pub fn power_law_grid() -> GridTable {
    let hden: Vec<f64> = HDEN_TEXT.iter().map(|s| s.parse().unwrap()).collect();
    let mut columns = IndexMap::new();
    for (idx, ion) in IONS.iter().enumerate() {
        let values = LOG_HDEN
            .iter()
            .map(|&x| 10f64.powf(log_column(idx, x)))
            .collect();
        columns.insert(ion.to_string(), values);
    }
    GridTable::from_columns(hden, columns).unwrap()
}

pub fn write_power_law_grid(path: &Path) {
    let mut text = format!("hden,{}\n", IONS.join(","));
    for (row, hden) in HDEN_TEXT.iter().enumerate() {
        let cells: Vec<String> = (0..IONS.len())
            .map(|idx| format!("{:e}", 10f64.powf(log_column(idx, LOG_HDEN[row]))))
            .collect();
        text.push_str(&format!("{},{}\n", hden, cells.join(",")));
    }
    fs::write(path, text).unwrap();
}

pub fn forward_model() -> ForwardModel {
    ForwardModel::from_grid(&power_law_grid(), &ions(), DEFAULT_REFERENCE_LOG_METAL).unwrap()
}

pub fn theta_true() -> ParameterVector {
    ParameterVector::new(-4.0, -1.0)
}

pub fn synthetic_posterior(sigma: f64) -> CloudPosterior {
    let model = forward_model();
    let observation = Observation::from_prediction(&model, theta_true(), sigma).unwrap();
    let likelihood = GaussianLikelihood::new(model, &observation).unwrap();
    Posterior::new(BoxPrior::new(PriorBounds::default()).unwrap(), likelihood)
}
