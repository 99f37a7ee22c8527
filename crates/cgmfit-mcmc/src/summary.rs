use cgmfit_core::errors::{CgmError, ErrorInfo};
use cgmfit_core::ParameterVector;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::chain::FlatSamples;

/// Percentiles reported for every parameter.
pub const SUMMARY_QUANTILES: [f64; 3] = [0.16, 0.50, 0.84];

/// Median with asymmetric one-sigma uncertainties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    /// 50th percentile.
    pub median: f64,
    /// `median - p16`.
    pub lower: f64,
    /// `p84 - median`.
    pub upper: f64,
}

impl ParameterSummary {
    /// The 16th and 84th percentiles.
    pub fn interval(&self) -> (f64, f64) {
        (self.median - self.lower, self.median + self.upper)
    }
}

/// Per-parameter summaries keyed by parameter label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    /// Number of samples summarised.
    pub samples: usize,
    /// Summaries in parameter order (`log_nH`, `log_Z`).
    pub parameters: IndexMap<String, ParameterSummary>,
}

impl PosteriorSummary {
    /// Summary of a parameter by label.
    pub fn get(&self, label: &str) -> Option<&ParameterSummary> {
        self.parameters.get(label)
    }
}

/// Summarises flattened samples by their 16th, 50th and 84th percentiles.
pub fn summarize(samples: &FlatSamples) -> Result<PosteriorSummary, CgmError> {
    if samples.is_empty() {
        return Err(CgmError::Chain(ErrorInfo::new(
            "summary-empty",
            "no samples to summarise",
        )));
    }
    let mut parameters = IndexMap::new();
    for (param, label) in ParameterVector::LABELS.iter().enumerate() {
        let mut values = samples.column(param);
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(CgmError::Chain(
                ErrorInfo::new("summary-non-finite", "sample is not finite")
                    .with_context("parameter", *label)
                    .with_context("sample", index.to_string()),
            ));
        }
        values.sort_by(f64::total_cmp);
        let [p16, p50, p84] = SUMMARY_QUANTILES.map(|q| percentile(&values, q));
        parameters.insert(
            (*label).to_string(),
            ParameterSummary {
                median: p50,
                lower: p50 - p16,
                upper: p84 - p50,
            },
        );
    }
    Ok(PosteriorSummary {
        samples: samples.len(),
        parameters,
    })
}

/// Linearly interpolated percentile of sorted `values`, `quantile` in `[0, 1]`.
pub fn percentile(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let position = quantile.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        values[lower]
    } else {
        let weight = position - lower as f64;
        values[lower] * (1.0 - weight) + values[upper] * weight
    }
}
