use std::fs::File;
use std::path::Path;

use cgmfit_core::errors::{CgmError, ErrorInfo};
use cgmfit_core::ParameterVector;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::forward::ForwardModel;
use crate::table::GridTable;

/// Observed column density of one ion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IonMeasurement {
    /// Linear column density (cm^-2).
    pub column: f64,
    /// One-sigma uncertainty on `log10(column)` in dex.
    pub sigma: f64,
}

impl IonMeasurement {
    /// Creates a measurement from a linear column and its dex uncertainty.
    pub const fn new(column: f64, sigma: f64) -> Self {
        Self { column, sigma }
    }

    /// `log10` of the measured column.
    pub fn log_column(&self) -> f64 {
        self.column.log10()
    }
}

/// Row layout of measured observation CSV files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Ion name in spectroscopic notation (e.g. `C+3`).
    pub ion: String,
    /// Linear column density.
    pub column: f64,
    /// Uncertainty in dex.
    pub sigma: f64,
}

/// Observed (or synthetic) column densities keyed by ion.
///
/// Every entry carries a finite positive column and a finite positive
/// uncertainty; this is enforced at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    entries: IndexMap<String, IonMeasurement>,
}

impl Observation {
    /// Validates and stores measurements.
    pub fn new<I>(entries: I) -> Result<Self, CgmError>
    where
        I: IntoIterator<Item = (String, IonMeasurement)>,
    {
        let mut stored = IndexMap::new();
        for (ion, measurement) in entries {
            if !(measurement.sigma.is_finite() && measurement.sigma > 0.0) {
                return Err(CgmError::Observation(
                    ErrorInfo::new("observation-sigma", "uncertainty must be finite and positive")
                        .with_context("ion", ion)
                        .with_context("sigma", measurement.sigma.to_string()),
                ));
            }
            if !(measurement.column.is_finite() && measurement.column > 0.0) {
                return Err(CgmError::Observation(
                    ErrorInfo::new("observation-column", "column density must be finite and positive")
                        .with_context("ion", ion)
                        .with_context("column", measurement.column.to_string()),
                ));
            }
            if stored.contains_key(&ion) {
                return Err(CgmError::Observation(
                    ErrorInfo::new("observation-duplicate-ion", "ion measured more than once")
                        .with_context("ion", ion),
                ));
            }
            stored.insert(ion, measurement);
        }
        if stored.is_empty() {
            return Err(CgmError::Observation(ErrorInfo::new(
                "observation-empty",
                "observation holds no ions",
            )));
        }
        Ok(Self { entries: stored })
    }

    /// Builds an observation from `(ion, column, sigma)` triples.
    pub fn from_triples<I, S>(triples: I) -> Result<Self, CgmError>
    where
        I: IntoIterator<Item = (S, f64, f64)>,
        S: Into<String>,
    {
        Self::new(
            triples
                .into_iter()
                .map(|(ion, column, sigma)| (ion.into(), IonMeasurement::new(column, sigma))),
        )
    }

    /// Synthetic "true" observation taken from the grid row at `reference_hden`.
    pub fn from_grid_row(
        grid: &GridTable,
        ions: &[String],
        reference_hden: f64,
        sigma: f64,
    ) -> Result<Self, CgmError> {
        let row = grid.row_at_density(reference_hden, ions)?;
        Self::new(
            row.into_iter()
                .map(|(ion, column)| (ion, IonMeasurement::new(column, sigma))),
        )
    }

    /// Synthetic observation predicted by `model` at `theta`.
    pub fn from_prediction(
        model: &ForwardModel,
        theta: ParameterVector,
        sigma: f64,
    ) -> Result<Self, CgmError> {
        Self::new(
            model
                .predict(theta)
                .into_iter()
                .map(|(ion, column)| (ion, IonMeasurement::new(column, sigma))),
        )
    }

    /// Loads measurements from a CSV with `ion,column,sigma` columns.
    pub fn load_csv(path: &Path) -> Result<Self, CgmError> {
        let file = File::open(path).map_err(|err| CgmError::io("observation-open", path, err))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(file);
        let mut records = Vec::new();
        for record in reader.deserialize::<ObservationRecord>() {
            let record = record.map_err(|err| {
                CgmError::Schema(
                    ErrorInfo::new("observation-record", "malformed observation row")
                        .with_context("path", path.display().to_string())
                        .with_hint(err.to_string()),
                )
            })?;
            records.push((record.ion, record.column, record.sigma));
        }
        Self::from_triples(records)
    }

    /// Fails with a schema error naming the first ion not measured.
    pub fn require_ions(&self, ions: &[String]) -> Result<(), CgmError> {
        match ions.iter().find(|ion| !self.entries.contains_key(ion.as_str())) {
            Some(ion) => Err(CgmError::Schema(
                ErrorInfo::new("observation-missing-ion", "ion not present in observation")
                    .with_context("ion", ion.clone()),
            )),
            None => Ok(()),
        }
    }

    /// Measurement for a single ion.
    pub fn get(&self, ion: &str) -> Option<&IonMeasurement> {
        self.entries.get(ion)
    }

    /// Measured ions in insertion order.
    pub fn ions(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of measured ions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the observation holds no ions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(ion, measurement)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IonMeasurement)> {
        self.entries.iter().map(|(ion, m)| (ion.as_str(), m))
    }

    /// Measurements for `ions`, in that order.
    pub fn select<'a, I>(&self, ions: I) -> Result<Vec<IonMeasurement>, CgmError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        ions.into_iter()
            .map(|ion| {
                self.entries.get(ion).copied().ok_or_else(|| {
                    CgmError::Schema(
                        ErrorInfo::new("observation-missing-ion", "ion not present in observation")
                            .with_context("ion", ion),
                    )
                })
            })
            .collect()
    }
}
