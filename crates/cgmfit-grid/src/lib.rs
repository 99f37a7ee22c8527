#![deny(missing_docs)]
#![doc = "Photoionization model grids: table loading, log-log interpolation, forward modelling and observations."]

/// Linear metallicity-scaled forward model.
pub mod forward;
/// Per-ion log-log interpolation over the density axis.
pub mod interp;
pub mod lsf;
/// Observed and synthetic column-density sets.
pub mod observation;
/// Grid table loading and validation.
pub mod table;

pub use forward::{ForwardModel, DEFAULT_REFERENCE_LOG_METAL};
pub use interp::{build_interpolator, InterpolatorSet, LogLogInterpolator};
pub use lsf::{find_density, DensityScan};
pub use observation::{IonMeasurement, Observation, ObservationRecord};
pub use table::{GridTable, DENSITY_COLUMN};
