use std::fmt;

use serde::{Deserialize, Serialize};

/// Point in the two-dimensional fit space `(log nH, log Z)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    /// Base-10 logarithm of the hydrogen number density (cm^-3).
    pub log_nh: f64,
    /// Base-10 logarithm of the metallicity relative to solar.
    pub log_z: f64,
}

impl ParameterVector {
    /// Number of fitted parameters.
    pub const DIM: usize = 2;
    /// Column labels used for samples, summaries and CSV headers.
    pub const LABELS: [&'static str; 2] = ["log_nH", "log_Z"];

    /// Creates a parameter vector from its components.
    pub const fn new(log_nh: f64, log_z: f64) -> Self {
        Self { log_nh, log_z }
    }

    /// Builds a parameter vector from `[log_nh, log_z]`.
    pub fn from_array(values: [f64; 2]) -> Self {
        Self::new(values[0], values[1])
    }

    /// Returns the components as `[log_nh, log_z]`.
    pub fn to_array(self) -> [f64; 2] {
        [self.log_nh, self.log_z]
    }

    /// Component by index, `0 => log_nh`, `1 => log_z`.
    pub fn get(&self, index: usize) -> Option<f64> {
        match index {
            0 => Some(self.log_nh),
            1 => Some(self.log_z),
            _ => None,
        }
    }

    /// True when both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.log_nh.is_finite() && self.log_z.is_finite()
    }

    /// Stretch-move point `anchor + z * (self - anchor)`.
    pub fn stretch_from(self, anchor: ParameterVector, z: f64) -> Self {
        Self {
            log_nh: anchor.log_nh + z * (self.log_nh - anchor.log_nh),
            log_z: anchor.log_z + z * (self.log_z - anchor.log_z),
        }
    }
}

impl fmt::Display for ParameterVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(log_nH={:.4}, log_Z={:.4})", self.log_nh, self.log_z)
    }
}

impl From<[f64; 2]> for ParameterVector {
    fn from(values: [f64; 2]) -> Self {
        Self::from_array(values)
    }
}
