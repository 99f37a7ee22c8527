use std::fs::File;
use std::io::Read;
use std::path::Path;

use cgmfit_core::errors::{CgmError, ErrorInfo};
use csv::ReaderBuilder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Name of the linear hydrogen density column in grid tables.
pub const DENSITY_COLUMN: &str = "hden";

/// Column-density predictions sampled along the hydrogen density axis at a
/// fixed reference metallicity.
///
/// Rows are kept sorted by strictly increasing `hden`; the table is immutable
/// once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridTable {
    hden: Vec<f64>,
    columns: IndexMap<String, Vec<f64>>,
}

impl GridTable {
    /// Builds a grid from a density axis and per-ion columns.
    ///
    /// Rows are reordered by density. Fails when fewer than two rows exist,
    /// when densities repeat or are not positive, or when a column length
    /// disagrees with the density axis.
    pub fn from_columns(
        hden: Vec<f64>,
        columns: IndexMap<String, Vec<f64>>,
    ) -> Result<Self, CgmError> {
        if hden.len() < 2 {
            return Err(CgmError::Schema(
                ErrorInfo::new("grid-too-few-rows", "grid needs at least two density samples")
                    .with_context("rows", hden.len().to_string()),
            ));
        }
        if let Some(bad) = hden.iter().find(|value| !(value.is_finite() && **value > 0.0)) {
            return Err(CgmError::Schema(
                ErrorInfo::new("grid-bad-density", "densities must be finite and positive")
                    .with_context("hden", bad.to_string()),
            ));
        }
        for (ion, values) in &columns {
            if values.len() != hden.len() {
                return Err(CgmError::Schema(
                    ErrorInfo::new("grid-ragged-column", "column length differs from density axis")
                        .with_context("ion", ion.clone())
                        .with_context("expected", hden.len().to_string())
                        .with_context("found", values.len().to_string()),
                ));
            }
        }

        let mut order: Vec<usize> = (0..hden.len()).collect();
        order.sort_by(|&a, &b| hden[a].total_cmp(&hden[b]));
        let sorted_hden: Vec<f64> = order.iter().map(|&idx| hden[idx]).collect();
        if let Some(pair) = sorted_hden.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(CgmError::Schema(
                ErrorInfo::new("grid-duplicate-density", "density samples must be distinct")
                    .with_context("hden", pair[0].to_string()),
            ));
        }
        let columns = columns
            .into_iter()
            .map(|(ion, values)| {
                let sorted = order.iter().map(|&idx| values[idx]).collect();
                (ion, sorted)
            })
            .collect();

        Ok(Self {
            hden: sorted_hden,
            columns,
        })
    }

    /// Loads a CSV grid table, requiring the density column and every ion in
    /// `ions`.
    ///
    /// With an empty `ions` list every fully numeric column is kept; otherwise
    /// only the requested ions are retained.
    pub fn load(path: &Path, ions: &[String]) -> Result<Self, CgmError> {
        let file = File::open(path).map_err(|err| CgmError::io("grid-open", path, err))?;
        Self::from_reader(file, ions).map_err(|err| match err {
            CgmError::Schema(info) => {
                CgmError::Schema(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Parses a CSV grid table from any reader. See [`GridTable::load`].
    pub fn from_reader<R: Read>(reader: R, ions: &[String]) -> Result<Self, CgmError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|err| wrap_csv("grid-header", err))?
            .iter()
            .map(str::to_string)
            .collect();

        let density_index = headers
            .iter()
            .position(|name| name == DENSITY_COLUMN)
            .ok_or_else(|| {
                CgmError::Schema(
                    ErrorInfo::new("grid-missing-density", "grid has no density column")
                        .with_context("column", DENSITY_COLUMN),
                )
            })?;
        for ion in ions {
            if !headers.iter().any(|name| name == ion) {
                return Err(missing_ion(ion));
            }
        }

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record.map_err(|err| wrap_csv("grid-record", err))?;
            for (idx, cell) in record.iter().enumerate().take(headers.len()) {
                raw[idx].push(cell.to_string());
            }
        }

        let hden = parse_column(DENSITY_COLUMN, &raw[density_index])?;
        let mut columns = IndexMap::new();
        if ions.is_empty() {
            for (idx, name) in headers.iter().enumerate() {
                if idx == density_index {
                    continue;
                }
                match parse_column(name, &raw[idx]) {
                    Ok(values) => {
                        columns.insert(name.clone(), values);
                    }
                    Err(_) => tracing::debug!(column = %name, "skipping non-numeric grid column"),
                }
            }
        } else {
            for ion in ions {
                let idx = headers
                    .iter()
                    .position(|name| name == ion)
                    .ok_or_else(|| missing_ion(ion))?;
                columns.insert(ion.clone(), parse_column(ion, &raw[idx])?);
            }
        }
        Self::from_columns(hden, columns)
    }

    /// Number of density samples.
    pub fn rows(&self) -> usize {
        self.hden.len()
    }

    /// Linear hydrogen densities in increasing order.
    pub fn hden(&self) -> &[f64] {
        &self.hden
    }

    /// Column densities for `ion`, aligned with [`GridTable::hden`].
    pub fn column(&self, ion: &str) -> Option<&[f64]> {
        self.columns.get(ion).map(Vec::as_slice)
    }

    /// Ion names present in the table, in column order.
    pub fn ions(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Fails with a schema error naming the first ion absent from the grid.
    pub fn require_ions(&self, ions: &[String]) -> Result<(), CgmError> {
        match ions.iter().find(|ion| !self.columns.contains_key(ion.as_str())) {
            Some(ion) => Err(missing_ion(ion)),
            None => Ok(()),
        }
    }

    /// Returns the row whose density equals `hden` exactly, restricted to `ions`.
    pub fn row_at_density(
        &self,
        hden: f64,
        ions: &[String],
    ) -> Result<IndexMap<String, f64>, CgmError> {
        self.require_ions(ions)?;
        let row = self
            .hden
            .iter()
            .position(|&value| value == hden)
            .ok_or_else(|| {
                CgmError::Schema(
                    ErrorInfo::new("grid-missing-row", "no grid row at the requested density")
                        .with_context("hden", hden.to_string())
                        .with_hint("the reference density must be one of the sampled grid values"),
                )
            })?;
        Ok(ions
            .iter()
            .map(|ion| (ion.clone(), self.columns[ion.as_str()][row]))
            .collect())
    }

    /// Stable SHA-256 digest of the table contents.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for value in &self.hden {
            hasher.update(value.to_le_bytes());
        }
        for (ion, values) in &self.columns {
            hasher.update(ion.as_bytes());
            for value in values {
                hasher.update(value.to_le_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

fn parse_column(name: &str, cells: &[String]) -> Result<Vec<f64>, CgmError> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            cell.parse::<f64>().map_err(|err| {
                CgmError::Schema(
                    ErrorInfo::new("grid-non-numeric", "grid cell is not a number")
                        .with_context("column", name)
                        .with_context("row", row.to_string())
                        .with_hint(err.to_string()),
                )
            })
        })
        .collect()
}

fn missing_ion(ion: &str) -> CgmError {
    CgmError::Schema(
        ErrorInfo::new("grid-missing-ion", "requested ion column is absent").with_context("ion", ion),
    )
}

fn wrap_csv(code: &str, err: csv::Error) -> CgmError {
    CgmError::Serde(ErrorInfo::new(code, "CSV grid failure").with_hint(err.to_string()))
}
