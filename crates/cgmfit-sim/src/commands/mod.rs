pub mod density;
pub mod fit;
pub mod predict;
pub mod version;

/// Splits a comma-separated ion list, dropping blanks.
pub fn parse_ions(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|ion| !ion.is_empty())
        .map(str::to_string)
        .collect()
}
