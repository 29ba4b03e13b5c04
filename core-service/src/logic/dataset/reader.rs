use std::path::Path;

use crate::error::{Error, Result};
use crate::logic::dataset::record::Table;

/// Load a tabular dataset from disk.
///
/// Only `.csv` is supported. Header names are lowercased so column lookups
/// are case-insensitive.
pub fn read_table(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(Error::Validation(format!(
            "File extension not supported: {} (expected .csv)",
            path.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        Error::Validation(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Validation(format!("Failed to read header: {}", e)))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| Error::Validation(format!("Malformed row: {}", e)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    log::debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(Table::new(headers, rows))
}
