use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logic::session::parse_scalar;

/// A loaded tabular dataset: lowercased headers plus raw cell text
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Extract a numeric column. Null cells become zero; any other
    /// non-numeric cell rejects the whole column.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f32>> {
        if self.is_empty() {
            return Err(Error::Validation("Table is empty".to_string()));
        }

        let idx = self.column_index(name).ok_or_else(|| {
            Error::Validation(format!("Column named '{}' not found in the table", name))
        })?;

        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                let cell = cells.get(idx).map(String::as_str).unwrap_or("");
                parse_scalar(cell).ok_or_else(|| {
                    Error::Validation(format!(
                        "Column '{}' must be numeric, row {} holds {:?}",
                        name, row, cell
                    ))
                })
            })
            .collect()
    }
}
