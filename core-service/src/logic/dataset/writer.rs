use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::constants::{LABEL_COLUMN, VALUES_COLUMN};
use crate::error::{Error, Result};
use crate::logic::classifier::WindowResult;
use crate::logic::dataset::record::Table;
use crate::logic::model::Label;
use crate::logic::session::FinishedSession;

/// Writes finished sessions and classified tables as CSV records
#[derive(Debug, Clone)]
pub struct DatasetSink {
    base_dir: PathBuf,
}

impl DatasetSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir).map_err(|e| {
            Error::Persistence(format!(
                "Failed to create output directory {}: {}",
                self.base_dir.display(),
                e
            ))
        })
    }

    /// Persist a session under its `<ip>_<port>_<timestamp>.csv` name.
    ///
    /// One `values` row per reading in arrival order; an `EV` column is
    /// added when labels are given (blank for unlabeled readings).
    pub fn write_session(
        &self,
        session: FinishedSession,
        labels: Option<&[Option<Label>]>,
    ) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.base_dir.join(session.id().record_name());

        if let Some(labels) = labels {
            if labels.len() != session.len() {
                return Err(Error::Persistence(format!(
                    "Label count {} does not match reading count {}",
                    labels.len(),
                    session.len()
                )));
            }
        }

        let mut writer = csv::Writer::from_path(&path)?;
        match labels {
            Some(labels) => {
                writer.write_record([VALUES_COLUMN, LABEL_COLUMN])?;
                for (value, label) in session.readings().iter().zip(labels) {
                    writer.write_record([value.as_str(), label_cell(*label).as_str()])?;
                }
            }
            None => {
                writer.write_record([VALUES_COLUMN])?;
                for value in session.readings() {
                    writer.write_record([value.as_str()])?;
                }
            }
        }
        writer.flush()?;

        log::info!(
            "Session {} saved to {} ({} rows)",
            session.id(),
            path.display(),
            session.len()
        );
        Ok(path)
    }

    /// Persist a classified table: input columns plus the `EV` column
    pub fn write_classified(
        &self,
        table: &Table,
        labels: &[Option<Label>],
        file_name: &str,
    ) -> Result<PathBuf> {
        if labels.len() != table.len() {
            return Err(Error::Persistence(format!(
                "Label count {} does not match row count {}",
                labels.len(),
                table.len()
            )));
        }

        self.ensure_dir()?;
        let path = self.base_dir.join(file_name);

        let mut writer = csv::Writer::from_path(&path)?;

        let mut header = table.headers.clone();
        header.push(LABEL_COLUMN.to_string());
        writer.write_record(&header)?;

        for (row, label) in table.rows.iter().zip(labels) {
            let mut record = row.clone();
            record.push(label_cell(*label));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        log::info!("Predictions saved to {}", path.display());
        Ok(path)
    }

    /// Write one JSON line per scored window (start, end, score, label)
    pub fn write_window_log(&self, file_name: &str, windows: &[WindowResult]) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.base_dir.join(file_name);

        let mut writer = BufWriter::new(File::create(&path)?);
        for window in windows {
            let json = serde_json::to_string(window)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        log::debug!("Window scores saved to {}", path.display());
        Ok(path)
    }
}

fn label_cell(label: Option<Label>) -> String {
    label.map(|l| l.to_string()).unwrap_or_default()
}

/// Reload the `values` column of an ingestion record
pub fn read_session(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;

    let idx = reader
        .headers()?
        .iter()
        .position(|h| h == VALUES_COLUMN)
        .ok_or_else(|| {
            Error::Validation(format!(
                "{} has no '{}' column",
                path.as_ref().display(),
                VALUES_COLUMN
            ))
        })?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        values.push(record.get(idx).unwrap_or("").to_string());
    }
    Ok(values)
}
