//! Prediction pipeline - ties tabular input, classifier and sink together

use std::path::{Path, PathBuf};

use crate::constants::{default_predictions_name, GRID_COLUMN};
use crate::error::Result;
use crate::logic::classifier::{classify, Classification, ClassifierConfig};
use crate::logic::dataset::{read_table, DatasetSink, Table};
use crate::logic::model::WindowScorer;
use crate::logic::session::FinishedSession;

/// Result of classifying a file
#[derive(Debug, Clone)]
pub struct PredictionOutput {
    pub table: Table,
    pub classification: Classification,
    pub path: PathBuf,
}

/// Classify the `grid` column of a table.
///
/// Empty tables, a missing or non-numeric column and tables shorter than one
/// window are rejected before the scorer runs.
pub fn predict_table(
    table: &Table,
    scorer: &dyn WindowScorer,
    config: &ClassifierConfig,
) -> Result<Classification> {
    let series = table.numeric_column(GRID_COLUMN)?;
    classify(&series, scorer, config)
}

/// Read a CSV file, classify it and write the labeled copy through `sink`.
///
/// The output is named `out_name` when given, otherwise after the window
/// duration (`predictions_15_min.csv` for 900 readings).
pub fn predict_from_file(
    path: impl AsRef<Path>,
    scorer: &dyn WindowScorer,
    config: &ClassifierConfig,
    sink: &DatasetSink,
    out_name: Option<&str>,
) -> Result<PredictionOutput> {
    let table = read_table(path.as_ref())?;

    log::info!(
        "Predicting {} min EV values for {}",
        config.window_len / 60,
        path.as_ref().display()
    );
    let classification = predict_table(&table, scorer, config)?;

    let file_name = out_name
        .map(str::to_string)
        .unwrap_or_else(|| default_predictions_name(config.window_len));
    let out_path = sink.write_classified(&table, &classification.labels, &file_name)?;
    sink.write_window_log(&window_log_name(&file_name), &classification.windows)?;

    Ok(PredictionOutput {
        table,
        classification,
        path: out_path,
    })
}

/// `predictions_15_min.csv` -> `predictions_15_min.windows.jsonl`
fn window_log_name(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
    format!("{}.windows.jsonl", stem)
}

/// Classify a finished ingestion session
pub fn classify_session(
    session: &FinishedSession,
    scorer: &dyn WindowScorer,
    config: &ClassifierConfig,
) -> Result<Classification> {
    let series = session.values()?;
    classify(&series, scorer, config)
}
