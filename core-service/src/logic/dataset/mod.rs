//! Dataset Module - CSV persistence for sessions and predictions
//!
//! Ingestion records hold one `values` row per reading. Classified tables
//! keep their input columns and gain an `EV` label column.

pub mod reader;
pub mod record;
pub mod writer;


use std::path::PathBuf;

pub use reader::read_table;
pub use record::Table;
pub use writer::{read_session, DatasetSink};

/// Default directory for classified files (`output/files` under the working directory)
pub fn get_predictions_dir() -> PathBuf {
    PathBuf::from("output").join("files")
}
