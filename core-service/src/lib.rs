//! Plexflo datastream core
//!
//! Detects electric-vehicle charging in smart-meter power readings by
//! scoring fixed 15 minute windows with a pre-trained model.
//!
//! ```text
//!  readings ──► Session ──► classifier ──► WindowScorer (ONNX)
//!                  │             │
//!                  └─────────────┴──► DatasetSink (CSV)
//! ```

pub mod constants;
pub mod error;
pub mod logic;

pub use error::{Error, Result};
pub use logic::classifier::{classify, Backfill, Classification, ClassifierConfig, WindowResult};
pub use logic::dataset::{read_session, read_table, DatasetSink, Table};
pub use logic::model::{FnScorer, Label, OnnxModel, ThresholdConfig, WindowScorer};
pub use logic::pipeline::{classify_session, predict_from_file, predict_table, PredictionOutput};
pub use logic::session::{FinishedSession, Session, SessionId};
