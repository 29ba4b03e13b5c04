//! Model Module - scoring functions for charging detection
//!
//! Keeps inference separate from the windowing logic so the scorer can be
//! swapped (ONNX model, plain function in tests).

pub mod inference;
pub mod threshold;

// Re-export common types
pub use inference::{FnScorer, ModelMetadata, ModelStats, OnnxModel, WindowScorer};
pub use threshold::{Label, ThresholdConfig};
