//! Logic Module - classification engine and persistence
//!
//! - `model/` - scoring functions (ONNX, threshold)
//! - `classifier/` - windowing and label back-fill
//! - `dataset/` - CSV reader and sink
//! - `session` - per-connection reading buffers
//! - `pipeline` - file and session prediction entry points

pub mod classifier;
pub mod dataset;
pub mod model;
pub mod pipeline;
pub mod session;
