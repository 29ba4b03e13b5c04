//! Inference Engine - ONNX Runtime Integration
//!
//! Loads the 15 minute EV-charging model and scores fixed-length windows.
//! The model is loaded once and shared read-only by every session.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array3;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

// ============================================================================
// SCORER TRAIT
// ============================================================================

/// A stateless scoring function over one window of readings.
///
/// Implementations must be deterministic: the same window always yields the
/// same score. They are shared across threads behind an `Arc`.
pub trait WindowScorer: Send + Sync {
    /// Number of readings a window must contain
    fn window_len(&self) -> usize;

    /// Score one window; `window.len()` equals `window_len()`
    fn score(&self, window: &[f32]) -> Result<f32>;

    /// Human readable name for logs
    fn name(&self) -> &str {
        "scorer"
    }
}

/// Adapter turning a plain function into a [`WindowScorer`]
pub struct FnScorer<F> {
    window_len: usize,
    f: F,
}

impl<F> FnScorer<F>
where
    F: Fn(&[f32]) -> f32 + Send + Sync,
{
    pub fn new(window_len: usize, f: F) -> Self {
        Self { window_len, f }
    }
}

impl<F> WindowScorer for FnScorer<F>
where
    F: Fn(&[f32]) -> f32 + Send + Sync,
{
    fn window_len(&self) -> usize {
        self.window_len
    }

    fn score(&self, window: &[f32]) -> Result<f32> {
        check_window(window, self.window_len)?;
        Ok((self.f)(window))
    }

    fn name(&self) -> &str {
        "fn"
    }
}

fn check_window(window: &[f32], expected: usize) -> Result<()> {
    if window.len() != expected {
        return Err(Error::Model(format!(
            "Window has {} readings, model expects {}",
            window.len(),
            expected
        )));
    }
    Ok(())
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub window_len: usize,
    pub sha256: String,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

/// Running inference statistics
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelStats {
    pub inference_count: u64,
    pub avg_latency_ms: f32,
}

// ============================================================================
// ONNX IMPLEMENTATION
// ============================================================================

/// ONNX-backed window scorer.
///
/// The model takes a `(1, 1, window_len)` f32 tensor and emits the charging
/// probability as the first element of its first output.
pub struct OnnxModel {
    session: Mutex<Session>,
    output_name: String,
    metadata: ModelMetadata,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl OnnxModel {
    /// Load a model file, optionally verifying its SHA-256 digest first
    pub fn load(
        model_path: impl AsRef<Path>,
        window_len: usize,
        expected_sha256: Option<&str>,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        log::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(Error::ModelLoad(format!(
                "Model not found: {}",
                model_path.display()
            )));
        }

        let bytes = std::fs::read(model_path)
            .map_err(|e| Error::ModelLoad(format!("Failed to read model: {}", e)))?;

        let digest = sha256_hex(&bytes);
        if let Some(expected) = expected_sha256 {
            if !digest.eq_ignore_ascii_case(expected.trim()) {
                return Err(Error::ModelLoad(format!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    model_path.display(),
                    expected,
                    digest
                )));
            }
            log::info!("Model checksum verified");
        }

        let mut model = Self::from_bytes(&bytes, window_len)?;
        model.metadata.model_path = model_path.display().to_string();
        Ok(model)
    }

    /// Load a model from memory
    pub fn from_bytes(model_bytes: &[u8], window_len: usize) -> Result<Self> {
        if window_len == 0 {
            return Err(Error::ModelLoad("Window length must be positive".to_string()));
        }

        let session = Session::builder()
            .map_err(|e| Error::ModelLoad(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::ModelLoad(format!("Failed to set optimization: {}", e)))?
            .commit_from_memory(model_bytes)
            .map_err(|e| Error::ModelLoad(format!("Failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| Error::ModelLoad("Model defines no output".to_string()))?;

        log::info!("ONNX model loaded ({} bytes, window {})", model_bytes.len(), window_len);

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            metadata: ModelMetadata {
                model_path: "<memory>".to_string(),
                window_len,
                sha256: sha256_hex(model_bytes),
                loaded_at: chrono::Utc::now(),
            },
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn stats(&self) -> ModelStats {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        ModelStats {
            inference_count: count,
            avg_latency_ms: avg,
        }
    }
}

impl WindowScorer for OnnxModel {
    fn window_len(&self) -> usize {
        self.metadata.window_len
    }

    fn score(&self, window: &[f32]) -> Result<f32> {
        check_window(window, self.metadata.window_len)?;
        let start_time = std::time::Instant::now();

        let input_array = Array3::<f32>::from_shape_vec((1, 1, window.len()), window.to_vec())
            .map_err(|e| Error::Model(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| Error::Model(format!("Tensor error: {}", e)))?;

        let score = {
            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![input_tensor])
                .map_err(|e| Error::Model(format!("Inference failed: {}", e)))?;

            let output = outputs
                .get(&self.output_name)
                .ok_or_else(|| Error::Model("No output".to_string()))?;

            let output_tensor = output
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Model(format!("Extract error: {}", e)))?;

            output_tensor
                .1
                .first()
                .copied()
                .ok_or_else(|| Error::Model("Empty output tensor".to_string()))?
        };

        self.latency_sum_us
            .fetch_add(start_time.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        Ok(score)
    }

    fn name(&self) -> &str {
        &self.metadata.model_path
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Hex SHA-256 digest of a model file's bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
