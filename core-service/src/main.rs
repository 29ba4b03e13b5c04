//! plexflo-classify - label a meter CSV with 15 minute EV charging predictions
//!
//! Usage: `plexflo-classify <input.csv> [output-name]`
//!
//! The model is read from `PLEXFLO_MODEL_PATH` (default
//! `models/model_15min.onnx`); output goes to `output/files/`.

use anyhow::{bail, Context};

use plexflo_core::constants::{self, APP_VERSION};
use plexflo_core::logic::dataset::get_predictions_dir;
use plexflo_core::{predict_from_file, Backfill, ClassifierConfig, DatasetSink, OnnxModel};

const DEFAULT_MODEL_PATH: &str = "models/model_15min.onnx";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting plexflo-classify v{}", APP_VERSION);

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        bail!("usage: plexflo-classify <input.csv> [output-name]");
    };
    let out_name = args.next();

    let backfill = constants::parse_env::<Backfill>("PLEXFLO_BACKFILL")?.unwrap_or_default();
    let config = ClassifierConfig {
        window_len: constants::get_window_len()?,
        threshold: constants::get_threshold()?,
        backfill,
    };

    let model_path =
        std::env::var("PLEXFLO_MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string());
    let expected_sha = std::env::var("PLEXFLO_MODEL_SHA256").ok();
    let model = OnnxModel::load(&model_path, config.window_len, expected_sha.as_deref())
        .context("15 min model not available")?;

    let sink = DatasetSink::new(get_predictions_dir());
    let output = predict_from_file(&input, &model, &config, &sink, out_name.as_deref())
        .with_context(|| format!("Failed to classify {}", input))?;

    log::info!(
        "Classified {} rows in {} windows ({} charging), written to {}",
        output.table.len(),
        output.classification.windows.len(),
        output.classification.charging_windows(),
        output.path.display()
    );

    let stats = model.stats();
    log::info!(
        "Model {}: {} inferences, avg {:.2} ms",
        model.metadata().model_path,
        stats.inference_count,
        stats.avg_latency_ms
    );

    Ok(())
}
