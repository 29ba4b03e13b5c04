//! Plexflo connect - telemetry ingestion server
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      PLEXFLO INGEST                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   spawn    ┌──────────────────────────────┐  │
//! │  │  Acceptor  │──────────► │  Collector (1 per client)    │  │
//! │  │ (listener) │  JoinSet   │  read -> decode -> buffer    │  │
//! │  └─────┬──────┘            └──────────────┬───────────────┘  │
//! │        │ cancel                           │ end-of-stream    │
//! │  ┌─────┴──────┐            ┌──────────────▼───────────────┐  │
//! │  │  Shutdown  │            │  Classifier (ONNX, optional) │  │
//! │  │ controller │            │  -> DatasetSink (CSV)        │  │
//! │  └────────────┘            └──────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod collector;
pub mod config;
pub mod server;

pub use collector::{CollectorConfig, ErrorPolicy, Framing, HandlerContext};
pub use config::Config;
pub use server::{DrainPolicy, ServeSummary, Server, ShutdownController};
