//! NetSentry — near-real-time network traffic classification pipeline.
//!
//! Modular structure:
//! - [`capture`] — Packet records and the live capture feed
//! - [`features`] — Canonical per-packet features and batch accumulation
//! - [`model`] — Pretrained classifier loading and batch inference
//! - [`stats`] — Cumulative traffic statistics and snapshots
//! - [`publish`] — Snapshot publication to the key-value/broadcast sink
//! - [`report`] — Downstream reader contract over published state

pub mod capture;
pub mod config;
pub mod features;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod stats;

pub use capture::{LiveFeed, PacketFeed, PacketRecord};
pub use config::SentinelConfig;
pub use features::{extract, BatchAccumulator, FeatureVector};
pub use logging::StructuredLogger;
pub use model::{Classifier, ClassifierInvoker, ModelSchema, OnnxClassifier, Verdict};
pub use pipeline::Pipeline;
pub use publish::{Publisher, SqliteSink, TrafficSink};
pub use report::TrafficReport;
pub use stats::{AggregateState, Snapshot};
