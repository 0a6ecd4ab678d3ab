//! Pretrained classifier loading and batch inference.

mod invoker;
mod onnx;
mod schema;

pub use invoker::{ClassifierInvoker, Column, ColumnValues, TabularBatch};
pub use onnx::OnnxClassifier;
pub use schema::ModelSchema;

use std::path::PathBuf;
use thiserror::Error;

/// Per-element classification label, positionally aligned with its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Benign,
    Malicious,
}

/// Classifier seam: the production implementation wraps the ONNX artifact,
/// tests substitute stubs.
pub trait Classifier {
    fn predict(&self, batch: &TabularBatch) -> Result<Vec<Verdict>, ClassifyError>;
}

/// Per-batch classification failures. Any of these drops the batch; none of
/// them stops ingestion.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier rejected input: {0}")]
    InputRejected(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("classifier returned {got} labels for {expected} rows")]
    MisalignedOutput { expected: usize, got: usize },

    #[error("classifier emitted label {0}, expected 0 or 1")]
    UnknownLabel(i64),
}

/// Startup-fatal conditions: without a loadable artifact and a valid feature
/// schema no classification is possible, so the process aborts.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model artifact not found: {0}")]
    ArtifactMissing(PathBuf),

    #[error("failed to load model artifact: {0}")]
    Artifact(String),

    #[error("failed to read feature schema {path}: {reason}")]
    Schema { path: PathBuf, reason: String },

    #[error("feature schema lists no expected features")]
    EmptySchema,

    #[error("feature schema names '{0}', which is not a feature column")]
    UnknownColumn(String),
}
