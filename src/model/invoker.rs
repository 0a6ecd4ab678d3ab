//! Formats sealed batches against the model's fixed expected-column schema
//! and invokes the classifier, with the output alignment check.

use super::{Classifier, ClassifyError, ModelLoadError, Verdict};
use crate::features::{is_feature_column, FeatureVector, NUMERIC_COLUMNS};

/// Column-major tabular view of one batch, in expected-column order.
pub struct TabularBatch {
    columns: Vec<Column>,
    rows: usize,
}

pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

pub enum ColumnValues {
    Numeric(Vec<i64>),
    Categorical(Vec<String>),
}

impl TabularBatch {
    /// Coerce a batch into tabular form: numeric columns to integers (absent
    /// value → 0), categorical columns to strings (absent → "UNKNOWN").
    pub fn from_features(expected: &[String], batch: &[FeatureVector]) -> Self {
        let columns = expected
            .iter()
            .map(|name| {
                let values = if NUMERIC_COLUMNS.contains(&name.as_str()) {
                    ColumnValues::Numeric(
                        batch
                            .iter()
                            .map(|fv| fv.numeric(name).unwrap_or(0))
                            .collect(),
                    )
                } else {
                    ColumnValues::Categorical(
                        batch
                            .iter()
                            .map(|fv| {
                                fv.categorical(name).unwrap_or("UNKNOWN").to_string()
                            })
                            .collect(),
                    )
                };
                Column {
                    name: name.clone(),
                    values,
                }
            })
            .collect();
        Self {
            columns,
            rows: batch.len(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

/// Owns the classifier and its expected-column list for the pipeline lifetime.
pub struct ClassifierInvoker<C> {
    classifier: C,
    expected_columns: Vec<String>,
}

impl<C: Classifier> ClassifierInvoker<C> {
    /// Validates at startup that every expected column is a feature column;
    /// a violation here is fatal, not a per-batch condition.
    pub fn new(classifier: C, expected_columns: Vec<String>) -> Result<Self, ModelLoadError> {
        if expected_columns.is_empty() {
            return Err(ModelLoadError::EmptySchema);
        }
        for column in &expected_columns {
            if !is_feature_column(column) {
                return Err(ModelLoadError::UnknownColumn(column.clone()));
            }
        }
        Ok(Self {
            classifier,
            expected_columns,
        })
    }

    /// Classify one sealed batch. Any error means the whole batch is dropped
    /// by the caller; results are guaranteed positionally aligned on success.
    pub fn classify(&self, batch: &[FeatureVector]) -> Result<Vec<Verdict>, ClassifyError> {
        let table = TabularBatch::from_features(&self.expected_columns, batch);
        let verdicts = self.classifier.predict(&table)?;
        if verdicts.len() != batch.len() {
            return Err(ClassifyError::MisalignedOutput {
                expected: batch.len(),
                got: verdicts.len(),
            });
        }
        Ok(verdicts)
    }

    pub fn expected_columns(&self) -> &[String] {
        &self.expected_columns
    }
}
