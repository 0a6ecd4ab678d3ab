//! ONNX Runtime classifier. Input: [rows, columns] f32 with categorical
//! columns encoded through the schema's training-time levels. Output: one
//! {0,1} label per row, either as i64 class labels or as probabilities.

use super::{
    Classifier, ClassifyError, ColumnValues, ModelLoadError, ModelSchema, TabularBatch, Verdict,
};
use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

pub struct OnnxClassifier {
    session: Mutex<Session>,
    output_name: String,
    schema: ModelSchema,
}

impl OnnxClassifier {
    /// Load the artifact. A missing or unreadable artifact is startup-fatal:
    /// without it no valid classification is possible.
    pub fn load(path: &Path, schema: ModelSchema) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::ArtifactMissing(path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| ModelLoadError::Artifact(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelLoadError::Artifact(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| ModelLoadError::Artifact(e.to_string()))?;

        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .unwrap_or_else(|| "output".to_string());

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            schema,
        })
    }

    /// Encode the tabular batch as a dense [rows, columns] f32 matrix.
    fn encode(&self, batch: &TabularBatch) -> Result<Array2<f32>, ClassifyError> {
        let rows = batch.rows();
        let cols = batch.columns().len();
        let mut data = vec![0.0f32; rows * cols];

        for (c, column) in batch.columns().iter().enumerate() {
            match &column.values {
                ColumnValues::Numeric(values) => {
                    for (r, v) in values.iter().enumerate() {
                        data[r * cols + c] = *v as f32;
                    }
                }
                ColumnValues::Categorical(values) => {
                    for (r, v) in values.iter().enumerate() {
                        data[r * cols + c] = self.schema.level_code(&column.name, v);
                    }
                }
            }
        }

        Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| ClassifyError::InputRejected(e.to_string()))
    }
}

/// Map raw i64 class labels to verdicts; anything outside {0,1} is malformed.
fn labels_to_verdicts(labels: &[i64]) -> Result<Vec<Verdict>, ClassifyError> {
    labels
        .iter()
        .map(|&label| match label {
            0 => Ok(Verdict::Benign),
            1 => Ok(Verdict::Malicious),
            other => Err(ClassifyError::UnknownLabel(other)),
        })
        .collect()
}

/// Map probability outputs to verdicts: [rows] or [rows,1] is p(malicious);
/// [rows,2] is per-class, column 1 being p(malicious).
fn probabilities_to_verdicts(probs: &[f32], rows: usize) -> Result<Vec<Verdict>, ClassifyError> {
    let malicious_prob = |r: usize| -> Option<f32> {
        if probs.len() == rows {
            probs.get(r).copied()
        } else if probs.len() == rows * 2 {
            probs.get(r * 2 + 1).copied()
        } else {
            None
        }
    };

    (0..rows)
        .map(|r| {
            malicious_prob(r)
                .map(|p| {
                    if p >= 0.5 {
                        Verdict::Malicious
                    } else {
                        Verdict::Benign
                    }
                })
                .ok_or(ClassifyError::MisalignedOutput {
                    expected: rows,
                    got: probs.len(),
                })
        })
        .collect()
}

impl Classifier for OnnxClassifier {
    fn predict(&self, batch: &TabularBatch) -> Result<Vec<Verdict>, ClassifyError> {
        let rows = batch.rows();
        if rows == 0 {
            return Ok(Vec::new());
        }

        let input_array = self.encode(batch)?;
        let input = Value::from_array(input_array)
            .map_err(|e| ClassifyError::InputRejected(e.to_string()))?;

        let mut session = self.session.lock().expect("lock");
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| ClassifyError::Inference("model produced no output".to_string()))?;

        if let Ok((_, labels)) = output.try_extract_tensor::<i64>() {
            if labels.len() != rows {
                return Err(ClassifyError::MisalignedOutput {
                    expected: rows,
                    got: labels.len(),
                });
            }
            return labels_to_verdicts(labels);
        }

        let (_, probs) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;
        probabilities_to_verdicts(probs, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_artifact_is_fatal() {
        let schema = ModelSchema {
            expected_features: vec!["src_ip".to_string()],
            categorical_levels: HashMap::new(),
        };
        let err = OnnxClassifier::load(Path::new("nonexistent.onnx"), schema);
        assert!(matches!(err, Err(ModelLoadError::ArtifactMissing(_))));
    }

    #[test]
    fn label_mapping_rejects_out_of_domain() {
        assert_eq!(
            labels_to_verdicts(&[0, 1, 0]).unwrap(),
            vec![Verdict::Benign, Verdict::Malicious, Verdict::Benign]
        );
        assert!(matches!(
            labels_to_verdicts(&[0, 2]),
            Err(ClassifyError::UnknownLabel(2))
        ));
    }

    #[test]
    fn probability_shapes() {
        // [rows]
        assert_eq!(
            probabilities_to_verdicts(&[0.2, 0.9], 2).unwrap(),
            vec![Verdict::Benign, Verdict::Malicious]
        );
        // [rows, 2], column 1 = p(malicious)
        assert_eq!(
            probabilities_to_verdicts(&[0.8, 0.2, 0.1, 0.9], 2).unwrap(),
            vec![Verdict::Benign, Verdict::Malicious]
        );
        // anything else is misaligned
        assert!(matches!(
            probabilities_to_verdicts(&[0.5; 3], 2),
            Err(ClassifyError::MisalignedOutput { .. })
        ));
    }
}
