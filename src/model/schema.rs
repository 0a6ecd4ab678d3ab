//! Feature schema sidecar exported alongside the model artifact: the ordered
//! column list the model was trained on, plus the categorical levels seen at
//! training time.

use super::ModelLoadError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Ordered column names the model expects, fixed for the process lifetime.
    pub expected_features: Vec<String>,
    /// Training-time levels per categorical column, in training order.
    #[serde(default)]
    pub categorical_levels: HashMap<String, Vec<String>>,
}

impl ModelSchema {
    /// Load the JSON sidecar. Missing or unreadable schema is startup-fatal.
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ModelLoadError::Schema {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let schema: Self = serde_json::from_str(&raw).map_err(|e| ModelLoadError::Schema {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if schema.expected_features.is_empty() {
            return Err(ModelLoadError::EmptySchema);
        }
        Ok(schema)
    }

    /// Numeric code for a categorical value: trained level index + 1, so an
    /// unseen value encodes as 0 rather than colliding with a trained level.
    pub fn level_code(&self, column: &str, value: &str) -> f32 {
        self.categorical_levels
            .get(column)
            .and_then(|levels| levels.iter().position(|v| v == value))
            .map(|i| (i + 1) as f32)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_file_is_fatal() {
        let err = ModelSchema::load(Path::new("nonexistent.json"));
        assert!(matches!(err, Err(ModelLoadError::Schema { .. })));
    }

    #[test]
    fn level_code_distinguishes_unseen() {
        let mut levels = HashMap::new();
        levels.insert(
            "protocol".to_string(),
            vec!["TCP".to_string(), "UDP".to_string()],
        );
        let schema = ModelSchema {
            expected_features: vec!["protocol".to_string()],
            categorical_levels: levels,
        };
        assert_eq!(schema.level_code("protocol", "TCP"), 1.0);
        assert_eq!(schema.level_code("protocol", "UDP"), 2.0);
        assert_eq!(schema.level_code("protocol", "SCTP"), 0.0);
        assert_eq!(schema.level_code("flags", "ACK"), 0.0);
    }
}
