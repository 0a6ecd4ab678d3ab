//! Pipeline configuration: JSON file if present, defaults otherwise.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Data directory (sink store)
    pub data_dir: PathBuf,
    /// Capture interface settings
    pub capture: CaptureConfig,
    /// Batch threshold
    pub batch: BatchConfig,
    /// Classifier artifact paths
    pub model: ModelConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Interface to capture on
    pub interface: String,
    pub promiscuous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of packets per classified batch
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX classifier artifact
    pub artifact_path: PathBuf,
    /// Path to the expected-features schema sidecar
    pub schema_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".netsentry"),
            capture: CaptureConfig::default(),
            batch: BatchConfig::default(),
            model: ModelConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: "eth0".to_string(),
            promiscuous: false,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { size: 2 }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("model/traffic_classifier.onnx"),
            schema_path: PathBuf::from("model/expected_features.json"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl SentinelConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<SentinelConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }
}
