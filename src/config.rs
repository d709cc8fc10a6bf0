use std::fs;
use std::path;

use serde_derive::Deserialize;

use crate::error::StartupError;

/// Runtime configuration. Every field has a default so a config file only
/// needs to name what differs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tokenizer_path: path::PathBuf,
    pub model_path: path::PathBuf,
    pub extractor_path: path::PathBuf,
    pub max_length: usize,
    pub image_size: usize,
    pub backend: String,
    pub backend_config: String,
    pub extractor: ExtractorConfig,
    pub sequence_model: SequenceModelConfig,
    pub markers: Markers,
    pub server: ServerConfig,
    pub display: DisplayConfig,
}

/// Variable names of the feature extractor graph.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub input: String,
    pub output: String,
    pub layout: Layout,
}

/// Memory layout the feature extractor expects for its image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Nchw,
    Nhwc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SequenceModelConfig {
    pub features_input: String,
    pub sequence_input: String,
    pub output: String,
    pub feature_dim: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Markers {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
}

/// Static figures shown next to every caption. They describe the model's
/// training run and are not computed from the current inference.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub accuracy: String,
    pub loss: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tokenizer_path: "tokenizer.json".into(),
            model_path: "model.onnx".into(),
            extractor_path: "xception.onnx".into(),
            max_length: 32,
            image_size: 299,
            backend: "mkldnn".to_string(),
            backend_config: String::new(),
            extractor: ExtractorConfig::default(),
            sequence_model: SequenceModelConfig::default(),
            markers: Markers::default(),
            server: ServerConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            input: "input".to_string(),
            output: "pooled".to_string(),
            layout: Layout::Nchw,
        }
    }
}

impl Default for SequenceModelConfig {
    fn default() -> Self {
        Self {
            features_input: "features".to_string(),
            sequence_input: "sequence".to_string(),
            output: "probabilities".to_string(),
            feature_dim: 2048,
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            start: "start".to_string(),
            end: "end".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8501".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            accuracy: "89%".to_string(),
            loss: "0.08".to_string(),
        }
    }
}

impl Config {
    /// Reads a YAML config file.
    pub fn from_file<P>(path: P) -> Result<Self, StartupError>
    where
        P: AsRef<path::Path>,
    {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| StartupError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| StartupError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), StartupError> {
        let invalid = |msg: &str| Err(StartupError::InvalidConfig(msg.to_string()));
        if self.max_length == 0 {
            return invalid("max_length must be positive");
        }
        if self.image_size == 0 {
            return invalid("image_size must be positive");
        }
        if self.sequence_model.feature_dim == 0 {
            return invalid("sequence_model.feature_dim must be positive");
        }
        if self.markers.start.is_empty() || self.markers.end.is_empty() {
            return invalid("markers must not be empty");
        }
        if self.markers.start == self.markers.end {
            return invalid("start and end markers must differ");
        }
        Ok(())
    }
}
