use std::path;

use ndarray::Array4;
use tracing::{debug, info};

use crate::config::Config;
use crate::decoder::{Caption, GreedyDecoder};
use crate::error::{CaptionError, StartupError};
use crate::model::{FeatureExtractor, SequenceModel};
use crate::preprocess;
use crate::vocab::Vocabulary;

/// Owns the loaded models and vocabulary for the life of the process and runs
/// one image at a time through preparation, extraction and decoding.
pub struct Captioner {
    extractor: Box<dyn FeatureExtractor>,
    model: Box<dyn SequenceModel>,
    vocab: Vocabulary,
    config: Config,
}

impl Captioner {
    pub fn new(
        extractor: Box<dyn FeatureExtractor>,
        model: Box<dyn SequenceModel>,
        vocab: Vocabulary,
        config: Config,
    ) -> Self {
        Self {
            extractor,
            model,
            vocab,
            config,
        }
    }

    /// Loads every artifact named by `config` with the Menoh backend.
    #[cfg(feature = "menoh")]
    pub fn from_config(config: Config) -> Result<Self, StartupError> {
        use crate::model::menoh::{MenohFeatureExtractor, MenohSequenceModel};

        config.validate()?;
        for artifact in &[&config.tokenizer_path, &config.model_path, &config.extractor_path] {
            require(artifact)?;
        }

        let vocab = Vocabulary::load(&config.tokenizer_path)?;
        let model = MenohSequenceModel::from_onnx(&config.model_path, &config)?;
        let extractor = MenohFeatureExtractor::from_onnx(&config.extractor_path, &config)?;
        info!(backend = %config.backend, "captioner ready");

        Ok(Self::new(Box::new(extractor), Box::new(model), vocab, config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn caption_bytes(&mut self, buffer: &[u8]) -> Result<Caption, CaptionError> {
        let image = preprocess::prepare_bytes(buffer, self.config.image_size)?;
        self.caption_tensor(&image)
    }

    pub fn caption_path<P>(&mut self, path: P) -> Result<Caption, CaptionError>
    where
        P: AsRef<path::Path>,
    {
        let image = preprocess::prepare_path(path, self.config.image_size)?;
        self.caption_tensor(&image)
    }

    fn caption_tensor(&mut self, image: &Array4<f32>) -> Result<Caption, CaptionError> {
        let features = self.extractor.extract(image)?;
        debug!(dim = features.len(), "image embedded");

        let decoder = GreedyDecoder::new(
            &self.vocab,
            self.config.max_length,
            &self.config.markers.start,
            &self.config.markers.end,
        );
        let caption = decoder.decode(&mut *self.model, &features)?;
        info!(caption = %caption, termination = ?caption.termination(), "caption generated");
        Ok(caption)
    }
}

/// Fails early with the path instead of a backend-specific message.
pub fn require(path: &path::Path) -> Result<(), StartupError> {
    if path.exists() {
        Ok(())
    } else {
        Err(StartupError::ArtifactNotFound(path.to_path_buf()))
    }
}
