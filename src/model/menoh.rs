use ndarray::Array4;
use std::path;

use tracing::{debug, info};

use super::{fill_input, fill_row, FeatureExtractor, Features, SequenceModel};
use crate::config::{Config, Layout};
use crate::error::ModelError;

const EXTRACTOR: &'static str = "feature extractor";
const SEQUENCE_MODEL: &'static str = "sequence model";

fn unavailable(model: &'static str) -> impl Fn(menoh::Error) -> ModelError {
    move |err| ModelError::Unavailable {
        model,
        reason: err.to_string(),
    }
}

/// Xception-style ONNX graph cut at its global average pooling layer.
pub struct MenohFeatureExtractor {
    model: menoh::Model,
    input: String,
    output: String,
    layout: Layout,
}

impl MenohFeatureExtractor {
    pub fn from_onnx<P>(path: P, config: &Config) -> Result<Self, ModelError>
    where
        P: AsRef<path::Path>,
    {
        let size = config.image_size;
        let dims = match config.extractor.layout {
            Layout::Nchw => [1, 3, size, size],
            Layout::Nhwc => [1, size, size, 3],
        };
        let model = menoh::Builder::from_onnx(&path)
            .and_then(|b| b.add_input::<f32>(&config.extractor.input, &dims))
            .and_then(|b| b.add_output(&config.extractor.output))
            .and_then(|b| b.build(&config.backend, &config.backend_config))
            .map_err(unavailable(EXTRACTOR))?;
        info!(path = %path.as_ref().display(), ?dims, "loaded feature extractor");

        Ok(Self {
            model,
            input: config.extractor.input.clone(),
            output: config.extractor.output.clone(),
            layout: config.extractor.layout,
        })
    }
}

impl FeatureExtractor for MenohFeatureExtractor {
    fn extract(&mut self, image: &Array4<f32>) -> Result<Features, ModelError> {
        {
            let (dims, in_) = self
                .model
                .get_variable_mut::<f32>(&self.input)
                .map_err(unavailable(EXTRACTOR))?;
            fill_input(EXTRACTOR, in_, &dims, image, self.layout)?;
        }
        self.model.run().map_err(unavailable(EXTRACTOR))?;

        let (_, out) = self
            .model
            .get_variable::<f32>(&self.output)
            .map_err(unavailable(EXTRACTOR))?;
        debug!(len = out.len(), "extracted features");
        Ok(Features::new(out.to_vec()))
    }
}

/// Caption model taking the image embedding and a padded id window.
pub struct MenohSequenceModel {
    model: menoh::Model,
    features_input: String,
    sequence_input: String,
    output: String,
}

impl MenohSequenceModel {
    pub fn from_onnx<P>(path: P, config: &Config) -> Result<Self, ModelError>
    where
        P: AsRef<path::Path>,
    {
        let names = &config.sequence_model;
        let model = menoh::Builder::from_onnx(&path)
            .and_then(|b| b.add_input::<f32>(&names.features_input, &[1, names.feature_dim]))
            .and_then(|b| b.add_input::<f32>(&names.sequence_input, &[1, config.max_length]))
            .and_then(|b| b.add_output(&names.output))
            .and_then(|b| b.build(&config.backend, &config.backend_config))
            .map_err(unavailable(SEQUENCE_MODEL))?;
        info!(path = %path.as_ref().display(), "loaded sequence model");

        Ok(Self {
            model,
            features_input: names.features_input.clone(),
            sequence_input: names.sequence_input.clone(),
            output: names.output.clone(),
        })
    }
}

impl SequenceModel for MenohSequenceModel {
    fn predict(&mut self, features: &Features, sequence: &[usize]) -> Result<Vec<f32>, ModelError> {
        {
            let (dims, in_) = self
                .model
                .get_variable_mut::<f32>(&self.features_input)
                .map_err(unavailable(SEQUENCE_MODEL))?;
            fill_row(SEQUENCE_MODEL, in_, &dims, features.as_slice().iter().copied())?;
        }
        {
            let (dims, in_) = self
                .model
                .get_variable_mut::<f32>(&self.sequence_input)
                .map_err(unavailable(SEQUENCE_MODEL))?;
            fill_row(SEQUENCE_MODEL, in_, &dims, sequence.iter().map(|&id| id as f32))?;
        }
        self.model.run().map_err(unavailable(SEQUENCE_MODEL))?;

        let (_, out) = self
            .model
            .get_variable::<f32>(&self.output)
            .map_err(unavailable(SEQUENCE_MODEL))?;
        Ok(out.to_vec())
    }
}
