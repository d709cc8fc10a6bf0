use std::io;
use std::path;

use thiserror::Error;

/// Failure of an external model, either while it was being built or while it
/// was running.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("{model} unavailable: {reason}")]
    Unavailable { model: &'static str, reason: String },

    #[error("{model} input shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        model: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("unusable model output: {0}")]
    UnusableOutput(String),
}

/// Failure of a single caption request.
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("Couldn't open image! Make sure the image path and extension are correct. ({0})")]
    Decode(#[from] image::ImageError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl CaptionError {
    /// Whether the failure is the user's input rather than the models.
    pub fn is_decode(&self) -> bool {
        match self {
            CaptionError::Decode(_) => true,
            CaptionError::Model(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum VocabularyError {
    #[error("cannot read vocabulary {}: {source}", .path.display())]
    Io {
        path: path::PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse vocabulary {}: {source}", .path.display())]
    Json {
        path: path::PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("vocabulary {} has no word index", .path.display())]
    MissingWordIndex { path: path::PathBuf },

    #[error("vocabulary {}: id for {word:?} is not a positive integer", .path.display())]
    InvalidId { path: path::PathBuf, word: String },
}

/// Anything that stops the process before it can serve a caption.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("cannot read config {}: {source}", .path.display())]
    ConfigIo {
        path: path::PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse config {}: {source}", .path.display())]
    ConfigParse {
        path: path::PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("artifact not found: {}", .0.display())]
    ArtifactNotFound(path::PathBuf),

    #[error("cannot listen on {address}: {reason}")]
    Bind { address: String, reason: String },

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_message() {
        let err = CaptionError::from(image::ImageError::IoError(io::Error::new(
            io::ErrorKind::InvalidData,
            "garbage",
        )));
        assert!(err.is_decode());
        assert!(err.to_string().starts_with("Couldn't open image!"));
    }

    #[test]
    fn test_model_error_is_not_decode() {
        let err = CaptionError::from(ModelError::UnusableOutput("empty".to_string()));
        assert!(!err.is_decode());
        assert_eq!(err.to_string(), "unusable model output: empty");
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = ModelError::ShapeMismatch {
            model: "feature extractor",
            expected: vec![1, 3, 299, 299],
            got: vec![1, 3, 224, 224],
        };
        assert_eq!(
            err.to_string(),
            "feature extractor input shape mismatch: expected [1, 3, 299, 299], got [1, 3, 224, 224]"
        );
    }

    #[test]
    fn test_startup_error_wraps_vocabulary() {
        let err = StartupError::from(VocabularyError::MissingWordIndex {
            path: "tokenizer.json".into(),
        });
        assert_eq!(err.to_string(), "vocabulary tokenizer.json has no word index");
    }
}
