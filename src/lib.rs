//! Image captioning on Menoh: an image is prepared, embedded by a pretrained
//! CNN and captioned by greedy decoding over a pretrained sequence model.

pub mod config;
pub mod decoder;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod server;
pub mod vocab;

pub use config::Config;
pub use decoder::{Caption, GreedyDecoder, Termination};
pub use error::{CaptionError, ModelError, StartupError, VocabularyError};
pub use pipeline::Captioner;
pub use vocab::Vocabulary;
