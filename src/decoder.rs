use std::fmt;

use tracing::debug;

use crate::error::ModelError;
use crate::model::{Features, SequenceModel};
use crate::vocab::{pad_sequence, Vocabulary};

/// Why decoding stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    EndMarker,
    /// The model predicted an id with no word.
    UnknownId(usize),
    MaxLength,
}

/// Generated tokens, start marker first.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    tokens: Vec<String>,
    termination: Termination,
}

impl Caption {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Index of the first largest value. NaN never wins, unlike numpy's argmax
/// which returns the first NaN.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Single-path greedy decoding over a fixed vocabulary.
pub struct GreedyDecoder<'a> {
    vocab: &'a Vocabulary,
    max_length: usize,
    start: &'a str,
    end: &'a str,
}

impl<'a> GreedyDecoder<'a> {
    pub fn new(vocab: &'a Vocabulary, max_length: usize, start: &'a str, end: &'a str) -> Self {
        Self {
            vocab,
            max_length,
            start,
            end,
        }
    }

    /// Runs at most `max_length` model steps. An unusable distribution is an
    /// error; an id outside the vocabulary ends the caption.
    pub fn decode<M>(&self, model: &mut M, features: &Features) -> Result<Caption, ModelError>
    where
        M: SequenceModel + ?Sized,
    {
        let mut tokens = vec![self.start.to_string()];

        for step in 0..self.max_length {
            let ids = self.vocab.encode(&tokens.join(" "));
            let sequence = pad_sequence(&ids, self.max_length);
            let distribution = model.predict(features, &sequence)?;
            let id = argmax(&distribution).ok_or_else(|| {
                ModelError::UnusableOutput(format!(
                    "no comparable score among {} values",
                    distribution.len()
                ))
            })?;

            let word = match self.vocab.word(id) {
                Some(word) => word,
                None => {
                    debug!(step, id, "predicted id has no word");
                    return Ok(Caption {
                        tokens,
                        termination: Termination::UnknownId(id),
                    });
                }
            };
            debug!(step, id, word, "predicted word");
            tokens.push(word.to_string());

            if word == self.end {
                return Ok(Caption {
                    tokens,
                    termination: Termination::EndMarker,
                });
            }
        }

        Ok(Caption {
            tokens,
            termination: Termination::MaxLength,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays scripted predictions and records what it was asked.
    struct ScriptedModel {
        script: Vec<usize>,
        vocab_size: usize,
        calls: Vec<Vec<usize>>,
    }

    impl ScriptedModel {
        fn new(script: Vec<usize>) -> Self {
            Self {
                script,
                vocab_size: 8,
                calls: Vec::new(),
            }
        }
    }

    impl SequenceModel for ScriptedModel {
        fn predict(&mut self, _: &Features, sequence: &[usize]) -> Result<Vec<f32>, ModelError> {
            let step = self.calls.len();
            self.calls.push(sequence.to_vec());
            let id = self.script[step.min(self.script.len() - 1)];
            let mut out = vec![0.0; self.vocab_size.max(id + 1)];
            out[id] = 1.0;
            Ok(out)
        }
    }

    struct FailingModel;

    impl SequenceModel for FailingModel {
        fn predict(&mut self, _: &Features, _: &[usize]) -> Result<Vec<f32>, ModelError> {
            Err(ModelError::Unavailable {
                model: "sequence model",
                reason: "backend gone".to_string(),
            })
        }
    }

    fn vocab() -> Vocabulary {
        Vocabulary::from_word_index(
            vec![("start", 1), ("end", 2), ("a", 3), ("dog", 4), ("runs", 5)]
                .into_iter()
                .map(|(w, i)| (w.to_string(), i)),
        )
    }

    fn features() -> Features {
        Features::new(vec![0.5; 4])
    }

    #[test]
    fn test_end_on_first_step() {
        let vocab = vocab();
        let decoder = GreedyDecoder::new(&vocab, 32, "start", "end");
        let mut model = ScriptedModel::new(vec![2]);

        let caption = decoder.decode(&mut model, &features()).unwrap();
        assert_eq!(caption.text(), "start end");
        assert_eq!(caption.termination(), Termination::EndMarker);
        assert_eq!(model.calls.len(), 1);
    }

    #[test]
    fn test_full_caption_includes_markers() {
        let vocab = vocab();
        let decoder = GreedyDecoder::new(&vocab, 32, "start", "end");
        let mut model = ScriptedModel::new(vec![3, 4, 5, 2]);

        let caption = decoder.decode(&mut model, &features()).unwrap();
        assert_eq!(caption.to_string(), "start a dog runs end");
        assert_eq!(caption.tokens()[0], "start");
        assert_eq!(model.calls.len(), 4);
    }

    #[test]
    fn test_halts_at_max_length() {
        let vocab = vocab();
        let decoder = GreedyDecoder::new(&vocab, 5, "start", "end");
        let mut model = ScriptedModel::new(vec![4]);

        let caption = decoder.decode(&mut model, &features()).unwrap();
        assert_eq!(caption.termination(), Termination::MaxLength);
        assert_eq!(model.calls.len(), 5);
        assert_eq!(caption.tokens().len(), 6);
        assert_ne!(caption.tokens().last().map(String::as_str), Some("end"));
    }

    #[test]
    fn test_unknown_id_stops_without_appending() {
        let vocab = vocab();
        let decoder = GreedyDecoder::new(&vocab, 32, "start", "end");
        let mut model = ScriptedModel::new(vec![3, 7, 4]);

        let caption = decoder.decode(&mut model, &features()).unwrap();
        assert_eq!(caption.text(), "start a");
        assert_eq!(caption.termination(), Termination::UnknownId(7));
        assert_eq!(model.calls.len(), 2);
    }

    #[test]
    fn test_padding_id_is_unknown() {
        let vocab = vocab();
        let decoder = GreedyDecoder::new(&vocab, 32, "start", "end");
        let mut model = ScriptedModel::new(vec![0]);

        let caption = decoder.decode(&mut model, &features()).unwrap();
        assert_eq!(caption.text(), "start");
        assert_eq!(caption.termination(), Termination::UnknownId(0));
    }

    #[test]
    fn test_model_sees_left_padded_window() {
        let vocab = vocab();
        let decoder = GreedyDecoder::new(&vocab, 4, "start", "end");
        let mut model = ScriptedModel::new(vec![3, 4, 5, 5]);

        decoder.decode(&mut model, &features()).unwrap();
        assert_eq!(model.calls[0], vec![0, 0, 0, 1]);
        assert_eq!(model.calls[1], vec![0, 0, 1, 3]);
        assert_eq!(model.calls[2], vec![0, 1, 3, 4]);
        assert_eq!(model.calls[3], vec![1, 3, 4, 5]);
    }

    #[test]
    fn test_model_error_propagates() {
        let vocab = vocab();
        let decoder = GreedyDecoder::new(&vocab, 32, "start", "end");

        match decoder.decode(&mut FailingModel, &features()) {
            Err(ModelError::Unavailable { reason, .. }) => assert_eq!(reason, "backend gone"),
            other => panic!("Expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_distribution_is_unusable() {
        struct EmptyModel;
        impl SequenceModel for EmptyModel {
            fn predict(&mut self, _: &Features, _: &[usize]) -> Result<Vec<f32>, ModelError> {
                Ok(Vec::new())
            }
        }

        let vocab = vocab();
        let decoder = GreedyDecoder::new(&vocab, 32, "start", "end");
        assert!(matches!(
            decoder.decode(&mut EmptyModel, &features()),
            Err(ModelError::UnusableOutput(_))
        ));
    }

    #[test]
    fn test_argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 0.3, 0.2]), Some(1));
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), Some(1));
        assert_eq!(argmax(&[f32::NAN]), None);
        assert_eq!(argmax(&[]), None);
    }
}
