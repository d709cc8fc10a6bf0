use std::collections::HashMap;
use std::fs;
use std::path;

use serde_json::Value;
use tracing::info;

use crate::error::VocabularyError;

/// Characters a Keras `Tokenizer` strips from text before splitting it.
const FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// Id reserved for padding. No word maps to it.
pub const PADDING_ID: usize = 0;

/// Word <-> id mapping of the sequence model.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    word_index: HashMap<String, usize>,
    index_word: HashMap<usize, String>,
    num_words: Option<usize>,
}

impl Vocabulary {
    /// Builds the mapping and its reverse index. When two words share an id
    /// the first one wins the reverse lookup.
    pub fn from_word_index<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, usize)>,
    {
        let mut word_index = HashMap::new();
        let mut index_word = HashMap::new();
        for (word, id) in entries {
            index_word.entry(id).or_insert_with(|| word.clone());
            word_index.insert(word, id);
        }
        Self {
            word_index,
            index_word,
            num_words: None,
        }
    }

    /// Keeps only ids below `num_words` when encoding, like a tokenizer
    /// fitted with a `num_words` limit. Reverse lookup is unaffected.
    pub fn with_num_words(mut self, num_words: Option<usize>) -> Self {
        self.num_words = num_words;
        self
    }

    /// Loads a vocabulary file. `.txt` files hold one word per line, the word
    /// on line `n` getting id `n + 1`. Anything else is read as JSON: either a
    /// Keras tokenizer export or a bare `{"word": id}` object.
    pub fn load<P>(path: P) -> Result<Self, VocabularyError>
    where
        P: AsRef<path::Path>,
    {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_text = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("txt"));

        let vocab = if is_text {
            Self::from_lines(&content)
        } else {
            Self::from_json(&content, path)?
        };
        info!(path = %path.display(), words = vocab.len(), "loaded vocabulary");
        Ok(vocab)
    }

    fn from_lines(content: &str) -> Self {
        Self::from_word_index(
            content
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(i, line)| (line.trim().to_string(), i + 1)),
        )
    }

    fn from_json(content: &str, path: &path::Path) -> Result<Self, VocabularyError> {
        let json_err = |source| VocabularyError::Json {
            path: path.to_path_buf(),
            source,
        };
        let root: Value = serde_json::from_str(content).map_err(json_err)?;

        let exported = root.pointer("/config/word_index").cloned();
        let num_words = root
            .pointer("/config/num_words")
            .and_then(Value::as_u64)
            .map(|n| n as usize);
        let has_config = root.get("config").is_some();

        let word_index = match exported {
            // tokenizer.to_json() stores the index as a nested JSON string
            Some(Value::String(nested)) => serde_json::from_str(&nested).map_err(json_err)?,
            Some(index) => index,
            None if !has_config => root,
            None => {
                return Err(VocabularyError::MissingWordIndex {
                    path: path.to_path_buf(),
                })
            }
        };

        let map = match word_index {
            Value::Object(map) => map,
            _ => {
                return Err(VocabularyError::MissingWordIndex {
                    path: path.to_path_buf(),
                })
            }
        };

        let mut entries = Vec::with_capacity(map.len());
        for (word, id) in map {
            match id.as_u64() {
                Some(id) if id as usize != PADDING_ID => entries.push((word, id as usize)),
                _ => {
                    return Err(VocabularyError::InvalidId {
                        path: path.to_path_buf(),
                        word,
                    })
                }
            }
        }
        Ok(Self::from_word_index(entries).with_num_words(num_words))
    }

    pub fn len(&self) -> usize {
        self.word_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_index.is_empty()
    }

    pub fn id(&self, word: &str) -> Option<usize> {
        self.word_index.get(word).copied()
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.index_word.get(&id).map(String::as_str)
    }

    /// Converts text to ids the way a Keras tokenizer does: lower-cased,
    /// punctuation stripped, split on whitespace, unknown words and ids at or
    /// above `num_words` skipped.
    pub fn encode(&self, text: &str) -> Vec<usize> {
        let normalized: String = text
            .to_lowercase()
            .chars()
            .map(|c| if FILTERS.contains(c) { ' ' } else { c })
            .collect();
        normalized
            .split(' ')
            .filter(|w| !w.is_empty())
            .filter_map(|w| self.id(w))
            .filter(|&id| self.num_words.map_or(true, |n| id < n))
            .collect()
    }
}

/// Left-pads `ids` with [`PADDING_ID`] to `max_length`, or keeps only the last
/// `max_length` ids if there are more.
pub fn pad_sequence(ids: &[usize], max_length: usize) -> Vec<usize> {
    if ids.len() >= max_length {
        return ids[ids.len() - max_length..].to_vec();
    }
    let mut padded = vec![PADDING_ID; max_length - ids.len()];
    padded.extend_from_slice(ids);
    padded
}
