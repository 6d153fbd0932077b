use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use jieba_rs::Jieba;

use crate::config::Config;

/// Term segmentation contract. Implementations must return terms in source
/// order and behave as a pure function of the input sentence: the facade
/// caches responses by raw query string, so build-time and query-time
/// segmentation have to agree.
pub trait Tokenizer: Send + Sync {
    fn cut(&self, sentence: &str) -> Vec<String>;
}

/// jieba-based segmenter for mixed CJK/Latin text, with an optional user
/// dictionary and stop-word list. The stop-word set lives here, not in the
/// index: downstream consumers never re-check membership.
pub struct JiebaTokenizer {
    jieba: Jieba,
    stop_words: HashSet<String>,
}

impl JiebaTokenizer {
    pub fn new() -> Self {
        Self { jieba: Jieba::new(), stop_words: HashSet::new() }
    }

    /// Build from config: `stop_word_path` (one word per line) and
    /// `user_dict_path` (jieba dict format). A missing file degrades to the
    /// bundled dictionary with no stop words.
    pub fn from_config(config: &Config) -> Self {
        let mut tokenizer = Self::new();
        if let Some(path) = config.get("user_dict_path") {
            match File::open(path) {
                Ok(f) => {
                    let mut reader = BufReader::new(f);
                    if let Err(err) = tokenizer.jieba.load_dict(&mut reader) {
                        tracing::error!(path, %err, "failed to load user dictionary");
                    }
                }
                Err(err) => tracing::error!(path, %err, "cannot open user dictionary"),
            }
        }
        if let Some(path) = config.get("stop_word_path") {
            tokenizer.load_stop_words(path);
        }
        tokenizer
    }

    pub fn load_stop_words<P: AsRef<Path>>(&mut self, path: P) {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(err) => {
                tracing::error!(path = %path.display(), %err, "cannot open stop words file");
                return;
            }
        };
        for line in BufReader::new(file).lines().map_while(Result::ok) {
            let word = line.trim();
            if !word.is_empty() {
                self.stop_words.insert(word.to_string());
            }
        }
        tracing::info!(count = self.stop_words.len(), "loaded stop words");
    }
}

impl Default for JiebaTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for JiebaTokenizer {
    fn cut(&self, sentence: &str) -> Vec<String> {
        self.jieba
            .cut_for_search(sentence, true)
            .into_iter()
            .filter(|word| {
                let trimmed = word.trim();
                !trimmed.is_empty() && !self.stop_words.contains(trimmed)
            })
            .map(|word| word.to_string())
            .collect()
    }
}
