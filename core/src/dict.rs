use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::charsplit::split_chars;
use crate::document::Document;
use crate::tokenizer::Tokenizer;

/// Corpus-wide term frequencies plus a per-character posting of words,
/// feeding the keyword recommender. Immutable once built or loaded.
#[derive(Debug, Default)]
pub struct Dictionary {
    dict: HashMap<String, u64>,
    char_index: HashMap<String, BTreeSet<String>>,
}

impl Dictionary {
    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    pub fn frequency(&self, word: &str) -> u64 {
        self.dict.get(word).copied().unwrap_or(0)
    }

    pub fn words(&self) -> impl Iterator<Item = (&str, u64)> {
        self.dict.iter().map(|(w, f)| (w.as_str(), *f))
    }

    /// Aggregate term frequencies across the surviving pages, then build
    /// the character index.
    pub fn build(&mut self, pages: &[Document]) {
        for page in pages {
            for (word, freq) in &page.terms {
                *self.dict.entry(word.clone()).or_insert(0) += *freq as u64;
            }
        }
        tracing::info!(words = self.dict.len(), "built dictionary");
        self.build_index();
    }

    /// Build the dictionary from a plain-text corpus, one line at a time.
    pub fn build_from_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        tokenizer: &dyn Tokenizer,
    ) -> Result<()> {
        let text = fs::read_to_string(path.as_ref())
            .with_context(|| format!("cannot open file: {}", path.as_ref().display()))?;

        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            for word in tokenizer.cut(line) {
                *self.dict.entry(word).or_insert(0) += 1;
            }
        }
        tracing::info!(words = self.dict.len(), "built dictionary");
        self.build_index();
        Ok(())
    }

    /// Index every word under each of its code-point units.
    pub fn build_index(&mut self) {
        for word in self.dict.keys() {
            for unit in split_chars(word) {
                self.char_index
                    .entry(unit.to_string())
                    .or_insert_with(BTreeSet::new)
                    .insert(word.clone());
            }
        }
        tracing::info!(chars = self.char_index.len(), "built character index");
    }

    /// Words containing the first unit of `prefix`, filtered so that every
    /// remaining unit occurs somewhere in the word, ordered by corpus
    /// frequency. Tail units are matched anywhere, not as a prefix.
    pub fn get_candidates(&self, prefix: &str) -> Vec<String> {
        let units = split_chars(prefix);
        let Some(first) = units.first() else {
            return Vec::new();
        };
        let Some(seed) = self.char_index.get(*first) else {
            return Vec::new();
        };

        let mut candidates: Vec<String> = seed
            .iter()
            .filter(|word| units[1..].iter().all(|unit| word.contains(unit)))
            .cloned()
            .collect();

        candidates.sort_by(|a, b| self.frequency(b).cmp(&self.frequency(a)));
        candidates
    }

    /// One `word freq` line per entry, most frequent first.
    pub fn store_dict<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("cannot create dict file: {}", path.as_ref().display()))?;
        let mut out = BufWriter::new(file);

        let mut entries: Vec<(&String, &u64)> = self.dict.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (word, freq) in entries {
            writeln!(out, "{} {}", word, freq)?;
        }
        out.flush()?;

        tracing::info!(words = self.dict.len(), "stored dictionary");
        Ok(())
    }

    /// One `char word1 word2 …` line per character.
    pub fn store_index<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).with_context(|| {
            format!("cannot create char index file: {}", path.as_ref().display())
        })?;
        let mut out = BufWriter::new(file);

        let mut chars: Vec<&String> = self.char_index.keys().collect();
        chars.sort();
        for ch in chars {
            write!(out, "{}", ch)?;
            for word in &self.char_index[ch] {
                write!(out, " {}", word)?;
            }
            writeln!(out)?;
        }
        out.flush()?;

        tracing::info!(chars = self.char_index.len(), "stored character index");
        Ok(())
    }

    pub fn load_dict<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())
            .with_context(|| format!("cannot open dict file: {}", path.as_ref().display()))?;

        let mut dict = HashMap::new();
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            let (Some(word), Some(freq)) = (parts.next(), parts.next()) else { continue };
            if let Ok(freq) = freq.parse::<u64>() {
                dict.insert(word.to_string(), freq);
            }
        }

        tracing::info!(words = dict.len(), "loaded dictionary");
        Ok(Self { dict, char_index: HashMap::new() })
    }

    #[cfg(test)]
    pub(crate) fn from_entries(pairs: &[(&str, u64)]) -> Self {
        let mut dict = Self {
            dict: pairs.iter().map(|(w, f)| (w.to_string(), *f)).collect(),
            char_index: HashMap::new(),
        };
        dict.build_index();
        dict
    }

    pub fn load_index<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let text = fs::read_to_string(path.as_ref())
            .with_context(|| format!("cannot open char index file: {}", path.as_ref().display()))?;

        self.char_index.clear();
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            let Some(ch) = parts.next() else { continue };
            let words: BTreeSet<String> = parts.map(str::to_string).collect();
            if !words.is_empty() {
                self.char_index.insert(ch.to_string(), words);
            }
        }

        tracing::info!(chars = self.char_index.len(), "loaded character index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict_of(pairs: &[(&str, u64)]) -> Dictionary {
        let mut d = Dictionary {
            dict: pairs.iter().map(|(w, f)| (w.to_string(), *f)).collect(),
            char_index: HashMap::new(),
        };
        d.build_index();
        d
    }

    #[test]
    fn char_index_covers_every_unit() {
        let d = dict_of(&[("苹果", 3), ("苹果汁", 1)]);
        let words = d.char_index.get("果").unwrap();
        assert!(words.contains("苹果"));
        assert!(words.contains("苹果汁"));
        assert!(d.char_index.get("汁").unwrap().contains("苹果汁"));
    }

    #[test]
    fn candidates_filtered_and_sorted_by_frequency() {
        let d = dict_of(&[("苹果", 3), ("苹果汁", 1), ("水果", 9), ("苹配", 2)]);
        // seed on 苹, then require 果 anywhere
        let candidates = d.get_candidates("苹果");
        assert_eq!(candidates, vec!["苹果", "苹果汁"]);
    }

    #[test]
    fn tail_units_match_anywhere() {
        let d = dict_of(&[("果苹", 1)]);
        assert_eq!(d.get_candidates("苹果"), vec!["果苹"]);
    }

    #[test]
    fn empty_prefix_gives_no_candidates() {
        let d = dict_of(&[("苹果", 1)]);
        assert!(d.get_candidates("").is_empty());
        assert!(d.get_candidates("龙").is_empty());
    }
}
