use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::document::Document;
use crate::DocId;

pub const K1: f64 = 1.2;
pub const B: f64 = 0.75;

/// Default number of hits returned by a search.
pub const DEFAULT_TOP_K: usize = 20;

/// One document's precomputed contribution for one term.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingEntry {
    pub doc_id: DocId,
    pub weight: f64,
    pub term_freq: u32,
}

/// BM25-weighted inverted index. Built once from the surviving pages, then
/// read-only: posting lists, document lengths, and the average length are
/// never touched after `build` or `load` returns.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<PostingEntry>>,
    doc_lens: BTreeMap<DocId, u32>,
    total_docs: usize,
    avg_doc_len: f64,
}

impl InvertedIndex {
    pub fn total_docs(&self) -> usize {
        self.total_docs
    }

    pub fn avg_doc_len(&self) -> f64 {
        self.avg_doc_len
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn postings(&self, term: &str) -> Option<&[PostingEntry]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    pub fn doc_len(&self, doc_id: DocId) -> Option<u32> {
        self.doc_lens.get(&doc_id).copied()
    }

    /// Two-pass BM25 build: document frequencies and lengths first, then
    /// per-(term, doc) weights. Posting lists end up sorted by weight
    /// descending, doc id ascending on ties.
    pub fn build(&mut self, pages: &[Document]) {
        self.total_docs = pages.len();
        if self.total_docs == 0 {
            tracing::warn!("no pages to build index");
            return;
        }

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        let mut total_len = 0u64;
        for page in pages {
            let doc_len = page.doc_len();
            for term in page.terms.keys() {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
            self.doc_lens.insert(page.doc_id, doc_len);
            total_len += doc_len as u64;
        }
        self.avg_doc_len = total_len as f64 / self.total_docs as f64;
        tracing::info!(avg_doc_len = self.avg_doc_len, "computed corpus statistics");

        for page in pages {
            let doc_len = page.doc_len();
            for (term, &term_freq) in &page.terms {
                let weight = self.bm25(term_freq, doc_len, doc_freq[term.as_str()]);
                self.postings.entry(term.clone()).or_default().push(PostingEntry {
                    doc_id: page.doc_id,
                    weight,
                    term_freq,
                });
            }
        }

        for list in self.postings.values_mut() {
            list.sort_by(compare_entries);
        }

        tracing::info!(terms = self.postings.len(), docs = self.total_docs, "built inverted index");
    }

    fn idf(&self, doc_freq: usize) -> f64 {
        if doc_freq == 0 {
            return 0.0;
        }
        let n = self.total_docs as f64;
        let df = doc_freq as f64;
        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
        idf.max(0.0)
    }

    fn bm25(&self, term_freq: u32, doc_len: u32, doc_freq: usize) -> f64 {
        let tf = term_freq as f64;
        let norm = (tf * (K1 + 1.0))
            / (tf + K1 * (1.0 - B + B * (doc_len as f64 / self.avg_doc_len)));
        self.idf(doc_freq) * norm
    }

    /// Disjunctive top-k: sum each query term's precomputed weight per
    /// document. Scores accumulate in a dense vector indexed by doc id,
    /// with a dirty list so only touched documents are ranked. Ordering is
    /// score descending, doc id ascending on ties; unknown terms contribute
    /// nothing and an empty query returns nothing.
    pub fn search(&self, query_words: &[String], top_k: usize) -> Vec<(DocId, f64)> {
        if query_words.is_empty() {
            return Vec::new();
        }
        let max_doc_id = match self.doc_lens.last_key_value() {
            Some((&id, _)) => id,
            None => return Vec::new(),
        };

        let mut scores = vec![0.0f64; max_doc_id as usize + 1];
        let mut dirty: Vec<DocId> = Vec::new();

        for word in query_words {
            if let Some(list) = self.postings.get(word) {
                for entry in list {
                    let slot = &mut scores[entry.doc_id as usize];
                    if *slot == 0.0 {
                        dirty.push(entry.doc_id);
                    }
                    *slot += entry.weight;
                }
            }
        }

        let mut results: Vec<(DocId, f64)> = dirty
            .into_iter()
            .map(|doc_id| (doc_id, scores[doc_id as usize]))
            .collect();

        let by_rank = |a: &(DocId, f64), b: &(DocId, f64)| {
            b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0))
        };
        if results.len() > top_k {
            results.select_nth_unstable_by(top_k, by_rank);
            results.truncate(top_k);
        }
        results.sort_by(by_rank);
        results
    }

    /// Persist as text: a `#META` line, a `#DOCLENS` line, then one line per
    /// term. Weights use the shortest round-trip decimal form, so ranking
    /// order survives store/load.
    pub fn store<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("cannot create index file: {}", path.as_ref().display()))?;
        let mut out = BufWriter::new(file);

        writeln!(out, "#META {} {}", self.total_docs, self.avg_doc_len)?;

        write!(out, "#DOCLENS")?;
        for (doc_id, len) in &self.doc_lens {
            write!(out, " {}:{}", doc_id, len)?;
        }
        writeln!(out)?;

        let mut terms: Vec<&String> = self.postings.keys().collect();
        terms.sort();
        for term in terms {
            write!(out, "{}", term)?;
            for entry in &self.postings[term] {
                write!(out, " {}:{}:{}", entry.doc_id, entry.weight, entry.term_freq)?;
            }
            writeln!(out)?;
        }
        out.flush()?;

        tracing::info!(terms = self.postings.len(), "stored index");
        Ok(())
    }

    /// Load a stored index. Malformed lines and items are skipped rather
    /// than failing the whole load.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())
            .with_context(|| format!("cannot open index file: {}", path.as_ref().display()))?;

        let mut index = Self::default();
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            if let Some(meta) = line.strip_prefix("#META ") {
                let mut parts = meta.split_whitespace();
                if let (Some(total), Some(avg)) = (parts.next(), parts.next()) {
                    index.total_docs = total.parse().unwrap_or(0);
                    index.avg_doc_len = avg.parse().unwrap_or(0.0);
                }
            } else if let Some(lens) = line.strip_prefix("#DOCLENS") {
                for item in lens.split_whitespace() {
                    let Some((id, len)) = item.split_once(':') else { continue };
                    if let (Ok(id), Ok(len)) = (id.parse::<DocId>(), len.parse::<u32>()) {
                        index.doc_lens.insert(id, len);
                    }
                }
            } else {
                let Some((term, rest)) = line.split_once(' ') else { continue };
                let mut list = Vec::new();
                for item in rest.split_whitespace() {
                    let mut fields = item.splitn(3, ':');
                    let (Some(id), Some(weight), Some(tf)) =
                        (fields.next(), fields.next(), fields.next())
                    else {
                        continue;
                    };
                    let (Ok(doc_id), Ok(weight), Ok(term_freq)) =
                        (id.parse::<DocId>(), weight.parse::<f64>(), tf.parse::<u32>())
                    else {
                        continue;
                    };
                    list.push(PostingEntry { doc_id, weight, term_freq });
                }
                if !list.is_empty() {
                    index.postings.insert(term.to_string(), list);
                }
            }
        }

        tracing::info!(terms = index.postings.len(), "loaded index");
        Ok(index)
    }
}

fn compare_entries(a: &PostingEntry, b: &PostingEntry) -> Ordering {
    b.weight
        .partial_cmp(&a.weight)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.doc_id.cmp(&b.doc_id))
}
