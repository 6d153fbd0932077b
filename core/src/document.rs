use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::simhash;
use crate::snippet::{self, MAX_SUMMARY_CHARS};
use crate::tokenizer::Tokenizer;
use crate::DocId;

lazy_static! {
    static ref TITLE_RE: Regex =
        Regex::new(r"(?s)<(?:content)?title>(.*?)</(?:content)?title>").expect("valid regex");
    static ref URL_RE: Regex = Regex::new(r"(?s)<url>(.*?)</url>").expect("valid regex");
    static ref CONTENT_RE: Regex = Regex::new(r"(?s)<content>(.*?)</content>").expect("valid regex");
}

/// One parsed corpus record. Lives through the build phase only; the serve
/// phase works from persisted metadata and the content file.
#[derive(Debug, Clone)]
pub struct Document {
    pub doc_id: DocId,
    pub title: String,
    pub url: String,
    pub content: String,
    /// Post-stop-word term frequencies over title + content. The sum of the
    /// values is the document length used by ranking.
    pub terms: HashMap<String, u32>,
}

impl Document {
    /// Parse one `<doc>` record. Tag bodies may span lines; a record with
    /// neither title nor content is treated as bare content with the title
    /// derived from its head. Any `<docid>` in the input is ignored — ids
    /// come from the ingest counter.
    pub fn parse(doc_id: DocId, raw: &str, tokenizer: &dyn Tokenizer) -> Self {
        let mut title = capture(&TITLE_RE, raw);
        let url = capture(&URL_RE, raw);
        let mut content = capture(&CONTENT_RE, raw);

        if title.is_empty() && content.is_empty() {
            content = raw.to_string();
            let mut cut = raw.len().min(50);
            while cut > 0 && !raw.is_char_boundary(cut) {
                cut -= 1;
            }
            title = raw[..cut].to_string();
        }

        let text = format!("{} {}", title, content);
        let mut terms: HashMap<String, u32> = HashMap::new();
        for word in tokenizer.cut(&text) {
            *terms.entry(word).or_insert(0) += 1;
        }

        Self { doc_id, title, url, content, terms }
    }

    /// Document length in terms.
    pub fn doc_len(&self) -> u32 {
        self.terms.values().sum()
    }

    pub fn simhash(&self) -> u64 {
        simhash::simhash(&self.terms)
    }

    /// Query-aware snippet of the content.
    pub fn summary(&self, query_words: &[String]) -> String {
        snippet::extract(self.content.as_bytes(), query_words, MAX_SUMMARY_CHARS)
    }
}

fn capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
