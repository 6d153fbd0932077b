use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::charsplit::find_bytes;
use crate::document::Document;
use crate::tokenizer::Tokenizer;
use crate::DocId;

/// Ingest cap across all files, to bound build-phase memory.
pub const MAX_DOCS: usize = 300_000;

const CHUNK_SIZE: usize = 1024 * 1024;
const DOC_OPEN: &[u8] = b"<doc>";
const DOC_CLOSE: &[u8] = b"</doc>";

/// Lightweight per-page record persisted next to the content file. The
/// content bytes of all pages, concatenated in insertion order, equal the
/// content file exactly.
#[derive(Debug, Clone, Default)]
pub struct WebPageMeta {
    pub doc_id: DocId,
    pub title: String,
    pub url: String,
    pub content_offset: u64,
    pub content_length: u64,
}

/// Corpus loader: streams `<doc>…</doc>` records out of archive files and
/// owns the parsed pages until the build pipeline consumes them.
pub struct PageLib {
    data_path: PathBuf,
    pages: Vec<Document>,
}

impl PageLib {
    pub fn new<P: AsRef<Path>>(data_path: P) -> Self {
        Self { data_path: data_path.as_ref().to_path_buf(), pages: Vec::new() }
    }

    pub fn pages(&self) -> &[Document] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<Document> {
        self.pages
    }

    /// Scan the data directory (non-recursive) for `.xml` / `.dat` files and
    /// stream-parse them, assigning ids from `next_doc_id` in ingest order.
    pub fn load(&mut self, tokenizer: &dyn Tokenizer, next_doc_id: &mut DocId) -> Result<()> {
        let entries = WalkDir::new(&self.data_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in entries.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !name.contains(".xml") && !name.contains(".dat") {
                continue;
            }
            if let Err(err) = self.parse_file(entry.path(), tokenizer, next_doc_id) {
                tracing::error!(path = %entry.path().display(), %err, "failed to parse archive file");
            }
            if self.pages.len() >= MAX_DOCS {
                tracing::info!(limit = MAX_DOCS, "reached max document limit");
                break;
            }
        }

        tracing::info!(pages = self.pages.len(), "loaded page library");
        Ok(())
    }

    /// Stream one archive: read 1 MiB chunks into a rolling buffer and peel
    /// off complete records. A record left open at the end of a chunk is
    /// carried into the next read; a buffer with no `<doc>` at all is
    /// dropped. A file that yields no records is ingested whole.
    fn parse_file(
        &mut self,
        path: &Path,
        tokenizer: &dyn Tokenizer,
        next_doc_id: &mut DocId,
    ) -> Result<()> {
        let mut file =
            File::open(path).with_context(|| format!("cannot open file: {}", path.display()))?;

        let initial = self.pages.len();
        let mut processed = 0usize;
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut buffer: Vec<u8> = Vec::with_capacity(CHUNK_SIZE * 2);

        loop {
            let n = file.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);

            let mut search_start = 0;
            loop {
                let Some(open) = find_bytes(&buffer[search_start..], DOC_OPEN) else {
                    buffer.clear();
                    break;
                };
                let start = search_start + open;
                let Some(close) = find_bytes(&buffer[start..], DOC_CLOSE) else {
                    // open record: keep it for the next chunk
                    buffer.drain(..start);
                    break;
                };
                let end = start + close + DOC_CLOSE.len();

                let record = String::from_utf8_lossy(&buffer[start..end]).into_owned();
                self.push_record(&record, tokenizer, next_doc_id);
                if self.pages.len() >= MAX_DOCS {
                    return Ok(());
                }

                processed += 1;
                if processed % 10_000 == 0 {
                    tracing::info!(processed, path = %path.display(), "loading documents");
                }
                search_start = end;
            }
        }

        if self.pages.len() == initial {
            let raw = fs::read(path)?;
            if !raw.is_empty() {
                let text = String::from_utf8_lossy(&raw).into_owned();
                self.push_record(&text, tokenizer, next_doc_id);
            }
        }
        Ok(())
    }

    fn push_record(&mut self, raw: &str, tokenizer: &dyn Tokenizer, next_doc_id: &mut DocId) {
        let doc_id = *next_doc_id;
        *next_doc_id += 1;
        self.pages.push(Document::parse(doc_id, raw, tokenizer));
    }

    /// Re-emit the surviving pages as `<doc>` records.
    pub fn store<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("cannot create output file: {}", path.as_ref().display()))?;
        let mut out = BufWriter::new(file);

        for page in &self.pages {
            writeln!(out, "<doc>")?;
            writeln!(out, "<docid>{}</docid>", page.doc_id)?;
            writeln!(out, "<title>{}</title>", page.title)?;
            writeln!(out, "<url>{}</url>", page.url)?;
            writeln!(out, "<content>{}</content>", page.content)?;
            writeln!(out, "</doc>")?;
            writeln!(out)?;
        }
        out.flush()?;

        tracing::info!(pages = self.pages.len(), "stored page library");
        Ok(())
    }

    /// Write content bytes back-to-back plus a line-based metadata file, so
    /// the serve phase can fetch any body with one ranged read.
    pub fn store_separated<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        meta_path: P,
        content_path: Q,
    ) -> Result<()> {
        let content_file = File::create(content_path.as_ref()).with_context(|| {
            format!("cannot create content file: {}", content_path.as_ref().display())
        })?;
        let mut content_out = BufWriter::new(content_file);

        let meta_file = File::create(meta_path.as_ref())
            .with_context(|| format!("cannot create meta file: {}", meta_path.as_ref().display()))?;
        let mut meta_out = BufWriter::new(meta_file);

        writeln!(meta_out, "#FORMAT docId|title|url|offset|length")?;

        let mut offset = 0u64;
        for page in &self.pages {
            let content = page.content.as_bytes();
            content_out.write_all(content)?;

            writeln!(
                meta_out,
                "{}|{}|{}|{}|{}",
                page.doc_id,
                clean_field(&page.title),
                clean_field(&page.url),
                offset,
                content.len()
            )?;
            offset += content.len() as u64;
        }
        content_out.flush()?;
        meta_out.flush()?;

        tracing::info!(pages = self.pages.len(), bytes = offset, "stored separated page library");
        Ok(())
    }

    /// Load the metadata file written by `store_separated`. Blank lines,
    /// `#` comments, and malformed lines are skipped.
    pub fn load_meta<P: AsRef<Path>>(path: P) -> Result<HashMap<DocId, WebPageMeta>> {
        let text = fs::read_to_string(path.as_ref())
            .with_context(|| format!("cannot open meta file: {}", path.as_ref().display()))?;

        let mut metas = HashMap::new();
        for line in text.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.splitn(5, '|');
            let (Some(id), Some(title), Some(url), Some(offset), Some(length)) = (
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
            ) else {
                continue;
            };
            let (Ok(doc_id), Ok(content_offset), Ok(content_length)) =
                (id.parse::<DocId>(), offset.parse::<u64>(), length.parse::<u64>())
            else {
                continue;
            };
            metas.insert(
                doc_id,
                WebPageMeta {
                    doc_id,
                    title: title.to_string(),
                    url: url.to_string(),
                    content_offset,
                    content_length,
                },
            );
        }

        tracing::info!(entries = metas.len(), "loaded page metadata");
        Ok(metas)
    }
}

/// Metadata lines are `|`-separated and newline-terminated; strip both from
/// free-text fields.
fn clean_field(s: &str) -> String {
    s.replace(['\n', '\r', '|'], " ")
}
