use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::snippet;

/// Snippets only ever need the head of a body; cap the ranged read so a
/// huge article cannot balloon a request.
pub const MAX_SUMMARY_READ: u64 = 5_000;

/// On-demand ranged reads from the content file written at build time.
/// Owns a path, never the bytes; each call opens, seeks, and reads exactly
/// the requested slice.
pub struct ContentStore {
    path: PathBuf,
}

impl ContentStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Read `length` bytes at `offset`, or fewer at EOF. A missing or
    /// unreadable file yields an empty slice.
    pub fn read_content(&self, offset: u64, length: u64) -> Vec<u8> {
        let Ok(mut file) = File::open(&self.path) else {
            return Vec::new();
        };
        if file.seek(SeekFrom::Start(offset)).is_err() {
            return Vec::new();
        }
        let mut buf = Vec::with_capacity(length as usize);
        if file.take(length).read_to_end(&mut buf).is_err() {
            return Vec::new();
        }
        buf
    }

    /// Query-aware snippet from at most `MAX_SUMMARY_READ` bytes of the
    /// body's head.
    pub fn get_summary(
        &self,
        offset: u64,
        length: u64,
        query_words: &[String],
        max_chars: usize,
    ) -> String {
        let text = self.read_content(offset, length.min(MAX_SUMMARY_READ));
        snippet::extract(&text, query_words, max_chars)
    }
}
