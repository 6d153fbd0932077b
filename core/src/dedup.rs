use crate::document::Document;
use crate::simhash::hamming_distance;

/// Fingerprints closer than this many bits are considered duplicates. The
/// comparison is strict: distance 3 itself survives.
pub const DUPLICATE_THRESHOLD: u32 = 3;

/// Drop every page whose SimHash sits within `DUPLICATE_THRESHOLD` bits of
/// an earlier survivor. Order-preserving; the first page always survives.
/// The linear scan over survivors is fine at the ingest cap.
pub fn deduplicate(pages: Vec<Document>) -> Vec<Document> {
    let total = pages.len();
    let mut survivors: Vec<Document> = Vec::with_capacity(total);
    let mut fingerprints: Vec<u64> = Vec::with_capacity(total);

    for page in pages {
        let hash = page.simhash();
        let duplicate = fingerprints
            .iter()
            .any(|&kept| hamming_distance(hash, kept) < DUPLICATE_THRESHOLD);
        if !duplicate {
            fingerprints.push(hash);
            survivors.push(page);
        }
    }

    tracing::info!(before = total, after = survivors.len(), "deduplication");
    survivors
}
