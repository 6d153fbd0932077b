use std::collections::HashMap;

/// Jenkins one-at-a-time hash, widened to 64 bits. Fingerprints persist
/// across builds and must stay comparable, so this exact variant is frozen.
pub fn jenkins_hash(key: &str) -> u64 {
    let mut hash: u64 = 0;
    for &b in key.as_bytes() {
        hash = hash.wrapping_add(b as u64);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);
    hash
}

/// 64-bit SimHash over a term-frequency map: each term's hash votes on
/// every bit position with weight ±freq, and a bit is set iff its
/// accumulated weight ends up positive.
pub fn simhash(terms: &HashMap<String, u32>) -> u64 {
    let mut weights = [0.0f64; 64];

    for (word, freq) in terms {
        let word_hash = jenkins_hash(word);
        let freq = *freq as f64;
        for (i, w) in weights.iter_mut().enumerate() {
            if (word_hash >> i) & 1 == 1 {
                *w += freq;
            } else {
                *w -= freq;
            }
        }
    }

    let mut fingerprint = 0u64;
    for (i, w) in weights.iter().enumerate() {
        if *w > 0.0 {
            fingerprint |= 1 << i;
        }
    }
    fingerprint
}

/// Popcount of the xor; always in [0, 64].
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}
