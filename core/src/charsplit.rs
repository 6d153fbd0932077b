//! Byte-level UTF-8 helpers shared by tokenization, snippets, and the
//! outbound sanitizer. "Character" here always means one code-point unit
//! of 1-4 bytes, never a grapheme cluster.

/// Length of the UTF-8 sequence announced by a lead byte, or `None` for a
/// byte that is no valid lead (continuation bytes, 0xF8..).
fn sequence_len(lead: u8) -> Option<usize> {
    if lead & 0x80 == 0 {
        Some(1)
    } else if lead & 0xE0 == 0xC0 {
        Some(2)
    } else if lead & 0xF0 == 0xE0 {
        Some(3)
    } else if lead & 0xF8 == 0xF0 {
        Some(4)
    } else {
        None
    }
}

/// Split a string into its code-point units. Concatenating the result
/// yields the input unchanged.
pub fn split_chars(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut units = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let len = match sequence_len(bytes[i]) {
            Some(len) => len,
            None => {
                i += 1;
                continue;
            }
        };
        if i + len > bytes.len() {
            break;
        }
        units.push(&s[i..i + len]);
        i += len;
    }
    units
}

/// Keep only complete, well-formed UTF-8 sequences and drop every other
/// byte. Crawled pages carry broken encodings; running outbound strings
/// through this keeps the JSON encoder from choking on them.
pub fn sanitize_utf8(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let len = match sequence_len(bytes[i]) {
            Some(len) => len,
            None => {
                i += 1;
                continue;
            }
        };
        let end = i + len;
        if end <= bytes.len() {
            if let Ok(unit) = std::str::from_utf8(&bytes[i..end]) {
                out.push_str(unit);
                i = end;
                continue;
            }
        }
        i += 1;
    }
    out
}

/// First occurrence of `needle` in `haystack`, byte-wise.
pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_mixed_width_text() {
        let units = split_chars("a苹果b");
        assert_eq!(units, vec!["a", "苹", "果", "b"]);
    }

    #[test]
    fn split_concat_roundtrips() {
        let s = "BM25 检索引擎 🔍 test";
        assert_eq!(split_chars(s).concat(), s);
    }

    #[test]
    fn sanitize_passes_valid_utf8_through() {
        let s = "苹果 phone";
        assert_eq!(sanitize_utf8(s.as_bytes()), s);
    }

    #[test]
    fn sanitize_drops_broken_bytes() {
        // truncated 3-byte sequence followed by a stray continuation byte
        let bytes = [b'a', 0xE8, 0x8B, b'b', 0x80, b'c'];
        assert_eq!(sanitize_utf8(&bytes), "abc");
    }

    #[test]
    fn sanitize_drops_truncated_tail() {
        let mut bytes = "苹".as_bytes().to_vec();
        bytes.pop();
        assert_eq!(sanitize_utf8(&bytes), "");
    }

    #[test]
    fn finds_byte_patterns() {
        assert_eq!(find_bytes(b"<doc>x</doc>", b"</doc>"), Some(6));
        assert_eq!(find_bytes(b"abc", b"xyz"), None);
        assert_eq!(find_bytes(b"abc", b""), None);
    }
}
