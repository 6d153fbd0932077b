use crate::charsplit::{find_bytes, sanitize_utf8};

/// Default snippet length in code-point units.
pub const MAX_SUMMARY_CHARS: usize = 150;

/// How far before the first query-term match the snippet window opens.
const CONTEXT_BYTES: usize = 30;

/// Query-aware snippet over raw content bytes: anchor on the first query
/// word found deeper than `CONTEXT_BYTES` into the text, back off those
/// bytes, then take up to `max_chars` code-point units forward. The back-off
/// can land inside a multi-byte sequence; the walk counts orphaned
/// continuation bytes as single units and the sanitizer drops them at the
/// end. Ellipses mark trimming on either side.
pub fn extract(text: &[u8], query_words: &[String], max_chars: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut start = 0;
    for word in query_words {
        if let Some(pos) = find_bytes(text, word.as_bytes()) {
            if pos > CONTEXT_BYTES {
                start = pos - CONTEXT_BYTES;
                break;
            }
        }
    }

    let mut end = start;
    let mut char_count = 0;
    while end < text.len() && char_count < max_chars {
        let b = text[end];
        let char_len = if b & 0x80 == 0 {
            1
        } else if b & 0xE0 == 0xC0 {
            2
        } else if b & 0xF0 == 0xE0 {
            3
        } else if b & 0xF8 == 0xF0 {
            4
        } else {
            1
        };
        if end + char_len > text.len() {
            break;
        }
        end += char_len;
        char_count += 1;
    }

    let mut summary = sanitize_utf8(&text[start..end]);
    if start > 0 {
        summary.insert_str(0, "...");
    }
    if end < text.len() {
        summary.push_str("...");
    }
    summary
}
