//! UTF-16 text embedded in a byte buffer (spec.md §4.4 "UTF-16 (transformer)").

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::node::Node;

// Printable-byte-then-nul runs of at least 7 pairs, allowing embedded
// double-nul separators (common for UTF-16 strings packed back-to-back).
static UTF16_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)(?:[^\x00-\x08\x0e-\x1f\x7f-\x9f]\x00){7,}(?:\x00\x00(?:\x00\x00)?(?:[^\x00-\x08\x0e-\x1f\x7f-\x9f]\x00){7,})*",
    )
    .unwrap()
});

fn decode_utf16le(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).ok().map(String::into_bytes)
}

/// Find UTF-16-LE runs and convert them to UTF-8.
pub fn find_utf16(data: &[u8]) -> Vec<Node> {
    UTF16_RE
        .find_iter(data)
        .filter_map(|m| {
            let decoded = decode_utf16le(m.as_bytes())?;
            Some(
                Node::new("", decoded)
                    .with_obfuscation("codec.utf-16")
                    .with_span(m.start(), m.end()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn decodes_utf16_run() {
        let bytes = utf16le("hello world");
        let hits = find_utf16(&bytes);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"hello world");
        assert_eq!(hits[0].obfuscation, "codec.utf-16");
    }

    #[test]
    fn short_run_is_ignored() {
        let bytes = utf16le("hi");
        assert!(find_utf16(&bytes).is_empty());
    }
}
