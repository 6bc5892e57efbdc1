//! JavaScript `unescape('…')` (spec.md §4.4).

use std::sync::LazyLock;

use percent_encoding::percent_decode;
use regex::bytes::Regex;

use super::STRING_RE_SRC;
use crate::node::Node;

static UNESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)unescape\(\s*({STRING_RE_SRC})\s*\)")).unwrap());

/// Find and percent-decode `unescape("...")` calls.
pub fn find_unescape(data: &[u8]) -> Vec<Node> {
    UNESCAPE_RE
        .captures_iter(data)
        .filter_map(|caps| {
            let whole = caps.get(0).unwrap();
            let arg = caps.get(1)?.as_bytes();
            let inner = if arg.len() >= 2 { &arg[1..arg.len() - 1] } else { &arg[..0] };
            let decoded = percent_decode(inner).collect::<Vec<u8>>();
            Some(
                Node::new("string", decoded)
                    .with_obfuscation("function.unescape")
                    .with_span(whole.start(), whole.end()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_percent_escapes() {
        let hits = find_unescape(br#"unescape('%68%65%6c%6c%6f')"#);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"hello");
        assert_eq!(hits[0].obfuscation, "function.unescape");
    }

    #[test]
    fn passes_through_unescaped_characters() {
        let hits = find_unescape(br#"unescape('hello')"#);
        assert_eq!(hits[0].value, b"hello");
    }
}
