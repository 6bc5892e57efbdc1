//! `chr()` / `chrw()` / `chrb()` calls (spec.md §4.4).

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::node::Node;

static CHR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)chr[bw]?\((\d+)\)").unwrap());

/// Find and decode calls to the `chr` family of functions.
pub fn find_chr(data: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    for caps in CHR_RE.captures_iter(data) {
        let whole = caps.get(0).unwrap();
        let digits = caps.get(1).unwrap();
        let Ok(text) = std::str::from_utf8(digits.as_bytes()) else { continue };
        let Ok(code) = text.parse::<u32>() else { continue };
        let Some(ch) = char::from_u32(code) else { continue };
        let mut buf = [0u8; 4];
        let encoded = ch.encode_utf8(&mut buf).as_bytes().to_vec();
        out.push(
            Node::new("string", encoded)
                .with_obfuscation("function.chr")
                .with_span(whole.start(), whole.end()),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_chr_call() {
        let hits = find_chr(b"chr(65)");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"A");
        assert_eq!(hits[0].node_type, "string");
    }

    #[test]
    fn decodes_chrw_call_multibyte() {
        let hits = find_chr(b"chrw(9731)"); // SNOWMAN
        assert_eq!(hits[0].value, "\u{2603}".as_bytes());
    }

    #[test]
    fn invalid_code_point_is_skipped() {
        assert!(find_chr(b"chr(4294967295)").is_empty());
    }
}
