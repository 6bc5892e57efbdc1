//! String concatenation (spec.md §4.4).

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::STRING_RE_SRC;
use crate::node::Node;

// VB's `_` line continuation is also accepted as whitespace around the
// concatenation operator.
const CONCAT_SPACER_SRC: &str = r"[\s_]*(?:&|\+|&amp;)[\s_]*";

static CONCAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:(?:{STRING_RE_SRC}){CONCAT_SPACER_SRC})+(?:{STRING_RE_SRC})"
    ))
    .unwrap()
});

static QUOTE_SPACER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r#"['"]{CONCAT_SPACER_SRC}['"]"#)).unwrap());

/// Find and decode string concatenation (`"a" + "b"`, `'a' & 'b'`, ...).
pub fn find_concat(data: &[u8]) -> Vec<Node> {
    CONCAT_RE
        .find_iter(data)
        .map(|m| {
            let merged = QUOTE_SPACER_RE.replace_all(m.as_bytes(), &b""[..]);
            let inner = if merged.len() >= 2 { merged[1..merged.len() - 1].to_vec() } else { Vec::new() };
            Node::new("string", inner)
                .with_obfuscation("concatenation")
                .with_span(m.start(), m.end())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_double_quoted_strings() {
        let hits = find_concat(br#""foo" + "bar""#);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"foobar");
        assert_eq!(hits[0].obfuscation, "concatenation");
    }

    #[test]
    fn concatenates_with_ampersand() {
        let hits = find_concat(br#""foo" & "bar""#);
        assert_eq!(hits[0].value, b"foobar");
    }

    #[test]
    fn concatenates_single_quoted_strings() {
        let hits = find_concat(b"'foo' + 'bar'");
        assert_eq!(hits[0].value, b"foobar");
    }
}
