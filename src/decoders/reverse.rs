//! `reverse(...)` / `StrReverse(...)` calls (spec.md §4.4).

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::STRING_RE_SRC;
use crate::hit::find_and_deobfuscate;
use crate::node::Node;

static REVERSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)reversed?\(\s*({STRING_RE_SRC})\s*\)")).unwrap());

static STRREVERSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)StrReverse\(\s*({STRING_RE_SRC})\s*\)")).unwrap());

// Excludes the surrounding quote characters: reverses the quoted content only.
fn reverse_quoted(s: &[u8]) -> (Vec<u8>, &'static str) {
    let inner_reversed: Vec<u8> = if s.len() >= 2 { s[1..s.len() - 1].iter().rev().copied().collect() } else { Vec::new() };
    (inner_reversed, "reverse")
}

fn reverse_quoted_vba(s: &[u8]) -> (Vec<u8>, &'static str) {
    let inner_reversed: Vec<u8> = if s.len() >= 2 { s[1..s.len() - 1].iter().rev().copied().collect() } else { Vec::new() };
    (inner_reversed, "vba.reverse")
}

/// Find and decode `reverse("str")` / `reversed("str")` calls.
pub fn find_reverse(data: &[u8]) -> Vec<Node> {
    find_and_deobfuscate("string", &REVERSE_RE, data, reverse_quoted, 1, 0)
}

/// Find and decode VBA `StrReverse("str")` calls.
pub fn find_strreverse(data: &[u8]) -> Vec<Node> {
    find_and_deobfuscate("vba.string", &STRREVERSE_RE, data, reverse_quoted_vba, 1, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_reverse_call() {
        let hits = find_reverse(br#"reverse("kcud")"#);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"duck");
        assert_eq!(hits[0].obfuscation, "reverse");
    }

    #[test]
    fn decodes_strreverse_call() {
        let hits = find_strreverse(br#"StrReverse("kcud")"#);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"duck");
        assert_eq!(hits[0].node_type, "vba.string");
        assert_eq!(hits[0].obfuscation, "vba.reverse");
    }

    #[test]
    fn empty_input_yields_no_hits() {
        assert!(find_strreverse(b"").is_empty());
    }
}
