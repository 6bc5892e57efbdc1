//! Case-insensitive, word-boundary keyword search (spec.md §4.5).

use crate::node::Node;

pub const MIXED_CASE_OBF: &str = "MixedCase";

fn is_alnum(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

fn is_alpha(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

/// Whether `found` (as it actually appears in the un-lowered buffer) counts
/// as a mixed-case rendering of `expected` (the canonical keyword bytes).
///
/// Runs of alphabetic characters are considered independently (so that
/// e.g. registry-key-like or path-like strings are evaluated segment by
/// segment). A run that is entirely uppercase is never flagged, to avoid
/// treating `DUCK` as a mixed-case obfuscation of `duck`.
pub fn is_mixed_case(expected: &[u8], found: &[u8]) -> bool {
    let mut in_word = false;
    let mut all_upper = true;
    let mut good_case = true;
    for (&byte_found, &byte_expected) in found.iter().zip(expected.iter()) {
        if is_alpha(byte_found) {
            in_word = true;
            let found_upper = byte_found.is_ascii_uppercase();
            let expected_upper = byte_expected.is_ascii_uppercase();
            all_upper = all_upper && found_upper;
            good_case = good_case && (expected_upper || !found_upper);
        } else if in_word {
            if !all_upper && !good_case {
                return true;
            }
            in_word = false;
            all_upper = true;
            good_case = true;
        }
    }
    if in_word { !all_upper && !good_case } else { false }
}

/// Find every word-boundary occurrence of `keyword` within `data`.
fn find_all(keyword: &[u8], data: &[u8]) -> Vec<usize> {
    if keyword.is_empty() {
        return Vec::new();
    }
    let mut starts = Vec::new();
    let mut search_from = 0usize;
    while let Some(rel) = find_subslice(&data[search_from..], keyword) {
        let start = search_from + rel;
        let end = start + keyword.len();
        let before_ok = start == 0 || !is_alnum(data[start - 1]);
        let after_ok = end == data.len() || !is_alnum(data[end]);
        if before_ok && after_ok {
            starts.push(start);
        }
        search_from = end;
    }
    starts
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Search `data` for every `keyword`, case-insensitively, at word
/// boundaries. Emits one [`Node`] per occurrence with `type = label`.
pub fn find_keywords(label: &str, keywords: &[Vec<u8>], data: &[u8]) -> Vec<Node> {
    let lower: Vec<u8> = data.to_ascii_lowercase();
    let mut out = Vec::new();
    for keyword in keywords {
        let lower_keyword = keyword.to_ascii_lowercase();
        for start in find_all(&lower_keyword, &lower) {
            let end = start + keyword.len();
            let found = &data[start..end];
            let obfuscation = if is_mixed_case(keyword, found) { MIXED_CASE_OBF } else { "" };
            out.push(
                Node::new(label, keyword.clone())
                    .with_obfuscation(obfuscation)
                    .with_span(start, end),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_word_boundary_occurrence() {
        let hits = find_keywords("susp", &[b"evil".to_vec()], b"this is evil code");
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].start, hits[0].end), (8, 12));
        assert_eq!(hits[0].obfuscation, "");
    }

    #[test]
    fn rejects_substring_match() {
        let hits = find_keywords("susp", &[b"evil".to_vec()], b"devilish");
        assert!(hits.is_empty());
    }

    #[test]
    fn flags_mixed_case() {
        let hits = find_keywords("susp", &[b"evil".to_vec()], b"EvIl thing");
        assert_eq!(hits[0].obfuscation, MIXED_CASE_OBF);
    }

    #[test]
    fn all_uppercase_is_not_mixed_case() {
        assert!(!is_mixed_case(b"duck", b"DUCK"));
    }

    #[test]
    fn partial_case_mismatch_is_mixed_case() {
        assert!(is_mixed_case(b"duck", b"DuCk"));
    }

    #[test]
    fn exact_case_is_not_mixed() {
        assert!(!is_mixed_case(b"duck", b"duck"));
    }
}
