//! `.replace(...)` / `-replace` / VBA `Replace(...)` calls (spec.md §4.4).

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::STRING_RE_SRC;
use crate::node::Node;

static REPLACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)({STRING_RE_SRC})\.replace\(\s*({STRING_RE_SRC})\s*,\s*({STRING_RE_SRC})\s*\)"
    ))
    .unwrap()
});

static VBA_REPLACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)replace\(\s*({STRING_RE_SRC})\s*,\s*({STRING_RE_SRC})\s*,\s*({STRING_RE_SRC})\s*\)"
    ))
    .unwrap()
});

static POWERSHELL_REPLACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)({STRING_RE_SRC})\s*-replace\s*({STRING_RE_SRC})\s*,\s*({STRING_RE_SRC})"
    ))
    .unwrap()
});

static JS_REGEX_REPLACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)({STRING_RE_SRC})\.replace\(/([^/\[\](){{}}\\.+*?^$,]+)/[gim]{{0,3}}\s*,\s*({STRING_RE_SRC})\s*\)"
    ))
    .unwrap()
});

fn unquote(bytes: &[u8]) -> &[u8] {
    if bytes.len() >= 2 { &bytes[1..bytes.len() - 1] } else { bytes }
}

fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    if needle.is_empty() {
        return haystack.to_vec();
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(pos) = rest.windows(needle.len()).position(|w| w == needle) {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(replacement);
        rest = &rest[pos + needle.len()..];
    }
    out.extend_from_slice(rest);
    out
}

/// Find and decode plain `"str".replace("a", "b")` calls.
pub fn find_replace(data: &[u8]) -> Vec<Node> {
    REPLACE_RE
        .captures_iter(data)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            let haystack = unquote(caps.get(1).unwrap().as_bytes());
            let needle = unquote(caps.get(2).unwrap().as_bytes());
            let replacement = unquote(caps.get(3).unwrap().as_bytes());
            Node::new("string", replace_all(haystack, needle, replacement))
                .with_obfuscation("replace")
                .with_span(whole.start(), whole.end())
        })
        .collect()
}

/// Find and decode PowerShell `"str" -replace "a", "b"` calls.
pub fn find_powershell_replace(data: &[u8]) -> Vec<Node> {
    POWERSHELL_REPLACE_RE
        .captures_iter(data)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            let haystack = unquote(caps.get(1).unwrap().as_bytes());
            let needle = unquote(caps.get(2).unwrap().as_bytes());
            let replacement = unquote(caps.get(3).unwrap().as_bytes());
            Node::new("powershell.string", replace_all(haystack, needle, replacement))
                .with_obfuscation("replace")
                .with_span(whole.start(), whole.end())
        })
        .collect()
}

/// Find and decode VBA `Replace("str", "a", "b")` calls.
pub fn find_vba_replace(data: &[u8]) -> Vec<Node> {
    VBA_REPLACE_RE
        .captures_iter(data)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            let haystack = unquote(caps.get(1).unwrap().as_bytes());
            let needle = unquote(caps.get(2).unwrap().as_bytes());
            let replacement = unquote(caps.get(3).unwrap().as_bytes());
            Node::new("vba.string", replace_all(haystack, needle, replacement))
                .with_obfuscation("vba.replace")
                .with_span(whole.start(), whole.end())
        })
        .collect()
}

/// Find and decode JS `"str".replace(/regex/, "b")` calls. The pattern group
/// is treated as a literal needle; genuine regex replacement is out of scope.
pub fn find_js_regex_replace(data: &[u8]) -> Vec<Node> {
    JS_REGEX_REPLACE_RE
        .captures_iter(data)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            let haystack = unquote(caps.get(1).unwrap().as_bytes());
            let needle = caps.get(2).unwrap().as_bytes();
            let replacement = unquote(caps.get(3).unwrap().as_bytes());
            Node::new("javascript.string", replace_all(haystack, needle, replacement))
                .with_obfuscation("replace")
                .with_span(whole.start(), whole.end())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_replace() {
        let hits = find_replace(br#""hxxp://evil.com".replace("xx", "tt")"#);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"http://evil.com");
        assert_eq!(hits[0].node_type, "string");
    }

    #[test]
    fn decodes_vba_replace() {
        let hits = find_vba_replace(br#"Replace("hxxp://evil.com", "xx", "tt")"#);
        assert_eq!(hits[0].value, b"http://evil.com");
        assert_eq!(hits[0].node_type, "vba.string");
        assert_eq!(hits[0].obfuscation, "vba.replace");
    }

    #[test]
    fn decodes_powershell_replace() {
        let hits = find_powershell_replace(br#""hxxp://evil.com" -replace "xx", "tt""#);
        assert_eq!(hits[0].value, b"http://evil.com");
        assert_eq!(hits[0].node_type, "powershell.string");
    }

    #[test]
    fn decodes_js_regex_replace() {
        let hits = find_js_regex_replace(br#""hxxp://evil.com".replace(/xx/g, "tt")"#);
        assert_eq!(hits[0].value, b"http://evil.com");
        assert_eq!(hits[0].node_type, "javascript.string");
    }
}
