//! Base64-encoded text (spec.md §4.4 "Base64 (transformer)").

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use regex::bytes::Regex;

use crate::node::Node;
use crate::xor;

const MIN_B64_CHARS: usize = 6;

static HTML_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:x[a-fA-F0-9]{1,4}|\d{1,4});").unwrap());

static BASE64_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:[A-Za-z0-9+/]{4,}(?:<\x00  \x00)?(?:&#13;|&#xD;)?(?:&#10;|&#xA)?\r?\n?){5,}[A-Za-z0-9+/]{2,}=?=?",
    )
    .unwrap()
});

static CAMEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\A[a-z]+\z").unwrap());
static HEX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\A[a-f0-9]+\z").unwrap());

static BASE64DECODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)Base64Decode\("([a-z0-9/+]+=?=?)"\)"#).unwrap());

static FROM_B64STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\[System\.Convert\]::)?FromBase64String\('([a-z0-9+/]+=?=?)'\)").unwrap()
});

/// Strip newline, HTML-numeric-entity, and UTF-16-padding artifacts that
/// can interleave a base64 candidate before attempting to decode it.
fn clean_candidate(raw: &[u8]) -> Vec<u8> {
    let no_entities = HTML_ESCAPE_RE.replace_all(raw, &b""[..]);
    let mut out = Vec::with_capacity(no_entities.len());
    let mut i = 0;
    while i < no_entities.len() {
        if no_entities[i..].starts_with(b"<\x00  \x00") {
            i += 5;
            continue;
        }
        let b = no_entities[i];
        if b != b'\n' && b != b'\r' {
            out.push(b);
        }
        i += 1;
    }
    out
}

fn is_plausible_base64(candidate: &[u8]) -> bool {
    if candidate.len() % 4 != 0 {
        return false;
    }
    let distinct: std::collections::HashSet<u8> = candidate.iter().copied().collect();
    if distinct.len() <= MIN_B64_CHARS {
        return false;
    }
    if HEX_RE.is_match(candidate) {
        return false; // hashes are commonly hex and happen to be base64-alphabet too
    }
    if CAMEL_RE.is_match(candidate) {
        return false; // camelCase identifiers look like base64 too
    }
    let slash_count = candidate.iter().filter(|&&b| b == b'/').count();
    if slash_count as f64 / candidate.len() as f64 > 3.0 / 32.0 {
        return false; // more likely a path
    }
    true
}

/// Find all base64-encoded sections in `data`.
pub fn find_base64(data: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    for m in BASE64_RE.find_iter(data) {
        let candidate = clean_candidate(m.as_bytes());
        if !is_plausible_base64(&candidate) {
            continue;
        }
        let Ok(decoded) = B64.decode(&candidate) else {
            continue;
        };
        out.push(
            Node::new("", decoded)
                .with_obfuscation("encoding.base64")
                .with_span(m.start(), m.end()),
        );
    }
    out
}

/// Find `Base64Decode("...")` (VBA) calls and decode their argument.
pub fn find_base64decode(data: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    for caps in BASE64DECODE_RE.captures_iter(data) {
        let whole = caps.get(0).unwrap();
        let arg = caps.get(1).unwrap();
        let Ok(decoded) = B64.decode(arg.as_bytes()) else {
            continue;
        };
        out.push(
            Node::new("vba.string", decoded)
                .with_obfuscation("encoding.base64")
                .with_span(whole.start(), whole.end()),
        );
    }
    out
}

/// Find PowerShell `FromBase64String('...')` calls and decode their
/// argument, XOR-decoding the result as a child if a `-xor`/`-bxor` token
/// is present anywhere in the buffer.
pub fn find_from_base64_string(data: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    let xorkey = xor::get_xorkey(data);
    for caps in FROM_B64STRING_RE.captures_iter(data) {
        let whole = caps.get(0).unwrap();
        let arg = caps.get(1).unwrap();
        let Ok(decoded) = B64.decode(arg.as_bytes()) else {
            continue;
        };
        let mut node = Node::new("powershell.bytes", decoded.clone())
            .with_obfuscation("encoding.base64")
            .with_span(whole.start(), whole.end());
        if let Some(key) = xorkey {
            xor::apply_xor_key(key, &decoded, &mut node, "powershell.bytes");
        }
        out.push(node);
    }
    out
}
