//! PowerShell numeric byte arrays, e.g. `0x1,2,0x3,...` (SPEC_FULL.md §4.9).
//!
//! The original decoder also falls back to a frequency-analysis multi-byte
//! XOR key guesser when no explicit `-xor`/`-bxor` token is present; that
//! guesser is out of scope here (SPEC_FULL.md §4.9), so only the explicit
//! single-byte key path is implemented.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::node::Node;
use crate::xor;

const POWERSHELL_BYTES_TYPE: &str = "powershell.bytes";

static POWERSHELL_BYTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:(?:0x[0-9a-f]{2}|\d{1,3}),\s*){500,}(?:0x[0-9a-f]{2}|\d{1,3})").unwrap());

fn decode_byte(token: &[u8]) -> Option<u8> {
    let trimmed = std::str::from_utf8(token).ok()?.trim();
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).ok()
    } else {
        trimmed.parse().ok()
    }
}

/// Find comma-separated numeric byte-array literals of at least 501 entries.
pub fn find_powershell_bytes(data: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    let xorkey = xor::get_xorkey(data);
    for m in POWERSHELL_BYTES_RE.find_iter(data) {
        let Some(binary) = m.as_bytes().split(|&b| b == b',').map(decode_byte).collect::<Option<Vec<u8>>>() else {
            continue;
        };
        let mut node = Node::new(POWERSHELL_BYTES_TYPE, binary.clone()).with_span(m.start(), m.end());
        if let Some(key) = xorkey {
            xor::apply_xor_key(key, &binary, &mut node, POWERSHELL_BYTES_TYPE);
        }
        out.push(node);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeated_byte_list(byte: &str, count: usize) -> Vec<u8> {
        std::iter::repeat(byte).take(count).collect::<Vec<_>>().join(",").into_bytes()
    }

    #[test]
    fn decodes_large_byte_array() {
        let data = repeated_byte_list("0x41", 501);
        let hits = find_powershell_bytes(&data);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, vec![0x41u8; 501]);
    }

    #[test]
    fn short_array_is_ignored() {
        let data = repeated_byte_list("65", 10);
        assert!(find_powershell_bytes(&data).is_empty());
    }

    #[test]
    fn applies_explicit_xor_key() {
        let mut data = repeated_byte_list("0x47", 501);
        data.extend_from_slice(b" -bxor 0");
        let hits = find_powershell_bytes(&data);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].children.len(), 1);
        assert_eq!(hits[0].children[0].value, vec![0x47u8; 501]);
    }
}
