//! Hexadecimal-encoded text (spec.md §4.4 "Hex (transformer)").

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::node::Node;
use crate::xor;

static HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[a-f0-9]{2}){10,}|(?:[A-F0-9]{2}){10,}").unwrap());

static FROM_HEX_STRING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)FromHexString\('([a-f0-9]+)'\)").unwrap());

/// Find runs of 10 or more consistently-cased hex pairs and decode them.
pub fn find_hex(data: &[u8]) -> Vec<Node> {
    HEX_RE
        .find_iter(data)
        .filter_map(|m| {
            let decoded = hex::decode(m.as_bytes()).ok()?;
            Some(
                Node::new("", decoded)
                    .with_obfuscation("decoded.hexadecimal")
                    .with_span(m.start(), m.end()),
            )
        })
        .collect()
}

/// Find `FromHexString('...')` calls (mirrors `FromBase64String`'s XOR
/// handling per spec.md §4.4).
pub fn find_from_hex_string(data: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    let xorkey = xor::get_xorkey(data);
    for caps in FROM_HEX_STRING_RE.captures_iter(data) {
        let whole = caps.get(0).unwrap();
        let arg = caps.get(1).unwrap();
        let Ok(decoded) = hex::decode(arg.as_bytes()) else {
            continue;
        };
        let mut node = Node::new("powershell.bytes", decoded.clone())
            .with_obfuscation("decoded.hexadecimal")
            .with_span(whole.start(), whole.end());
        if let Some(key) = xorkey {
            xor::apply_xor_key(key, &decoded, &mut node, "powershell.bytes");
        }
        out.push(node);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_lowercase_hex_run() {
        let hits = find_hex(b"68656c6c6f776f726c6421212121"); // "helloworld!!!!"
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"helloworld!!!!");
        assert_eq!(hits[0].obfuscation, "decoded.hexadecimal");
    }

    #[test]
    fn short_hex_run_is_ignored() {
        assert!(find_hex(b"deadbeef").is_empty());
    }

    #[test]
    fn decodes_from_hex_string_call() {
        let hits = find_from_hex_string(b"FromHexString('68656c6c6f')");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"hello");
    }
}
