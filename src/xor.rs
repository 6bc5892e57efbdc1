//! XOR key detection and application (spec.md §4.6).
//!
//! Supported by the same heuristic used by Qu1cksc0pe's powershell analyzer:
//! a `-xor N` / `-bxor N` command-line style token anywhere in the buffer.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::node::Node;

static XOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)-b?xor\s*(\d{1,3})").unwrap());

/// Find the first `-xor N` / `-bxor N` token in `data` and return `N`.
///
/// Per spec.md §9: the regex captures up to three digits but the documented
/// behavior is "first 1-3 digit integer after -xor/-bxor", not longest —
/// this is exactly what `\d{1,3}` (non-greedy in effect, since regex finds
/// the first match) gives us.
pub fn get_xorkey(data: &[u8]) -> Option<u8> {
    let caps = XOR_RE.captures(data)?;
    let digits = caps.get(1)?.as_bytes();
    let text = std::str::from_utf8(digits).ok()?;
    text.parse::<u32>().ok().and_then(|n| u8::try_from(n).ok())
}

/// XOR-decode `data` with `key` and append the result as a child of `node`
/// with obfuscation `cipher.xor<key>`. The child spans the whole decoded
/// region, relative to `node`'s own value (i.e. `0..data.len()`).
pub fn apply_xor_key(key: u8, data: &[u8], node: &mut Node, new_node_type: &str) {
    let decoded: Vec<u8> = data.iter().map(|b| b ^ key).collect();
    let len = decoded.len();
    node.children.push(
        Node::new(new_node_type, decoded)
            .with_obfuscation(format!("cipher.xor{key}"))
            .with_span(0, len),
    );
}
