//! XML numeric character references (spec.md §4.4).

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::node::Node;

static XML_ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:&#(?:x[a-z0-9]{2}|(?:25[0-5]|2[0-4][0-9]|[0-1]?[0-9]{1,2}));){5,}").unwrap()
});

/// Decode a run of `&#NN;` / `&#xHH;` numeric character references to bytes.
fn unescape_xml(data: &[u8]) -> Option<Vec<u8>> {
    let text = data.strip_suffix(b";")?;
    let mut out = Vec::new();
    for entity in text.split(|&b| b == b';') {
        let entity = entity.strip_prefix(b"&#")?;
        let byte = if entity.first().is_some_and(|b| b.eq_ignore_ascii_case(&b'x')) {
            let hex_digits = &entity[1..];
            u8::from_str_radix(std::str::from_utf8(hex_digits).ok()?, 16).ok()?
        } else {
            std::str::from_utf8(entity).ok()?.parse::<u16>().ok().and_then(|v| u8::try_from(v).ok())?
        };
        out.push(byte);
    }
    Some(out)
}

/// Find five-or-more runs of numeric XML character references and decode
/// them to raw bytes.
pub fn find_xml_hex(data: &[u8]) -> Vec<Node> {
    XML_ESCAPE_RE
        .find_iter(data)
        .filter_map(|m| {
            let decoded = unescape_xml(m.as_bytes())?;
            Some(
                Node::new("", decoded)
                    .with_obfuscation("unescape.xml")
                    .with_span(m.start(), m.end()),
            )
        })
        .collect()
}
