//! Builds [`Node`]s out of regex matches; these are conveniences, not the
//! decoder contract itself (see `crate::registry` for the contract).

use regex::bytes::{Captures, Match};

use crate::node::Node;

/// Build a detector hit from a match's whole span (group 0): the matched
/// bytes become `value` verbatim, with empty obfuscation.
pub fn match_to_hit(label: &str, m: Match<'_>) -> Node {
    Node::new(label, m.as_bytes().to_vec()).with_span(m.start(), m.end())
}

/// Build a detector hit from a specific capture group's span.
pub fn group_to_hit(label: &str, caps: &Captures<'_>, group: usize) -> Option<Node> {
    let m = caps.get(group)?;
    Some(match_to_hit(label, m))
}

/// Build a transformer hit: `deobfuscate` turns the `deob_group` capture
/// into `(decoded_bytes, obfuscation_label)`; the node's span is taken from
/// `context_group` (which may cover more than just the decoded group, e.g.
/// to include a surrounding function call).
pub fn find_and_deobfuscate<F>(
    label: &str,
    re: &regex::bytes::Regex,
    data: &[u8],
    deobfuscate: F,
    deob_group: usize,
    context_group: usize,
) -> Vec<Node>
where
    F: Fn(&[u8]) -> (Vec<u8>, &'static str),
{
    re.captures_iter(data)
        .filter_map(|caps| {
            let deob_match = caps.get(deob_group)?;
            let ctx_match = caps.get(context_group)?;
            let (decoded, obfuscation) = deobfuscate(deob_match.as_bytes());
            Some(
                Node::new(label, decoded)
                    .with_obfuscation(obfuscation)
                    .with_span(ctx_match.start(), ctx_match.end()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::bytes::Regex;

    #[test]
    fn match_to_hit_copies_span_and_value() {
        let re = Regex::new(r"foo").unwrap();
        let m = re.find(b"xx foo yy").unwrap();
        let node = match_to_hit("t", m);
        assert_eq!(node.value, b"foo");
        assert_eq!((node.start, node.end), (3, 6));
        assert_eq!(node.obfuscation, "");
    }
}
