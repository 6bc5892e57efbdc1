//! Tree queries: deobfuscated byte stream, human-readable summary, and
//! obfuscation-label tallies (spec.md §4.8 "Flatten / query").

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::node::Node;

/// Reproduce the original byte stream with every transformer's original
/// bytes replaced by its decoded `value`, recursively.
pub fn flatten(node: &Node) -> Vec<u8> {
    let mut out = Vec::new();
    let mut last_end = 0usize;
    for child in &node.children {
        if child.start < last_end {
            continue; // overlapping child; keep the first one seen
        }
        let gap_start = last_end.min(node.value.len());
        let gap_end = child.start.min(node.value.len());
        out.extend_from_slice(&node.value[gap_start..gap_end]);

        let flattened = flatten(child);
        if child.node_type.ends_with("string") {
            out.push(b'"');
            out.extend_from_slice(&flattened);
            out.push(b'"');
        } else {
            out.extend_from_slice(&flattened);
        }
        last_end = child.end;
    }
    let tail_start = last_end.min(node.value.len());
    out.extend_from_slice(&node.value[tail_start..]);
    out
}

/// A `repr()`-style rendering of a byte string: printable ASCII verbatim,
/// everything else as a `\xHH` escape.
fn byte_repr(value: &[u8]) -> String {
    let mut out = String::with_capacity(value.len() + 3);
    out.push_str("b'");
    for &b in value {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out.push('\'');
    out
}

fn label_at(path: &str, node_type: &str, obfuscation: &str) -> String {
    let mut label = String::new();
    if !path.is_empty() {
        label.push_str(path);
        label.push('/');
    }
    label.push_str(node_type);
    if !obfuscation.is_empty() {
        label.push_str("/>");
        label.push_str(obfuscation);
    }
    label
}

fn walk_summary(node: &Node, path: &str, out: &mut Vec<String>) {
    for child in &node.children {
        let label = label_at(path, &child.node_type, &child.obfuscation);
        out.push(format!("{} {}", label, byte_repr(&child.value)));
        walk_summary(child, &label, out);
    }
}

/// Depth-first pre-order summary lines, one per descendant, each formatted
/// `<label-path> <repr(value)>`.
pub fn string_summary(node: &Node) -> Vec<String> {
    let mut out = Vec::new();
    walk_summary(node, "", &mut out);
    out
}

/// Count occurrences of each non-empty obfuscation label across the tree.
pub fn obfuscation_counts(tree: &Node) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    if !tree.obfuscation.is_empty() {
        *counts.entry(tree.obfuscation.clone()).or_insert(0) += 1;
    }
    for node in tree.iter_descendants() {
        if !node.obfuscation.is_empty() {
            *counts.entry(node.obfuscation.clone()).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_replaces_transformer_with_decoded_value() {
        let child = Node::new("", b"hello".to_vec()).with_obfuscation("encoding.base64").with_span(5, 13);
        let root = Node::new("", b"text: aGVsbG8= end".to_vec()).with_children(vec![child]);
        assert_eq!(flatten(&root), b"text: hello end");
    }

    #[test]
    fn flatten_wraps_string_typed_children_in_quotes() {
        let child = Node::new("string", b"hello".to_vec()).with_span(0, 5);
        let root = Node::new("", b"hello".to_vec()).with_children(vec![child]);
        assert_eq!(flatten(&root), b"\"hello\"");
    }

    #[test]
    fn flatten_is_identity_for_leaf_node() {
        let root = Node::new("", b"no children here".to_vec());
        assert_eq!(flatten(&root), b"no children here");
    }

    #[test]
    fn string_summary_builds_nested_label_path() {
        let grandchild = Node::new("network.domain", b"evil.com".to_vec()).with_span(0, 8);
        let child = Node::new("", b"evil.com".to_vec()).with_obfuscation("encoding.base64").with_children(vec![grandchild]);
        let root = Node::new("", vec![]).with_children(vec![child]);
        let lines = string_summary(&root);
        assert_eq!(lines[0], "/>encoding.base64 b'evil.com'");
        assert_eq!(lines[1], "/>encoding.base64/network.domain b'evil.com'");
    }

    #[test]
    fn obfuscation_counts_tallies_nonempty_labels() {
        let child_a = Node::new("t", vec![]).with_obfuscation("encoding.base64");
        let child_b = Node::new("t", vec![]).with_obfuscation("encoding.base64");
        let child_c = Node::new("t", vec![]);
        let root = Node::new("", vec![]).with_children(vec![child_a, child_b, child_c]);
        let counts = obfuscation_counts(&root);
        assert_eq!(counts.get("encoding.base64"), Some(&2));
        assert_eq!(counts.len(), 1);
    }
}
