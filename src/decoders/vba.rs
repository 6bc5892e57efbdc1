//! VBA `CreateObject(...)` calls (spec.md §4.4).

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::node::Node;

static CREATE_OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)createobject\(").unwrap());

const OPEN_BRACE: u8 = b'(';
const CLOSE_BRACE: u8 = b')';

/// Find the index just past the brace matching the open brace that ends at
/// `start_index - 1`, or `None` if the braces never balance.
fn closing_brace(data: &[u8], start_index: usize) -> Option<usize> {
    let mut balance = 1i32;
    let mut index = start_index;
    while index < data.len() && balance != 0 {
        if data[index] == CLOSE_BRACE {
            balance -= 1;
        } else if data[index] == OPEN_BRACE {
            balance += 1;
        }
        index += 1;
    }
    if balance == 0 { Some(index) } else { None }
}

/// Find `CreateObject(...)` calls, matching nested parentheses.
pub fn find_createobject(data: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    for m in CREATE_OBJECT_RE.find_iter(data) {
        if let Some(end) = closing_brace(data, m.end()) {
            out.push(Node::new("vba.function.createobject", data[m.start()..end].to_vec()).with_span(m.start(), end));
        }
    }
    out
}
