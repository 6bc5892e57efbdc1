//! The recursive multi-decoder scan engine (spec.md §4.7).
//!
//! `scan_node` drives every registered decoder over a buffer, sorts the
//! results, and resolves nesting/overlap with a context stack instead of
//! host recursion (spec.md §9's "convert to an explicit work-stack"
//! recommendation) — only the bounded recursion into freshly-decoded
//! transformer output (at most `depth_limit` levels deep) uses the Rust
//! call stack, since that recursion is already capped by the depth limit.

use crate::node::Node;
use crate::registry::Registry;

/// Default recursion depth, matching the original `DEFAULT_DEPTH`.
pub const DEFAULT_DEPTH: i32 = 10;

/// Scan `data` from scratch and return the root of the resulting tree.
pub fn scan(data: &[u8], registry: &Registry) -> Node {
    scan_with_depth(data, registry, DEFAULT_DEPTH)
}

/// Scan `data` with an explicit depth limit.
pub fn scan_with_depth(data: &[u8], registry: &Registry, depth_limit: i32) -> Node {
    let root = Node::new("", data.to_vec()).with_span(0, data.len());
    scan_node(root, registry, depth_limit)
}

struct Frame {
    node: Node,
    offset: usize,
}

/// Report the combined analysis results for `node`, recursing into newly
/// decoded content up to `depth_limit` levels.
pub fn scan_node(node: Node, registry: &Registry, depth_limit: i32) -> Node {
    if depth_limit <= 0 {
        return node;
    }
    if !node.children.is_empty() {
        // Don't rescan nodes that already have children (decoder-provided
        // subtrees); just deepen them.
        let Node { node_type, value, obfuscation, start, end, children } = node;
        let children = children
            .into_iter()
            .map(|c| scan_node(c, registry, depth_limit - 1))
            .collect();
        return Node { node_type, value, obfuscation, start, end, children };
    }

    let mut results: Vec<Node> = registry
        .iter()
        .flat_map(|decoder| decoder(&node.value))
        .filter(|hit| !hit.value.is_empty())
        .collect();
    // (start ascending, end descending) so enclosing matches sort before
    // matches they contain at the same start.
    results.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut stack: Vec<Frame> = Vec::new();
    let mut current = node;
    let mut offset: usize = 0;
    let mut decode_end: usize = 0;

    for mut hit in results {
        if hit.end <= decode_end {
            continue;
        }
        // Unwind out of contexts the hit has escaped.
        while hit.end > offset + current.value.len() {
            let Some(frame) = stack.pop() else {
                log::error!("multidecoder: context stack underflow during scan, returning partial tree");
                return current;
            };
            let mut parent = frame.node;
            parent.children.push(current);
            current = parent;
            offset = frame.offset;
        }
        if hit.start < offset {
            log::error!("multidecoder: hit starts before current context offset, dropping hit");
            continue;
        }
        hit = hit.shift_neg(offset);

        // Self-loop guard: don't let a decoder rematch its own output.
        if hit.start == 0 && hit.value == current.value && hit.node_type == current.node_type {
            continue;
        }

        let is_transformer = hit.value.to_ascii_lowercase()
            != hit.original(&current.value).to_ascii_lowercase()
            || !hit.children.is_empty();

        if is_transformer {
            decode_end = hit.end;
            let scanned = scan_node(hit, registry, depth_limit - 1);
            current.children.push(scanned);
        } else {
            // Pure detector: it becomes the new context. Don't attach it to
            // `current.children` yet — it is attached when its own context
            // is popped (or, for the outermost case, when `scan_node`
            // returns and the caller is itself inside a parent context).
            let hit_start = hit.start;
            stack.push(Frame { node: current, offset });
            current = hit;
            offset += hit_start;
        }
    }

    while let Some(frame) = stack.pop() {
        let mut parent = frame.node;
        parent.children.push(current);
        current = parent;
    }
    current
}

impl Node {
    fn shift_neg(mut self, offset: usize) -> Node {
        self.start = self.start.saturating_sub(offset);
        self.end = self.end.saturating_sub(offset);
        self
    }
}
