//! POSIX and Windows file paths (spec.md §4.4 "Paths (detector)").

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::filename::ext_type;
use super::network::{is_domain, parse_ip};
use crate::hit::match_to_hit;
use crate::node::Node;

static PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.]?[.]?/(?:\w{3,}/)+[\w.]{3,}").unwrap());

static WINDOWS_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:",
        r"\\\\[.?]\\(?:[a-z]:\\|UNC\\[\w.-]+\\(?:[a-z][$]\\)?|Volume\{[a-z0-9-]{36}\}\\)?",
        r"|\\\\[\w.-]+(?:@SSL)?(?:@\d{0,5})?\\(?:[a-z][$]\\)?",
        r"|[a-z]:\\?",
        r"|\\",
        r")?",
        r"(?:(?:[.]|[.][.]|[\w.-]{3,})\\)+",
        r"[\w.-]{3,}",
    ))
    .unwrap()
});

/// Find POSIX-style paths.
pub fn find_path(data: &[u8]) -> Vec<Node> {
    PATH_RE.find_iter(data).map(|m| match_to_hit("path", m)).collect()
}

fn host_child(hostname: &[u8], offset: usize) -> Option<Node> {
    if let Some(node) = parse_ip(hostname) {
        return Some(node.shift(offset));
    }
    if is_domain(hostname) {
        return Some(Node::new("network.domain", hostname.to_vec()).with_span(offset, offset + hostname.len()));
    }
    None
}

/// Remove `.` and `..` segments from a backslash-separated Windows path,
/// preserving whatever fixed root prefix it has (drive letter, UNC share,
/// or device path) since those components can never be popped.
fn normalize_windows_path(path: &[u8]) -> Vec<u8> {
    let segments: Vec<&[u8]> = path.split(|&b| b == b'\\').collect();

    let root_len = if path.len() >= 2 && &path[..2] == b"\\\\" {
        if segments.len() > 2 && (segments[2] == b"." || segments[2] == b"?") {
            // device path: "", "", ".", [UNC, server, share? | drive]
            if segments.get(3).is_some_and(|s| s.eq_ignore_ascii_case(b"UNC")) {
                6.min(segments.len())
            } else {
                4.min(segments.len())
            }
        } else {
            // UNC path: "", server, share
            3.min(segments.len())
        }
    } else if path.first() == Some(&b'\\') {
        1
    } else if segments.first().is_some_and(|s| s.len() == 2 && s[1] == b':') {
        1
    } else {
        0
    };

    let root: Vec<&[u8]> = segments[..root_len].to_vec();
    let mut stack: Vec<&[u8]> = Vec::new();
    for seg in &segments[root_len..] {
        match *seg {
            b"." | b"" => {}
            b".." => {
                if stack.last().is_some_and(|s| *s != b"..") {
                    stack.pop();
                } else if root_len == 0 {
                    stack.push(b"..");
                }
            }
            other => stack.push(other),
        }
    }

    let mut out = Vec::new();
    for (i, seg) in root.iter().chain(stack.iter()).enumerate() {
        if i > 0 {
            out.push(b'\\');
        }
        out.extend_from_slice(seg);
    }
    out
}

/// Find Windows-style paths, extracting UNC/device-path hostnames and
/// recognized filename extensions as children.
pub fn find_windows_path(data: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    for m in WINDOWS_PATH_RE.find_iter(data) {
        let original = m.as_bytes();
        let normalized = normalize_windows_path(original);
        let obfuscation = if normalized.len() < original.len() { "windows.dotpath" } else { "" };

        let segments: Vec<&[u8]> = normalized.split(|&b| b == b'\\').collect();
        let mut children = Vec::new();
        let path_type = if normalized.starts_with(b"\\\\.") || normalized.starts_with(b"\\\\?") {
            if segments.get(3).is_some_and(|s| s.eq_ignore_ascii_case(b"UNC")) {
                if let Some(hostname) = segments.get(4) {
                    let hostname = hostname.split(|&b| b == b'@').next().unwrap_or(hostname);
                    if let Some(child) = host_child(hostname, 8) {
                        children.push(child);
                    }
                }
            }
            "windows.device.path"
        } else if normalized.starts_with(b"\\\\") {
            if let Some(hostname) = segments.get(2) {
                let hostname = hostname.split(|&b| b == b'@').next().unwrap_or(hostname);
                if let Some(child) = host_child(hostname, 2) {
                    children.push(child);
                }
            }
            "windows.unc.path"
        } else {
            "windows.path"
        };

        if let Some(filename) = segments.last() {
            if let Some(dot) = filename.iter().rposition(|&b| b == b'.') {
                let extension = filename[dot..].to_ascii_lowercase();
                let start = normalized.len() - filename.len();
                children.push(Node::new(ext_type(&extension), filename.to_vec()).with_span(start, normalized.len()));
            }
        }

        out.push(
            Node::new(path_type, normalized)
                .with_obfuscation(obfuscation)
                .with_span(m.start(), m.end())
                .with_children(children),
        );
    }
    out
}
