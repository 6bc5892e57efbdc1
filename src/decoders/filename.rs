//! Executable / library filenames (spec.md §4.4).

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::hit::match_to_hit;
use crate::node::Node;

pub(crate) const EXECUTABLE_TYPE: &str = "executable.filename";
pub(crate) const LIBRARY_TYPE: &str = "executable.library.filename";

static EXECUTABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b\w+\.exe\b").unwrap());
static LIBRARY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b\w+\.dll\b").unwrap());

/// Map a (lowercased) file extension to its semantic filename type, falling
/// back to the generic `"filename"` label. Shared with the path decoders.
pub(crate) fn ext_type(extension: &[u8]) -> &'static str {
    match extension {
        b".exe" => EXECUTABLE_TYPE,
        b".dll" => LIBRARY_TYPE,
        _ => "filename",
    }
}

/// Find `*.exe` filenames.
pub fn find_executable_name(data: &[u8]) -> Vec<Node> {
    EXECUTABLE_RE.find_iter(data).map(|m| match_to_hit(EXECUTABLE_TYPE, m)).collect()
}

/// Find `*.dll` filenames.
pub fn find_library(data: &[u8]) -> Vec<Node> {
    LIBRARY_RE.find_iter(data).map(|m| match_to_hit(LIBRARY_TYPE, m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_exe_filename() {
        let hits = find_executable_name(b"run setup.exe now");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"setup.exe");
        assert_eq!(hits[0].node_type, EXECUTABLE_TYPE);
    }

    #[test]
    fn finds_dll_filename() {
        let hits = find_library(b"load kernel32.dll");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"kernel32.dll");
        assert_eq!(hits[0].node_type, LIBRARY_TYPE);
    }
}
