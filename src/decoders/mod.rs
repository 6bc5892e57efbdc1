//! The decoder library (spec.md §4.4): ~20 pure functions `&[u8] -> Vec<Node>`.

pub mod base64;
pub mod chr;
pub mod concat;
pub mod filename;
pub mod hex;
pub mod network;
pub mod path;
pub mod pe_file;
pub mod powershell_bytes;
pub mod replace;
pub mod reverse;
pub mod shell;
pub mod unescape;
pub mod utf16;
pub mod vba;
pub mod xml;

/// Shared regex for quoted-string literals, used by concat/replace/reverse
/// decoders to recognize VB/JS/PowerShell string arguments (spec.md §4.4
/// "String concatenation").
pub(crate) const STRING_RE_SRC: &str = concat!(
    r#""(?:[^"`\\]*(?:""|`.|\\[^"]|\\""?))*[^"`\\]*""#,
    "|",
    r"'(?:[^']*'')*[^']*'"
);
