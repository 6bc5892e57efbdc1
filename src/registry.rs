//! Decoder registry: collects built-in decoders plus keyword-file-derived
//! ones into a single ordered list the scan engine drives (spec.md §4.3, §9
//! "dynamic dispatch on decoder set" design note — realized here as an
//! explicit `Vec` of boxed closures built once at startup, the suggested
//! `inventory`-style alternative to Python's decorator-based registration).

use std::path::Path;

use crate::decoders;
use crate::error::{MultidecoderError, MultidecoderResult};
use crate::keyword::find_keywords;
use crate::node::Node;

/// A decoder is a pure function `&[u8] -> Vec<Node>`: deterministic, no I/O,
/// no network, never lets an error escape (spec.md §4.3).
pub type Decoder = Box<dyn Fn(&[u8]) -> Vec<Node> + Send + Sync>;

/// An ordered, read-only list of decoders. Safe to share across threads
/// (wrap in `Arc` if needed) once built, since no decoder mutates shared
/// state.
pub type Registry = Vec<Decoder>;

fn boxed(f: fn(&[u8]) -> Vec<Node>) -> Decoder {
    Box::new(f)
}

/// The built-in decoder set, in the order listed by spec.md §2/§4.
pub fn builtin_decoders() -> Registry {
    vec![
        boxed(decoders::base64::find_base64),
        boxed(decoders::base64::find_base64decode),
        boxed(decoders::base64::find_from_base64_string),
        boxed(decoders::hex::find_hex),
        boxed(decoders::hex::find_from_hex_string),
        boxed(decoders::xml::find_xml_hex),
        boxed(decoders::utf16::find_utf16),
        boxed(decoders::chr::find_chr),
        boxed(decoders::concat::find_concat),
        boxed(decoders::replace::find_replace),
        boxed(decoders::replace::find_powershell_replace),
        boxed(decoders::replace::find_vba_replace),
        boxed(decoders::replace::find_js_regex_replace),
        boxed(decoders::reverse::find_reverse),
        boxed(decoders::reverse::find_strreverse),
        boxed(decoders::unescape::find_unescape),
        boxed(decoders::network::find_domains),
        boxed(decoders::network::find_emails),
        boxed(decoders::network::find_ips),
        boxed(decoders::network::find_urls),
        boxed(decoders::path::find_path),
        boxed(decoders::path::find_windows_path),
        boxed(decoders::filename::find_executable_name),
        boxed(decoders::filename::find_library),
        boxed(decoders::pe_file::find_pe_files),
        boxed(decoders::shell::find_cmd_strings),
        boxed(decoders::shell::find_powershell_strings),
        boxed(decoders::vba::find_createobject),
        boxed(decoders::powershell_bytes::find_powershell_bytes),
    ]
}

/// Build a registry from a keyword directory (one decoder per file) plus
/// the built-in analyzers.
pub fn build_registry(keyword_dir: Option<&Path>) -> MultidecoderResult<Registry> {
    let mut registry = match keyword_dir {
        Some(dir) => get_keywords(dir)?,
        None => Vec::new(),
    };
    registry.extend(builtin_decoders());
    Ok(registry)
}

/// Load one keyword-search decoder per file in `directory` (recursing into
/// subdirectories), using the file name as the label (spec.md §4.5, §6
/// "Keyword file format").
fn get_keywords(directory: &Path) -> MultidecoderResult<Registry> {
    if !directory.is_dir() {
        return Err(MultidecoderError::config(format!(
            "--keywords argument must be a directory: {}",
            directory.display()
        )));
    }
    let mut out: Registry = Vec::new();
    let mut stack = vec![directory.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let contents = std::fs::read(&path)?;
            let keywords: Vec<Vec<u8>> = contents
                .split(|&b| b == b'\n')
                .map(|line| {
                    let line = line.strip_suffix(b"\r").unwrap_or(line);
                    line.to_vec()
                })
                .filter(|line| !line.is_empty())
                .collect();
            if keywords.is_empty() {
                continue;
            }
            out.push(Box::new(move |data: &[u8]| find_keywords(&label, &keywords, data)));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_registry_is_non_empty() {
        assert!(!builtin_decoders().is_empty());
    }

    #[test]
    fn keyword_directory_loads_one_decoder_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("suspicious.txt");
        let mut f = std::fs::File::create(&file_path).unwrap();
        writeln!(f, "evil").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "bad").unwrap();
        drop(f);

        let registry = build_registry(Some(dir.path())).unwrap();
        let keyword_decoder = &registry[0];
        let hits = keyword_decoder(b"this contains evil code");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node_type, "suspicious.txt");
    }

    #[test]
    fn non_directory_keyword_path_is_a_config_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = build_registry(Some(file.path()));
        assert!(matches!(result, Err(MultidecoderError::Config { .. })));
    }
}
