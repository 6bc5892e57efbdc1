//! `cmd.exe` and PowerShell command lines (spec.md §4.4 "Shell (cmd/powershell)").

use std::sync::LazyLock;

use base64::Engine;
use regex::bytes::Regex;

use crate::node::Node;

static CMD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)("(?:C:\\WINDOWS\\system32\\)?\bcmd(?:\.exe)?"|(?:C:\\Windows\\System32\\)?\bc\^?m\^?d\b)[^\x00]*"#).unwrap()
});

static POWERSHELL_INDICATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:^|/c|/k|/r|[;,=&'"({\\])\s*(\^?\bp\^?(?:o\^?w\^?e\^?r\^?s\^?h\^?e\^?l\^?l|w\^?s\^?h)(?:\^?\.\^?e\^?x\^?e)?)\b"#,
    )
    .unwrap()
});

static ENC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?i)\"?(?:(?:\^?\s)*\^?(?:\s\^?-|/)[a-z^]+)*(?:\^?\s)*\^?(?:\s\^?-|/)\^?"#,
        r#"e\^?(?:c|n\^?(?:c\^?(?:o\^?(?:d\^?(?:e\^?(?:d\^?(?:c\^?(?:o\^?(?:m\^?(?:m\^?(?:a\^?(?:n\^?d?)?)?)?)?)?)?)?)?)?)?)?)?"#,
        r#"(?:\^?\s)+\^?["']?[a-z0-9+/^]{4,}=?\^?=?\^?['"]?"#,
    ))
    .unwrap()
});

/// Strip `cmd.exe` caret escapes outside of double-quoted runs. `^^` becomes
/// `^`, `^\r\n` (a line continuation) is dropped entirely.
fn strip_carets(cmd: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(cmd.len());
    let mut in_string = false;
    let mut i = 0;
    while i + 1 < cmd.len() {
        let c = cmd[i];
        if c == b'"' {
            in_string = !in_string;
        } else if c == b'\r' {
            in_string = false;
        } else if c == b'^' && !in_string {
            i += 1;
            if cmd[i] == b'\r' {
                i += 2;
            }
        }
        out.push(cmd[i]);
        i += 1;
    }
    if i < cmd.len() && (cmd[i] != b'^' || in_string) {
        out.push(cmd[i]);
    }
    out
}

fn deobfuscate_cmd(cmd: &[u8]) -> (Vec<u8>, &'static str) {
    let stripped = strip_carets(cmd);
    let obfuscation = if stripped != cmd { "unescape.shell.carets" } else { "" };
    (stripped, obfuscation)
}

fn strip_trailing_unmatched_quote(deobfuscated: Vec<u8>) -> Vec<u8> {
    let mut parts: Vec<&[u8]> = deobfuscated.split(|&b| b == b' ').filter(|s| !s.is_empty()).collect();
    if parts.is_empty() {
        return deobfuscated;
    }
    let first = parts[0];
    let trailing_double = !first.starts_with(b"\"") && first.ends_with(b"\"");
    let trailing_single = !first.starts_with(b"'") && first.ends_with(b"'");
    if trailing_double || trailing_single {
        let trimmed = &first[..first.len() - 1];
        let mut rebuilt = trimmed.to_vec();
        for part in &parts[1..] {
            rebuilt.push(b' ');
            rebuilt.extend_from_slice(part);
        }
        parts.clear();
        return rebuilt;
    }
    deobfuscated
}

/// Find `cmd.exe` command lines, stripping caret obfuscation.
pub fn find_cmd_strings(data: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    for m in CMD_RE.find_iter(data) {
        let start = m.start();
        let mut full_cmd = m.as_bytes();
        let mut end = m.end();
        let mut parens: i32 = 0;
        for (i, &c) in full_cmd.iter().enumerate() {
            if c == b')' {
                parens -= 1;
            } else if c == b'(' {
                parens += 1;
            }
            if parens < 0 {
                full_cmd = &full_cmd[..i];
                end = start + i;
                break;
            }
        }
        let (deobfuscated, obfuscation) = deobfuscate_cmd(full_cmd);
        let deobfuscated = strip_trailing_unmatched_quote(deobfuscated);
        out.push(Node::new("shell.cmd", deobfuscated).with_obfuscation(obfuscation).with_span(start, end));
    }
    out
}

fn find_string_end(data: &[u8], from: usize, needle: u8) -> usize {
    data[from..].iter().position(|&b| b == needle).map(|p| from + p).unwrap_or(data.len())
}

fn decode_utf16_lossy(bytes: &[u8]) -> Vec<u8> {
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
    char::decode_utf16(units).filter_map(Result::ok).collect::<String>().into_bytes()
}

/// Find PowerShell invocations, decoding `-EncodedCommand` arguments and
/// stripping caret obfuscation.
pub fn find_powershell_strings(data: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    for indicator in POWERSHELL_INDICATOR_RE.captures_iter(data) {
        let Some(group) = indicator.get(1) else { continue };
        let start = group.start();

        let enc = ENC_RE.find(&data[group.end()..]).filter(|m| m.start() == 0);

        let (end, powershell): (usize, &[u8]) = if let Some(enc) = enc {
            let abs_end = group.end() + enc.end();
            (abs_end, &data[start..abs_end])
        } else {
            let lookback: Vec<u8> = data[..start].iter().rev().copied().collect();
            let bound = lookback.iter().position(|&b| b == b'"' || b == b'\'');
            match bound {
                Some(pos) => {
                    let quote = lookback[pos];
                    let end = find_string_end(data, start, quote);
                    (end, &data[start..end])
                }
                None => (data.len(), &data[start..]),
            }
        };

        let (deobfuscated, obfuscation) = deobfuscate_cmd(powershell);

        if enc.is_some() {
            let Some(split_at) = deobfuscated.iter().rposition(|&b| b == b' ') else { continue };
            let (invocation, encoded_raw) = (&deobfuscated[..split_at], &deobfuscated[split_at + 1..]);
            let encoded: Vec<u8> = encoded_raw.iter().copied().filter(|&b| b != b'\'' && b != b'"').collect();
            if encoded.len() % 4 != 0 || encoded.contains(&b'^') {
                continue;
            }
            let Ok(raw) = base64::engine::general_purpose::STANDARD.decode(&encoded) else { continue };
            let decoded_command = decode_utf16_lossy(&raw);

            let invocation_with_dashes: Vec<u8> = invocation
                .split(|&b| b == b'/')
                .collect::<Vec<_>>()
                .join(&b" -"[..]);
            let mut args: Vec<Vec<u8>> = invocation_with_dashes
                .split(|&b| b == b' ')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_vec())
                .collect();
            if let Some(first) = args.first() {
                let trailing_double = !first.starts_with(b"\"") && first.ends_with(b"\"");
                let trailing_single = !first.starts_with(b"'") && first.ends_with(b"'");
                if trailing_double || trailing_single {
                    args[0].pop();
                }
            }
            // Drop the encoded-command flag itself (args.last()); only the
            // binary/invocation prefix survives before appending -Command.
            args.pop();
            let mut value = args.join(&b" "[..]);
            value.extend_from_slice(b" -Command ");
            value.extend_from_slice(&decoded_command);

            out.push(
                Node::new("shell.powershell", value).with_obfuscation("powershell.base64").with_span(start, end),
            );
        } else {
            out.push(Node::new("shell.powershell", deobfuscated).with_obfuscation(obfuscation).with_span(start, end));
        }
    }
    out
}
