//! Domains, IPs, email addresses and URLs (spec.md §4.5 "Network (mixed)").

use std::net::Ipv6Addr;
use std::sync::LazyLock;

use percent_encoding::percent_decode;
use regex::bytes::{Match, Regex};

use crate::config;
use crate::keyword::MIXED_CASE_OBF;
use crate::node::Node;

const DOMAIN_TYPE: &str = "network.domain";
const IP_TYPE: &str = "network.ip";
const IPV6_TYPE: &str = "network.ipv6";
const EMAIL_TYPE: &str = "network.email";
const URL_TYPE: &str = "network.url";
const IP_OBF: &str = "ip_obfuscation";
const DOTPATH_OBF: &str = "url.dotpath";
const PERCENT_OBF: &str = "escape.percent";

const OCTET_SRC: &str = r"(?:0x0*[a-f0-9]{1,2}|0*\d{1,3})";

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:[a-z0-9-]+\.)+(?:xn--[a-z0-9]{4,18}|[a-z]{2,12})").unwrap()
});

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[a-z0-9._%+-]{3,}@((?:[a-z0-9-]+\.)+(?:xn--[a-z0-9]{4,18}|[a-z]{2,12}))").unwrap());

static IP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)(?:{OCTET_SRC}\.){{3}}{OCTET_SRC}")).unwrap());

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    regex::bytes::RegexBuilder::new(concat!(
        r"(?i)(?:ftp|https?)://",
        r"(?:[\w!$\-.:;=~@]{0,2000}@)?",
        r"(?:(?:(?:%5[Bb])?[%A-Za-z0-9.-]{4,253})|(?:\[|%5[Bb])[%0-9A-Fa-f:]{3,117}(?:\]|%5[Dd]))",
        r"(?::[0-9]{0,5})?",
        r"(?:[/?#](?:[\w!#$%&'()*+,\-./:;=?@~]{0,2000})?)?",
    ))
    .size_limit(256 * 1024 * 1024)
    .build()
    .unwrap()
});

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn preceded_by_word_or_dot(data: &[u8], start: usize) -> bool {
    start > 0 && {
        let b = data[start - 1];
        is_word_byte(b) || b == b'.'
    }
}

fn followed_by_word_or_dot(data: &[u8], end: usize) -> bool {
    data.get(end).is_some_and(|&b| is_word_byte(b) || b == b'.')
}

fn domain_context_ok(data: &[u8], start: usize, end: usize) -> bool {
    let pre_ok = start == 0
        || !matches!(data[start - 1], b'-' | b'.' | b'\\' | b'_') && !data[start - 1].is_ascii_alphanumeric();
    let post_ok = match data.get(end) {
        None => true,
        Some(&b) => !(b.is_ascii_lowercase()
            || b.is_ascii_digit() && b != b'0'
            || matches!(b, b'.' | b'(' | b'=' | b'_' | b'-')),
    };
    pre_ok && post_ok
}

pub(crate) fn is_domain(domain: &[u8]) -> bool {
    let Some(dot) = domain.iter().rposition(|&b| b == b'.') else {
        return false;
    };
    let (name, tld) = (&domain[..dot], &domain[dot + 1..]);
    if name.is_empty() || domain.len() < 7 {
        return false;
    }
    if config::active().is_false_positive(domain) {
        return false;
    }
    config::active().is_top_level_domain(tld)
}

/// Parses `ip` as an inet_aton-style IPv4 address: each dot-separated octet
/// may be decimal, octal (leading `0`), or hex (leading `0x`).
fn parse_octet(s: &[u8]) -> Option<u32> {
    let text = std::str::from_utf8(s).ok()?;
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(if hex.is_empty() { "0" } else { hex }, 16).ok()
    } else if text.len() > 1 && text.starts_with('0') {
        u32::from_str_radix(text, 8).ok()
    } else {
        text.parse().ok()
    }
}

fn parse_ipv4_octets(ip: &[u8]) -> Option<[u8; 4]> {
    let parts: Vec<&[u8]> = ip.split(|&b| b == b'.').collect();
    if parts.len() != 4 {
        return None;
    }
    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(parts.iter()) {
        let value = parse_octet(part)?;
        if value > 255 {
            return None;
        }
        *slot = value as u8;
    }
    Some(octets)
}

fn is_version_or_section_context(data: &[u8], start: usize, end: usize) -> bool {
    let lookback = &data[start.saturating_sub(16)..start];
    let lower: Vec<u8> = lookback.iter().map(u8::to_ascii_lowercase).collect();
    if lower.ends_with(b"version=") || lower.ends_with(b"version ") {
        return true;
    }
    if lower.windows(b"section ".len()).any(|w| w == b"section ") {
        return true;
    }
    // XML-style numbering: "<tag>1.2.3.4</tag>"
    if data.get(start.wrapping_sub(1)) == Some(&b'>') {
        let ahead = &data[end..data.len().min(end + 40)];
        if ahead.windows(2).any(|w| w == b"</") {
            return true;
        }
    }
    false
}

/// Parse an inet_aton-style IPv4 address into a node with a canonical,
/// dotted-quad `value`.
pub fn parse_ip(ip: &[u8]) -> Option<Node> {
    let octets = parse_ipv4_octets(ip)?;
    if octets == [0, 0, 0, 0] || octets[3] == 0 || octets[3] == 255 {
        return None;
    }
    let canonical = format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3]).into_bytes();
    let obfuscation = if canonical != ip { IP_OBF } else { "" };
    Some(Node::new(IP_TYPE, canonical).with_obfuscation(obfuscation).with_span(0, ip.len()))
}

/// Parse a bracket-free IPv6 address into a node with its canonical
/// (compressed) `value`.
pub fn parse_ipv6(ip: &[u8]) -> Option<Node> {
    let text = std::str::from_utf8(ip).ok()?;
    let addr: Ipv6Addr = text.parse().ok()?;
    let canonical = addr.to_string().into_bytes();
    let obfuscation = if canonical != ip { IP_OBF } else { "" };
    Some(Node::new(IPV6_TYPE, canonical).with_obfuscation(obfuscation).with_span(0, ip.len()))
}

fn is_ip(data: &[u8], m: &Match) -> bool {
    parse_ipv4_octets(m.as_bytes()).is_some_and(|octets| {
        !(octets == [0, 0, 0, 0] || octets[3] == 0 || octets[3] == 255)
    }) && !is_version_or_section_context(data, m.start(), m.end())
}

/// Find domains in data.
pub fn find_domains(data: &[u8]) -> Vec<Node> {
    DOMAIN_RE
        .find_iter(data)
        .filter(|m| domain_context_ok(data, m.start(), m.end()) && is_domain(m.as_bytes()))
        .map(|m| Node::new(DOMAIN_TYPE, m.as_bytes().to_vec()).with_span(m.start(), m.end()))
        .collect()
}

/// Find email addresses in data.
pub fn find_emails(data: &[u8]) -> Vec<Node> {
    EMAIL_RE
        .captures_iter(data)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let domain = caps.get(1)?;
            if !is_domain(domain.as_bytes()) {
                return None;
            }
            Some(Node::new(EMAIL_TYPE, whole.as_bytes().to_vec()).with_span(whole.start(), whole.end()))
        })
        .collect()
}

/// Find IPv4 addresses in data.
pub fn find_ips(data: &[u8]) -> Vec<Node> {
    IP_RE
        .find_iter(data)
        .filter(|m| {
            !preceded_by_word_or_dot(data, m.start())
                && !followed_by_word_or_dot(data, m.end())
                && is_ip(data, m)
        })
        .filter_map(|m| Some(parse_ip(m.as_bytes())?.shift(m.start())))
        .collect()
}

/// Find URLs in data.
pub fn find_urls(data: &[u8]) -> Vec<Node> {
    URL_RE
        .find_iter(data)
        .filter(|m| is_url(m.as_bytes()))
        .map(|m| {
            let (value, obfuscation) = normalize_percent_encoding(m.as_bytes());
            let children = parse_url(m.as_bytes());
            Node::new(URL_TYPE, value)
                .with_obfuscation(obfuscation)
                .with_span(m.start(), m.end())
                .with_children(children)
        })
        .collect()
}

struct UrlParts<'a> {
    scheme: &'a [u8],
    authority: Option<&'a [u8]>,
    path: &'a [u8],
    query: Option<&'a [u8]>,
    fragment: Option<&'a [u8]>,
}

fn split_url(url: &[u8]) -> Option<UrlParts<'_>> {
    let scheme_end = url.iter().position(|&b| b == b':')?;
    let scheme = &url[..scheme_end];
    let rest = url.get(scheme_end + 1..)?.strip_prefix(b"//")?;
    let authority_end = rest.iter().position(|&b| matches!(b, b'/' | b'?' | b'#')).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let tail = &rest[authority_end..];
    let query_start = tail.iter().position(|&b| b == b'?');
    let fragment_start = tail.iter().position(|&b| b == b'#');
    let path_end = [query_start, fragment_start].into_iter().flatten().min().unwrap_or(tail.len());
    let path = &tail[..path_end];
    let after_path = &tail[path_end..];
    let (query, after_query) = if after_path.first() == Some(&b'?') {
        let end = after_path.iter().position(|&b| b == b'#').unwrap_or(after_path.len());
        (Some(&after_path[1..end]), &after_path[end..])
    } else {
        (None, after_path)
    };
    let fragment = after_query.strip_prefix(b"#");
    Some(UrlParts {
        scheme,
        authority: if authority.is_empty() { None } else { Some(authority) },
        path,
        query,
        fragment,
    })
}

fn host_from_authority(authority: &[u8]) -> &[u8] {
    let address = match authority.iter().rposition(|&b| b == b'@') {
        Some(pos) => &authority[pos + 1..],
        None => authority,
    };
    split_host_port(address).0
}

fn is_url(url: &[u8]) -> bool {
    let Some(parts) = split_url(url) else { return false };
    if !matches!(parts.scheme.to_ascii_lowercase().as_slice(), b"http" | b"https" | b"ftp") {
        return false;
    }
    let Some(authority) = parts.authority else { return false };
    let host = host_from_authority(authority);
    if host.is_empty() {
        return false;
    }
    let decoded = percent_decode(host).collect::<Vec<u8>>();
    if let Some(inner) = decoded.strip_prefix(b"[").and_then(|h| h.strip_suffix(b"]")) {
        return std::str::from_utf8(inner).is_ok_and(|s| s.parse::<Ipv6Addr>().is_ok());
    }
    !decoded.is_empty()
}

/// Splits an authority's address part (no userinfo) into host and port,
/// treating the rightmost `:` as a port separator only when everything
/// after it is digits. This sidesteps a lookbehind-based reverse search in
/// the source implementation.
fn split_host_port(address: &[u8]) -> (&[u8], &[u8]) {
    if let Some(idx) = address.iter().rposition(|&b| b == b':') {
        let suffix = &address[idx + 1..];
        if suffix.iter().all(u8::is_ascii_digit) {
            return (&address[..idx], suffix);
        }
    }
    (address, &address[..0])
}

/// Parse a URL into its component child nodes (spec.md §4.5).
pub fn parse_url(url: &[u8]) -> Vec<Node> {
    let Some(parts) = split_url(url) else { return Vec::new() };
    let mut out = Vec::new();
    let mut offset = 0usize;

    if !parts.scheme.is_empty() {
        let original_case = &url[..parts.scheme.len()];
        let lower = parts.scheme.to_ascii_lowercase();
        let upper = parts.scheme.to_ascii_uppercase();
        let obfuscation = if original_case != lower.as_slice() && original_case != upper.as_slice() {
            MIXED_CASE_OBF
        } else {
            ""
        };
        out.push(
            Node::new("network.url.scheme", lower)
                .with_obfuscation(obfuscation)
                .with_span(0, parts.scheme.len()),
        );
        offset += parts.scheme.len() + 1;
    }

    if let Some(authority) = parts.authority {
        offset += 2;
        out.extend(parse_authority(authority).into_iter().map(|n| n.shift(offset)));
        offset += authority.len();
    }

    if !parts.path.is_empty() {
        let (value, obfuscation) = normalize_path(parts.path);
        let start = offset;
        offset += parts.path.len();
        out.push(Node::new("network.url.path", value).with_obfuscation(obfuscation).with_span(start, offset));
    }

    if let Some(query) = parts.query {
        offset += 1;
        let start = offset;
        offset += query.len();
        let decoded = percent_decode(query).collect::<Vec<u8>>();
        out.push(Node::new("network.url.query", decoded).with_span(start, offset));
    }

    if let Some(fragment) = parts.fragment {
        offset += 1;
        let decoded = percent_decode(fragment).collect::<Vec<u8>>();
        out.push(Node::new("network.url.fragment", decoded).with_span(offset, offset + fragment.len()));
    }

    out
}

/// Split a URL authority into username / password / host(-ip) children,
/// percent-decoding each part.
fn parse_authority(authority: &[u8]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut offset = 0usize;

    let (userinfo, address) = match authority.iter().rposition(|&b| b == b'@') {
        Some(pos) => (&authority[..pos], &authority[pos + 1..]),
        None => (&authority[..0], authority),
    };
    let (username, password) = match userinfo.iter().position(|&b| b == b':') {
        Some(pos) => (&userinfo[..pos], Some(&userinfo[pos + 1..])),
        None => (userinfo, None),
    };

    if !username.is_empty() {
        let decoded = percent_decode(username).collect::<Vec<u8>>();
        out.push(Node::new("network.url.username", decoded).with_span(0, username.len()));
        offset += username.len();
    }
    if let Some(password) = password {
        offset += 1;
        let start = offset;
        offset += password.len();
        let decoded = percent_decode(password).collect::<Vec<u8>>();
        out.push(Node::new("network.url.password", decoded).with_span(start, offset));
    }

    let (host, _port) = split_host_port(address);
    if host.is_empty() {
        return out;
    }
    if !userinfo.is_empty() {
        offset += 1;
    }
    let decoded_host = percent_decode(host).collect::<Vec<u8>>();
    if let Some(inner) = decoded_host.strip_prefix(b"[").and_then(|h| h.strip_suffix(b"]")) {
        if let Some(node) = parse_ipv6(inner) {
            out.push(node.shift(offset + 1));
        }
    } else if let Some(node) = parse_ip(&decoded_host) {
        out.push(node.shift(offset));
    } else if is_domain(&decoded_host) {
        out.push(Node::new(DOMAIN_TYPE, decoded_host.clone()).with_span(offset, offset + host.len()));
    }
    out
}

/// Un-encode unreserved percent-escapes and uppercase the rest.
fn normalize_percent_encoding(uri: &[u8]) -> (Vec<u8>, &'static str) {
    static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)%[0-9a-f]{2}").unwrap());
    let mut out = Vec::with_capacity(uri.len());
    let mut last = 0;
    for m in PERCENT_RE.find_iter(uri) {
        out.extend_from_slice(&uri[last..m.start()]);
        let hex = &m.as_bytes()[1..];
        let byte = u8::from_str_radix(std::str::from_utf8(hex).unwrap(), 16).unwrap();
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(byte);
        } else {
            out.extend_from_slice(&m.as_bytes().to_ascii_uppercase());
        }
        last = m.end();
    }
    out.extend_from_slice(&uri[last..]);
    let obfuscation = if out.len() < uri.len() { PERCENT_OBF } else { "" };
    (out, obfuscation)
}

/// Percent-decode a path while preserving `%2F` (otherwise `path/path` and
/// `path%2Fpath` would collapse to the same normalized value) and removing
/// `.`/`..` dot segments.
fn normalize_path(path: &[u8]) -> (Vec<u8>, &'static str) {
    let segments: Vec<Vec<u8>> = path
        .split(|&b| b == b'/')
        .map(|segment| {
            let decoded = percent_decode(segment).collect::<Vec<u8>>();
            let mut out = Vec::with_capacity(decoded.len());
            for b in decoded {
                if b == b'/' {
                    out.extend_from_slice(b"%2F");
                } else {
                    out.push(b);
                }
            }
            out
        })
        .collect();

    let mut dotless: Vec<Vec<u8>> = Vec::with_capacity(segments.len());
    for segment in &segments {
        if segment.as_slice() == b"." {
            continue;
        } else if segment.as_slice() == b".." {
            dotless.pop();
        } else {
            dotless.push(segment.clone());
        }
    }

    if dotless.len() == 1 && dotless[0].is_empty() {
        return (b"/".to_vec(), DOTPATH_OBF);
    }
    let obfuscation = if dotless.len() < segments.len() { DOTPATH_OBF } else { "" };
    (dotless.join(&b'/'), obfuscation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_plain_domain() {
        let hits = find_domains(b"visit google.com today");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"google.com");
        assert_eq!(hits[0].node_type, DOMAIN_TYPE);
    }

    #[test]
    fn rejects_library_so_name() {
        assert!(find_domains(b"libm.so").is_empty());
    }

    #[test]
    fn rejects_member_access_lookalikes() {
        assert!(find_domains(b"this.name").is_empty());
        assert!(find_domains(b"Array.prototype.map").is_empty());
    }

    #[test]
    fn finds_plain_ip() {
        let hits = find_ips(b"ping 8.8.8.8 now");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"8.8.8.8");
        assert_eq!(hits[0].obfuscation, "");
    }

    #[test]
    fn rejects_version_string() {
        assert!(find_ips(b"Version=4.0.0.1").is_empty());
    }

    #[test]
    fn normalizes_obfuscated_octets() {
        let hits = find_ips(b"host 0x08.0x08.0x08.0x08 alive");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"8.8.8.8");
        assert_eq!(hits[0].obfuscation, IP_OBF);
    }

    #[test]
    fn finds_email() {
        let hits = find_emails(b"contact admin@example.com please");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].value, b"admin@example.com");
    }

    #[test]
    fn finds_url_with_domain_child() {
        let hits = find_urls(b"https://some.domain.com");
        assert_eq!(hits.len(), 1);
        let url = &hits[0];
        assert_eq!(url.value, b"https://some.domain.com");
        let scheme = url.children.iter().find(|c| c.node_type == "network.url.scheme").unwrap();
        assert_eq!(scheme.value, b"https");
        let domain = url.children.iter().find(|c| c.node_type == DOMAIN_TYPE).unwrap();
        assert_eq!(domain.value, b"some.domain.com");
    }

    #[test]
    fn url_path_strips_dot_segments() {
        let hits = find_urls(b"http://example.com/a/../b");
        let path = hits[0].children.iter().find(|c| c.node_type == "network.url.path").unwrap();
        assert_eq!(path.value, b"/b");
        assert_eq!(path.obfuscation, DOTPATH_OBF);
    }

    #[test]
    fn schema_url_is_not_treated_as_base64() {
        let hits = find_urls(b"http://schemas.microsoft.com/SMI/2016/WindowsSettings");
        assert_eq!(hits.len(), 1);
    }
}
