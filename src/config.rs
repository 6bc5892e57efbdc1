//! Domain / TLD reference tables (spec.md §9 design note: these are data,
//! not core logic, so they live in a TOML file rather than hardcoded sets).

use std::collections::HashSet;
use std::path::Path;
use std::sync::{LazyLock, OnceLock};

use serde::Deserialize;

use crate::error::{MultidecoderError, MultidecoderResult};

const DEFAULT_TABLES_TOML: &str = include_str!("../config/domains.toml");

#[derive(Debug, Deserialize)]
struct RawTables {
    top_level_domains: Vec<String>,
    false_positive_domains: Vec<String>,
}

/// Registered top level domains and a denylist of strings that look like
/// domains but aren't (member accesses, shared-library names, ...).
pub struct DomainTables {
    top_level_domains: HashSet<Vec<u8>>,
    false_positive_domains: HashSet<Vec<u8>>,
}

impl DomainTables {
    fn from_raw(raw: RawTables) -> Self {
        DomainTables {
            top_level_domains: raw.top_level_domains.into_iter().map(|s| s.to_ascii_uppercase().into_bytes()).collect(),
            false_positive_domains: raw.false_positive_domains.into_iter().map(String::into_bytes).collect(),
        }
    }

    fn parse(text: &str) -> MultidecoderResult<Self> {
        let raw: RawTables = toml::from_str(text).map_err(|e| MultidecoderError::config(format!("invalid domain table: {e}")))?;
        Ok(Self::from_raw(raw))
    }

    /// Load tables from a TOML file, falling back to the bundled defaults
    /// when `path` is `None`.
    pub fn load(path: Option<&Path>) -> MultidecoderResult<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                Self::parse(&text)
            }
            None => Self::parse(DEFAULT_TABLES_TOML),
        }
    }

    /// Whether `tld` (without the leading dot) is a registered TLD, matched
    /// case-insensitively.
    pub fn is_top_level_domain(&self, tld: &[u8]) -> bool {
        self.top_level_domains.contains(&tld.to_ascii_uppercase())
    }

    /// Whether `domain` exactly matches a known false-positive entry.
    pub fn is_false_positive(&self, domain: &[u8]) -> bool {
        self.false_positive_domains.contains(domain)
    }
}

static DEFAULT_TABLES: LazyLock<DomainTables> =
    LazyLock::new(|| DomainTables::parse(DEFAULT_TABLES_TOML).expect("bundled domain table is valid TOML"));

static ACTIVE_TABLES: OnceLock<DomainTables> = OnceLock::new();

/// Install a non-default table set (e.g. loaded from `--tld-config`) for the
/// lifetime of the process. Must be called before any decoder runs; a
/// second call is a no-op.
pub fn install(tables: DomainTables) {
    let _ = ACTIVE_TABLES.set(tables);
}

/// The currently active table set: whatever was installed via [`install`],
/// or the bundled defaults.
pub fn active() -> &'static DomainTables {
    ACTIVE_TABLES.get().unwrap_or(&DEFAULT_TABLES)
}
