//! Identifier quoting, sanitization, and constraint-name synthesis.
//!
//! Every name that reaches emitted DDL passes through this module. The
//! synthesis rules guarantee the SQL Server bound: no emitted identifier is
//! ever longer than 128 characters, falling back to a truncated form with a
//! SHA-256 suffix when logical components overflow.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SQL Server's identifier length bound.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Hex digits kept from the overflow hash.
const HASH_SUFFIX_LEN: usize = 12;

/// How identifiers are quoted in emitted SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuoteStrategy {
    /// `[name]`, with embedded `]` doubled.
    #[default]
    Bracket,
    /// `"name"`, with embedded `"` doubled.
    DoubleQuote,
}

impl QuoteStrategy {
    /// Quotes a single identifier part.
    pub fn quote(&self, name: &str) -> String {
        match self {
            Self::Bracket => format!("[{}]", name.replace(']', "]]")),
            Self::DoubleQuote => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Quotes a `schema.name` pair.
    pub fn quote_qualified(&self, schema: &str, name: &str) -> String {
        format!("{}.{}", self.quote(schema), self.quote(name))
    }
}

/// Configurable constraint-name prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConstraintPrefixes {
    pub primary_key: String,
    pub unique: String,
    pub index: String,
    pub foreign_key: String,
    pub default: String,
    pub check: String,
}

impl Default for ConstraintPrefixes {
    fn default() -> Self {
        Self {
            primary_key: "PK_".to_owned(),
            unique: "UX_".to_owned(),
            index: "IX_".to_owned(),
            foreign_key: "FK_".to_owned(),
            default: "DF_".to_owned(),
            check: "CK_".to_owned(),
        }
    }
}

/// Sanitizes a module name for use in directory paths and header text.
///
/// Whitespace and any character outside `[A-Za-z0-9_]` becomes `_`. Never
/// applied to logical identifiers used in resolution.
pub fn sanitize_module(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Picks an evidence-derived name when it fits, otherwise rebuilds one from
/// logical components.
///
/// Evidence names longer than the bound are discarded entirely (not
/// truncated) and replaced by the rebuilt form, which itself goes through
/// [`enforce_length`].
pub fn preserve_or_rebuild(evidence: Option<&str>, rebuilt: String) -> String {
    match evidence {
        Some(name) if !name.is_empty() && name.chars().count() <= MAX_IDENTIFIER_LEN => {
            name.to_owned()
        }
        _ => enforce_length(&rebuilt),
    }
}

/// Builds a constraint name from logical components:
/// `<prefix><owner>[_<target>][_<col1>_<col2>…]`, length-enforced.
pub fn synthesize_constraint_name(
    prefix: &str,
    owner_logical: &str,
    target_logical: Option<&str>,
    columns: &[&str],
) -> String {
    let mut name = String::with_capacity(
        prefix.len() + owner_logical.len() + columns.iter().map(|c| c.len() + 1).sum::<usize>() + 16,
    );
    name.push_str(prefix);
    name.push_str(owner_logical);
    if let Some(target) = target_logical {
        name.push('_');
        name.push_str(target);
    }
    for column in columns {
        name.push('_');
        name.push_str(column);
    }
    enforce_length(&name)
}

/// Enforces the 128-character bound.
///
/// Oversized names are truncated to `128 - 13` characters, trailing
/// underscores trimmed, and suffixed with `_<first 12 hex of SHA-256 of the
/// pre-truncation name>`. The result is always within the bound.
pub fn enforce_length(name: &str) -> String {
    if name.chars().count() <= MAX_IDENTIFIER_LEN {
        return name.to_owned();
    }

    let digest = Sha256::digest(name.as_bytes());
    let mut suffix = String::with_capacity(HASH_SUFFIX_LEN);
    for byte in digest.iter() {
        if suffix.len() >= HASH_SUFFIX_LEN {
            break;
        }
        suffix.push_str(&format!("{byte:02x}"));
    }
    suffix.truncate(HASH_SUFFIX_LEN);

    let keep = MAX_IDENTIFIER_LEN - HASH_SUFFIX_LEN - 1;
    let truncated: String = name.chars().take(keep).collect();
    let trimmed = truncated.trim_end_matches('_');

    format!("{trimmed}_{suffix}")
}

/// Rewrites a derived name after a table rename.
///
/// Every occurrence of the old physical table name embedded in `name` is
/// replaced (case-insensitively) with the new effective name, then the
/// length bound is re-enforced.
pub fn propagate_rename(name: &str, old_physical: &str, new_effective: &str) -> String {
    if old_physical.is_empty() || name.is_empty() {
        return name.to_owned();
    }
    // ASCII-only case folding keeps byte offsets aligned with `name`.
    let upper_name = name.to_ascii_uppercase();
    let upper_old = old_physical.to_ascii_uppercase();
    if !upper_name.contains(&upper_old) {
        return name.to_owned();
    }

    let mut out = String::with_capacity(name.len() + new_effective.len());
    let mut rest = name;
    let mut upper_rest = upper_name.as_str();
    while let Some(pos) = upper_rest.find(&upper_old) {
        out.push_str(&rest[..pos]);
        out.push_str(new_effective);
        rest = &rest[pos + old_physical.len()..];
        upper_rest = &upper_rest[pos + upper_old.len()..];
    }
    out.push_str(rest);
    enforce_length(&out)
}
