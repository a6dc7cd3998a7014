//! The on-disk profile snapshot: observational evidence about columns,
//! unique candidates, and foreign-key reality.
//!
//! Lookups are case-normalized on `(schema, table, column)` so that model
//! identifiers and captured metadata match regardless of casing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-column statistics captured by the profiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    pub schema: String,
    pub table: String,
    pub column: String,

    #[serde(default)]
    pub row_count: u64,

    #[serde(default)]
    pub null_count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_definition: Option<String>,

    /// Whether the column is nullable as captured from the catalog.
    #[serde(default = "default_true")]
    pub is_nullable: bool,
}

impl ColumnProfile {
    /// Observed fraction of rows that are NULL; zero when the table is empty.
    pub fn null_fraction(&self) -> f64 {
        if self.row_count == 0 {
            0.0
        } else {
            self.null_count as f64 / self.row_count as f64
        }
    }
}

/// A unique-candidate verdict over one or more columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueCandidate {
    pub schema: String,
    pub table: String,

    /// The candidate column set, in declared order.
    pub columns: Vec<String>,

    #[serde(default)]
    pub has_duplicates: bool,
}

/// Observed foreign-key reality for one owning column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyReality {
    pub schema: String,
    pub table: String,
    pub column: String,

    #[serde(default)]
    pub orphan_count: u64,

    /// `true` when the source constraint exists but is marked not trusted.
    #[serde(default)]
    pub is_untrusted_in_source: bool,
}

/// The raw profile document as deserialized from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    #[serde(default)]
    pub columns: Vec<ColumnProfile>,

    #[serde(default)]
    pub unique_candidates: Vec<UniqueCandidate>,

    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyReality>,
}

/// An indexed profile snapshot ready for policy lookups.
#[derive(Debug, Clone, Default)]
pub struct ProfileSnapshot {
    columns: Vec<ColumnProfile>,
    unique_candidates: Vec<UniqueCandidate>,
    foreign_keys: Vec<ForeignKeyReality>,

    column_index: HashMap<String, usize>,
    unique_index: HashMap<String, usize>,
    fk_index: HashMap<String, usize>,
}

impl ProfileSnapshot {
    /// Builds the lookup indexes over a deserialized document.
    pub fn from_document(doc: ProfileDocument) -> Self {
        let mut snapshot = ProfileSnapshot {
            columns: doc.columns,
            unique_candidates: doc.unique_candidates,
            foreign_keys: doc.foreign_keys,
            ..Default::default()
        };
        for (i, c) in snapshot.columns.iter().enumerate() {
            snapshot
                .column_index
                .insert(column_key(&c.schema, &c.table, &c.column), i);
        }
        for (i, u) in snapshot.unique_candidates.iter().enumerate() {
            snapshot
                .unique_index
                .insert(candidate_key(&u.schema, &u.table, &u.columns), i);
        }
        for (i, f) in snapshot.foreign_keys.iter().enumerate() {
            snapshot
                .fk_index
                .insert(column_key(&f.schema, &f.table, &f.column), i);
        }
        snapshot
    }

    /// Parses a profile snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let doc: ProfileDocument = serde_json::from_str(text)?;
        Ok(Self::from_document(doc))
    }

    /// Looks up column statistics.
    pub fn column(&self, schema: &str, table: &str, column: &str) -> Option<&ColumnProfile> {
        self.column_index
            .get(&column_key(schema, table, column))
            .map(|&i| &self.columns[i])
    }

    /// Looks up the unique-candidate verdict for a column set.
    ///
    /// The candidate key ignores column order: a declared index over
    /// `(A, B)` matches a profiled candidate over `(B, A)`.
    pub fn unique_candidate(
        &self,
        schema: &str,
        table: &str,
        columns: &[String],
    ) -> Option<&UniqueCandidate> {
        self.unique_index
            .get(&candidate_key(schema, table, columns))
            .map(|&i| &self.unique_candidates[i])
    }

    /// Looks up foreign-key reality for an owning column.
    pub fn foreign_key(&self, schema: &str, table: &str, column: &str) -> Option<&ForeignKeyReality> {
        self.fk_index
            .get(&column_key(schema, table, column))
            .map(|&i| &self.foreign_keys[i])
    }

    /// Total profiled column count (used for coverage metrics).
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Total unique-candidate count.
    pub fn unique_candidate_count(&self) -> usize {
        self.unique_candidates.len()
    }

    /// Total foreign-key reality count.
    pub fn foreign_key_count(&self) -> usize {
        self.foreign_keys.len()
    }
}

fn column_key(schema: &str, table: &str, column: &str) -> String {
    format!(
        "{}.{}.{}",
        schema.to_uppercase(),
        table.to_uppercase(),
        column.to_uppercase()
    )
}

fn candidate_key(schema: &str, table: &str, columns: &[String]) -> String {
    let mut cols: Vec<String> = columns.iter().map(|c| c.to_uppercase()).collect();
    cols.sort();
    format!(
        "{}.{}:{}",
        schema.to_uppercase(),
        table.to_uppercase(),
        cols.join("+")
    )
}

fn default_true() -> bool {
    true
}
