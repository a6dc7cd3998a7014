//! The emission manifest: what was emitted and why.
//!
//! Serialized to `manifest.json` with a fixed top-level key order and
//! BTree-sorted maps, so two identical runs produce identical bytes.

use std::collections::BTreeMap;

use serde::Serialize;

use trestle_config::options::TighteningOptions;
use trestle_core::decisions::{ModuleRollup, PolicyDecisionSet};
use trestle_core::profile::ProfileSnapshot;

use crate::projection::TableDefinition;

/// Run provenance.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionMetadata {
    pub fingerprint_algorithm: String,
    pub fingerprint: String,
    pub model_path: String,
    pub profile_path: String,
}

/// Aggregate decision counts plus rationale frequencies.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    pub column_count: u32,
    pub tightened_count: u32,
    pub unique_indexes_enforced: u32,
    pub foreign_keys_created: u32,
    pub rationales: BTreeMap<String, u32>,
}

/// One `count / total` pair with a percentage.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageEntry {
    pub count: u32,
    pub total: u32,
    pub percent: f64,
}

impl CoverageEntry {
    fn new(count: u32, total: u32) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            (f64::from(count) / f64::from(total) * 10_000.0).round() / 100.0
        };
        Self {
            count,
            total,
            percent,
        }
    }
}

/// Emitted share of the model.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub tables: CoverageEntry,
    pub columns: CoverageEntry,
    pub constraints: CoverageEntry,
}

/// Profile-evidence share behind each decision predicate.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateCoverage {
    pub columns_profiled: CoverageEntry,
    pub unique_candidates_profiled: CoverageEntry,
    pub foreign_keys_profiled: CoverageEntry,
}

/// One emitted table entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestTable {
    pub module: String,
    pub schema: String,
    pub table: String,
    pub table_file: String,
    pub indexes: Vec<String>,
    pub foreign_keys: Vec<String>,
    pub includes_extended_properties: bool,
}

/// The complete manifest. Field order here is the serialized key order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub options: TighteningOptions,
    pub metadata: EmissionMetadata,
    pub policy_summary: PolicySummary,
    pub module_rollups: BTreeMap<String, ModuleRollup>,
    pub coverage: Coverage,
    pub predicate_coverage: PredicateCoverage,
    pub pre_remediation: Vec<String>,
    pub tables: Vec<ManifestTable>,
}

/// One-line decisions summary rendered into table headers.
pub fn decisions_summary(decisions: &PolicyDecisionSet) -> String {
    let tightened = decisions
        .nullability
        .values()
        .filter(|d| d.make_not_null)
        .count();
    let unique = decisions
        .unique_indexes
        .values()
        .filter(|d| d.enforce_unique)
        .count();
    let fks = decisions
        .foreign_keys
        .values()
        .filter(|d| d.create_constraint)
        .count();
    format!(
        "{tightened} columns tightened, {unique} unique indexes enforced, {fks} foreign keys created"
    )
}

/// Assembles the manifest over the projected tables.
///
/// `model_totals` carries the declared counts used for coverage:
/// `(entities, attributes, relationships-with-constraints)`.
pub fn build_manifest(
    options: &TighteningOptions,
    metadata: EmissionMetadata,
    decisions: &PolicyDecisionSet,
    profile: &ProfileSnapshot,
    tables: &[TableDefinition],
    model_totals: (u32, u32, u32),
) -> Manifest {
    let mut entries: Vec<ManifestTable> = tables
        .iter()
        .map(|t| ManifestTable {
            module: t.module_sanitized.clone(),
            schema: t.schema.clone(),
            table: t.physical_name.clone(),
            table_file: crate::plan::table_relative_path(t, options.emission.per_table_files),
            indexes: t.indexes.iter().map(|i| i.name.clone()).collect(),
            foreign_keys: t.foreign_keys.iter().map(|f| f.name.clone()).collect(),
            includes_extended_properties: t.has_descriptions(),
        })
        .collect();
    entries.sort_by(|a, b| {
        a.module
            .cmp(&b.module)
            .then_with(|| a.schema.cmp(&b.schema))
            .then_with(|| a.table.cmp(&b.table))
    });

    let emitted_columns: u32 = tables.iter().map(|t| t.columns.len() as u32).sum();
    let emitted_fks: u32 = tables.iter().map(|t| t.foreign_keys.len() as u32).sum();

    let tightened_count = decisions
        .nullability
        .values()
        .filter(|d| d.make_not_null)
        .count() as u32;
    let unique_enforced = decisions
        .unique_indexes
        .values()
        .filter(|d| d.enforce_unique)
        .count() as u32;
    let fks_created = decisions
        .foreign_keys
        .values()
        .filter(|d| d.create_constraint)
        .count() as u32;

    let rationales = decisions
        .rationale_frequencies()
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();

    let (model_tables, model_columns, model_constraints) = model_totals;

    // Profiled share behind each predicate kind.
    let columns_profiled = tables
        .iter()
        .flat_map(|t| {
            t.columns.iter().map(move |c| {
                profile
                    .column(&t.schema, &t.original_physical_name, &c.physical_name)
                    .is_some()
            })
        })
        .filter(|hit| *hit)
        .count() as u32;
    let unique_profiled = decisions
        .unique_indexes
        .values()
        .filter(|d| {
            !d.rationales
                .contains(&trestle_core::decisions::Rationale::ProfileMissing)
        })
        .count() as u32;
    let fks_profiled = tables
        .iter()
        .flat_map(|t| {
            t.foreign_keys.iter().flat_map(move |fk| {
                fk.columns.iter().map(move |c| {
                    profile
                        .foreign_key(&t.schema, &t.original_physical_name, c)
                        .is_some()
                })
            })
        })
        .filter(|hit| *hit)
        .count() as u32;

    Manifest {
        options: options.clone(),
        metadata,
        policy_summary: PolicySummary {
            column_count: decisions.nullability.len() as u32,
            tightened_count,
            unique_indexes_enforced: unique_enforced,
            foreign_keys_created: fks_created,
            rationales,
        },
        module_rollups: decisions.module_rollups.clone(),
        coverage: Coverage {
            tables: CoverageEntry::new(tables.len() as u32, model_tables),
            columns: CoverageEntry::new(emitted_columns, model_columns),
            constraints: CoverageEntry::new(emitted_fks, model_constraints),
        },
        predicate_coverage: PredicateCoverage {
            columns_profiled: CoverageEntry::new(columns_profiled, emitted_columns),
            unique_candidates_profiled: CoverageEntry::new(
                unique_profiled,
                decisions.unique_indexes.len() as u32,
            ),
            foreign_keys_profiled: CoverageEntry::new(fks_profiled, emitted_fks),
        },
        pre_remediation: decisions.pre_remediation(),
        tables: entries,
    }
}

impl Manifest {
    /// Serializes to the stable on-disk JSON form (UTF-8, trailing newline).
    pub fn to_json(&self) -> String {
        let mut text = serde_json::to_string_pretty(self).expect("manifest serialization is infallible");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn coverage_percent_rounds_to_two_places() {
        let entry = CoverageEntry::new(1, 3);
        assert_eq!(entry.percent, 33.33);
        let full = CoverageEntry::new(0, 0);
        assert_eq!(full.percent, 100.0);
    }

    #[test]
    fn empty_model_yields_empty_tables_array() {
        let manifest = build_manifest(
            &TighteningOptions::default(),
            EmissionMetadata::default(),
            &PolicyDecisionSet::default(),
            &ProfileSnapshot::default(),
            &[],
            (0, 0, 0),
        );
        assert!(manifest.tables.is_empty());
        let json = manifest.to_json();
        assert!(json.ends_with('\n'));
        // Top-level key order is part of the contract.
        let options_pos = json.find("\"options\"").unwrap();
        let metadata_pos = json.find("\"metadata\"").unwrap();
        let tables_pos = json.find("\"tables\"").unwrap();
        assert!(options_pos < metadata_pos && metadata_pos < tables_pos);
    }

    #[test]
    fn summary_line_counts_decisions() {
        let set = PolicyDecisionSet::default();
        assert_eq!(
            decisions_summary(&set),
            "0 columns tightened, 0 unique indexes enforced, 0 foreign keys created"
        );
    }
}
