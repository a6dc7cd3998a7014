//! Policy decision records.
//!
//! The decider produces one tagged record per column / index / foreign key.
//! Each record carries the coordinate it applies to and the list of
//! rationale codes that contributed to the outcome. The whole set is a pure
//! value: building it has no side effects and two identical inputs produce
//! identical sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifies one column: `(schema, table, column)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnCoordinate {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl ColumnCoordinate {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    /// Case-normalized map key. Decision maps are keyed by this so lookups
    /// are insensitive to source casing while records keep original names.
    pub fn key(&self) -> String {
        format!(
            "{}.{}.{}",
            self.schema.to_uppercase(),
            self.table.to_uppercase(),
            self.column.to_uppercase()
        )
    }
}

impl std::fmt::Display for ColumnCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.column)
    }
}

/// Identifies one index: `(schema, table, index)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexCoordinate {
    pub schema: String,
    pub table: String,
    pub index: String,
}

impl IndexCoordinate {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            index: index.into(),
        }
    }

    /// Case-normalized map key.
    pub fn key(&self) -> String {
        format!(
            "{}.{}.{}",
            self.schema.to_uppercase(),
            self.table.to_uppercase(),
            self.index.to_uppercase()
        )
    }
}

impl std::fmt::Display for IndexCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.index)
    }
}

/// A signal that contributed to a decision.
///
/// The set of codes is closed; manifests aggregate them into frequency maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rationale {
    ColumnIdentifier,
    ColumnAutoNumber,
    ColumnComputed,
    EvidenceNotNull,
    ModelMandatory,
    EvidenceNullsZero,
    EvidenceNullsPresent,
    BudgetWithin,
    BudgetExceeded,
    ProfileMissing,
    PolicyMode,
    PolicyCautious,
    RemediationRequired,
    FkDeclared,
    FkResolved,
    FkUnresolved,
    FkDisabled,
    FkOrphans,
    FkUntrustedSource,
    UniqueClean,
    UniqueDuplicates,
    UniqueRemediation,
    UniqueRelaxed,
}

impl Rationale {
    /// The stable code string for this rationale.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ColumnIdentifier => "column.identifier",
            Self::ColumnAutoNumber => "column.autoNumber",
            Self::ColumnComputed => "column.computed",
            Self::EvidenceNotNull => "evidence.notNull",
            Self::ModelMandatory => "model.mandatory",
            Self::EvidenceNullsZero => "evidence.nulls.zero",
            Self::EvidenceNullsPresent => "evidence.nulls.present",
            Self::BudgetWithin => "budget.within",
            Self::BudgetExceeded => "budget.exceeded",
            Self::ProfileMissing => "profile.missing",
            Self::PolicyMode => "policy.mode",
            Self::PolicyCautious => "policy.cautious",
            Self::RemediationRequired => "remediation.required",
            Self::FkDeclared => "fk.declared",
            Self::FkResolved => "fk.resolved",
            Self::FkUnresolved => "fk.unresolved",
            Self::FkDisabled => "fk.disabled",
            Self::FkOrphans => "fk.orphans",
            Self::FkUntrustedSource => "fk.untrustedSource",
            Self::UniqueClean => "unique.clean",
            Self::UniqueDuplicates => "unique.duplicates",
            Self::UniqueRemediation => "unique.remediation",
            Self::UniqueRelaxed => "unique.relaxed",
        }
    }
}

impl Serialize for Rationale {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Whether a column's nullability is tightened to NOT NULL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NullabilityDecision {
    pub coordinate: ColumnCoordinate,
    pub make_not_null: bool,
    pub requires_remediation: bool,
    pub rationales: Vec<Rationale>,
}

/// Whether a foreign key is created, and with what trust.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDecision {
    pub coordinate: ColumnCoordinate,
    pub create_constraint: bool,
    /// `true` emits `WITH CHECK`; `false` emits `WITH NOCHECK`.
    pub is_trusted: bool,
    pub rationales: Vec<Rationale>,
}

/// Whether a declared-unique index is enforced as unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueIndexDecision {
    pub coordinate: IndexCoordinate,
    pub enforce_unique: bool,
    pub requires_remediation: bool,
    pub rationales: Vec<Rationale>,
}

/// Per-module decision counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRollup {
    pub columns_total: u32,
    pub columns_tightened: u32,
    pub columns_requiring_remediation: u32,
    pub unique_indexes_enforced: u32,
    pub foreign_keys_created: u32,
}

/// Snapshot of the tightening toggles a decision set was produced under.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleSnapshot {
    pub mode: String,
    pub null_budget: f64,
    pub fk_creation_enabled: bool,
    pub fk_trust_enabled: bool,
    pub unique_enforce_with_remediation: bool,
}

/// The complete output of one policy run.
///
/// Maps are keyed by the case-normalized coordinate key, so iteration and
/// serialization order are deterministic.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDecisionSet {
    pub nullability: BTreeMap<String, NullabilityDecision>,
    pub foreign_keys: BTreeMap<String, ForeignKeyDecision>,
    pub unique_indexes: BTreeMap<String, UniqueIndexDecision>,

    /// Human-readable notes surfaced alongside the decisions.
    pub diagnostics: Vec<String>,

    /// Counts keyed by module name.
    pub module_rollups: BTreeMap<String, ModuleRollup>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub toggles: Option<ToggleSnapshot>,
}

impl PolicyDecisionSet {
    /// Looks up the nullability decision for a column coordinate.
    pub fn nullability_for(&self, coordinate: &ColumnCoordinate) -> Option<&NullabilityDecision> {
        self.nullability.get(&coordinate.key())
    }

    /// Looks up the FK decision for the owning column coordinate.
    pub fn foreign_key_for(&self, coordinate: &ColumnCoordinate) -> Option<&ForeignKeyDecision> {
        self.foreign_keys.get(&coordinate.key())
    }

    /// Looks up the unique decision for an index coordinate.
    pub fn unique_for(&self, coordinate: &IndexCoordinate) -> Option<&UniqueIndexDecision> {
        self.unique_indexes.get(&coordinate.key())
    }

    /// Coordinates whose decisions require pre-remediation, in key order.
    pub fn pre_remediation(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .nullability
            .values()
            .filter(|d| d.requires_remediation)
            .map(|d| d.coordinate.to_string())
            .chain(
                self.unique_indexes
                    .values()
                    .filter(|d| d.requires_remediation)
                    .map(|d| d.coordinate.to_string()),
            )
            .collect();
        out.sort();
        out
    }

    /// Frequency map of rationale codes across all decisions.
    pub fn rationale_frequencies(&self) -> BTreeMap<&'static str, u32> {
        let mut freq: BTreeMap<&'static str, u32> = BTreeMap::new();
        let all = self
            .nullability
            .values()
            .flat_map(|d| d.rationales.iter())
            .chain(self.foreign_keys.values().flat_map(|d| d.rationales.iter()))
            .chain(
                self.unique_indexes
                    .values()
                    .flat_map(|d| d.rationales.iter()),
            );
        for r in all {
            *freq.entry(r.as_str()).or_default() += 1;
        }
        freq
    }
}
