//! The tightening option tree.
//!
//! Every option has a default; sections deserialize independently so a
//! configuration file may name only the keys it changes. `with_`-style
//! helpers produce adjusted copies for hosts that assemble options in code.

use serde::{Deserialize, Serialize};

use trestle_core::decisions::ToggleSnapshot;
use trestle_core::error::EngineError;
use trestle_core::identifier::{ConstraintPrefixes, QuoteStrategy};
use trestle_core::overrides::NamingOverrideRule;

/// How eagerly evidence is converted into schema tightening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyMode {
    /// Tighten only with supporting profile evidence within the budget.
    #[default]
    EvidenceGated,
    /// Tighten only what evidence proves trivially safe.
    Cautious,
    /// Tighten wherever the model declares intent; flag remediation.
    Aggressive,
}

impl PolicyMode {
    /// The mode name as it appears in configuration and manifests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EvidenceGated => "EvidenceGated",
            Self::Cautious => "Cautious",
            Self::Aggressive => "Aggressive",
        }
    }
}

/// Policy section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyOptions {
    pub mode: PolicyMode,

    /// Maximum observed null fraction that EvidenceGated may tighten over.
    pub null_budget: f64,
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self {
            mode: PolicyMode::EvidenceGated,
            null_budget: 0.0,
        }
    }
}

/// Foreign-key section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForeignKeyOptions {
    pub enable_creation: bool,
    pub enable_trust: bool,
}

impl Default for ForeignKeyOptions {
    fn default() -> Self {
        Self {
            enable_creation: true,
            enable_trust: true,
        }
    }
}

/// Uniqueness section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UniquenessOptions {
    /// Under Aggressive, enforce unique indexes even over duplicate data,
    /// flagging the coordinate for pre-remediation.
    pub enforce_with_remediation: bool,
}

/// Emission section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmissionOptions {
    /// One file per table under `Modules/<module>/Tables/`; `false` writes
    /// a flat directory.
    pub per_table_files: bool,

    pub include_platform_auto_indexes: bool,

    pub sanitize_module_names: bool,

    /// Suppress everything after the column list (indexes, FKs, extended
    /// properties, triggers). The inline primary key is kept.
    pub emit_bare_table_only: bool,

    /// Emit the provenance header comment at the top of each table file.
    pub emit_table_headers: bool,

    /// `NOT FOR REPLICATION` on untrusted foreign keys and checks.
    pub not_for_replication: bool,

    /// Concurrent file writes in the write plan.
    pub module_parallelism: usize,

    /// Length assigned to logical text attributes with no declared length.
    pub default_text_length: u32,

    pub quote_strategy: QuoteStrategy,

    pub constraint_prefixes: ConstraintPrefixes,

    pub naming_overrides: Vec<NamingOverrideRule>,
}

impl Default for EmissionOptions {
    fn default() -> Self {
        Self {
            per_table_files: true,
            include_platform_auto_indexes: false,
            sanitize_module_names: true,
            emit_bare_table_only: false,
            emit_table_headers: true,
            not_for_replication: true,
            module_parallelism: 1,
            default_text_length: 2000,
            quote_strategy: QuoteStrategy::Bracket,
            constraint_prefixes: ConstraintPrefixes::default(),
            naming_overrides: Vec::new(),
        }
    }
}

/// How seed scripts reconcile target tables with source rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynchronizationMode {
    /// Update matches, insert missing; never delete.
    #[default]
    NonDestructive,
    /// Additionally delete rows absent from the source.
    Authoritative,
    /// Guard against drift with a THROW before applying.
    ValidateThenApply,
}

impl SynchronizationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonDestructive => "NonDestructive",
            Self::Authoritative => "Authoritative",
            Self::ValidateThenApply => "ValidateThenApply",
        }
    }
}

/// A manually ordered allowed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircularDependencyOverride {
    /// Table names (effective physical names) in the order to emit.
    pub cycle: Vec<String>,

    /// When `true`, the override only applies if it covers the detected
    /// component exactly; a partial cover is ignored.
    pub strict: bool,
}

/// Seeding section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedingOptions {
    pub synchronization_mode: SynchronizationMode,

    /// `Module.Entity` names allowed to seed without a primary key.
    pub allow_missing_primary_key: Vec<String>,

    pub circular_dependency_overrides: Vec<CircularDependencyOverride>,

    /// Rows per INSERT batch when a dataset exceeds one MERGE source.
    pub batch_size: usize,
}

impl Default for SeedingOptions {
    fn default() -> Self {
        Self {
            synchronization_mode: SynchronizationMode::default(),
            allow_missing_primary_key: Vec::new(),
            circular_dependency_overrides: Vec::new(),
            batch_size: 1000,
        }
    }
}

/// Evidence-cache section, consumed by the upstream capture pipeline only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheOptions {
    pub root: Option<String>,
    pub refresh: bool,
}

/// The complete option tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TighteningOptions {
    pub policy: PolicyOptions,
    pub foreign_keys: ForeignKeyOptions,
    pub uniqueness: UniquenessOptions,
    pub emission: EmissionOptions,
    pub seeding: SeedingOptions,
    pub cache: CacheOptions,
}

impl TighteningOptions {
    /// Validates option ranges. Enum validity is handled by serde.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.policy.null_budget) {
            return Err(EngineError::config_invalid(format!(
                "policy.nullBudget must be within [0, 1], got {}",
                self.policy.null_budget
            )));
        }
        if self.emission.module_parallelism == 0 {
            return Err(EngineError::config_invalid(
                "emission.moduleParallelism must be at least 1",
            ));
        }
        if self.seeding.batch_size == 0 {
            return Err(EngineError::config_invalid(
                "seeding.batchSize must be at least 1",
            ));
        }
        for rule in &self.emission.naming_overrides {
            if rule.target.is_empty() {
                return Err(EngineError::config_invalid(
                    "emission.namingOverrides entries must set a target",
                ));
            }
        }
        Ok(())
    }

    /// Copy with a different policy mode.
    pub fn with_mode(mut self, mode: PolicyMode) -> Self {
        self.policy.mode = mode;
        self
    }

    /// Copy with a different null budget.
    pub fn with_null_budget(mut self, budget: f64) -> Self {
        self.policy.null_budget = budget;
        self
    }

    /// Copy with a different synchronization mode.
    pub fn with_synchronization_mode(mut self, mode: SynchronizationMode) -> Self {
        self.seeding.synchronization_mode = mode;
        self
    }

    /// The toggle snapshot recorded into decision sets and manifests.
    pub fn toggle_snapshot(&self) -> ToggleSnapshot {
        ToggleSnapshot {
            mode: self.policy.mode.as_str().to_owned(),
            null_budget: self.policy.null_budget,
            fk_creation_enabled: self.foreign_keys.enable_creation,
            fk_trust_enabled: self.foreign_keys.enable_trust,
            unique_enforce_with_remediation: self.uniqueness.enforce_with_remediation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let options = TighteningOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.policy.mode, PolicyMode::EvidenceGated);
        assert!(options.emission.per_table_files);
        assert_eq!(options.seeding.batch_size, 1000);
    }

    #[test]
    fn mode_deserializes_from_spec_spelling() {
        let options: TighteningOptions =
            serde_json::from_str(r#"{"policy": {"mode": "Aggressive"}}"#).unwrap();
        assert_eq!(options.policy.mode, PolicyMode::Aggressive);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let result =
            serde_json::from_str::<TighteningOptions>(r#"{"policy": {"mode": "Reckless"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn zero_parallelism_rejected() {
        let options: TighteningOptions =
            serde_json::from_str(r#"{"emission": {"moduleParallelism": 0}}"#).unwrap();
        let err = options.validate().unwrap_err();
        assert_eq!(err.code(), "config.invalid");
    }

    #[test]
    fn with_style_overrides() {
        let options = TighteningOptions::default()
            .with_mode(PolicyMode::Cautious)
            .with_null_budget(0.05)
            .with_synchronization_mode(SynchronizationMode::Authoritative);
        assert_eq!(options.policy.mode, PolicyMode::Cautious);
        assert!((options.policy.null_budget - 0.05).abs() < 1e-12);
        assert_eq!(
            options.seeding.synchronization_mode,
            SynchronizationMode::Authoritative
        );
    }

    #[test]
    fn toggle_snapshot_reflects_options() {
        let snap = TighteningOptions::default()
            .with_mode(PolicyMode::Aggressive)
            .toggle_snapshot();
        assert_eq!(snap.mode, "Aggressive");
        assert!(snap.fk_creation_enabled);
    }

    #[test]
    fn seeding_overrides_deserialize() {
        let options: TighteningOptions = serde_json::from_str(
            r#"{"seeding": {
                "synchronizationMode": "ValidateThenApply",
                "allowMissingPrimaryKey": ["Sales.Log"],
                "circularDependencyOverrides": [{"cycle": ["PARENT", "AUDIT"], "strict": true}]
            }}"#,
        )
        .unwrap();
        assert_eq!(
            options.seeding.synchronization_mode,
            SynchronizationMode::ValidateThenApply
        );
        assert_eq!(options.seeding.circular_dependency_overrides[0].cycle.len(), 2);
    }
}
