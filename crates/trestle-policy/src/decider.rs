//! Per-coordinate tightening decisions.
//!
//! The decider is a pure function: `(model, profile, index, options)` in,
//! [`PolicyDecisionSet`] out. It never fails; everything it cannot decide
//! cleanly becomes a diagnostic on the set.

use tracing::debug;

use trestle_config::options::{PolicyMode, TighteningOptions};
use trestle_core::decisions::{
    ColumnCoordinate, ForeignKeyDecision, IndexCoordinate, ModuleRollup, NullabilityDecision,
    PolicyDecisionSet, Rationale, UniqueIndexDecision,
};
use trestle_core::index::{EntityIndex, Resolution};
use trestle_core::model::{Attribute, Entity, Model, Module, Relationship};
use trestle_core::profile::ProfileSnapshot;

/// Runs the tightening policy over the whole model.
pub fn decide(
    model: &Model,
    profile: &ProfileSnapshot,
    index: &EntityIndex,
    options: &TighteningOptions,
) -> PolicyDecisionSet {
    let mut set = PolicyDecisionSet {
        toggles: Some(options.toggle_snapshot()),
        ..Default::default()
    };

    for (module, entity) in model.emittable_entities() {
        let rollup = set.module_rollups.entry(module.name.clone()).or_default();

        for attr in entity.attributes.iter().filter(|a| a.is_emittable()) {
            let decision = decide_nullability(entity, attr, profile, options);
            rollup.columns_total += 1;
            if decision.make_not_null && declared_nullable(attr) {
                rollup.columns_tightened += 1;
            }
            if decision.requires_remediation {
                rollup.columns_requiring_remediation += 1;
            }
            set.nullability.insert(decision.coordinate.key(), decision);
        }

        for relationship in entity
            .relationships
            .iter()
            .filter(|r| !r.actual_constraints.is_empty())
        {
            if let Some(decision) =
                decide_foreign_key(module, entity, relationship, profile, index, options, &mut set.diagnostics)
            {
                if decision.create_constraint {
                    rollup.foreign_keys_created += 1;
                }
                set.foreign_keys.insert(decision.coordinate.key(), decision);
            }
        }

        for model_index in entity
            .indexes
            .iter()
            .filter(|i| i.is_unique && !i.is_primary)
        {
            let decision = decide_unique(entity, model_index, profile, options, &mut set.diagnostics);
            if decision.enforce_unique {
                rollup.unique_indexes_enforced += 1;
            }
            set.unique_indexes.insert(decision.coordinate.key(), decision);
        }

        debug!(
            module = %module.name,
            entity = %entity.logical_name,
            "policy decisions computed"
        );
    }

    set
}

/// Whether the source declares the column nullable (on disk when captured,
/// otherwise by the mandatory flag).
fn declared_nullable(attr: &Attribute) -> bool {
    match &attr.on_disk {
        Some(disk) => disk.is_nullable,
        None => !attr.is_mandatory,
    }
}

fn decide_nullability(
    entity: &Entity,
    attr: &Attribute,
    profile: &ProfileSnapshot,
    options: &TighteningOptions,
) -> NullabilityDecision {
    let coordinate = ColumnCoordinate::new(
        entity.schema.clone(),
        entity.physical_name.clone(),
        attr.physical_name.clone(),
    );

    // Physical column kinds are NOT NULL unconditionally.
    if attr.is_identifier {
        return tightened(coordinate, vec![Rationale::ColumnIdentifier]);
    }
    if attr.is_auto_number {
        return tightened(coordinate, vec![Rationale::ColumnAutoNumber]);
    }
    if attr.is_computed() {
        return tightened(coordinate, vec![Rationale::ColumnComputed]);
    }

    // Already non-nullable in evidence: trivially tighten.
    if attr.on_disk.as_ref().is_some_and(|d| !d.is_nullable) {
        return tightened(coordinate, vec![Rationale::EvidenceNotNull]);
    }

    // Optional columns are left alone.
    if !attr.is_mandatory {
        return NullabilityDecision {
            coordinate,
            make_not_null: false,
            requires_remediation: false,
            rationales: Vec::new(),
        };
    }

    // A mandatory column with no on-disk presence is new; there is no data
    // to violate the declaration.
    if attr.on_disk.is_none() {
        return tightened(coordinate, vec![Rationale::ModelMandatory]);
    }

    let mut rationales = vec![Rationale::ModelMandatory];
    let observed = profile.column(&coordinate.schema, &coordinate.table, &coordinate.column);

    match observed {
        None => match options.policy.mode {
            PolicyMode::Aggressive => {
                rationales.push(Rationale::ProfileMissing);
                rationales.push(Rationale::PolicyMode);
                tightened(coordinate, rationales)
            }
            _ => {
                rationales.push(Rationale::ProfileMissing);
                kept_nullable(coordinate, rationales)
            }
        },
        Some(stats) if stats.null_count == 0 => {
            rationales.push(Rationale::EvidenceNullsZero);
            tightened(coordinate, rationales)
        }
        Some(stats) => {
            rationales.push(Rationale::EvidenceNullsPresent);
            match options.policy.mode {
                PolicyMode::Aggressive => {
                    rationales.push(Rationale::PolicyMode);
                    rationales.push(Rationale::RemediationRequired);
                    NullabilityDecision {
                        coordinate,
                        make_not_null: true,
                        requires_remediation: true,
                        rationales,
                    }
                }
                PolicyMode::EvidenceGated => {
                    if stats.null_fraction() <= options.policy.null_budget {
                        rationales.push(Rationale::BudgetWithin);
                        rationales.push(Rationale::RemediationRequired);
                        NullabilityDecision {
                            coordinate,
                            make_not_null: true,
                            requires_remediation: true,
                            rationales,
                        }
                    } else {
                        rationales.push(Rationale::BudgetExceeded);
                        kept_nullable(coordinate, rationales)
                    }
                }
                PolicyMode::Cautious => {
                    rationales.push(Rationale::PolicyCautious);
                    kept_nullable(coordinate, rationales)
                }
            }
        }
    }
}

fn tightened(coordinate: ColumnCoordinate, rationales: Vec<Rationale>) -> NullabilityDecision {
    NullabilityDecision {
        coordinate,
        make_not_null: true,
        requires_remediation: false,
        rationales,
    }
}

fn kept_nullable(coordinate: ColumnCoordinate, rationales: Vec<Rationale>) -> NullabilityDecision {
    NullabilityDecision {
        coordinate,
        make_not_null: false,
        requires_remediation: false,
        rationales,
    }
}

fn decide_foreign_key(
    module: &Module,
    entity: &Entity,
    relationship: &Relationship,
    profile: &ProfileSnapshot,
    index: &EntityIndex,
    options: &TighteningOptions,
    diagnostics: &mut Vec<String>,
) -> Option<ForeignKeyDecision> {
    let Some(attr) = entity.attribute(&relationship.via_attribute) else {
        diagnostics.push(format!(
            "relationship on {} names unknown attribute {}",
            entity.qualified_name(),
            relationship.via_attribute
        ));
        return None;
    };

    let coordinate = ColumnCoordinate::new(
        entity.schema.clone(),
        entity.physical_name.clone(),
        attr.physical_name.clone(),
    );
    let mut rationales = vec![Rationale::FkDeclared];

    let constraint = &relationship.actual_constraints[0];
    let resolution = index.resolve(
        &relationship.target_entity,
        relationship
            .target_physical_name
            .as_deref()
            .or(Some(constraint.referenced_table.as_str())),
        Some(constraint.referenced_schema.as_str()),
        &entity.schema,
        &module.name,
    );
    let resolved = match resolution {
        Resolution::Resolved(_) => {
            rationales.push(Rationale::FkResolved);
            true
        }
        Resolution::Ambiguous(candidates) => {
            rationales.push(Rationale::FkUnresolved);
            diagnostics.push(format!(
                "reference {} from {} is ambiguous across {} declarations",
                relationship.target_entity,
                entity.qualified_name(),
                candidates.len()
            ));
            false
        }
        Resolution::NotFound => {
            rationales.push(Rationale::FkUnresolved);
            diagnostics.push(format!(
                "reference {} from {} does not resolve in the model or supplemental set",
                relationship.target_entity,
                entity.qualified_name()
            ));
            false
        }
    };

    if !options.foreign_keys.enable_creation {
        rationales.push(Rationale::FkDisabled);
    }
    let create_constraint = resolved
        && options.foreign_keys.enable_creation
        && (relationship.has_database_constraint || !relationship.actual_constraints.is_empty());

    // Trust: WITH CHECK requires a clean source and clean reality, unless
    // Aggressive forces it.
    let reality = profile.foreign_key(&coordinate.schema, &coordinate.table, &coordinate.column);
    let orphan_count = reality.map_or(0, |r| r.orphan_count);
    let source_untrusted =
        constraint.is_not_trusted || reality.is_some_and(|r| r.is_untrusted_in_source);

    if orphan_count > 0 {
        rationales.push(Rationale::FkOrphans);
    }
    if source_untrusted {
        rationales.push(Rationale::FkUntrustedSource);
    }

    let clean = orphan_count == 0 && !source_untrusted;
    let forced = options.policy.mode == PolicyMode::Aggressive;
    if forced && !clean {
        rationales.push(Rationale::PolicyMode);
    }
    let is_trusted = options.foreign_keys.enable_trust && (forced || clean);

    Some(ForeignKeyDecision {
        coordinate,
        create_constraint,
        is_trusted,
        rationales,
    })
}

fn decide_unique(
    entity: &Entity,
    model_index: &trestle_core::model::ModelIndex,
    profile: &ProfileSnapshot,
    options: &TighteningOptions,
    diagnostics: &mut Vec<String>,
) -> UniqueIndexDecision {
    let coordinate = IndexCoordinate::new(
        entity.schema.clone(),
        entity.physical_name.clone(),
        model_index.name.clone(),
    );
    let key_columns: Vec<String> = model_index
        .key_columns()
        .map(|c| c.column.clone())
        .collect();

    let candidate = profile.unique_candidate(&entity.schema, &entity.physical_name, &key_columns);

    match candidate {
        Some(c) if !c.has_duplicates => UniqueIndexDecision {
            coordinate,
            enforce_unique: true,
            requires_remediation: false,
            rationales: vec![Rationale::UniqueClean],
        },
        Some(_) => {
            let enforce = options.policy.mode == PolicyMode::Aggressive
                && options.uniqueness.enforce_with_remediation;
            let mut rationales = vec![Rationale::UniqueDuplicates];
            if enforce {
                rationales.push(Rationale::UniqueRemediation);
                rationales.push(Rationale::RemediationRequired);
            } else {
                rationales.push(Rationale::UniqueRelaxed);
                diagnostics.push(format!(
                    "unique index {coordinate} relaxed to non-unique: duplicates observed"
                ));
            }
            UniqueIndexDecision {
                coordinate,
                enforce_unique: enforce,
                requires_remediation: enforce,
                rationales,
            }
        }
        // No verdict captured: the profile does not show duplicates, so the
        // declared intent stands.
        None => UniqueIndexDecision {
            coordinate,
            enforce_unique: true,
            requires_remediation: false,
            rationales: vec![Rationale::ProfileMissing],
        },
    }
}
