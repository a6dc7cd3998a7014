//! The table projector: decisions + model → physical table definitions.
//!
//! Two passes. The first computes every table's effective name so the
//! second can retarget foreign keys and rewrite derived names regardless of
//! declaration order. Output order is deterministic: module order, then
//! declared entity order.

use std::collections::HashMap;

use tracing::debug;

use trestle_config::options::TighteningOptions;
use trestle_core::decisions::{ColumnCoordinate, PolicyDecisionSet};
use trestle_core::error::{AggregateResult, EngineError};
use trestle_core::identifier::{
    preserve_or_rebuild, propagate_rename, sanitize_module, synthesize_constraint_name,
};
use trestle_core::index::{EntityIndex, Resolution};
use trestle_core::model::{Attribute, Entity, Model, Module, Relationship};
use trestle_core::overrides::NamingOverrides;
use trestle_core::types::{normalize_default, resolve_attribute_type};

use crate::projection::{
    CheckSpec, ColumnDefinition, DefaultSpec, ForeignKeyDefinition, IdentitySpec, IndexDefinition,
    IndexKeyColumn, PrimaryKeyDefinition, TableDefinition, TriggerDefinition,
};

/// Projects every emittable entity into a [`TableDefinition`].
pub fn project(
    model: &Model,
    decisions: &PolicyDecisionSet,
    entity_index: &EntityIndex,
    options: &TighteningOptions,
) -> AggregateResult<Vec<TableDefinition>> {
    let overrides = NamingOverrides::new(options.emission.naming_overrides.clone())
        .map_err(|e| vec![e])?;

    let mut errors = Vec::new();
    let effective_names = compute_effective_names(model, &overrides, &mut errors);

    let mut tables = Vec::new();
    for (module, entity) in model.emittable_entities() {
        match project_entity(
            module,
            entity,
            decisions,
            entity_index,
            &overrides,
            &effective_names,
            options,
        ) {
            Ok(table) => tables.push(table),
            Err(mut errs) => errors.append(&mut errs),
        }
    }

    if errors.is_empty() {
        Ok(tables)
    } else {
        Err(errors)
    }
}

/// Pass 1: effective name per `(schema, physical)`, with collision checks.
fn compute_effective_names(
    model: &Model,
    overrides: &NamingOverrides,
    errors: &mut Vec<EngineError>,
) -> HashMap<(String, String), String> {
    let mut effective: HashMap<(String, String), String> = HashMap::new();
    let mut claimed: HashMap<(String, String), String> = HashMap::new();

    for (module, entity) in model.emittable_entities() {
        let name = match overrides.effective_name(
            &entity.schema,
            &entity.physical_name,
            &module.name,
            &entity.logical_name,
        ) {
            Ok(name) => name,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };

        let claim_key = (entity.schema.to_uppercase(), name.to_uppercase());
        if let Some(prior) = claimed.insert(claim_key, entity.qualified_name()) {
            errors.push(EngineError::model_invariant(format!(
                "naming overrides map both {} and {} to {}.{}",
                prior,
                entity.qualified_name(),
                entity.schema,
                name
            )));
        }

        effective.insert(
            (
                entity.schema.to_uppercase(),
                entity.physical_name.to_uppercase(),
            ),
            name,
        );
    }

    effective
}

struct NameRewrites<'a> {
    /// `(old physical, new effective)` pairs applied to derived names.
    pairs: Vec<(&'a str, String)>,
}

impl NameRewrites<'_> {
    fn apply(&self, name: String) -> String {
        let mut out = name;
        for (old, new) in &self.pairs {
            out = propagate_rename(&out, old, new);
        }
        out
    }
}

#[allow(clippy::too_many_arguments)]
fn project_entity(
    module: &Module,
    entity: &Entity,
    decisions: &PolicyDecisionSet,
    entity_index: &EntityIndex,
    overrides: &NamingOverrides,
    effective_names: &HashMap<(String, String), String>,
    options: &TighteningOptions,
) -> AggregateResult<TableDefinition> {
    let prefixes = &options.emission.constraint_prefixes;
    let effective_name = effective_names
        .get(&(
            entity.schema.to_uppercase(),
            entity.physical_name.to_uppercase(),
        ))
        .cloned()
        .unwrap_or_else(|| entity.physical_name.clone());

    let renamed = !effective_name.eq_ignore_ascii_case(&entity.physical_name);
    let rewrites = NameRewrites {
        pairs: if renamed {
            vec![(entity.physical_name.as_str(), effective_name.clone())]
        } else {
            Vec::new()
        },
    };

    // -- Columns -------------------------------------------------------------

    let emittable: Vec<&Attribute> = entity
        .attributes
        .iter()
        .filter(|a| a.is_emittable())
        .collect();

    let mut columns = Vec::with_capacity(emittable.len());
    for attr in &emittable {
        columns.push(project_column(entity, attr, decisions, &rewrites, options));
    }

    // -- Primary key ---------------------------------------------------------

    let primary_key = project_primary_key(entity, &rewrites, &prefixes.primary_key);

    // -- Secondary indexes ---------------------------------------------------

    let mut unique_indexes = Vec::new();
    let mut plain_indexes = Vec::new();
    for model_index in entity.indexes.iter().filter(|i| !i.is_primary) {
        if model_index.is_platform_auto && !options.emission.include_platform_auto_indexes {
            continue;
        }
        let index = project_index(entity, model_index, decisions, &rewrites, prefixes);
        if index.is_unique {
            unique_indexes.push(index);
        } else {
            plain_indexes.push(index);
        }
    }
    let mut indexes = unique_indexes;
    indexes.append(&mut plain_indexes);

    // -- Foreign keys --------------------------------------------------------

    let mut errors = Vec::new();
    let mut foreign_keys = Vec::new();
    for relationship in entity
        .relationships
        .iter()
        .filter(|r| !r.actual_constraints.is_empty())
    {
        match project_foreign_key(
            module,
            entity,
            relationship,
            decisions,
            entity_index,
            overrides,
            effective_names,
            options,
            &rewrites,
        ) {
            Ok(Some(fk)) => foreign_keys.push(fk),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    // Order by the first owning column's position in the emitted column list.
    foreign_keys.sort_by_key(|fk| {
        columns
            .iter()
            .position(|c| {
                fk.columns
                    .first()
                    .is_some_and(|f| c.physical_name.eq_ignore_ascii_case(f))
            })
            .unwrap_or(usize::MAX)
    });

    let module_sanitized = if options.emission.sanitize_module_names {
        module
            .sanitized_name
            .clone()
            .unwrap_or_else(|| sanitize_module(&module.name))
    } else {
        module.name.clone()
    };

    debug!(
        table = %entity.qualified_name(),
        effective = %effective_name,
        columns = columns.len(),
        "projected table"
    );

    Ok(TableDefinition {
        module: module.name.clone(),
        original_module: module.name.clone(),
        module_sanitized,
        schema: entity.schema.clone(),
        catalog: entity.catalog.clone(),
        physical_name: effective_name,
        original_physical_name: entity.physical_name.clone(),
        logical_name: entity.logical_name.clone(),
        description: entity.description.clone(),
        columns,
        primary_key,
        indexes,
        foreign_keys,
        triggers: entity
            .triggers
            .iter()
            .map(|t| TriggerDefinition {
                name: t.name.clone(),
                definition: t.definition.clone(),
                is_disabled: t.is_disabled,
            })
            .collect(),
    })
}

fn project_column(
    entity: &Entity,
    attr: &Attribute,
    decisions: &PolicyDecisionSet,
    rewrites: &NameRewrites<'_>,
    options: &TighteningOptions,
) -> ColumnDefinition {
    let data_type = resolve_attribute_type(attr, options.emission.default_text_length);

    let coordinate = ColumnCoordinate::new(
        entity.schema.clone(),
        entity.physical_name.clone(),
        attr.physical_name.clone(),
    );
    let nullable = decisions
        .nullability_for(&coordinate)
        .map_or(true, |d| !d.make_not_null);

    let disk = attr.on_disk.as_ref();

    let identity = disk.filter(|d| d.is_identity).map(|d| IdentitySpec {
        seed: d.identity_seed.unwrap_or(1),
        increment: d.identity_increment.unwrap_or(1),
    });

    let computed_expression = disk
        .filter(|d| d.is_computed)
        .and_then(|d| d.computed_definition.clone());

    let default = match disk.and_then(|d| d.default_definition.as_ref()) {
        Some(expr) => Some(DefaultSpec {
            constraint_name: disk
                .and_then(|d| d.default_constraint_name.clone())
                .map(|n| rewrites.apply(n)),
            expression: expr.clone(),
        }),
        None => attr.default_value.as_ref().map(|raw| DefaultSpec {
            constraint_name: None,
            expression: normalize_default(raw, &data_type),
        }),
    };

    let check_constraints = disk
        .map(|d| {
            d.check_constraints
                .iter()
                .map(|c| CheckSpec {
                    name: rewrites.apply(c.name.clone()),
                    definition: c.definition.clone(),
                    is_not_trusted: c.is_not_trusted,
                })
                .collect()
        })
        .unwrap_or_default();

    ColumnDefinition {
        physical_name: attr.physical_name.clone(),
        logical_name: attr.logical_name.clone(),
        data_type: data_type.to_string(),
        nullable,
        identity,
        computed_expression,
        default,
        check_constraints,
        collation: disk.and_then(|d| d.collation.clone()),
        description: attr.description.clone(),
    }
}

fn project_primary_key(
    entity: &Entity,
    rewrites: &NameRewrites<'_>,
    prefix: &str,
) -> Option<PrimaryKeyDefinition> {
    if let Some(pk_index) = entity.primary_key_index() {
        let rebuilt = synthesize_constraint_name(prefix, &entity.logical_name, None, &[]);
        let name = rewrites.apply(preserve_or_rebuild(Some(&pk_index.name), rebuilt));
        return Some(PrimaryKeyDefinition {
            name,
            columns: pk_index.key_columns().map(|c| c.column.clone()).collect(),
        });
    }

    let columns: Vec<String> = entity
        .identifier_attributes()
        .filter(|a| a.is_emittable())
        .map(|a| a.physical_name.clone())
        .collect();
    if columns.is_empty() {
        return None;
    }
    let name = rewrites.apply(synthesize_constraint_name(
        prefix,
        &entity.logical_name,
        None,
        &[],
    ));
    Some(PrimaryKeyDefinition { name, columns })
}

fn project_index(
    entity: &Entity,
    model_index: &trestle_core::model::ModelIndex,
    decisions: &PolicyDecisionSet,
    rewrites: &NameRewrites<'_>,
    prefixes: &trestle_core::identifier::ConstraintPrefixes,
) -> IndexDefinition {
    let coordinate = trestle_core::decisions::IndexCoordinate::new(
        entity.schema.clone(),
        entity.physical_name.clone(),
        model_index.name.clone(),
    );
    let is_unique = if model_index.is_unique {
        decisions
            .unique_for(&coordinate)
            .map_or(true, |d| d.enforce_unique)
    } else {
        false
    };

    let key_names: Vec<&str> = model_index
        .key_columns()
        .map(|c| c.column.as_str())
        .collect();
    let prefix = if is_unique {
        &prefixes.unique
    } else {
        &prefixes.index
    };
    let rebuilt = synthesize_constraint_name(prefix, &entity.logical_name, None, &key_names);

    IndexDefinition {
        name: rewrites.apply(preserve_or_rebuild(Some(&model_index.name), rebuilt)),
        is_unique,
        is_platform_auto: model_index.is_platform_auto,
        key_columns: model_index
            .key_columns()
            .map(|c| IndexKeyColumn {
                name: c.column.clone(),
                descending: c.is_descending,
            })
            .collect(),
        included_columns: model_index
            .included_columns()
            .map(|c| c.column.clone())
            .collect(),
        fill_factor: model_index.fill_factor,
        filter: model_index.filter.clone(),
        data_space: model_index.data_space.clone(),
        partition_scheme: model_index.partition_scheme.clone(),
        data_compression: model_index.data_compression.clone(),
    }
}

#[allow(clippy::too_many_arguments)]
fn project_foreign_key(
    module: &Module,
    entity: &Entity,
    relationship: &Relationship,
    decisions: &PolicyDecisionSet,
    entity_index: &EntityIndex,
    overrides: &NamingOverrides,
    effective_names: &HashMap<(String, String), String>,
    options: &TighteningOptions,
    rewrites: &NameRewrites<'_>,
) -> Result<Option<ForeignKeyDefinition>, EngineError> {
    let Some(attr) = entity.attribute(&relationship.via_attribute) else {
        return Ok(None);
    };
    let coordinate = ColumnCoordinate::new(
        entity.schema.clone(),
        entity.physical_name.clone(),
        attr.physical_name.clone(),
    );
    let Some(decision) = decisions.foreign_key_for(&coordinate) else {
        return Ok(None);
    };
    if !decision.create_constraint {
        return Ok(None);
    }

    let constraint = &relationship.actual_constraints[0];
    let resolution = entity_index.resolve(
        &relationship.target_entity,
        relationship
            .target_physical_name
            .as_deref()
            .or(Some(constraint.referenced_table.as_str())),
        Some(constraint.referenced_schema.as_str()),
        &entity.schema,
        &module.name,
    );
    let target = match resolution {
        Resolution::Resolved(ctx) => ctx,
        // The decision demanded creation; losing the target here is fatal.
        _ => {
            return Err(EngineError::reference_unresolved(
                entity.qualified_name(),
                relationship.target_entity.clone(),
            ));
        }
    };

    // Effective referenced name: emitted tables via pass 1, supplemental
    // tables through the override rules directly.
    let referenced_table = match effective_names.get(&(
        target.schema.to_uppercase(),
        target.physical_name.to_uppercase(),
    )) {
        Some(name) => name.clone(),
        None => overrides.effective_name(
            &target.schema,
            &target.physical_name,
            &target.module,
            &target.logical_name,
        )?,
    };

    let mut pairs: Vec<(String, String)> = Vec::new();
    if !referenced_table.eq_ignore_ascii_case(&target.physical_name) {
        pairs.push((target.physical_name.clone(), referenced_table.clone()));
    }

    let mut columns: Vec<(u32, String, String)> = constraint
        .columns
        .iter()
        .map(|p| (p.ordinal, p.owning_column.clone(), p.referenced_column.clone()))
        .collect();
    columns.sort_by_key(|(ordinal, _, _)| *ordinal);
    let owning: Vec<String> = columns.iter().map(|(_, o, _)| o.clone()).collect();
    let referenced: Vec<String> = columns.iter().map(|(_, _, r)| r.clone()).collect();

    let owning_refs: Vec<&str> = owning.iter().map(String::as_str).collect();
    let rebuilt = synthesize_constraint_name(
        &options.emission.constraint_prefixes.foreign_key,
        &entity.logical_name,
        Some(&target.logical_name),
        &owning_refs,
    );
    let mut name = rewrites.apply(preserve_or_rebuild(constraint.name.as_deref(), rebuilt));
    for (old, new) in &pairs {
        name = propagate_rename(&name, old, new);
    }

    Ok(Some(ForeignKeyDefinition {
        name,
        columns: owning,
        referenced_module: target.module.clone(),
        referenced_schema: target.schema.clone(),
        referenced_table,
        referenced_columns: referenced,
        referenced_logical: target.logical_name.clone(),
        delete_action: normalize_action(&constraint.on_delete, &relationship.delete_rule),
        update_action: normalize_action(&constraint.on_update, ""),
        is_trusted: decision.is_trusted,
    }))
}

/// Normalizes a source referential action (or platform delete-rule code)
/// into SQL form.
fn normalize_action(action: &str, delete_rule: &str) -> String {
    let token = action.trim().to_uppercase().replace('_', " ");
    match token.as_str() {
        "CASCADE" => "CASCADE".to_owned(),
        "SET NULL" | "SETNULL" => "SET NULL".to_owned(),
        "SET DEFAULT" | "SETDEFAULT" => "SET DEFAULT".to_owned(),
        "NO ACTION" | "NOACTION" | "RESTRICT" => "NO ACTION".to_owned(),
        "" => match delete_rule.trim().to_uppercase().as_str() {
            "DELETE" | "CASCADE" => "CASCADE".to_owned(),
            _ => "NO ACTION".to_owned(),
        },
        other => other.to_owned(),
    }
}
