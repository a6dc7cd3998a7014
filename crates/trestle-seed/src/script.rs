//! Seed script generation.
//!
//! One SQL script over the ordered tables: a MERGE per table with a
//! values-based `SourceRows` source, phase-1 CTEs with NULLed deferred
//! columns plus phase-2 UPDATEs for nullable-FK cycles, constraint
//! disable/enable wrapping for strong cycles, and batched INSERTs for
//! oversized row sets. Deterministic output, LF only, one trailing newline.

use std::fmt::Write as _;

use tracing::debug;

use trestle_config::options::SynchronizationMode;
use trestle_core::error::{AggregateResult, EngineError};
use trestle_core::identifier::QuoteStrategy;

use crate::dataset::{SeedTableData, StaticEntitySeedColumn};
use crate::sorter::{SeedOrdering, SeedRole};

/// Generator settings, derived from the seeding options.
#[derive(Debug, Clone)]
pub struct ScriptSettings {
    pub synchronization_mode: SynchronizationMode,
    pub batch_size: usize,
    pub quote: QuoteStrategy,
    /// `Module.Entity` names allowed to seed without a primary key.
    pub allow_missing_primary_key: Vec<String>,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            synchronization_mode: SynchronizationMode::default(),
            batch_size: 1000,
            quote: QuoteStrategy::default(),
            allow_missing_primary_key: Vec::new(),
        }
    }
}

/// Generates the full seed script for an ordered dataset.
pub fn generate_script(
    ordering: &SeedOrdering,
    dataset: &[SeedTableData],
    settings: &ScriptSettings,
) -> AggregateResult<String> {
    let mut errors = Vec::new();
    let mut blocks: Vec<String> = Vec::new();
    let mut phase_two: Vec<String> = Vec::new();

    blocks.push(format!(
        "-- Static entity seed script ({})",
        settings.synchronization_mode.as_str()
    ));

    for ordered in &ordering.tables {
        let table = &dataset[ordered.table_index];
        let keys = match key_columns(table, settings) {
            Ok(keys) => keys,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };

        let mut block = String::new();
        if ordered.role == SeedRole::SelfReference {
            let _ = writeln!(
                block,
                "-- {} references itself; emitted in place",
                table.definition.qualified_name()
            );
        }
        if ordered.role == SeedRole::StrongCycleMember {
            let _ = writeln!(
                block,
                "ALTER TABLE {} NOCHECK CONSTRAINT ALL;",
                qualified(table, settings.quote)
            );
        }

        match &ordered.role {
            SeedRole::PhasedCycleMember { deferred_columns } => {
                block.push_str(&render_phase_one(table, &keys, deferred_columns, settings));
                if !table.rows.is_empty() {
                    phase_two.push(render_phase_two(table, &keys, deferred_columns, settings));
                }
            }
            _ => block.push_str(&render_table_block(table, &keys, settings)),
        }

        if !ordered.closes_strong_cycle.is_empty() {
            for &member in &ordered.closes_strong_cycle {
                let _ = write!(
                    block,
                    "\nALTER TABLE {} CHECK CONSTRAINT ALL;",
                    qualified(&dataset[member], settings.quote)
                );
            }
        }
        blocks.push(block);
    }

    blocks.append(&mut phase_two);

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut script = blocks
        .iter()
        .map(|b| b.trim_end_matches('\n'))
        .collect::<Vec<_>>()
        .join("\n\n");
    script.push('\n');

    debug!(
        tables = ordering.tables.len(),
        bytes = script.len(),
        "seed script generated"
    );
    Ok(script)
}

/// Resolves the matching key columns: the primary key, or every column for
/// PK-less tables the configuration allows.
fn key_columns<'a>(
    table: &'a SeedTableData,
    settings: &ScriptSettings,
) -> Result<Vec<&'a StaticEntitySeedColumn>, EngineError> {
    let keys = table.definition.primary_key_columns();
    if !keys.is_empty() {
        return Ok(keys);
    }
    let qualified = format!("{}.{}", table.definition.module, table.definition.logical_name);
    if settings
        .allow_missing_primary_key
        .iter()
        .any(|a| a.eq_ignore_ascii_case(&qualified))
    {
        return Ok(table.definition.columns.iter().collect());
    }
    Err(EngineError::SeedPrimaryKeyRequired {
        table: table.definition.qualified_name(),
    })
}

fn qualified(table: &SeedTableData, quote: QuoteStrategy) -> String {
    quote.quote_qualified(&table.definition.schema, &table.definition.effective_name)
}

fn column_list(columns: &[&StaticEntitySeedColumn], quote: QuoteStrategy) -> String {
    columns
        .iter()
        .map(|c| quote.quote(&c.emission_name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_values(table: &SeedTableData) -> String {
    table
        .rows
        .iter()
        .map(|row| {
            let literals: Vec<String> = row.values.iter().map(|v| v.to_sql_literal()).collect();
            format!("    ({})", literals.join(", "))
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

fn on_predicate(
    keys: &[&StaticEntitySeedColumn],
    quote: QuoteStrategy,
    source_alias: &str,
) -> String {
    keys.iter()
        .map(|k| {
            format!(
                "Target.{col} = {source_alias}.{col}",
                col = quote.quote(&k.emission_name)
            )
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Renders the standard (non-phased) block for one table.
fn render_table_block(
    table: &SeedTableData,
    keys: &[&StaticEntitySeedColumn],
    settings: &ScriptSettings,
) -> String {
    let mut block = format!("-- Seed {}\n", table.definition.qualified_name());

    if table.rows.is_empty() {
        match settings.synchronization_mode {
            SynchronizationMode::ValidateThenApply => {
                let _ = write!(
                    block,
                    "IF EXISTS (SELECT 1 FROM {})\n    THROW 50000, N'Seed drift detected for {}: expected no rows.', 1;",
                    qualified(table, settings.quote),
                    table.definition.qualified_name()
                );
            }
            _ => block.push_str("-- (no rows)"),
        }
        return block;
    }

    if table.rows.len() > settings.batch_size {
        block.push_str(&render_batched_inserts(table, settings));
        return block;
    }

    let identity = table.definition.has_identity();
    if identity {
        let _ = writeln!(
            block,
            "SET IDENTITY_INSERT {} ON;",
            qualified(table, settings.quote)
        );
    }

    if settings.synchronization_mode == SynchronizationMode::ValidateThenApply {
        block.push_str(&render_drift_guard(table, keys, settings));
        block.push('\n');
    }

    block.push_str(&render_merge(table, keys, settings, None));

    if identity {
        let _ = write!(
            block,
            "\nSET IDENTITY_INSERT {} OFF;",
            qualified(table, settings.quote)
        );
    }
    block
}

/// The MERGE statement. `cte` carries a pre-rendered `WITH …` block whose
/// final name is used as the source instead of inline VALUES.
fn render_merge(
    table: &SeedTableData,
    keys: &[&StaticEntitySeedColumn],
    settings: &ScriptSettings,
    cte: Option<&str>,
) -> String {
    let quote = settings.quote;
    let all_columns: Vec<&StaticEntitySeedColumn> = table.definition.columns.iter().collect();
    let non_keys: Vec<&&StaticEntitySeedColumn> = all_columns
        .iter()
        .filter(|c| !keys.iter().any(|k| k.emission_name == c.emission_name))
        .collect();

    let mut sql = String::with_capacity(256 + table.rows.len() * 48);
    if let Some(cte) = cte {
        sql.push_str(cte);
    }
    let _ = writeln!(sql, "MERGE INTO {} AS Target", qualified(table, quote));
    match cte {
        Some(_) => sql.push_str("USING PhaseOneSource AS SourceRows\n"),
        None => {
            let _ = writeln!(
                sql,
                "USING (VALUES\n{}\n) AS SourceRows ({})",
                render_values(table),
                column_list(&all_columns, quote)
            );
        }
    }
    let _ = writeln!(sql, "ON {}", on_predicate(keys, quote, "SourceRows"));

    if !non_keys.is_empty() {
        let updates: Vec<String> = non_keys
            .iter()
            .map(|c| {
                format!(
                    "    Target.{col} = SourceRows.{col}",
                    col = quote.quote(&c.emission_name)
                )
            })
            .collect();
        let _ = writeln!(sql, "WHEN MATCHED THEN UPDATE SET\n{}", updates.join(",\n"));
    }

    let _ = writeln!(
        sql,
        "WHEN NOT MATCHED BY TARGET THEN\n    INSERT ({})",
        column_list(&all_columns, quote)
    );
    let sources: Vec<String> = all_columns
        .iter()
        .map(|c| format!("SourceRows.{}", quote.quote(&c.emission_name)))
        .collect();
    let _ = write!(sql, "    VALUES ({})", sources.join(", "));

    if settings.synchronization_mode == SynchronizationMode::Authoritative {
        sql.push_str("\nWHEN NOT MATCHED BY SOURCE THEN DELETE");
    }
    sql.push(';');
    sql
}

/// `IF EXISTS` drift guard for ValidateThenApply mode.
fn render_drift_guard(
    table: &SeedTableData,
    keys: &[&StaticEntitySeedColumn],
    settings: &ScriptSettings,
) -> String {
    let quote = settings.quote;
    let all_columns: Vec<&StaticEntitySeedColumn> = table.definition.columns.iter().collect();
    let first_key = quote.quote(&keys[0].emission_name);
    format!(
        "IF EXISTS (\n    SELECT 1\n    FROM {table} AS Target\n    LEFT JOIN (VALUES\n{values}\n\
         \x20   ) AS SourceRows ({columns})\n        ON {predicate}\n    WHERE SourceRows.{first_key} IS NULL\n)\n\
         \x20   THROW 50000, N'Seed drift detected for {name}.', 1;",
        table = qualified(table, quote),
        values = indent(&render_values(table), 4),
        columns = column_list(&all_columns, quote),
        predicate = on_predicate(keys, quote, "SourceRows"),
        first_key = first_key,
        name = table.definition.qualified_name(),
    )
}

/// Phase 1 of a phasable cycle: full values behind a `PhaseOneSource` CTE
/// that NULLs each deferred column.
fn render_phase_one(
    table: &SeedTableData,
    keys: &[&StaticEntitySeedColumn],
    deferred: &[String],
    settings: &ScriptSettings,
) -> String {
    let quote = settings.quote;
    let mut block = format!(
        "-- Seed {} (phase 1 of 2: nullable FKs deferred)\n",
        table.definition.qualified_name()
    );

    if table.rows.is_empty() {
        block.push_str("-- (no rows)");
        return block;
    }

    let all_columns: Vec<&StaticEntitySeedColumn> = table.definition.columns.iter().collect();
    let projections: Vec<String> = all_columns
        .iter()
        .map(|c| {
            let col = quote.quote(&c.emission_name);
            if deferred.iter().any(|d| d.eq_ignore_ascii_case(&c.emission_name)) {
                format!("        CASE WHEN 1 = 0 THEN SourceRows.{col} ELSE NULL END AS {col}")
            } else {
                format!("        SourceRows.{col}")
            }
        })
        .collect();

    let cte = format!(
        "WITH PhaseOneSource AS (\n    SELECT\n{projections}\n    FROM (VALUES\n{values}\n\
         \x20   ) AS SourceRows ({columns})\n)\n",
        projections = projections.join(",\n"),
        values = indent(&render_values(table), 4),
        columns = column_list(&all_columns, quote),
    );

    block.push_str(&render_merge(table, keys, settings, Some(&cte)));
    block
}

/// Phase 2: restore the deferred columns from the full values, keyed by PK.
fn render_phase_two(
    table: &SeedTableData,
    keys: &[&StaticEntitySeedColumn],
    deferred: &[String],
    settings: &ScriptSettings,
) -> String {
    let quote = settings.quote;
    let all_columns: Vec<&StaticEntitySeedColumn> = table.definition.columns.iter().collect();
    let sets: Vec<String> = deferred
        .iter()
        .map(|c| {
            let col = quote.quote(c);
            format!("SET {col} = Source.{col}")
        })
        .collect();
    let predicate = keys
        .iter()
        .map(|k| {
            format!(
                "Target.{col} = Source.{col}",
                col = quote.quote(&k.emission_name)
            )
        })
        .collect::<Vec<_>>()
        .join(" AND ");

    format!(
        "-- UPDATE nullable FKs: {name}\nUPDATE Target\n{sets}\nFROM {table} AS Target\n\
         JOIN (VALUES\n{values}\n) AS Source ({columns})\n    ON {predicate};",
        name = table.definition.qualified_name(),
        sets = sets.join(",\n"),
        table = qualified(table, quote),
        values = render_values(table),
        columns = column_list(&all_columns, quote),
        predicate = predicate,
    )
}

/// Oversized row sets become plain INSERT batches.
fn render_batched_inserts(table: &SeedTableData, settings: &ScriptSettings) -> String {
    let quote = settings.quote;
    let all_columns: Vec<&StaticEntitySeedColumn> = table.definition.columns.iter().collect();
    let identity = table.definition.has_identity();
    let mut sql = format!(
        "-- {} rows, batched inserts of {}\n",
        table.rows.len(),
        settings.batch_size
    );

    if identity {
        let _ = writeln!(sql, "SET IDENTITY_INSERT {} ON;", qualified(table, quote));
    }

    let mut first = true;
    for batch in table.rows.chunks(settings.batch_size) {
        if !first {
            sql.push('\n');
        }
        first = false;
        let values: Vec<String> = batch
            .iter()
            .map(|row| {
                let literals: Vec<String> =
                    row.values.iter().map(|v| v.to_sql_literal()).collect();
                format!("    ({})", literals.join(", "))
            })
            .collect();
        let _ = writeln!(
            sql,
            "INSERT INTO {} ({})\nVALUES\n{};",
            qualified(table, quote),
            column_list(&all_columns, quote),
            values.join(",\n")
        );
    }

    if identity {
        let _ = write!(sql, "SET IDENTITY_INSERT {} OFF;", qualified(table, quote));
    } else if sql.ends_with('\n') {
        sql.pop();
    }
    sql
}

fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines()
        .map(|l| format!("{pad}{l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SeedDataset;
    use crate::sorter::sort_seed_tables;
    use pretty_assertions::assert_eq;
    use trestle_core::model::{Model, ModelDocument};

    fn build(
        entities: &[(&str, &[(&str, bool)])],
        rows: &[(&str, &[&[i64]])],
    ) -> (Model, SeedDataset) {
        let mut entity_docs = Vec::new();
        let mut seed_tables = Vec::new();
        for (name, targets) in entities {
            let mut attributes = vec![serde_json::json!({
                "logicalName": "Id", "physicalName": "Id", "dataType": "long",
                "isIdentifier": true, "isMandatory": true,
                "onDisk": {"isNullable": false, "sqlType": "bigint"}
            })];
            let mut relationships = Vec::new();
            let mut seed_columns = vec![serde_json::json!({
                "logicalName": "Id", "storageColumnName": "Id", "emissionName": "Id",
                "dataType": "bigint", "isPrimaryKey": true, "isNullable": false
            })];
            for (target, nullable) in *targets {
                let column = format!("{target}Id");
                attributes.push(serde_json::json!({
                    "logicalName": column, "physicalName": column, "dataType": "long",
                    "isMandatory": !nullable,
                    "reference": {"targetEntity": target},
                    "onDisk": {"isNullable": nullable, "sqlType": "bigint"}
                }));
                relationships.push(serde_json::json!({
                    "viaAttribute": column,
                    "targetEntity": target,
                    "hasDatabaseConstraint": true,
                    "actualConstraints": [{
                        "referencedSchema": "dbo",
                        "referencedTable": target,
                        "columns": [{"owningColumn": column,
                                     "referencedColumn": "Id", "ordinal": 1}]
                    }]
                }));
                seed_columns.push(serde_json::json!({
                    "logicalName": column, "storageColumnName": column,
                    "emissionName": column, "dataType": "bigint",
                    "isNullable": nullable
                }));
            }
            entity_docs.push(serde_json::json!({
                "logicalName": name, "physicalName": name, "isStatic": true,
                "attributes": attributes, "relationships": relationships
            }));
            let table_rows: Vec<Vec<i64>> = rows
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, r)| r.iter().map(|row| row.to_vec()).collect())
                .unwrap_or_default();
            seed_tables.push(serde_json::json!({
                "definition": {
                    "module": "M", "logicalName": name, "schema": "dbo",
                    "physicalName": name, "effectiveName": name,
                    "columns": seed_columns
                },
                "rows": table_rows
            }));
        }

        let model_json =
            serde_json::json!({"modules": [{"name": "M", "entities": entity_docs}]}).to_string();
        let doc: ModelDocument = serde_json::from_str(&model_json).unwrap();
        let model = Model::from_document(doc).unwrap();
        let dataset =
            SeedDataset::from_json(&serde_json::json!({"tables": seed_tables}).to_string())
                .unwrap();
        (model, dataset)
    }

    fn script_for(
        entities: &[(&str, &[(&str, bool)])],
        rows: &[(&str, &[&[i64]])],
        overrides: &[trestle_config::options::CircularDependencyOverride],
        settings: &ScriptSettings,
    ) -> String {
        let (model, dataset) = build(entities, rows);
        let ordering = sort_seed_tables(&dataset.tables, &model, overrides);
        generate_script(&ordering, &dataset.tables, settings).unwrap()
    }

    #[test]
    fn parent_child_ordering_without_phasing() {
        let script = script_for(
            &[("Child", &[("Parent", false)]), ("Parent", &[])],
            &[("Parent", &[&[1]]), ("Child", &[&[2, 1]])],
            &[],
            &ScriptSettings::default(),
        );
        let parent_pos = script.find("MERGE INTO [dbo].[Parent]").unwrap();
        let child_pos = script.find("MERGE INTO [dbo].[Child]").unwrap();
        assert!(parent_pos < child_pos);
        assert!(!script.contains("PhaseOneSource"));
    }

    #[test]
    fn nullable_cycle_emits_phases() {
        // A(BId NOT NULL -> B), B(AId NULL -> A).
        let script = script_for(
            &[("A", &[("B", false)]), ("B", &[("A", true)])],
            &[("A", &[&[1, 2]]), ("B", &[&[2, 1]])],
            &[],
            &ScriptSettings::default(),
        );
        assert_eq!(script.matches("MERGE INTO").count(), 2);
        assert!(script.contains("WITH PhaseOneSource AS ("));
        assert!(script.contains(
            "CASE WHEN 1 = 0 THEN SourceRows.[AId] ELSE NULL END AS [AId]"
        ));
        assert!(script.contains("-- UPDATE nullable FKs: dbo.B"));
        assert!(script.contains("SET [AId] = Source.[AId]"));
        // Phase 2 comes after both MERGE blocks.
        let last_merge = script.rfind("MERGE INTO").unwrap();
        let update_pos = script.find("-- UPDATE nullable FKs").unwrap();
        assert!(update_pos > last_merge);
    }

    #[test]
    fn strong_cycle_wraps_constraints_without_phasing() {
        let script = script_for(
            &[("A", &[("B", false)]), ("B", &[("A", false)])],
            &[("A", &[&[1, 2]]), ("B", &[&[2, 1]])],
            &[],
            &ScriptSettings::default(),
        );
        assert!(!script.contains("PhaseOneSource"));
        assert!(!script.contains("UPDATE nullable FKs"));
        assert!(script.contains("ALTER TABLE [dbo].[A] NOCHECK CONSTRAINT ALL;"));
        assert!(script.contains("ALTER TABLE [dbo].[B] NOCHECK CONSTRAINT ALL;"));
        let last_nocheck = script.rfind("NOCHECK CONSTRAINT ALL").unwrap();
        let first_check = script.find("] CHECK CONSTRAINT ALL").unwrap();
        assert!(first_check > last_nocheck, "re-enable happens after inserts");
    }

    #[test]
    fn manual_cycle_override_is_single_phase() {
        let overrides = vec![trestle_config::options::CircularDependencyOverride {
            cycle: vec!["Parent".into(), "Audit".into()],
            strict: true,
        }];
        let script = script_for(
            &[("Audit", &[("Parent", true)]), ("Parent", &[("Audit", true)])],
            &[("Parent", &[&[1, 2]]), ("Audit", &[&[2, 1]])],
            &overrides,
            &ScriptSettings::default(),
        );
        let parent_pos = script.find("MERGE INTO [dbo].[Parent]").unwrap();
        let audit_pos = script.find("MERGE INTO [dbo].[Audit]").unwrap();
        assert!(parent_pos < audit_pos);
        assert!(!script.contains("PhaseOneSource"));
    }

    #[test]
    fn empty_rows_emit_comment_block() {
        let script = script_for(
            &[("Status", &[])],
            &[],
            &[],
            &ScriptSettings::default(),
        );
        assert!(script.contains("-- Seed dbo.Status\n-- (no rows)"));
        assert!(!script.contains("MERGE INTO"));
    }

    #[test]
    fn empty_rows_under_validate_guard_existing_data() {
        let settings = ScriptSettings {
            synchronization_mode: SynchronizationMode::ValidateThenApply,
            ..Default::default()
        };
        let script = script_for(&[("Status", &[])], &[], &[], &settings);
        assert!(script.contains("IF EXISTS (SELECT 1 FROM [dbo].[Status])"));
        assert!(script.contains("THROW 50000"));
    }

    #[test]
    fn authoritative_mode_deletes_unmatched() {
        let settings = ScriptSettings {
            synchronization_mode: SynchronizationMode::Authoritative,
            ..Default::default()
        };
        let script = script_for(&[("Status", &[])], &[("Status", &[&[1]])], &[], &settings);
        assert!(script.contains("WHEN NOT MATCHED BY SOURCE THEN DELETE"));
    }

    #[test]
    fn validate_then_apply_guards_before_merge() {
        let settings = ScriptSettings {
            synchronization_mode: SynchronizationMode::ValidateThenApply,
            ..Default::default()
        };
        let script = script_for(&[("Status", &[])], &[("Status", &[&[1]])], &[], &settings);
        let guard = script.find("IF EXISTS (").unwrap();
        let merge = script.find("MERGE INTO").unwrap();
        assert!(guard < merge);
        assert!(script.contains("Seed drift detected for dbo.Status"));
    }

    #[test]
    fn oversized_row_sets_become_insert_batches() {
        let settings = ScriptSettings {
            batch_size: 2,
            ..Default::default()
        };
        let script = script_for(
            &[("Big", &[])],
            &[("Big", &[&[1], &[2], &[3]])],
            &[],
            &settings,
        );
        assert!(!script.contains("MERGE INTO"));
        assert_eq!(script.matches("INSERT INTO [dbo].[Big]").count(), 2);
    }

    #[test]
    fn missing_primary_key_is_an_error_unless_allowed() {
        let (model, mut dataset) = build(&[("Log", &[])], &[("Log", &[&[1]])]);
        for c in &mut dataset.tables[0].definition.columns {
            c.is_primary_key = false;
        }
        let ordering = sort_seed_tables(&dataset.tables, &model, &[]);

        let errs =
            generate_script(&ordering, &dataset.tables, &ScriptSettings::default()).unwrap_err();
        assert_eq!(errs[0].code(), "seed.primaryKeyRequired");

        let settings = ScriptSettings {
            allow_missing_primary_key: vec!["M.Log".into()],
            ..Default::default()
        };
        let script = generate_script(&ordering, &dataset.tables, &settings).unwrap();
        assert!(script.contains("MERGE INTO [dbo].[Log]"));
    }

    #[test]
    fn merge_shape_is_exact() {
        let script = script_for(
            &[("Status", &[])],
            &[("Status", &[&[1], &[2]])],
            &[],
            &ScriptSettings::default(),
        );
        let expected = "\
-- Seed dbo.Status
MERGE INTO [dbo].[Status] AS Target
USING (VALUES
    (1),
    (2)
) AS SourceRows ([Id])
ON Target.[Id] = SourceRows.[Id]
WHEN NOT MATCHED BY TARGET THEN
    INSERT ([Id])
    VALUES (SourceRows.[Id]);";
        assert!(script.contains(expected), "script was:\n{script}");
    }

    #[test]
    fn script_is_deterministic() {
        let make = || {
            script_for(
                &[("A", &[("B", false)]), ("B", &[("A", true)])],
                &[("A", &[&[1, 2]]), ("B", &[&[2, 1]])],
                &[],
                &ScriptSettings::default(),
            )
        };
        assert_eq!(make(), make());
    }
}
