//! Per-table DDL rendering.
//!
//! One text artifact per table: optional provenance header, `CREATE TABLE`
//! with inline primary key and foreign keys, `CREATE INDEX` statements,
//! extended properties, and triggers. Output uses `\n` exclusively and ends
//! with exactly one trailing newline; identical input renders identical
//! bytes.

use std::fmt::Write as _;

use trestle_core::error::EngineError;
use trestle_core::identifier::{QuoteStrategy, MAX_IDENTIFIER_LEN};

use crate::projection::{ColumnDefinition, ForeignKeyDefinition, TableDefinition};

/// Run-level header fields rendered into each table artifact.
#[derive(Debug, Clone, Default)]
pub struct HeaderContext {
    pub model_path: String,
    pub profile_path: String,
    /// One-line decisions summary (e.g. `3 columns tightened, 1 fk created`).
    pub decisions: String,
    pub fingerprint_algorithm: String,
    pub fingerprint: String,
}

/// Rendering settings derived from the emission options.
#[derive(Debug, Clone, Default)]
pub struct WriterSettings {
    pub quote: QuoteStrategy,
    /// Suppress everything after the column list (keeps the inline PK).
    pub bare_table_only: bool,
    /// Mark untrusted foreign keys and checks `NOT FOR REPLICATION`.
    pub not_for_replication: bool,
    pub header: Option<HeaderContext>,
}

/// Renders the complete artifact for one table.
pub fn render_table(table: &TableDefinition, settings: &WriterSettings) -> Result<String, EngineError> {
    guard_identifiers(table)?;

    // Pre-size generously off the column count to avoid regrowth churn.
    let mut out = String::with_capacity(256 + table.columns.len() * 96);
    let quote = settings.quote;

    if let Some(header) = &settings.header {
        render_header(&mut out, table, header);
    }

    let _ = writeln!(
        out,
        "CREATE TABLE {} (",
        quote.quote_qualified(&table.schema, &table.physical_name)
    );

    // Table items: columns, then the PK, then FKs. Each item may span
    // multiple lines and may carry a trailing comment that must land after
    // the separating comma.
    let mut items: Vec<(String, Option<String>)> = Vec::new();

    for column in &table.columns {
        items.push((render_column(column, quote, settings), None));
    }

    if let Some(pk) = &table.primary_key {
        let cols: Vec<String> = pk.columns.iter().map(|c| quote.quote(c)).collect();
        items.push((
            format!(
                "    CONSTRAINT {} PRIMARY KEY\n        ({})",
                quote.quote(&pk.name),
                cols.join(", ")
            ),
            None,
        ));
    }

    if !settings.bare_table_only {
        for fk in &table.foreign_keys {
            items.push(render_foreign_key(fk, quote, settings));
        }
    }

    let last = items.len().saturating_sub(1);
    for (i, (body, comment)) in items.iter().enumerate() {
        out.push_str(body);
        if i != last {
            out.push(',');
        }
        out.push('\n');
        if let Some(comment) = comment {
            out.push_str(comment);
            out.push('\n');
        }
    }
    out.push_str(");\n");

    if !settings.bare_table_only {
        render_indexes(&mut out, table, quote);
        render_extended_properties(&mut out, table);
        render_triggers(&mut out, table, quote);
    }

    // Exactly one trailing newline.
    let trimmed = out.trim_end_matches('\n');
    let mut final_text = trimmed.to_owned();
    final_text.push('\n');
    Ok(final_text)
}

fn render_header(out: &mut String, table: &TableDefinition, header: &HeaderContext) {
    out.push_str("/*\n");
    let _ = writeln!(out, "    Source: {}", header.model_path);
    let _ = writeln!(out, "    Profile: {}", header.profile_path);
    let _ = writeln!(out, "    Decisions: {}", header.decisions);
    let _ = writeln!(
        out,
        "    Fingerprint: {} {}",
        header.fingerprint_algorithm, header.fingerprint
    );
    let _ = writeln!(out, "    Logical: {}", table.logical_name);
    let _ = writeln!(out, "    Module: {}", table.module);
    if table.was_renamed() {
        let _ = writeln!(
            out,
            "    RenamedFrom: {}.{}",
            table.schema, table.original_physical_name
        );
        let _ = writeln!(out, "    EffectiveName: {}", table.physical_name);
        let _ = writeln!(out, "    OriginalModule: {}", table.original_module);
    }
    out.push_str("*/\n");
}

fn render_column(
    column: &ColumnDefinition,
    quote: QuoteStrategy,
    settings: &WriterSettings,
) -> String {
    // Computed columns carry only their expression.
    if let Some(expr) = &column.computed_expression {
        return format!("    {} AS {}", quote.quote(&column.physical_name), expr);
    }

    let mut line = format!("    {} {}", quote.quote(&column.physical_name), column.data_type);
    if let Some(collation) = &column.collation {
        let _ = write!(line, " COLLATE {collation}");
    }
    if let Some(identity) = &column.identity {
        let _ = write!(line, " IDENTITY({},{})", identity.seed, identity.increment);
    }
    line.push_str(if column.nullable { " NULL" } else { " NOT NULL" });

    if settings.bare_table_only {
        return line;
    }

    if let Some(default) = &column.default {
        line.push('\n');
        match &default.constraint_name {
            Some(name) => {
                let _ = write!(
                    line,
                    "        CONSTRAINT {} DEFAULT {}",
                    quote.quote(name),
                    default.expression
                );
            }
            None => {
                let _ = write!(line, "        DEFAULT ({})", default.expression);
            }
        }
    }

    for check in &column.check_constraints {
        let replication = if check.is_not_trusted && settings.not_for_replication {
            " NOT FOR REPLICATION"
        } else {
            ""
        };
        let _ = write!(
            line,
            "\n        CONSTRAINT {} CHECK{} ({})",
            quote.quote(&check.name),
            replication,
            check.definition
        );
    }

    line
}

fn render_foreign_key(
    fk: &ForeignKeyDefinition,
    quote: QuoteStrategy,
    settings: &WriterSettings,
) -> (String, Option<String>) {
    let owning: Vec<String> = fk.columns.iter().map(|c| quote.quote(c)).collect();
    let referenced: Vec<String> = fk.referenced_columns.iter().map(|c| quote.quote(c)).collect();

    let mut body = format!(
        "    CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote.quote(&fk.name),
        owning.join(", "),
        quote.quote_qualified(&fk.referenced_schema, &fk.referenced_table),
        referenced.join(", ")
    );
    if fk.delete_action != "NO ACTION" {
        let _ = write!(body, "\n        ON DELETE {}", fk.delete_action);
    }
    if fk.update_action != "NO ACTION" {
        let _ = write!(body, "\n        ON UPDATE {}", fk.update_action);
    }
    if !fk.is_trusted && settings.not_for_replication {
        body.push_str("\n        NOT FOR REPLICATION");
    }

    let comment = (!fk.is_trusted).then(|| {
        format!(
            "    -- {}: source constraint untrusted; applied WITH NOCHECK",
            fk.name
        )
    });

    (body, comment)
}

fn render_indexes(out: &mut String, table: &TableDefinition, quote: QuoteStrategy) {
    for index in &table.indexes {
        out.push('\n');
        let unique = if index.is_unique { "UNIQUE " } else { "" };
        let keys: Vec<String> = index
            .key_columns
            .iter()
            .map(|k| {
                if k.descending {
                    format!("{} DESC", quote.quote(&k.name))
                } else {
                    quote.quote(&k.name)
                }
            })
            .collect();

        let _ = write!(
            out,
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            quote.quote(&index.name),
            quote.quote_qualified(&table.schema, &table.physical_name),
            keys.join(", ")
        );

        if !index.included_columns.is_empty() {
            let included: Vec<String> =
                index.included_columns.iter().map(|c| quote.quote(c)).collect();
            let _ = write!(out, " INCLUDE ({})", included.join(", "));
        }
        if let Some(filter) = &index.filter {
            let _ = write!(out, " WHERE {filter}");
        }

        let mut with_options = Vec::new();
        if let Some(ff) = index.fill_factor {
            with_options.push(format!("FILLFACTOR = {ff}"));
        }
        if let Some(compression) = &index.data_compression {
            with_options.push(format!("DATA_COMPRESSION = {compression}"));
        }
        if !with_options.is_empty() {
            let _ = write!(out, " WITH ({})", with_options.join(", "));
        }

        if let Some(partition) = &index.partition_scheme {
            let _ = write!(out, " ON {partition}");
        } else if let Some(space) = &index.data_space {
            let _ = write!(out, " ON {}", quote.quote(space));
        }

        out.push_str(";\n");
    }
}

fn render_extended_properties(out: &mut String, table: &TableDefinition) {
    if let Some(description) = table.description.as_deref().filter(|d| !d.is_empty()) {
        out.push('\n');
        let _ = writeln!(
            out,
            "EXEC sys.sp_addextendedproperty @name=N'MS_Description', @value=N'{}', \
             @level0type=N'SCHEMA', @level0name=N'{}', @level1type=N'TABLE', @level1name=N'{}';",
            escape_literal(description),
            table.schema,
            table.physical_name
        );
    }
    for column in &table.columns {
        if let Some(description) = column.description.as_deref().filter(|d| !d.is_empty()) {
            out.push('\n');
            let _ = writeln!(
                out,
                "EXEC sys.sp_addextendedproperty @name=N'MS_Description', @value=N'{}', \
                 @level0type=N'SCHEMA', @level0name=N'{}', @level1type=N'TABLE', @level1name=N'{}', \
                 @level2type=N'COLUMN', @level2name=N'{}';",
                escape_literal(description),
                table.schema,
                table.physical_name,
                column.physical_name
            );
        }
    }
}

fn render_triggers(out: &mut String, table: &TableDefinition, quote: QuoteStrategy) {
    for trigger in &table.triggers {
        out.push('\n');
        out.push_str(trigger.definition.trim_end_matches('\n'));
        out.push('\n');
        if trigger.is_disabled {
            let _ = writeln!(
                out,
                "ALTER TABLE {} DISABLE TRIGGER {};",
                quote.quote_qualified(&table.schema, &table.physical_name),
                quote.quote(&trigger.name)
            );
        }
    }
}

fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}

/// Final guard: no identifier may exceed the bound after all transforms.
fn guard_identifiers(table: &TableDefinition) -> Result<(), EngineError> {
    let mut names: Vec<&str> = vec![&table.physical_name, &table.schema];
    names.extend(table.columns.iter().map(|c| c.physical_name.as_str()));
    if let Some(pk) = &table.primary_key {
        names.push(&pk.name);
    }
    names.extend(table.indexes.iter().map(|i| i.name.as_str()));
    names.extend(table.foreign_keys.iter().map(|f| f.name.as_str()));
    names.extend(table.triggers.iter().map(|t| t.name.as_str()));

    for name in names {
        if name.chars().count() > MAX_IDENTIFIER_LEN {
            return Err(EngineError::IdentifierTooLong {
                identifier: name.to_owned(),
            });
        }
    }
    Ok(())
}
