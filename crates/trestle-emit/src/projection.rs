//! Physical table definitions: the projector's output, read-only downstream.

use serde::Serialize;

/// A fully resolved physical table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    pub module: String,

    /// Module name before any provenance rewrite; equals `module` unless a
    /// rename moved the table.
    pub original_module: String,

    /// Sanitized module name used for directory paths and header text.
    pub module_sanitized: String,

    pub schema: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    /// Effective physical name, after naming overrides.
    pub physical_name: String,

    /// Declared physical name, before naming overrides.
    pub original_physical_name: String,

    pub logical_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub columns: Vec<ColumnDefinition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKeyDefinition>,

    pub indexes: Vec<IndexDefinition>,

    pub foreign_keys: Vec<ForeignKeyDefinition>,

    pub triggers: Vec<TriggerDefinition>,
}

impl TableDefinition {
    /// `true` when a naming override changed this table's physical name.
    pub fn was_renamed(&self) -> bool {
        !self
            .physical_name
            .eq_ignore_ascii_case(&self.original_physical_name)
    }

    /// `schema.effectiveName` display form.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.physical_name)
    }

    /// `true` when the table or any column carries a description.
    pub fn has_descriptions(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.is_empty())
            || self
                .columns
                .iter()
                .any(|c| c.description.as_deref().is_some_and(|d| !d.is_empty()))
    }
}

/// One emitted column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub physical_name: String,

    pub logical_name: String,

    /// Rendered SQL data type (e.g. `NVARCHAR(MAX)`).
    pub data_type: String,

    pub nullable: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentitySpec>,

    /// Computed-column expression; excludes type and nullability emission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_expression: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultSpec>,

    pub check_constraints: Vec<CheckSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// IDENTITY(seed, increment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdentitySpec {
    pub seed: i64,
    pub increment: i64,
}

/// A column default, optionally carried with its source constraint name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
    pub expression: String,
}

/// A named check constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSpec {
    pub name: String,
    pub definition: String,
    pub is_not_trusted: bool,
}

/// The inline primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKeyDefinition {
    pub name: String,
    pub columns: Vec<String>,
}

/// One emitted secondary index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub name: String,
    pub is_unique: bool,
    pub is_platform_auto: bool,
    pub key_columns: Vec<IndexKeyColumn>,
    pub included_columns: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_factor: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_space: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_scheme: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_compression: Option<String>,
}

/// One key column of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexKeyColumn {
    pub name: String,
    pub descending: bool,
}

/// One emitted foreign key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDefinition {
    pub name: String,

    /// Owning columns in constraint ordinal order.
    pub columns: Vec<String>,

    pub referenced_module: String,

    pub referenced_schema: String,

    /// Effective name of the referenced table, after naming overrides.
    pub referenced_table: String,

    pub referenced_columns: Vec<String>,

    pub referenced_logical: String,

    /// Normalized SQL action (`NO ACTION`, `CASCADE`, `SET NULL`, …).
    pub delete_action: String,

    pub update_action: String,

    /// `true` emits `WITH CHECK`; `false` leaves the constraint untrusted.
    pub is_trusted: bool,
}

/// A trigger carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDefinition {
    pub name: String,
    pub definition: String,
    pub is_disabled: bool,
}
