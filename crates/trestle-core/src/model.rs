//! The logical application model consumed by the emission engine.
//!
//! The model document is produced by an upstream ingestor and arrives as
//! JSON. The shapes here deserialize it verbatim; [`Model::from_document`]
//! is the smart constructor that checks cross-entity invariants and returns
//! every violation it finds rather than stopping at the first.

use serde::{Deserialize, Serialize};

use crate::error::{AggregateResult, EngineError};

/// A validated model: an ordered set of modules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub modules: Vec<Module>,
}

/// The raw model document as deserialized from JSON, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDocument {
    #[serde(default)]
    pub modules: Vec<Module>,
}

/// A module: a named group of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub name: String,

    /// Pre-sanitized module name, when the source supplies one. Falls back
    /// to [`crate::identifier::sanitize_module`] at emission time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitized_name: Option<String>,

    #[serde(default)]
    pub is_system: bool,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// An entity: one logical table of a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub logical_name: String,

    pub physical_name: String,

    #[serde(default = "default_schema")]
    pub schema: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    #[serde(default)]
    pub is_static: bool,

    #[serde(default)]
    pub is_external: bool,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub attributes: Vec<Attribute>,

    #[serde(default)]
    pub indexes: Vec<ModelIndex>,

    #[serde(default)]
    pub relationships: Vec<Relationship>,

    #[serde(default)]
    pub triggers: Vec<Trigger>,

    /// Opaque source metadata carried through for diagnostics.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Entity {
    /// Returns the identifier attributes in declared order.
    pub fn identifier_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.is_identifier)
    }

    /// Returns the declared primary-key index, if any.
    pub fn primary_key_index(&self) -> Option<&ModelIndex> {
        self.indexes.iter().find(|i| i.is_primary)
    }

    /// Returns the attribute with the given logical name.
    pub fn attribute(&self, logical_name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.logical_name.eq_ignore_ascii_case(logical_name))
    }

    /// Returns the attribute backing the given physical column name.
    pub fn attribute_by_column(&self, column: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.physical_name.eq_ignore_ascii_case(column))
    }

    /// `schema.physical` display form used in diagnostics.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.physical_name)
    }
}

/// An attribute: one logical column of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub logical_name: String,

    pub physical_name: String,

    /// Logical data-type token (e.g. `text`, `integer`, `currency`).
    pub data_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,

    #[serde(default)]
    pub is_mandatory: bool,

    #[serde(default)]
    pub is_identifier: bool,

    #[serde(default)]
    pub is_auto_number: bool,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared default value, as the source records it (e.g. `true`, `0`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<AttributeReference>,

    /// External platform type hint (e.g. `NVARCHAR(128)`), when the source
    /// carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_type_hint: Option<String>,

    /// Observed source-object metadata (orphans, duplicates, defaults).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reality: Option<RealitySnapshot>,

    /// Physical column metadata captured from the database, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_disk: Option<OnDiskColumn>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Attribute {
    /// Returns `true` if the attribute should appear in emitted DDL: it is
    /// either active in the model or physically present on disk. Inactive
    /// but present columns are retained (for seeding) but never created new.
    pub fn is_emittable(&self) -> bool {
        self.is_active || self.on_disk.is_some()
    }

    /// Returns `true` if evidence shows the column is computed.
    pub fn is_computed(&self) -> bool {
        self.on_disk.as_ref().is_some_and(|d| d.is_computed)
    }
}

/// A reference from an attribute to another entity's identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeReference {
    /// Logical name of the referenced entity.
    pub target_entity: String,

    /// Physical table name of the referenced entity, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_physical_name: Option<String>,

    /// Schema of the referenced entity, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_schema: Option<String>,
}

/// Observed metadata about a source object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealitySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphan_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_definition: Option<String>,
}

/// Physical column metadata captured from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnDiskColumn {
    #[serde(default = "default_true")]
    pub is_nullable: bool,

    /// The on-disk SQL type name (e.g. `nvarchar`, `decimal`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<String>,

    /// Declared maximum length; `-1` means MAX.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,

    #[serde(default)]
    pub is_identity: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_seed: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_increment: Option<i64>,

    #[serde(default)]
    pub is_computed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_definition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_definition: Option<String>,

    /// Name of the default constraint, when the source names it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_constraint_name: Option<String>,

    #[serde(default)]
    pub check_constraints: Vec<CheckConstraint>,
}

/// A named check constraint captured from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckConstraint {
    pub name: String,

    pub definition: String,

    #[serde(default)]
    pub is_not_trusted: bool,
}

/// A relationship from an owning attribute to a target entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Logical name of the attribute carrying the reference.
    pub via_attribute: String,

    /// Logical name of the target entity.
    pub target_entity: String,

    /// Physical table name of the target entity, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_physical_name: Option<String>,

    /// Platform delete-rule code (e.g. `Protect`, `Delete`, `Ignore`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub delete_rule: String,

    #[serde(default)]
    pub has_database_constraint: bool,

    #[serde(default)]
    pub actual_constraints: Vec<ActualConstraint>,
}

/// A foreign-key constraint observed in the database for a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub referenced_schema: String,

    pub referenced_table: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub on_delete: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub on_update: String,

    #[serde(default)]
    pub is_not_trusted: bool,

    /// Ordered column pairs (source column → target column).
    #[serde(default)]
    pub columns: Vec<ConstraintColumnPair>,
}

/// One column pairing of a foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintColumnPair {
    pub owning_column: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owning_attribute: String,

    pub referenced_column: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub referenced_attribute: String,

    pub ordinal: u32,
}

/// An index declared on an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelIndex {
    pub name: String,

    #[serde(default)]
    pub is_unique: bool,

    #[serde(default)]
    pub is_primary: bool,

    /// Indexes created automatically by the platform (e.g. on every FK).
    #[serde(default)]
    pub is_platform_auto: bool,

    #[serde(default)]
    pub columns: Vec<IndexColumn>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_factor: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_space: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_scheme: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_compression: Option<String>,
}

impl ModelIndex {
    /// Returns the keyed (non-included) columns in ordinal order.
    pub fn key_columns(&self) -> impl Iterator<Item = &IndexColumn> {
        self.columns.iter().filter(|c| !c.is_included)
    }

    /// Returns the included columns in ordinal order.
    pub fn included_columns(&self) -> impl Iterator<Item = &IndexColumn> {
        self.columns.iter().filter(|c| c.is_included)
    }
}

/// One column of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexColumn {
    /// Physical column name.
    pub column: String,

    pub ordinal: u32,

    #[serde(default)]
    pub is_descending: bool,

    #[serde(default)]
    pub is_included: bool,
}

/// A trigger carried through emission verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub name: String,

    pub definition: String,

    #[serde(default)]
    pub is_disabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_schema() -> String {
    "dbo".to_owned()
}

impl Model {
    /// Validates a deserialized document and constructs a [`Model`].
    ///
    /// Checks the cross-entity invariant that `(schema, physical name)` is
    /// unique across the model unless the entity is external. All
    /// violations are collected before returning.
    pub fn from_document(doc: ModelDocument) -> AggregateResult<Model> {
        let mut errors = Vec::new();
        let mut seen: std::collections::HashMap<(String, String), String> =
            std::collections::HashMap::new();

        for module in &doc.modules {
            for entity in &module.entities {
                if entity.logical_name.is_empty() || entity.physical_name.is_empty() {
                    errors.push(EngineError::model_invariant(format!(
                        "entity in module {} has an empty logical or physical name",
                        module.name
                    )));
                    continue;
                }
                if entity.is_external {
                    continue;
                }
                let key = (
                    entity.schema.to_uppercase(),
                    entity.physical_name.to_uppercase(),
                );
                if let Some(prior) = seen.insert(key, format!("{}.{}", module.name, entity.logical_name)) {
                    errors.push(EngineError::model_invariant(format!(
                        "duplicate physical name {} (declared by {} and {}.{})",
                        entity.qualified_name(),
                        prior,
                        module.name,
                        entity.logical_name
                    )));
                }
            }
        }

        if errors.is_empty() {
            Ok(Model {
                modules: doc.modules,
            })
        } else {
            Err(errors)
        }
    }

    /// Parses and validates a model from JSON text.
    pub fn from_json(text: &str) -> AggregateResult<Model> {
        let doc: ModelDocument = serde_json::from_str(text)
            .map_err(|e| vec![EngineError::model_invariant(format!("model document: {e}"))])?;
        Self::from_document(doc)
    }

    /// Iterates `(module, entity)` pairs in declared order.
    pub fn entities(&self) -> impl Iterator<Item = (&Module, &Entity)> {
        self.modules
            .iter()
            .flat_map(|m| m.entities.iter().map(move |e| (m, e)))
    }

    /// Iterates the entities that produce emitted tables: active and
    /// non-external, in active modules.
    pub fn emittable_entities(&self) -> impl Iterator<Item = (&Module, &Entity)> {
        self.entities()
            .filter(|(m, e)| m.is_active && e.is_active && !e.is_external)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entity(logical: &str, physical: &str) -> Entity {
        Entity {
            logical_name: logical.into(),
            physical_name: physical.into(),
            schema: "dbo".into(),
            catalog: None,
            is_static: false,
            is_external: false,
            is_active: true,
            description: None,
            attributes: Vec::new(),
            indexes: Vec::new(),
            relationships: Vec::new(),
            triggers: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    fn module(name: &str, entities: Vec<Entity>) -> Module {
        Module {
            name: name.into(),
            sanitized_name: None,
            is_system: false,
            is_active: true,
            entities,
        }
    }

    #[test]
    fn duplicate_physical_names_rejected() {
        let doc = ModelDocument {
            modules: vec![module(
                "Sales",
                vec![entity("Order", "OSUSR_S_ORDER"), entity("Order2", "osusr_s_order")],
            )],
        };
        let errs = Model::from_document(doc).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code(), "model.invariant");
    }

    #[test]
    fn external_entities_exempt_from_uniqueness() {
        let mut ext = entity("OrderExt", "OSUSR_S_ORDER");
        ext.is_external = true;
        let doc = ModelDocument {
            modules: vec![module("Sales", vec![entity("Order", "OSUSR_S_ORDER"), ext])],
        };
        assert!(Model::from_document(doc).is_ok());
    }

    #[test]
    fn document_deserializes_with_defaults() {
        let json = r#"{
            "modules": [{
                "name": "Sales",
                "entities": [{
                    "logicalName": "Order",
                    "physicalName": "OSUSR_S_ORDER",
                    "attributes": [{
                        "logicalName": "Id",
                        "physicalName": "ID",
                        "dataType": "long",
                        "isIdentifier": true,
                        "isMandatory": true
                    }]
                }]
            }]
        }"#;
        let model = Model::from_json(json).unwrap();
        let (m, e) = model.entities().next().unwrap();
        assert_eq!(m.name, "Sales");
        assert!(m.is_active, "module is_active defaults to true");
        assert_eq!(e.schema, "dbo", "schema defaults to dbo");
        assert!(e.attributes[0].is_identifier);
        assert!(e.attributes[0].is_active);
    }

    #[test]
    fn emittable_skips_inactive_and_external() {
        let mut inactive = entity("Old", "OSUSR_S_OLD");
        inactive.is_active = false;
        let mut ext = entity("Ext", "EXT_TABLE");
        ext.is_external = true;
        let doc = ModelDocument {
            modules: vec![module(
                "Sales",
                vec![entity("Order", "OSUSR_S_ORDER"), inactive, ext],
            )],
        };
        let model = Model::from_document(doc).unwrap();
        let names: Vec<_> = model
            .emittable_entities()
            .map(|(_, e)| e.logical_name.as_str())
            .collect();
        assert_eq!(names, vec!["Order"]);
    }
}
