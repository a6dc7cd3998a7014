//! Seed table definitions and row datasets.
//!
//! Seed rows arrive as JSON arrays positionally aligned with the table's
//! columns. Each column carries the raw on-disk SQL type string so literal
//! formatting matches the physical schema, and both the storage column name
//! and the emission name so renamed tables seed correctly.

use serde::{Deserialize, Serialize};

use trestle_core::error::{AggregateResult, EngineError};
use trestle_core::literal::{self, SeedValue};
use trestle_core::model::{Entity, Module};

/// One column of a seed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticEntitySeedColumn {
    pub logical_name: String,

    /// Physical column name in the source table.
    pub storage_column_name: String,

    /// Column name used in emitted SQL (equals the storage name unless a
    /// rename applies).
    pub emission_name: String,

    /// Raw on-disk SQL type string (e.g. `nvarchar(100)`).
    pub data_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,

    #[serde(default)]
    pub is_primary_key: bool,

    #[serde(default)]
    pub is_identity: bool,

    #[serde(default = "default_true")]
    pub is_nullable: bool,
}

/// A static entity's seed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticEntitySeedTableDefinition {
    pub module: String,

    pub logical_name: String,

    pub schema: String,

    /// Declared physical name.
    pub physical_name: String,

    /// Effective physical name after naming overrides.
    pub effective_name: String,

    pub columns: Vec<StaticEntitySeedColumn>,
}

impl StaticEntitySeedTableDefinition {
    /// `schema.effectiveName` display form.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.effective_name)
    }

    /// The primary-key columns, in declared order.
    pub fn primary_key_columns(&self) -> Vec<&StaticEntitySeedColumn> {
        self.columns.iter().filter(|c| c.is_primary_key).collect()
    }

    /// `true` if any column is an identity column.
    pub fn has_identity(&self) -> bool {
        self.columns.iter().any(|c| c.is_identity)
    }

    /// Finds a column by storage or emission name.
    pub fn column(&self, name: &str) -> Option<&StaticEntitySeedColumn> {
        self.columns.iter().find(|c| {
            c.storage_column_name.eq_ignore_ascii_case(name)
                || c.emission_name.eq_ignore_ascii_case(name)
        })
    }

    /// Builds the seed projection for a static entity.
    ///
    /// Columns use the same physical name the table projector emits and the
    /// raw on-disk SQL type string, so seed literals format against the
    /// physical schema rather than the logical one.
    pub fn from_entity(module: &Module, entity: &Entity, effective_name: String) -> Self {
        let columns = entity
            .attributes
            .iter()
            .filter(|a| a.is_emittable())
            .map(|a| {
                let disk = a.on_disk.as_ref();
                StaticEntitySeedColumn {
                    logical_name: a.logical_name.clone(),
                    storage_column_name: a.physical_name.clone(),
                    emission_name: a.physical_name.clone(),
                    data_type: disk
                        .and_then(|d| d.sql_type.clone())
                        .unwrap_or_else(|| a.data_type.clone()),
                    length: a.length.or(disk.and_then(|d| d.max_length)),
                    precision: a.precision.or(disk.and_then(|d| d.precision)),
                    scale: a.scale.or(disk.and_then(|d| d.scale)),
                    is_primary_key: a.is_identifier,
                    is_identity: disk.is_some_and(|d| d.is_identity),
                    is_nullable: disk.map_or(!a.is_mandatory, |d| d.is_nullable),
                }
            })
            .collect();

        Self {
            module: module.name.clone(),
            logical_name: entity.logical_name.clone(),
            schema: entity.schema.clone(),
            physical_name: entity.physical_name.clone(),
            effective_name,
            columns,
        }
    }
}

/// One seed row, positionally aligned with the table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticEntityRow {
    pub values: Vec<SeedValue>,
}

/// One table's definition plus its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedTableData {
    pub definition: StaticEntitySeedTableDefinition,
    pub rows: Vec<StaticEntityRow>,
}

/// The full dataset: ordered collection of `(definition, rows)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedDataset {
    pub tables: Vec<SeedTableData>,
}

/// Raw dataset document before value coercion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedDatasetDocument {
    #[serde(default)]
    tables: Vec<SeedTableDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedTableDocument {
    definition: StaticEntitySeedTableDefinition,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

impl SeedDataset {
    /// Rewrites each definition's effective name through a
    /// `(schema, physical) -> effective` lookup, so seed scripts target
    /// renamed tables consistently with the emitted DDL.
    pub fn apply_effective_names<F>(&mut self, effective: F)
    where
        F: Fn(&str, &str) -> Option<String>,
    {
        for table in &mut self.tables {
            if let Some(name) = effective(&table.definition.schema, &table.definition.physical_name)
            {
                table.definition.effective_name = name;
            }
        }
    }

    /// Parses and validates a dataset from JSON text.
    ///
    /// Row arity must equal the column count; every scalar is coerced
    /// through the column's data type. All violations are collected.
    pub fn from_json(text: &str) -> AggregateResult<SeedDataset> {
        let doc: SeedDatasetDocument = serde_json::from_str(text)
            .map_err(|e| vec![EngineError::model_invariant(format!("seed dataset: {e}"))])?;

        let mut errors = Vec::new();
        let mut tables = Vec::with_capacity(doc.tables.len());

        for table_doc in doc.tables {
            let definition = table_doc.definition;
            let mut rows = Vec::with_capacity(table_doc.rows.len());
            for (row_index, raw) in table_doc.rows.iter().enumerate() {
                if raw.len() != definition.columns.len() {
                    errors.push(EngineError::model_invariant(format!(
                        "seed row {} of {} has {} values, expected {}",
                        row_index,
                        definition.qualified_name(),
                        raw.len(),
                        definition.columns.len()
                    )));
                    continue;
                }
                let mut values = Vec::with_capacity(raw.len());
                let mut row_ok = true;
                for (value, column) in raw.iter().zip(&definition.columns) {
                    match literal::from_json(value, &column.data_type) {
                        Ok(v) => values.push(v),
                        Err(e) => {
                            errors.push(e);
                            row_ok = false;
                        }
                    }
                }
                if row_ok {
                    rows.push(StaticEntityRow { values });
                }
            }
            tables.push(SeedTableData { definition, rows });
        }

        if errors.is_empty() {
            Ok(SeedDataset { tables })
        } else {
            Err(errors)
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dataset_json() -> &'static str {
        r#"{
            "tables": [{
                "definition": {
                    "module": "Sales",
                    "logicalName": "Status",
                    "schema": "dbo",
                    "physicalName": "OSUSR_S_STATUS",
                    "effectiveName": "OSUSR_S_STATUS",
                    "columns": [
                        {"logicalName": "Id", "storageColumnName": "ID", "emissionName": "ID",
                         "dataType": "bigint", "isPrimaryKey": true, "isNullable": false},
                        {"logicalName": "Label", "storageColumnName": "LABEL", "emissionName": "LABEL",
                         "dataType": "nvarchar(50)", "isNullable": false}
                    ]
                },
                "rows": [[1, "Open"], [2, "Closed"]]
            }]
        }"#
    }

    #[test]
    fn parses_and_coerces_rows() {
        let dataset = SeedDataset::from_json(dataset_json()).unwrap();
        assert_eq!(dataset.tables.len(), 1);
        let table = &dataset.tables[0];
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].values[0], SeedValue::Int(1));
        assert_eq!(table.rows[0].values[1], SeedValue::Text("Open".into()));
    }

    #[test]
    fn arity_mismatch_is_collected() {
        let bad = dataset_json().replace("[2, \"Closed\"]", "[2]");
        let errors = SeedDataset::from_json(&bad).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "model.invariant");
    }

    #[test]
    fn effective_names_rewrite_through_lookup() {
        let mut dataset = SeedDataset::from_json(dataset_json()).unwrap();
        dataset.apply_effective_names(|schema, physical| {
            (schema == "dbo" && physical == "OSUSR_S_STATUS").then(|| "STATUS".to_owned())
        });
        assert_eq!(dataset.tables[0].definition.effective_name, "STATUS");
        assert_eq!(dataset.tables[0].definition.physical_name, "OSUSR_S_STATUS");
    }

    #[test]
    fn from_entity_uses_on_disk_types() {
        let json = r#"{
            "modules": [{"name": "Sales", "entities": [{
                "logicalName": "Status",
                "physicalName": "OSUSR_S_STATUS",
                "isStatic": true,
                "attributes": [
                    {"logicalName": "Id", "physicalName": "ID", "dataType": "long",
                     "isIdentifier": true, "isMandatory": true,
                     "onDisk": {"isNullable": false, "sqlType": "bigint", "isIdentity": true}},
                    {"logicalName": "Label", "physicalName": "LABEL", "dataType": "text",
                     "isMandatory": true,
                     "onDisk": {"isNullable": false, "sqlType": "nvarchar", "maxLength": 50}}
                ]
            }]}]
        }"#;
        let doc: trestle_core::model::ModelDocument = serde_json::from_str(json).unwrap();
        let model = trestle_core::model::Model::from_document(doc).unwrap();
        let (module, entity) = model.entities().next().unwrap();
        let def =
            StaticEntitySeedTableDefinition::from_entity(module, entity, "STATUS".to_owned());
        assert_eq!(def.effective_name, "STATUS");
        assert_eq!(def.columns[0].data_type, "bigint");
        assert!(def.columns[0].is_identity);
        assert!(def.has_identity());
        assert_eq!(def.primary_key_columns().len(), 1);
        assert_eq!(def.columns[1].data_type, "nvarchar");
    }
}
