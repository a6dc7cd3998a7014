//! The entity emission index: cross-module reference resolution.
//!
//! Relationships name their targets inconsistently across source exports:
//! sometimes by physical table, sometimes only by logical name. The index
//! holds three lookups and resolves in order of reliability, preferring the
//! owner's schema and module on ties. Supplemental entities (platform
//! system tables) participate so internal foreign keys resolve without
//! appearing in the user model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Model;

/// The resolution context stored per entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityContext {
    pub module: String,
    pub schema: String,
    pub physical_name: String,
    pub logical_name: String,
    pub is_static: bool,
    /// `true` for platform system tables injected alongside the model.
    pub is_supplemental: bool,
}

impl EntityContext {
    /// `schema.physical` display form.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.physical_name)
    }
}

/// A platform-defined system table injected into the resolution index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementalEntity {
    #[serde(default = "default_module")]
    pub module: String,

    #[serde(default = "default_schema")]
    pub schema: String,

    pub physical_name: String,

    pub logical_name: String,
}

fn default_module() -> String {
    "(platform)".to_owned()
}

fn default_schema() -> String {
    "dbo".to_owned()
}

/// Outcome of a reference resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Resolved(&'a EntityContext),
    /// Multiple logical-name candidates and no owner-based tiebreak.
    Ambiguous(Vec<&'a EntityContext>),
    NotFound,
}

impl<'a> Resolution<'a> {
    /// The resolved context, if resolution succeeded.
    pub fn context(&self) -> Option<&'a EntityContext> {
        match self {
            Self::Resolved(ctx) => Some(ctx),
            _ => None,
        }
    }
}

/// Lookup structure over all resolvable entities.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    contexts: Vec<EntityContext>,
    by_physical: HashMap<(String, String), usize>,
    by_module_logical: HashMap<(String, String), usize>,
    by_logical: HashMap<String, Vec<usize>>,
}

impl EntityIndex {
    /// Builds the index over a model plus supplemental entities.
    ///
    /// Contexts are inserted in module+entity declaration order, which makes
    /// the "first by module+logical order" fallback deterministic.
    pub fn build(model: &Model, supplemental: &[SupplementalEntity]) -> Self {
        let mut index = EntityIndex::default();
        for (module, entity) in model.entities() {
            index.insert(EntityContext {
                module: module.name.clone(),
                schema: entity.schema.clone(),
                physical_name: entity.physical_name.clone(),
                logical_name: entity.logical_name.clone(),
                is_static: entity.is_static,
                is_supplemental: false,
            });
        }
        for extra in supplemental {
            index.insert(EntityContext {
                module: extra.module.clone(),
                schema: extra.schema.clone(),
                physical_name: extra.physical_name.clone(),
                logical_name: extra.logical_name.clone(),
                is_static: false,
                is_supplemental: true,
            });
        }
        index
    }

    fn insert(&mut self, ctx: EntityContext) {
        let pos = self.contexts.len();
        self.by_physical
            .entry((ctx.schema.to_uppercase(), ctx.physical_name.to_uppercase()))
            .or_insert(pos);
        self.by_module_logical
            .entry((ctx.module.to_uppercase(), ctx.logical_name.to_uppercase()))
            .or_insert(pos);
        self.by_logical
            .entry(ctx.logical_name.to_uppercase())
            .or_default()
            .push(pos);
        self.contexts.push(ctx);
    }

    /// All indexed contexts in insertion order.
    pub fn contexts(&self) -> &[EntityContext] {
        &self.contexts
    }

    /// Looks up a context by exact `(schema, physical)`.
    pub fn by_physical(&self, schema: &str, physical: &str) -> Option<&EntityContext> {
        self.by_physical
            .get(&(schema.to_uppercase(), physical.to_uppercase()))
            .map(|&i| &self.contexts[i])
    }

    /// Resolves a reference from `owner` to the named target.
    ///
    /// Order: physical-name match (declared schema, then owner's schema),
    /// then `(owner module, logical)`, then bare logical name with
    /// owner-schema / owner-module tiebreaks.
    pub fn resolve(
        &self,
        target_logical: &str,
        target_physical: Option<&str>,
        target_schema: Option<&str>,
        owner_schema: &str,
        owner_module: &str,
    ) -> Resolution<'_> {
        if let Some(physical) = target_physical {
            if let Some(schema) = target_schema {
                if let Some(ctx) = self.by_physical(schema, physical) {
                    return Resolution::Resolved(ctx);
                }
            }
            if let Some(ctx) = self.by_physical(owner_schema, physical) {
                return Resolution::Resolved(ctx);
            }
            // Last physical attempt: unique match in any schema.
            let candidates: Vec<&EntityContext> = self
                .contexts
                .iter()
                .filter(|c| c.physical_name.eq_ignore_ascii_case(physical))
                .collect();
            if candidates.len() == 1 {
                return Resolution::Resolved(candidates[0]);
            }
        }

        if let Some(&i) = self
            .by_module_logical
            .get(&(owner_module.to_uppercase(), target_logical.to_uppercase()))
        {
            return Resolution::Resolved(&self.contexts[i]);
        }

        match self.by_logical.get(&target_logical.to_uppercase()) {
            None => Resolution::NotFound,
            Some(positions) => {
                let candidates: Vec<&EntityContext> =
                    positions.iter().map(|&i| &self.contexts[i]).collect();
                if candidates.len() == 1 {
                    return Resolution::Resolved(candidates[0]);
                }
                let same_schema: Vec<&EntityContext> = candidates
                    .iter()
                    .copied()
                    .filter(|c| c.schema.eq_ignore_ascii_case(owner_schema))
                    .collect();
                if same_schema.len() == 1 {
                    return Resolution::Resolved(same_schema[0]);
                }
                let pool = if same_schema.is_empty() {
                    &candidates
                } else {
                    &same_schema
                };
                let same_module: Vec<&EntityContext> = pool
                    .iter()
                    .copied()
                    .filter(|c| c.module.eq_ignore_ascii_case(owner_module))
                    .collect();
                if same_module.len() == 1 {
                    return Resolution::Resolved(same_module[0]);
                }
                Resolution::Ambiguous(candidates)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Model, ModelDocument};
    use pretty_assertions::assert_eq;

    fn model() -> Model {
        let json = r#"{
            "modules": [
                {"name": "Sales", "entities": [
                    {"logicalName": "Customer", "physicalName": "OSUSR_S_CUSTOMER"},
                    {"logicalName": "Order", "physicalName": "OSUSR_S_ORDER"}
                ]},
                {"name": "Billing", "entities": [
                    {"logicalName": "Customer", "physicalName": "OSUSR_B_CUSTOMER", "schema": "billing"}
                ]}
            ]
        }"#;
        let doc: ModelDocument = serde_json::from_str(json).unwrap();
        Model::from_document(doc).unwrap()
    }

    #[test]
    fn physical_lookup_is_primary() {
        let index = EntityIndex::build(&model(), &[]);
        let res = index.resolve("Customer", Some("OSUSR_B_CUSTOMER"), Some("billing"), "dbo", "Sales");
        assert_eq!(res.context().unwrap().module, "Billing");
    }

    #[test]
    fn module_logical_used_when_physical_unknown() {
        let index = EntityIndex::build(&model(), &[]);
        let res = index.resolve("Customer", None, None, "dbo", "Billing");
        assert_eq!(res.context().unwrap().physical_name, "OSUSR_B_CUSTOMER");
    }

    #[test]
    fn logical_fallback_prefers_owner_schema() {
        let index = EntityIndex::build(&model(), &[]);
        // Owner in dbo, module not matching either declaration.
        let res = index.resolve("Customer", None, None, "dbo", "Portal");
        assert_eq!(res.context().unwrap().physical_name, "OSUSR_S_CUSTOMER");
    }

    #[test]
    fn unresolvable_reports_not_found() {
        let index = EntityIndex::build(&model(), &[]);
        assert_eq!(
            index.resolve("Nothing", None, None, "dbo", "Sales"),
            Resolution::NotFound
        );
    }

    #[test]
    fn supplemental_entities_resolve() {
        let extras = vec![SupplementalEntity {
            module: "(platform)".into(),
            schema: "dbo".into(),
            physical_name: "OSSYS_USER".into(),
            logical_name: "User".into(),
        }];
        let index = EntityIndex::build(&model(), &extras);
        let res = index.resolve("User", None, None, "dbo", "Sales");
        let ctx = res.context().unwrap();
        assert!(ctx.is_supplemental);
        assert_eq!(ctx.physical_name, "OSSYS_USER");
    }

    #[test]
    fn ambiguity_without_tiebreak_is_reported() {
        let json = r#"{
            "modules": [
                {"name": "A", "entities": [
                    {"logicalName": "Thing", "physicalName": "T_A", "schema": "s1"}
                ]},
                {"name": "B", "entities": [
                    {"logicalName": "Thing", "physicalName": "T_B", "schema": "s2"}
                ]}
            ]
        }"#;
        let doc: ModelDocument = serde_json::from_str(json).unwrap();
        let m = Model::from_document(doc).unwrap();
        let index = EntityIndex::build(&m, &[]);
        let res = index.resolve("Thing", None, None, "other", "C");
        assert!(matches!(res, Resolution::Ambiguous(ref v) if v.len() == 2));
    }
}
