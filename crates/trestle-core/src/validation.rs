//! Model invariant validation beyond construction-time checks.

use crate::error::EngineError;
use crate::model::Model;

/// Validates per-entity invariants that depend on configuration.
///
/// Every active, non-external entity must declare at least one identifier
/// attribute unless `module.logical` appears in `allow_missing_primary_key`.
/// All violations are collected.
pub fn validate_model(model: &Model, allow_missing_primary_key: &[String]) -> Vec<EngineError> {
    let mut errors = Vec::new();

    for (module, entity) in model.emittable_entities() {
        let has_identifier = entity.identifier_attributes().next().is_some();
        if has_identifier || entity.primary_key_index().is_some() {
            continue;
        }
        let qualified = format!("{}.{}", module.name, entity.logical_name);
        let allowed = allow_missing_primary_key
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&qualified));
        if !allowed {
            errors.push(EngineError::model_invariant(format!(
                "entity {qualified} ({}) has no identifier attribute and is not listed in allowMissingPrimaryKey",
                entity.qualified_name()
            )));
        }
    }

    errors
}
