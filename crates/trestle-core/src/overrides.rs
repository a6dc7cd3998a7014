//! Naming overrides: rules that rename physical tables at emission time.
//!
//! Rules are matched against a table's `(schema, physical)`, `(module,
//! logical)`, or bare logical name, most specific tier first. Two rules
//! matching at the same tier is always an error; ties are never broken
//! silently.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// One naming-override rule.
///
/// `target` is the effective physical name assigned when the rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingOverrideRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Physical table name to match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_name: Option<String>,

    pub target: String,
}

/// Match tiers, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    SchemaTable,
    ModuleLogical,
    Logical,
}

impl NamingOverrideRule {
    fn tier(&self) -> Option<Tier> {
        if self.table.is_some() {
            Some(Tier::SchemaTable)
        } else if self.logical_name.is_some() && self.module.is_some() {
            Some(Tier::ModuleLogical)
        } else if self.logical_name.is_some() {
            Some(Tier::Logical)
        } else {
            None
        }
    }

    fn matches(&self, tier: Tier, schema: &str, physical: &str, module: &str, logical: &str) -> bool {
        match tier {
            Tier::SchemaTable => {
                self.table
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case(physical))
                    && self
                        .schema
                        .as_deref()
                        .is_none_or(|s| s.eq_ignore_ascii_case(schema))
            }
            Tier::ModuleLogical => {
                self.module
                    .as_deref()
                    .is_some_and(|m| m.eq_ignore_ascii_case(module))
                    && self
                        .logical_name
                        .as_deref()
                        .is_some_and(|l| l.eq_ignore_ascii_case(logical))
            }
            Tier::Logical => self
                .logical_name
                .as_deref()
                .is_some_and(|l| l.eq_ignore_ascii_case(logical)),
        }
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(s) = &self.schema {
            parts.push(format!("schema={s}"));
        }
        if let Some(t) = &self.table {
            parts.push(format!("table={t}"));
        }
        if let Some(m) = &self.module {
            parts.push(format!("module={m}"));
        }
        if let Some(l) = &self.logical_name {
            parts.push(format!("logicalName={l}"));
        }
        format!("{{{} -> {}}}", parts.join(", "), self.target)
    }
}

/// The validated rule set, constructed once per build and carried by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingOverrides {
    rules: Vec<NamingOverrideRule>,
}

impl NamingOverrides {
    /// Validates and wraps a rule list.
    ///
    /// Every rule must carry a non-empty target and at least one match
    /// field; anything else is a configuration error.
    pub fn new(rules: Vec<NamingOverrideRule>) -> Result<Self, EngineError> {
        for rule in &rules {
            if rule.target.is_empty() {
                return Err(EngineError::config_invalid(format!(
                    "naming override {} has an empty target",
                    rule.describe()
                )));
            }
            if rule.tier().is_none() {
                return Err(EngineError::config_invalid(format!(
                    "naming override {} matches nothing: set table, module+logicalName, or logicalName",
                    rule.describe()
                )));
            }
        }
        Ok(Self { rules })
    }

    /// Parses a rule array from JSON text.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let rules: Vec<NamingOverrideRule> = serde_json::from_str(text)
            .map_err(|e| EngineError::config_invalid(format!("naming overrides: {e}")))?;
        Self::new(rules)
    }

    /// Returns `true` if no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolves the override target for a table, if any rule matches.
    ///
    /// Tiers are consulted most specific first; multiple matches within the
    /// winning tier produce [`EngineError::OverrideAmbiguous`].
    pub fn resolve(
        &self,
        schema: &str,
        physical: &str,
        module: &str,
        logical: &str,
    ) -> Result<Option<&str>, EngineError> {
        for tier in [Tier::SchemaTable, Tier::ModuleLogical, Tier::Logical] {
            let matches: Vec<&NamingOverrideRule> = self
                .rules
                .iter()
                .filter(|r| r.tier() == Some(tier) && r.matches(tier, schema, physical, module, logical))
                .collect();
            match matches.len() {
                0 => continue,
                1 => return Ok(Some(&matches[0].target)),
                _ => {
                    return Err(EngineError::OverrideAmbiguous {
                        target: format!("{schema}.{physical}"),
                        detail: matches
                            .iter()
                            .map(|r| r.describe())
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }
            }
        }
        Ok(None)
    }

    /// Returns the effective physical name for a table: the override target
    /// when a rule matches, the declared physical name otherwise.
    pub fn effective_name(
        &self,
        schema: &str,
        physical: &str,
        module: &str,
        logical: &str,
    ) -> Result<String, EngineError> {
        Ok(self
            .resolve(schema, physical, module, logical)?
            .unwrap_or(physical)
            .to_owned())
    }
}
