//! Foreign-key preflight over a planned seed order.
//!
//! Validates that every relationship of a seeded table has its parent
//! present in the dataset and positioned before the child. Deferred
//! (phased) columns and self references are exempt; phase 2 restores them
//! after both sides exist.

use serde::Serialize;

use trestle_core::model::Model;

use crate::dataset::SeedTableData;
use crate::sorter::{SeedOrdering, SeedRole};

/// One preflight finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PreflightFinding {
    /// The child table is seeded but its referenced parent is not.
    MissingParent {
        child: String,
        parent: String,
        via_column: String,
    },
    /// Both tables are seeded but the parent is emitted after the child.
    ParentAfterChild {
        child: String,
        parent: String,
        via_column: String,
        parent_position: usize,
        child_position: usize,
    },
}

/// The structured preflight report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightReport {
    pub findings: Vec<PreflightFinding>,
}

impl PreflightReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Scans every relationship of the seeded tables against the planned order.
pub fn preflight(
    ordering: &SeedOrdering,
    dataset: &[SeedTableData],
    model: &Model,
) -> PreflightReport {
    let positions = ordering.positions();
    let mut report = PreflightReport::default();

    // Node lookup mirrors the sorter: physical or effective name, per schema.
    let node_for = |schema: &str, table: &str| -> Option<usize> {
        dataset.iter().position(|t| {
            t.definition.schema.eq_ignore_ascii_case(schema)
                && (t.definition.physical_name.eq_ignore_ascii_case(table)
                    || t.definition.effective_name.eq_ignore_ascii_case(table))
        })
    };

    for (_, entity) in model.entities() {
        let Some(child) = node_for(&entity.schema, &entity.physical_name) else {
            continue;
        };
        let child_role = ordering
            .tables
            .iter()
            .find(|t| t.table_index == child)
            .map(|t| &t.role);

        for relationship in entity
            .relationships
            .iter()
            .filter(|r| !r.actual_constraints.is_empty())
        {
            let constraint = &relationship.actual_constraints[0];
            let via_column = constraint
                .columns
                .first()
                .map(|p| p.owning_column.clone())
                .unwrap_or_default();

            // Phase 2 restores deferred columns after both sides exist.
            if let Some(SeedRole::PhasedCycleMember { deferred_columns }) = child_role {
                if deferred_columns
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(&via_column))
                {
                    continue;
                }
            }

            let child_name = dataset[child].definition.qualified_name();
            match node_for(&constraint.referenced_schema, &constraint.referenced_table) {
                None => report.findings.push(PreflightFinding::MissingParent {
                    child: child_name,
                    parent: format!(
                        "{}.{}",
                        constraint.referenced_schema, constraint.referenced_table
                    ),
                    via_column,
                }),
                Some(parent) if parent == child => {}
                Some(parent) => {
                    let (Some(&parent_position), Some(&child_position)) =
                        (positions.get(&parent), positions.get(&child))
                    else {
                        continue;
                    };
                    if parent_position > child_position {
                        report.findings.push(PreflightFinding::ParentAfterChild {
                            child: child_name,
                            parent: dataset[parent].definition.qualified_name(),
                            via_column,
                            parent_position,
                            child_position,
                        });
                    }
                }
            }
        }
    }

    report
}
