//! FK-aware ordering of static-entity seed tables.
//!
//! Builds a dependency graph (edges run referenced → owner), finds strongly
//! connected components, and resolves each cycle by manual ordering,
//! nullable-FK phasing, or alphabetical fallback, in that preference order.
//! The final order is a deterministic topological sort of the condensation:
//! dependency-free tables first, ties broken by declared position.

use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::cmp::Reverse;

use tracing::debug;

use trestle_config::options::CircularDependencyOverride;
use trestle_core::model::Model;

use crate::dataset::SeedTableData;
use crate::graph::strongly_connected_components;

/// How a table participates in the generated script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedRole {
    Normal,
    /// Size-1 component with a self-referencing FK; emitted in place with a
    /// comment, never phased.
    SelfReference,
    /// Member of a nullable-FK cycle; the named columns are nulled in phase
    /// 1 and restored by a phase-2 UPDATE.
    PhasedCycleMember { deferred_columns: Vec<String> },
    /// Member of a cycle with no nullable edge; constraints must be
    /// disabled around its inserts.
    StrongCycleMember,
}

/// One table in final emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedSeedTable {
    /// Index into the input dataset.
    pub table_index: usize,
    pub role: SeedRole,
    /// Non-empty on the last-emitted member of a strong cycle: the member
    /// set whose constraints are re-enabled after this table's inserts.
    pub closes_strong_cycle: Vec<usize>,
}

/// The ordering result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedOrdering {
    pub tables: Vec<OrderedSeedTable>,

    pub topological_ordering_applied: bool,
    pub cycle_detected: bool,
    pub alphabetical_fallback_applied: bool,
    /// `true` when a cycle survived manual ordering (phasable or strong).
    pub requires_phasing: bool,

    pub node_count: usize,
    pub edge_count: usize,
    pub missing_edge_count: usize,

    pub diagnostics: Vec<String>,
}

impl SeedOrdering {
    /// Position of each table index in the final order.
    pub fn positions(&self) -> HashMap<usize, usize> {
        self.tables
            .iter()
            .enumerate()
            .map(|(pos, t)| (t.table_index, pos))
            .collect()
    }
}

/// A derived FK edge: `from` (referenced table) must precede `to` (owner).
#[derive(Debug, Clone, PartialEq, Eq)]
struct SeedEdge {
    from: usize,
    to: usize,
    owning_column: String,
    owning_nullable: bool,
}

/// Orders the dataset's tables for emission.
pub fn sort_seed_tables(
    dataset: &[SeedTableData],
    model: &Model,
    overrides: &[CircularDependencyOverride],
) -> SeedOrdering {
    let mut ordering = SeedOrdering {
        node_count: dataset.len(),
        topological_ordering_applied: !dataset.is_empty(),
        ..Default::default()
    };

    let node_lookup = build_node_lookup(dataset);
    let edges = derive_edges(dataset, model, &node_lookup, &mut ordering);

    // Deduplicated adjacency for SCC detection; self-loops tracked aside.
    let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); dataset.len()];
    let mut self_loops: Vec<bool> = vec![false; dataset.len()];
    for edge in &edges {
        if edge.from == edge.to {
            self_loops[edge.from] = true;
        } else {
            adjacency[edge.from].insert(edge.to);
        }
    }
    ordering.edge_count = adjacency.iter().map(BTreeSet::len).sum::<usize>()
        + self_loops.iter().filter(|s| **s).count();

    let adjacency_vec: Vec<Vec<usize>> = adjacency
        .iter()
        .map(|s| s.iter().copied().collect())
        .collect();
    let components = strongly_connected_components(&adjacency_vec);

    let mut component_of = vec![0usize; dataset.len()];
    for (comp_id, members) in components.iter().enumerate() {
        for &node in members {
            component_of[node] = comp_id;
        }
    }

    // Resolve each component into an internal order, member roles, and the
    // set of intra-component edges removed by phasing or manual ordering.
    let mut internal_orders: Vec<Vec<usize>> = vec![Vec::new(); components.len()];
    let mut roles: Vec<SeedRole> = vec![SeedRole::Normal; dataset.len()];
    let mut strong_components: Vec<Vec<usize>> = Vec::new();

    for (comp_id, members) in components.iter().enumerate() {
        if members.len() == 1 {
            let node = members[0];
            internal_orders[comp_id] = vec![node];
            if self_loops[node] {
                roles[node] = SeedRole::SelfReference;
                ordering.diagnostics.push(format!(
                    "{} references itself; emitted in place",
                    dataset[node].definition.qualified_name()
                ));
            }
            continue;
        }

        ordering.cycle_detected = true;
        let resolved = resolve_cycle(
            members,
            dataset,
            &edges,
            &component_of,
            comp_id,
            overrides,
            &mut ordering,
        );
        match resolved {
            CycleResolution::Manual(order) => {
                internal_orders[comp_id] = order;
            }
            CycleResolution::Phased { order, deferred } => {
                ordering.requires_phasing = true;
                for (node, columns) in deferred {
                    roles[node] = SeedRole::PhasedCycleMember {
                        deferred_columns: columns,
                    };
                }
                internal_orders[comp_id] = order;
            }
            CycleResolution::Strong(order) => {
                ordering.requires_phasing = true;
                ordering.alphabetical_fallback_applied = true;
                for &node in &order {
                    roles[node] = SeedRole::StrongCycleMember;
                }
                strong_components.push(order.clone());
                internal_orders[comp_id] = order;
            }
        }
    }

    // Condensation DAG over the remaining inter-component edges, ordered by
    // Kahn's algorithm with smallest-declared-index tiebreak.
    let mut comp_adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
    let mut in_degree = vec![0usize; components.len()];
    for edge in &edges {
        let (from_comp, to_comp) = (component_of[edge.from], component_of[edge.to]);
        if from_comp != to_comp && comp_adjacency[from_comp].insert(to_comp) {
            in_degree[to_comp] += 1;
        }
    }

    let comp_rank = |comp_id: usize| -> usize {
        components[comp_id].iter().copied().min().unwrap_or(usize::MAX)
    };
    let mut ready: BinaryHeap<Reverse<(usize, usize)>> = (0..components.len())
        .filter(|&c| in_degree[c] == 0)
        .map(|c| Reverse((comp_rank(c), c)))
        .collect();

    let mut ordered_nodes = Vec::with_capacity(dataset.len());
    while let Some(Reverse((_, comp_id))) = ready.pop() {
        ordered_nodes.extend(internal_orders[comp_id].iter().copied());
        for &next in &comp_adjacency[comp_id] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse((comp_rank(next), next)));
            }
        }
    }

    for node in ordered_nodes {
        let closes = strong_components
            .iter()
            .find(|comp| comp.last() == Some(&node))
            .cloned()
            .unwrap_or_default();
        ordering.tables.push(OrderedSeedTable {
            table_index: node,
            role: roles[node].clone(),
            closes_strong_cycle: closes,
        });
    }

    debug!(
        nodes = ordering.node_count,
        edges = ordering.edge_count,
        missing = ordering.missing_edge_count,
        cycles = ordering.cycle_detected,
        "seed ordering computed"
    );
    ordering
}

fn build_node_lookup(dataset: &[SeedTableData]) -> HashMap<(String, String), usize> {
    let mut lookup = HashMap::new();
    for (i, table) in dataset.iter().enumerate() {
        let schema = table.definition.schema.to_uppercase();
        lookup.insert(
            (schema.clone(), table.definition.physical_name.to_uppercase()),
            i,
        );
        lookup.insert(
            (schema, table.definition.effective_name.to_uppercase()),
            i,
        );
    }
    lookup
}

fn derive_edges(
    dataset: &[SeedTableData],
    model: &Model,
    node_lookup: &HashMap<(String, String), usize>,
    ordering: &mut SeedOrdering,
) -> Vec<SeedEdge> {
    let mut edges = Vec::new();

    for (_, entity) in model.entities() {
        let owner_key = (
            entity.schema.to_uppercase(),
            entity.physical_name.to_uppercase(),
        );
        let Some(&owner) = node_lookup.get(&owner_key) else {
            continue;
        };

        for relationship in entity
            .relationships
            .iter()
            .filter(|r| !r.actual_constraints.is_empty())
        {
            let constraint = &relationship.actual_constraints[0];
            let target_key = (
                constraint.referenced_schema.to_uppercase(),
                constraint.referenced_table.to_uppercase(),
            );
            let Some(&referenced) = node_lookup.get(&target_key) else {
                ordering.missing_edge_count += 1;
                continue;
            };

            let owning_column = constraint
                .columns
                .first()
                .map(|p| p.owning_column.clone())
                .unwrap_or_default();
            let owning_nullable = dataset[owner]
                .definition
                .column(&owning_column)
                .is_some_and(|c| c.is_nullable);

            edges.push(SeedEdge {
                from: referenced,
                to: owner,
                owning_column,
                owning_nullable,
            });
        }
    }

    edges
}

enum CycleResolution {
    /// Manual allowed-cycle ordering adopted; no phasing.
    Manual(Vec<usize>),
    /// Phasable: members with their deferred nullable columns.
    Phased {
        order: Vec<usize>,
        deferred: Vec<(usize, Vec<String>)>,
    },
    /// Strong cycle: alphabetical member order.
    Strong(Vec<usize>),
}

fn resolve_cycle(
    members: &[usize],
    dataset: &[SeedTableData],
    edges: &[SeedEdge],
    component_of: &[usize],
    comp_id: usize,
    overrides: &[CircularDependencyOverride],
    ordering: &mut SeedOrdering,
) -> CycleResolution {
    // Manual ordering wins when it covers the component exactly.
    if let Some(order) = match_manual_override(members, dataset, overrides, ordering) {
        return CycleResolution::Manual(order);
    }

    let intra: Vec<&SeedEdge> = edges
        .iter()
        .filter(|e| {
            e.from != e.to && component_of[e.from] == comp_id && component_of[e.to] == comp_id
        })
        .collect();

    // One deferred nullable FK per participant that has one.
    let mut deferred: Vec<(usize, Vec<String>)> = Vec::new();
    let mut deferred_pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
    for &member in members {
        let pick = intra
            .iter()
            .find(|e| e.to == member && e.owning_nullable && !e.owning_column.is_empty());
        if let Some(edge) = pick {
            deferred_pairs.insert((edge.from, edge.to));
            deferred.push((member, vec![edge.owning_column.clone()]));
        }
    }

    if deferred.is_empty() {
        let mut order = members.to_vec();
        order.sort_by(|&a, &b| {
            dataset[a]
                .definition
                .effective_name
                .cmp(&dataset[b].definition.effective_name)
        });
        ordering.diagnostics.push(format!(
            "cycle without nullable foreign keys: {}; alphabetical order applied, constraints must be disabled",
            order
                .iter()
                .map(|&i| dataset[i].definition.qualified_name())
                .collect::<Vec<_>>()
                .join(" -> ")
        ));
        return CycleResolution::Strong(order);
    }

    // Topological order of the members with the deferred edges removed.
    let mut in_degree: HashMap<usize, usize> = members.iter().map(|&m| (m, 0)).collect();
    let mut local_adjacency: HashMap<usize, BTreeSet<usize>> =
        members.iter().map(|&m| (m, BTreeSet::new())).collect();
    for edge in &intra {
        if deferred_pairs.contains(&(edge.from, edge.to)) {
            continue;
        }
        if local_adjacency
            .get_mut(&edge.from)
            .expect("member adjacency")
            .insert(edge.to)
        {
            *in_degree.get_mut(&edge.to).expect("member degree") += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = members
        .iter()
        .filter(|&&m| in_degree[&m] == 0)
        .map(|&m| Reverse(m))
        .collect();
    let mut order = Vec::with_capacity(members.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &next in &local_adjacency[&node] {
            let d = in_degree.get_mut(&next).expect("member degree");
            *d -= 1;
            if *d == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    // Deferring one edge per member can leave a residual cycle; fall back
    // alphabetically for whatever is left.
    if order.len() < members.len() {
        let mut rest: Vec<usize> = members.iter().copied().filter(|m| !order.contains(m)).collect();
        rest.sort_by(|&a, &b| {
            dataset[a]
                .definition
                .effective_name
                .cmp(&dataset[b].definition.effective_name)
        });
        ordering.alphabetical_fallback_applied = true;
        ordering.diagnostics.push(format!(
            "residual cycle after deferring nullable foreign keys; alphabetical order applied to {} tables",
            rest.len()
        ));
        order.extend(rest);
    }

    CycleResolution::Phased { order, deferred }
}

fn match_manual_override(
    members: &[usize],
    dataset: &[SeedTableData],
    overrides: &[CircularDependencyOverride],
    ordering: &mut SeedOrdering,
) -> Option<Vec<usize>> {
    let find_member = |name: &str| -> Option<usize> {
        members.iter().copied().find(|&m| {
            let def = &dataset[m].definition;
            def.effective_name.eq_ignore_ascii_case(name)
                || def.physical_name.eq_ignore_ascii_case(name)
                || def.logical_name.eq_ignore_ascii_case(name)
        })
    };

    for override_rule in overrides {
        if override_rule.cycle.len() != members.len() {
            if override_rule.strict
                && override_rule.cycle.iter().any(|n| find_member(n).is_some())
            {
                ordering.diagnostics.push(format!(
                    "circular dependency override [{}] does not cover the detected cycle exactly; ignored",
                    override_rule.cycle.join(", ")
                ));
            }
            continue;
        }
        let resolved: Option<Vec<usize>> = override_rule
            .cycle
            .iter()
            .map(|name| find_member(name))
            .collect();
        if let Some(order) = resolved {
            let unique: BTreeSet<usize> = order.iter().copied().collect();
            if unique.len() == members.len() {
                return Some(order);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SeedDataset;
    use pretty_assertions::assert_eq;
    use trestle_core::model::{Model, ModelDocument};

    /// Builds a model + dataset pair for entities named by `(logical,
    /// nullable_fk_targets, mandatory_fk_targets)`.
    fn fixture(
        entities: &[(&str, &[&str], &[&str])],
    ) -> (Model, SeedDataset) {
        let mut entity_docs = Vec::new();
        let mut seed_tables = Vec::new();
        for (name, nullable_targets, mandatory_targets) in entities {
            let mut attributes = vec![serde_json::json!({
                "logicalName": "Id", "physicalName": "ID", "dataType": "long",
                "isIdentifier": true, "isMandatory": true,
                "onDisk": {"isNullable": false, "sqlType": "bigint"}
            })];
            let mut relationships = Vec::new();
            let mut seed_columns = vec![serde_json::json!({
                "logicalName": "Id", "storageColumnName": "ID", "emissionName": "ID",
                "dataType": "bigint", "isPrimaryKey": true, "isNullable": false
            })];
            for (target, nullable) in nullable_targets
                .iter()
                .map(|t| (t, true))
                .chain(mandatory_targets.iter().map(|t| (t, false)))
            {
                let column = format!("{}ID", target.to_uppercase());
                attributes.push(serde_json::json!({
                    "logicalName": format!("{target}Id"),
                    "physicalName": column,
                    "dataType": "long",
                    "isMandatory": !nullable,
                    "reference": {"targetEntity": target},
                    "onDisk": {"isNullable": nullable, "sqlType": "bigint"}
                }));
                relationships.push(serde_json::json!({
                    "viaAttribute": format!("{target}Id"),
                    "targetEntity": target,
                    "hasDatabaseConstraint": true,
                    "actualConstraints": [{
                        "referencedSchema": "dbo",
                        "referencedTable": target,
                        "columns": [{"owningColumn": column,
                                     "referencedColumn": "ID", "ordinal": 1}]
                    }]
                }));
                seed_columns.push(serde_json::json!({
                    "logicalName": format!("{target}Id"),
                    "storageColumnName": column,
                    "emissionName": column,
                    "dataType": "bigint",
                    "isNullable": nullable
                }));
            }
            entity_docs.push(serde_json::json!({
                "logicalName": name, "physicalName": name, "isStatic": true,
                "attributes": attributes, "relationships": relationships
            }));
            seed_tables.push(serde_json::json!({
                "definition": {
                    "module": "M", "logicalName": name, "schema": "dbo",
                    "physicalName": name, "effectiveName": name,
                    "columns": seed_columns
                },
                "rows": []
            }));
        }

        let model_json =
            serde_json::json!({"modules": [{"name": "M", "entities": entity_docs}]}).to_string();
        let doc: ModelDocument = serde_json::from_str(&model_json).unwrap();
        let model = Model::from_document(doc).unwrap();

        let dataset_json = serde_json::json!({"tables": seed_tables}).to_string();
        let dataset = SeedDataset::from_json(&dataset_json).unwrap();
        (model, dataset)
    }

    fn names(ordering: &SeedOrdering, dataset: &SeedDataset) -> Vec<String> {
        ordering
            .tables
            .iter()
            .map(|t| dataset.tables[t.table_index].definition.effective_name.clone())
            .collect()
    }

    #[test]
    fn parent_precedes_child() {
        // Child has a mandatory FK to Parent; declared child-first.
        let (model, dataset) = fixture(&[("Child", &[], &["Parent"]), ("Parent", &[], &[])]);
        let ordering = sort_seed_tables(&dataset.tables, &model, &[]);
        assert_eq!(names(&ordering, &dataset), vec!["Parent", "Child"]);
        assert!(!ordering.requires_phasing);
        assert!(!ordering.cycle_detected);
        assert_eq!(ordering.edge_count, 1);
    }

    #[test]
    fn nullable_cycle_is_phased() {
        // A -> B mandatory, B -> A nullable.
        let (model, dataset) = fixture(&[("A", &[], &["B"]), ("B", &["A"], &[])]);
        let ordering = sort_seed_tables(&dataset.tables, &model, &[]);
        assert!(ordering.cycle_detected);
        assert!(ordering.requires_phasing);
        assert!(!ordering.alphabetical_fallback_applied);
        // B's nullable AID edge is deferred, so B can go first.
        assert_eq!(names(&ordering, &dataset), vec!["B", "A"]);
        let b = ordering
            .tables
            .iter()
            .find(|t| dataset.tables[t.table_index].definition.effective_name == "B")
            .unwrap();
        assert_eq!(
            b.role,
            SeedRole::PhasedCycleMember {
                deferred_columns: vec!["AID".into()]
            }
        );
    }

    #[test]
    fn strong_cycle_falls_back_alphabetically() {
        let (model, dataset) = fixture(&[("Zeta", &[], &["Alpha"]), ("Alpha", &[], &["Zeta"])]);
        let ordering = sort_seed_tables(&dataset.tables, &model, &[]);
        assert!(ordering.cycle_detected);
        assert!(ordering.requires_phasing);
        assert!(ordering.alphabetical_fallback_applied);
        assert_eq!(names(&ordering, &dataset), vec!["Alpha", "Zeta"]);
        assert!(ordering
            .tables
            .iter()
            .all(|t| t.role == SeedRole::StrongCycleMember));
        assert_eq!(ordering.tables[1].closes_strong_cycle.len(), 2);
    }

    #[test]
    fn manual_override_adopts_order_without_phasing() {
        let (model, dataset) = fixture(&[("Audit", &["Parent"], &[]), ("Parent", &["Audit"], &[])]);
        let overrides = vec![CircularDependencyOverride {
            cycle: vec!["Parent".into(), "Audit".into()],
            strict: true,
        }];
        let ordering = sort_seed_tables(&dataset.tables, &model, &overrides);
        assert!(ordering.cycle_detected);
        assert!(!ordering.requires_phasing, "manual order avoids phasing");
        assert_eq!(names(&ordering, &dataset), vec!["Parent", "Audit"]);
        assert!(ordering.tables.iter().all(|t| t.role == SeedRole::Normal));
    }

    #[test]
    fn self_reference_is_not_phased() {
        let (model, dataset) = fixture(&[("Tree", &["Tree"], &[])]);
        let ordering = sort_seed_tables(&dataset.tables, &model, &[]);
        assert!(!ordering.requires_phasing);
        assert_eq!(ordering.tables[0].role, SeedRole::SelfReference);
        assert_eq!(ordering.edge_count, 1);
    }

    #[test]
    fn missing_parent_counts_but_does_not_block() {
        let (model, dataset) = fixture(&[("Child", &[], &["Ghost"])]);
        let ordering = sort_seed_tables(&dataset.tables, &model, &[]);
        assert_eq!(ordering.missing_edge_count, 1);
        assert_eq!(ordering.tables.len(), 1);
    }

    #[test]
    fn independent_tables_keep_declared_order() {
        let (model, dataset) = fixture(&[("B", &[], &[]), ("A", &[], &[]), ("C", &[], &[])]);
        let ordering = sort_seed_tables(&dataset.tables, &model, &[]);
        assert_eq!(names(&ordering, &dataset), vec!["B", "A", "C"]);
    }
}
