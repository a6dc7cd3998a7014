//! `trestle preflight` -- report seed-ordering problems without writing.

use trestle_seed::preflight::{preflight, PreflightFinding};
use trestle_seed::sorter::sort_seed_tables;

use crate::cli::PreflightArgs;
use crate::context::RuntimeContext;
use crate::output::{CommandFailure, CommandResult};

pub fn run(ctx: &RuntimeContext<'_>, args: &PreflightArgs) -> CommandResult {
    let options = trestle_config::load_options(ctx.config_path.as_deref())?;
    let (_, model) = super::load_model(&args.model)?;
    let dataset = super::load_dataset(&args.seed_data)?;

    let ordering = sort_seed_tables(
        &dataset.tables,
        &model,
        &options.seeding.circular_dependency_overrides,
    );
    let report = preflight(&ordering, &dataset.tables, &model);

    if ctx.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .map_err(|e| CommandFailure::Other(anyhow::anyhow!("report: {e}")))?
        );
        return Ok(());
    }

    if report.is_clean() {
        if !ctx.quiet {
            println!(
                "preflight clean: {} tables, {} edges, {} missing references",
                ordering.node_count, ordering.edge_count, ordering.missing_edge_count
            );
        }
        return Ok(());
    }

    for finding in &report.findings {
        match finding {
            PreflightFinding::MissingParent {
                child,
                parent,
                via_column,
            } => {
                println!("missing parent: {child} references {parent} via {via_column}, but no seed exists");
            }
            PreflightFinding::ParentAfterChild {
                child,
                parent,
                via_column,
                parent_position,
                child_position,
            } => {
                println!(
                    "parent after child: {parent} (position {parent_position}) must precede {child} (position {child_position}, via {via_column})"
                );
            }
        }
    }
    Ok(())
}
