//! `trestle seed` -- generate the static-entity seed script only.

use trestle_emit::plan::WritePlan;
use trestle_seed::preflight::preflight;
use trestle_seed::script::{generate_script, ScriptSettings};
use trestle_seed::sorter::sort_seed_tables;

use crate::cli::SeedArgs;
use crate::context::RuntimeContext;
use crate::output::{CommandFailure, CommandResult};

const SEED_SCRIPT_PATH: &str = "Seeds/StaticEntities.sql";

pub fn run(ctx: &RuntimeContext<'_>, args: &SeedArgs) -> CommandResult {
    let options = trestle_config::load_options(ctx.config_path.as_deref())?;
    let (_, model) = super::load_model(&args.model)?;
    let dataset = super::load_dataset(&args.seed_data)?;

    let ordering = sort_seed_tables(
        &dataset.tables,
        &model,
        &options.seeding.circular_dependency_overrides,
    );
    if !ctx.quiet {
        for diagnostic in &ordering.diagnostics {
            eprintln!("note: {diagnostic}");
        }
        let report = preflight(&ordering, &dataset.tables, &model);
        for finding in &report.findings {
            eprintln!("note: seed preflight: {finding:?}");
        }
    }

    let settings = ScriptSettings {
        synchronization_mode: options.seeding.synchronization_mode,
        batch_size: options.seeding.batch_size,
        quote: options.emission.quote_strategy,
        allow_missing_primary_key: options.seeding.allow_missing_primary_key.clone(),
    };
    let script =
        generate_script(&ordering, &dataset.tables, &settings).map_err(CommandFailure::Engine)?;

    let mut plan = WritePlan::new(&args.out, 1);
    plan.add_file(SEED_SCRIPT_PATH, script.into_bytes());
    let report = plan.execute(ctx.cancel).map_err(CommandFailure::Engine)?;

    if ctx.json {
        println!(
            "{}",
            serde_json::json!({
                "tables": ordering.tables.len(),
                "requiresPhasing": ordering.requires_phasing,
                "written": report.written,
                "skipped": report.skipped,
            })
        );
    } else if !ctx.quiet {
        println!(
            "{} seed tables ordered ({} edges, {} missing); script {}",
            ordering.node_count,
            ordering.edge_count,
            ordering.missing_edge_count,
            if report.written > 0 { "written" } else { "unchanged" }
        );
    }
    Ok(())
}
