//! `trestle emit` -- the full pipeline: decide, project, render, write.

use serde::Serialize;

use trestle_config::options::TighteningOptions;
use trestle_core::index::EntityIndex;
use trestle_core::model::Model;
use trestle_core::validation::validate_model;
use trestle_emit::fingerprint::{fingerprint, FINGERPRINT_ALGORITHM};
use trestle_emit::manifest::{build_manifest, decisions_summary, EmissionMetadata};
use trestle_emit::plan::{table_relative_path, WritePlan};
use trestle_emit::projector::project;
use trestle_emit::writer::{render_table, HeaderContext, WriterSettings};
use trestle_seed::preflight::preflight;
use trestle_seed::script::{generate_script, ScriptSettings};
use trestle_seed::sorter::sort_seed_tables;

use crate::cli::EmitArgs;
use crate::context::RuntimeContext;
use crate::output::{CommandFailure, CommandResult};

/// Relative path of the seed script inside the output tree.
const SEED_SCRIPT_PATH: &str = "Seeds/StaticEntities.sql";

#[derive(Serialize)]
struct EmitSummary {
    tables: usize,
    written: usize,
    skipped: usize,
    cancelled: bool,
}

pub fn run(ctx: &RuntimeContext<'_>, args: &EmitArgs) -> CommandResult {
    let options = trestle_config::load_options(ctx.config_path.as_deref())?;

    let (model_raw, model) = super::load_model(&args.model)?;
    let invariant_errors = validate_model(&model, &options.seeding.allow_missing_primary_key);
    if !invariant_errors.is_empty() {
        return Err(invariant_errors.into());
    }

    let (profile_raw, profile) = super::load_profile(args.profile.as_deref())?;
    let supplemental = super::load_supplemental(args.supplemental.as_deref())?;
    let index = EntityIndex::build(&model, &supplemental);

    let decisions = trestle_policy::decide(&model, &profile, &index, &options);
    if !ctx.quiet {
        for diagnostic in &decisions.diagnostics {
            eprintln!("note: {diagnostic}");
        }
    }

    let tables = project(&model, &decisions, &index, &options).map_err(CommandFailure::Engine)?;

    let options_json = serde_json::to_string(&options)
        .map_err(|e| CommandFailure::Other(anyhow::anyhow!("options serialization: {e}")))?;
    let digest = fingerprint(&[
        model_raw.as_bytes(),
        profile_raw.as_bytes(),
        options_json.as_bytes(),
    ]);

    let header = options.emission.emit_table_headers.then(|| HeaderContext {
        model_path: args.model.display().to_string(),
        profile_path: args
            .profile
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_owned()),
        decisions: decisions_summary(&decisions),
        fingerprint_algorithm: FINGERPRINT_ALGORITHM.to_owned(),
        fingerprint: digest.clone(),
    });
    let settings = WriterSettings {
        quote: options.emission.quote_strategy,
        bare_table_only: options.emission.emit_bare_table_only,
        not_for_replication: options.emission.not_for_replication,
        header,
    };

    let mut plan = WritePlan::new(&args.out, options.emission.module_parallelism);
    let mut render_errors = Vec::new();
    for table in &tables {
        match render_table(table, &settings) {
            Ok(text) => plan.add_file(
                table_relative_path(table, options.emission.per_table_files),
                text.into_bytes(),
            ),
            Err(e) => render_errors.push(e),
        }
    }
    if !render_errors.is_empty() {
        return Err(render_errors.into());
    }

    if let Some(seed_path) = &args.seed_data {
        let mut dataset = super::load_dataset(seed_path)?;
        // Seed scripts must target effective names, like every other artifact.
        dataset.apply_effective_names(|schema, physical| {
            tables
                .iter()
                .find(|t| {
                    t.schema.eq_ignore_ascii_case(schema)
                        && t.original_physical_name.eq_ignore_ascii_case(physical)
                })
                .map(|t| t.physical_name.clone())
        });
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
        let script = generate_script(&ordering, &dataset.tables, &script_settings(&options))
            .map_err(CommandFailure::Engine)?;
        plan.add_file(SEED_SCRIPT_PATH, script.into_bytes());
    }

    let manifest = build_manifest(
        &options,
        EmissionMetadata {
            fingerprint_algorithm: FINGERPRINT_ALGORITHM.to_owned(),
            fingerprint: digest,
            model_path: args.model.display().to_string(),
            profile_path: args
                .profile
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        },
        &decisions,
        &profile,
        &tables,
        model_totals(&model),
    );
    plan.set_manifest(manifest.to_json().into_bytes());

    if args.dry_run {
        if ctx.json {
            let files: Vec<serde_json::Value> = plan
                .files()
                .iter()
                .map(|f| {
                    serde_json::json!({"path": f.relative_path, "bytes": f.bytes.len()})
                })
                .collect();
            println!("{}", serde_json::json!({"dryRun": true, "files": files}));
        } else if !ctx.quiet {
            for file in plan.files() {
                println!("{} ({} bytes)", file.relative_path, file.bytes.len());
            }
            println!("dry run: {} files planned", plan.files().len() + 1);
        }
        return Ok(());
    }

    let report = plan.execute(ctx.cancel).map_err(CommandFailure::Engine)?;
    let summary = EmitSummary {
        tables: tables.len(),
        written: report.written,
        skipped: report.skipped,
        cancelled: report.cancelled,
    };
    if ctx.json {
        println!(
            "{}",
            serde_json::to_string(&summary)
                .map_err(|e| CommandFailure::Other(anyhow::anyhow!("summary: {e}")))?
        );
    } else if !ctx.quiet {
        if summary.cancelled {
            println!(
                "cancelled: {} files written before interruption",
                summary.written
            );
        } else {
            println!(
                "{} tables emitted: {} files written, {} unchanged",
                summary.tables, summary.written, summary.skipped
            );
        }
    }
    Ok(())
}

fn script_settings(options: &TighteningOptions) -> ScriptSettings {
    ScriptSettings {
        synchronization_mode: options.seeding.synchronization_mode,
        batch_size: options.seeding.batch_size,
        quote: options.emission.quote_strategy,
        allow_missing_primary_key: options.seeding.allow_missing_primary_key.clone(),
    }
}

/// Declared totals for coverage: emittable entities, their attributes, and
/// their constrained relationships.
fn model_totals(model: &Model) -> (u32, u32, u32) {
    let mut entities = 0u32;
    let mut attributes = 0u32;
    let mut constraints = 0u32;
    for (_, entity) in model.emittable_entities() {
        entities += 1;
        attributes += entity.attributes.len() as u32;
        constraints += entity
            .relationships
            .iter()
            .filter(|r| !r.actual_constraints.is_empty())
            .count() as u32;
    }
    (entities, attributes, constraints)
}
