//! Clap CLI definitions for the `trestle` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// trestle -- compile a platform data model into SQL Server DDL artifacts.
#[derive(Parser, Debug)]
#[command(
    name = "trestle",
    about = "Platform model to SQL Server DDL compiler",
    long_about = "Compiles a logical application model, a profiling snapshot, and a \
tightening configuration into deterministic per-table DDL files plus a manifest.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Tightening configuration file (JSON).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Emit per-table DDL files and the manifest.
    Emit(EmitArgs),

    /// Generate the static-entity seed script.
    Seed(SeedArgs),

    /// Check a seed dataset's foreign-key ordering without writing anything.
    Preflight(PreflightArgs),
}

/// Arguments for `trestle emit`.
#[derive(Args, Debug)]
pub struct EmitArgs {
    /// Model document (JSON).
    #[arg(long)]
    pub model: PathBuf,

    /// Profile snapshot (JSON). Decisions fall back to declared intent when
    /// omitted.
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Supplemental platform entities (JSON array).
    #[arg(long)]
    pub supplemental: Option<PathBuf>,

    /// Static-entity seed dataset (JSON); adds the seed script to the output.
    #[arg(long)]
    pub seed_data: Option<PathBuf>,

    /// Output directory.
    #[arg(long, short = 'o')]
    pub out: PathBuf,

    /// Plan without writing; prints per-file byte counts.
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for `trestle seed`.
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Model document (JSON).
    #[arg(long)]
    pub model: PathBuf,

    /// Static-entity seed dataset (JSON).
    #[arg(long)]
    pub seed_data: PathBuf,

    /// Output directory (script lands at Seeds/StaticEntities.sql).
    #[arg(long, short = 'o')]
    pub out: PathBuf,
}

/// Arguments for `trestle preflight`.
#[derive(Args, Debug)]
pub struct PreflightArgs {
    /// Model document (JSON).
    #[arg(long)]
    pub model: PathBuf,

    /// Static-entity seed dataset (JSON).
    #[arg(long)]
    pub seed_data: PathBuf,
}
