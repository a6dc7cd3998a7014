//! Command handlers and shared input loading.

pub mod emit;
pub mod preflight;
pub mod seed;

use std::path::Path;

use trestle_core::index::SupplementalEntity;
use trestle_core::model::Model;
use trestle_core::profile::ProfileSnapshot;
use trestle_seed::dataset::SeedDataset;

use crate::output::{read_file, CommandFailure};

/// Loads and validates the model document, returning the raw text too (it
/// feeds the emission fingerprint).
pub(crate) fn load_model(path: &Path) -> Result<(String, Model), CommandFailure> {
    let raw = read_file(path)?;
    let model = Model::from_json(&raw).map_err(CommandFailure::Engine)?;
    Ok((raw, model))
}

/// Loads the profile snapshot; absent means "no evidence".
pub(crate) fn load_profile(
    path: Option<&Path>,
) -> Result<(String, ProfileSnapshot), CommandFailure> {
    match path {
        None => Ok((String::new(), ProfileSnapshot::default())),
        Some(path) => {
            let raw = read_file(path)?;
            let snapshot = ProfileSnapshot::from_json(&raw).map_err(|e| {
                CommandFailure::Other(anyhow::anyhow!(
                    "failed to parse profile {}: {e}",
                    path.display()
                ))
            })?;
            Ok((raw, snapshot))
        }
    }
}

/// Loads the supplemental platform entities, when configured.
pub(crate) fn load_supplemental(
    path: Option<&Path>,
) -> Result<Vec<SupplementalEntity>, CommandFailure> {
    match path {
        None => Ok(Vec::new()),
        Some(path) => {
            let raw = read_file(path)?;
            serde_json::from_str(&raw).map_err(|e| {
                CommandFailure::Other(anyhow::anyhow!(
                    "failed to parse supplemental entities {}: {e}",
                    path.display()
                ))
            })
        }
    }
}

/// Loads and coerces a seed dataset.
pub(crate) fn load_dataset(path: &Path) -> Result<SeedDataset, CommandFailure> {
    let raw = read_file(path)?;
    SeedDataset::from_json(&raw).map_err(CommandFailure::Engine)
}
