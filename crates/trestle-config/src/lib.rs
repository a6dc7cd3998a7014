//! Configuration loading for the trestle emission engine.
//!
//! The main entry point is [`options::TighteningOptions`], the full option
//! tree consumed by the policy decider, projector, writer, and seeder.
//! [`load_options`] layers defaults, a JSON file, and `TRESTLE_*`
//! environment variables, in that order.

pub mod options;

use std::path::Path;

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;

use options::TighteningOptions;
use trestle_core::error::EngineError;

/// Loads options from an optional JSON file with environment overrides.
///
/// Layering, later wins: built-in defaults, then the JSON file (when
/// given), then `TRESTLE_*` environment variables (`__` separates nesting,
/// e.g. `TRESTLE_POLICY__MODE=Aggressive`).
pub fn load_options(path: Option<&Path>) -> Result<TighteningOptions, EngineError> {
    let mut figment = Figment::from(Serialized::defaults(TighteningOptions::default()));
    if let Some(path) = path {
        figment = figment.merge(Json::file(path));
    }
    figment = figment.merge(Env::prefixed("TRESTLE_").split("__"));

    let options: TighteningOptions = figment
        .extract()
        .map_err(|e| EngineError::config_invalid(e.to_string()))?;
    options.validate()?;
    Ok(options)
}
