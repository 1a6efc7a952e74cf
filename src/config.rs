/// PARAMETER LOADING
///
/// Defaults, then an optional TOML file, then `SURETY_*` environment
/// variables (e.g. `SURETY_MIN_RESPONSES=5`, `SURETY_MAX_PREMIUM="0.5 ether"`).

use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use surety_core::{ParamsError, SuretyParams};
use thiserror::Error;

pub const ENV_PREFIX: &str = "SURETY";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
    #[error("Invalid parameters: {0}")]
    Invalid(#[from] ParamsError),
}

pub fn load_params(path: Option<&Path>) -> Result<SuretyParams, ConfigLoadError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }
    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));

    let params: SuretyParams = builder.build()?.try_deserialize()?;
    params.validate()?;
    Ok(params)
}

/// Parse parameters from TOML text; used for inline configuration and tests.
pub fn params_from_toml(source: &str) -> Result<SuretyParams, ConfigLoadError> {
    let params: SuretyParams = Config::builder()
        .add_source(File::from_str(source, FileFormat::Toml))
        .build()?
        .try_deserialize()?;
    params.validate()?;
    Ok(params)
}
