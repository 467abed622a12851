//! # Layered Configuration
//!
//! Shared loader for the service and processor binaries.
//!
//! Sources, applied in order (later sources override earlier ones):
//!
//! 1. `/etc/movies/<binary>.yaml`, optional
//! 2. `config/<binary>.yaml`, optional
//! 3. The file named by `MOVIES_CONFIG_FILE`, required when the variable is set
//! 4. Environment variables prefixed `MOVIES__` with `__` as the nesting
//!    separator, e.g. `MOVIES__SERVER__PORT=9090` sets `server.port`
//! 5. Legacy single-value deployment variables such as `MOVIES_NAME`
//!
//! A missing optional file is not an error. A malformed file is.

use config::{Config, ConfigError, Environment, File, FileFormat};
use std::path::PathBuf;
use tracing::info;

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;

pub const ENV_PREFIX: &str = "MOVIES";
pub const CONFIG_FILE_VAR: &str = "MOVIES_CONFIG_FILE";

/// Environment variable mapped onto a single configuration key
#[derive(Debug, Clone, Copy)]
pub struct LegacyVariable {
    pub variable: &'static str,
    pub key: &'static str,
}

/// Files consulted by [`load_from`]
#[derive(Debug, Clone)]
pub struct ConfigSources {
    pub system_file: PathBuf,
    pub local_file: PathBuf,
    pub explicit_file: Option<PathBuf>,
}

impl ConfigSources {
    /// Standard locations for a binary, plus `MOVIES_CONFIG_FILE` if set
    pub fn for_binary(binary: &str) -> Self {
        let explicit_file = std::env::var(CONFIG_FILE_VAR)
            .ok()
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Self {
            system_file: PathBuf::from(format!("/etc/movies/{}", binary)),
            local_file: PathBuf::from(format!("config/{}", binary)),
            explicit_file,
        }
    }
}

/// Load configuration for `binary` from the standard sources
///
/// # Errors
///
/// Returns error if a present file cannot be parsed or the explicit file is
/// missing.
pub fn load_layered(binary: &str, legacy: &[LegacyVariable]) -> Result<Config, ConfigError> {
    load_from(&ConfigSources::for_binary(binary), legacy)
}

/// Load configuration from explicit file locations plus the environment
pub fn load_from(sources: &ConfigSources, legacy: &[LegacyVariable]) -> Result<Config, ConfigError> {
    let mut builder = Config::builder()
        .add_source(
            File::from(sources.system_file.as_path())
                .format(FileFormat::Yaml)
                .required(false),
        )
        .add_source(
            File::from(sources.local_file.as_path())
                .format(FileFormat::Yaml)
                .required(false),
        );

    if let Some(explicit) = &sources.explicit_file {
        info!(path = %explicit.display(), "Loading configuration from explicit path");
        builder = builder.add_source(
            File::from(explicit.as_path())
                .format(FileFormat::Yaml)
                .required(true),
        );
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    for entry in legacy {
        let value = std::env::var(entry.variable)
            .ok()
            .filter(|value| !value.is_empty());
        if value.is_some() {
            info!(variable = entry.variable, key = entry.key, "Applying legacy variable");
        }
        builder = builder.set_override_option(entry.key, value)?;
    }

    builder.build()
}
