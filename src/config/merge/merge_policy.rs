//! Merge policy: typed defaults form the lowest layer of every build.

use crate::config::TreeConfig;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};

/// Builder seeded with `TreeConfig::default()` so later sources only override keys they set.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = toml::to_string(&TreeConfig::default())
        .map_err(|e| ConfigError::Message(format!("Failed to serialize defaults: {}", e)))?;
    Ok(config::Config::builder().add_source(File::from_str(&defaults, FileFormat::Toml)))
}
