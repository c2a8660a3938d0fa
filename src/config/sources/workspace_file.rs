//! Workspace config file source: `<workspace>/.coursetree/config.toml`

use crate::config::paths::xdg_root;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use std::path::Path;

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = xdg_root::workspace_config_file(workspace_root);
    Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(false)))
}
