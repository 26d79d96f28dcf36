//! Resolves the backend config: `--config`, then the environment, then the
//! user config file.

use std::path::{Path, PathBuf};

use hearth_core::ClientConfig;

use crate::error::CliError;

const CONFIG_DIR_NAME: &str = "hearth";
const CONFIG_FILE_NAME: &str = "config.json";

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

pub fn load_config(explicit: Option<&Path>) -> Result<ClientConfig, CliError> {
    resolve_config(explicit, ClientConfig::from_env()?, default_config_path())
}

pub(crate) fn resolve_config(
    explicit: Option<&Path>,
    from_env: Option<ClientConfig>,
    default_path: Option<PathBuf>,
) -> Result<ClientConfig, CliError> {
    if let Some(path) = explicit {
        return Ok(ClientConfig::load_from_path(path)?);
    }
    if let Some(config) = from_env {
        return Ok(config);
    }
    match default_path {
        Some(path) if path.exists() => Ok(ClientConfig::load_from_path(&path)?),
        Some(path) => Err(CliError::Config(format!(
            "No backend configured. Set HEARTH_SUPABASE_URL and HEARTH_SUPABASE_ANON_KEY or create {}",
            path.display()
        ))),
        None => Err(CliError::Config(
            "No backend configured. Set HEARTH_SUPABASE_URL and HEARTH_SUPABASE_ANON_KEY"
                .to_string(),
        )),
    }
}
