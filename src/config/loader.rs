use super::ScanConfig;
use crate::error::{ErrorCode, ScanError};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Directory scanned when none is given
pub const DEFAULT_INPUT_DIR: &str = "trades";

/// Read a TOML configuration file
pub async fn load_config_file(path: &Path) -> Result<ScanConfig, ScanError> {
    let content = fs::read_to_string(path).await.map_err(|e| {
        let code = if e.kind() == std::io::ErrorKind::NotFound {
            ErrorCode::CONFIG_NOT_FOUND
        } else {
            ErrorCode::CONFIG_GENERIC
        };
        ScanError::config_with_code(
            code,
            format!("cannot read configuration file {}", path.display()),
        )
        .with_source(e)
    })?;

    let config = ScanConfig::from_toml_str(&content)?;
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Build the effective configuration: defaults, then `file`, then environment
pub async fn load_layered(file: Option<&Path>) -> Result<ScanConfig, ScanError> {
    let mut config = match file {
        Some(path) => load_config_file(path).await?,
        None => ScanConfig::default(),
    };
    config.merge_env_vars()?;
    Ok(config)
}
