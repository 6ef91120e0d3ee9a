//! CLI configuration utilities

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use wayfarer_http::ClientConfig;

/// Resolve the data directory holding credentials and logs
pub fn resolve_data_dir(data_dir: Option<PathBuf>) -> PathBuf {
    data_dir.unwrap_or_else(|| {
        // Check environment variable first, then fall back to system data dir
        if let Ok(state_dir) = std::env::var("WAYFARER_STATE_DIR") {
            PathBuf::from(state_dir)
        } else {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("wayfarer")
        }
    })
}

/// Load client configuration: defaults, then the optional file, then
/// `WAYFARER_*` environment variables (`__` separates nested keys)
pub fn load_client_config(path: Option<&Path>) -> Result<ClientConfig> {
    let mut builder = Config::builder().add_source(Config::try_from(&ClientConfig::default())?);

    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }

    builder = builder.add_source(environment());

    let settings = builder.build().context("Failed to load configuration")?;
    Ok(settings.try_deserialize()?)
}

// `WAYFARER_BASE_URL`, `WAYFARER_ENDPOINTS__REFRESH_PATH`, ...
fn environment() -> Environment {
    Environment::with_prefix("WAYFARER")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Write the default configuration as JSON
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(&ClientConfig::default())?;
    std::fs::write(path, content)?;
    Ok(())
}
