//! Orchestration configuration loading from TOML, with defaults.

use cortex_types::OrchestrationConfig;
use std::path::Path;
use tracing::{info, warn};

/// Load orchestration configuration from a TOML file.
///
/// A missing or malformed file logs a warning and yields defaults; the
/// host must be bootable without any config on disk.
pub fn load_config(path: Option<&Path>) -> OrchestrationConfig {
    let Some(path) = path else {
        return OrchestrationConfig::default();
    };

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<OrchestrationConfig>(&contents) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded configuration");
                config
            }
            Err(e) => {
                warn!(
                    error = %e,
                    path = %path.display(),
                    "Failed to parse config, using defaults"
                );
                OrchestrationConfig::default()
            }
        },
        Err(e) => {
            warn!(
                error = %e,
                path = %path.display(),
                "Failed to read config file, using defaults"
            );
            OrchestrationConfig::default()
        }
    }
}
