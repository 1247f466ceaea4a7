/// `load_config` module: loads the optional YAML knob file into typed
/// overrides for the run.
///
/// The knob file carries operational settings that do not belong on the
/// command line: extra file names to ignore during the staleness test, the
/// size cap above which directories are skipped, and the concurrency bound.
/// Everything in it is optional.
///
/// # Errors
/// All errors here use `anyhow::Error` for context-rich diagnostics, and are
/// surfaced at the CLI boundary.
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    /// File names excluded from the staleness test and the archive, in
    /// addition to the notice file name.
    #[serde(default)]
    pub ignored_filenames: Vec<String>,
    /// Skip directories whose accumulated size meets or exceeds this.
    #[serde(default)]
    pub max_source_bytes: Option<u64>,
    /// How many directories are processed at once.
    #[serde(default)]
    pub concurrency: Option<usize>,
}

/// Load the YAML knob file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    Ok(config)
}
