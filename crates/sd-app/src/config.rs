//! Scan configuration files.

use std::path::Path;

use sd_index::ScanOptions;

use crate::error::{AppError, AppResult};

/// Load scan options from a YAML file. Missing keys keep their defaults.
pub fn load_options(path: &Path) -> AppResult<ScanOptions> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let options: ScanOptions = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse config YAML: {}", e)))?;

    if options.extension.trim_start_matches('.').is_empty() {
        return Err(AppError::Config(
            "extension must not be empty".to_string(),
        ));
    }

    Ok(options)
}

/// Save scan options to a YAML file.
pub fn save_options(path: &Path, options: &ScanOptions) -> AppResult<()> {
    let content = serde_yaml::to_string(options)
        .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, content).map_err(|e| AppError::ConfigFileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
