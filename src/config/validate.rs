// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TestdagError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TestdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.runner,
            raw.results,
            raw.discover,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_runner_section(cfg)?;
    validate_results_section(cfg)?;
    validate_discover_section(cfg)?;
    Ok(())
}

fn validate_runner_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runner.dependency_timeout_ms == 0 {
        return Err(TestdagError::ConfigError(
            "[runner].dependency_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_results_section(cfg: &RawConfigFile) -> Result<()> {
    if let Some(file) = &cfg.results.file {
        if file.trim().is_empty() {
            return Err(TestdagError::ConfigError(
                "[results].file must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_discover_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.discover.patterns.is_empty() {
        return Err(TestdagError::ConfigError(
            "[discover].patterns must contain at least one glob".to_string(),
        ));
    }
    for pattern in cfg.discover.patterns.iter().chain(cfg.discover.exclude.iter()) {
        if let Err(err) = Glob::new(pattern) {
            return Err(TestdagError::ConfigError(format!(
                "invalid glob '{pattern}' in [discover]: {err}"
            )));
        }
    }
    Ok(())
}
