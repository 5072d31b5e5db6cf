// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// [`RawConfigFile`].
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (timeout bounds, glob syntax). Use [`load_and_validate`] for
/// that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
/// reads TOML, applies defaults (via `serde` + `Default` impls), then checks
/// timeout bounds and glob syntax.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load the file at `path` when it exists, otherwise fall back to the
/// built-in defaults. A file that exists but fails to parse or validate is
/// still an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if path.exists() {
        load_and_validate(path)
    } else {
        Ok(ConfigFile::default())
    }
}

/// Helper to resolve a default config path.
///
/// Currently this just returns `Testdag.toml` in the current working
/// directory; it exists so later versions can respect an env var or probe
/// multiple locations.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Testdag.toml")
}
