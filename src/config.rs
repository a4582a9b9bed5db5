//! Engine configuration.
//!
//! Defaults, then ~/.config/snapvault/config.toml if present, then CLI flags.
//! Recognized keys: technique, chunk_size, db_path. The technique applies to
//! future snapshots only; restore always uses the technique recorded on the
//! snapshot being restored.

use serde::Deserialize;
use std::path::PathBuf;

use crate::engine::DEFAULT_CHUNK_SIZE;
use crate::error::{Error, Result};
use crate::technique::Technique;

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    technique: Option<Technique>,
    chunk_size: Option<usize>,
    db_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Config {
    pub technique: Technique,
    pub chunk_size: usize,
    /// None means the default data-dir location.
    pub db_path: Option<PathBuf>,
}

impl Config {
    /// Load the config file (if any) and apply CLI overrides on top.
    pub fn load(technique: Option<Technique>, chunk_size: Option<usize>) -> Result<Self> {
        let file = read_config_file()?;

        Ok(Config {
            technique: technique
                .or(file.technique)
                .unwrap_or(Technique::WholeFile),
            chunk_size: chunk_size
                .or(file.chunk_size)
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            db_path: file.db_path,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            technique: Technique::WholeFile,
            chunk_size: DEFAULT_CHUNK_SIZE,
            db_path: None,
        }
    }
}

/// Parse ~/.config/snapvault/config.toml if it exists. A missing file is not
/// an error; a malformed one is.
fn read_config_file() -> Result<ConfigFile> {
    let Some(dirs) = directories::ProjectDirs::from("", "", "snapvault") else {
        return Ok(ConfigFile::default());
    };

    let path = dirs.config_dir().join("config.toml");
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let raw = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
}
