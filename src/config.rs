// src/config.rs
//! Configuration file parsing
//!
//! Supports an optional TOML file with the following sections:
//! - [paths] - Database path, filesystem root, workspace parent, destination
//! - [build] - Concurrency ceiling, compression codec, archiver backend
//!
//! Command-line flags override whatever the file sets.

use crate::archive::ArchiverKind;
use crate::assembler::JobSettings;
use crate::compression::CompressionFormat;
use crate::error::{Error, Result};
use crate::scheduler::DEFAULT_CONCURRENCY;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Location checked when no `--config` is given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pacrepack.toml";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub build: BuildSection,
}

/// Filesystem locations
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    /// pacman database root
    #[serde(default = "default_dbpath")]
    pub dbpath: PathBuf,

    /// Filesystem root owned paths are read from
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Parent directory for job workspaces (system temp dir when unset)
    #[serde(default)]
    pub tmpdir: Option<PathBuf>,

    /// Directory receiving finished archives
    #[serde(default = "default_destination")]
    pub destination: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            dbpath: default_dbpath(),
            root: default_root(),
            tmpdir: None,
            destination: default_destination(),
        }
    }
}

fn default_dbpath() -> PathBuf {
    PathBuf::from("/var/lib/pacman")
}

fn default_root() -> PathBuf {
    PathBuf::from("/")
}

fn default_destination() -> PathBuf {
    PathBuf::from(".")
}

/// Archive construction settings
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Maximum concurrently running jobs
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Codec name: none, gz, xz, zst
    #[serde(default = "default_compression")]
    pub compression: String,

    /// Backend: native or bsdtar
    #[serde(default = "default_archiver")]
    pub archiver: String,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            compression: default_compression(),
            archiver: default_archiver(),
        }
    }
}

fn default_jobs() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_compression() -> String {
    "xz".to_string()
}

fn default_archiver() -> String {
    "native".to_string()
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the default file if it exists, else defaults
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.build.jobs == 0 {
            return Err(Error::Config("build.jobs must be at least 1".to_string()));
        }
        self.compression_format()?;
        self.archiver_kind()?;
        Ok(())
    }

    pub fn compression_format(&self) -> Result<CompressionFormat> {
        Ok(CompressionFormat::from_name(&self.build.compression)?)
    }

    pub fn archiver_kind(&self) -> Result<ArchiverKind> {
        ArchiverKind::from_name(&self.build.archiver)
    }

    /// Per-job settings at the given verbosity
    pub fn job_settings(&self, verbosity: u8) -> Result<JobSettings> {
        Ok(JobSettings {
            destination: self.paths.destination.clone(),
            verbosity,
            compression: self.compression_format()?,
            dbpath: self.paths.dbpath.clone(),
            root: self.paths.root.clone(),
            tmpdir: self
                .paths
                .tmpdir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        })
    }
}
