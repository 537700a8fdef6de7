// src/error.rs

//! Error types for package reassembly
//!
//! Every variant is scoped to a single reassembly job. The scheduler turns
//! them into per-package `Failed` outcomes; none of them aborts a batch.

use crate::compression::CompressionError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for reassembly operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reassembling a package
#[derive(Error, Debug)]
pub enum Error {
    /// The package manager reports no installed version for this name
    #[error("package '{package}' is not installed")]
    NotInstalled { package: String },

    /// No local database record (or no descriptor inside it) for name+version
    #[error("no local database record for {name}-{version} at {}", path.display())]
    RecordNotFound {
        name: String,
        version: String,
        path: PathBuf,
    },

    /// A package manager query could not be run or returned an error
    #[error("package manager query failed for '{package}': {reason}")]
    ManagerQueryFailed { package: String, reason: String },

    /// The archiver did not produce an output file
    #[error("failed to assemble archive for '{package}': {reason}")]
    AssemblyFailed { package: String, reason: String },

    /// Compression setup or decompression failure
    #[error(transparent)]
    Compression(#[from] CompressionError),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// The bounded worker pool could not be started
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Package name this error concerns, when it names one
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::NotInstalled { package }
            | Self::ManagerQueryFailed { package, .. }
            | Self::AssemblyFailed { package, .. } => Some(package),
            Self::RecordNotFound { name, .. } => Some(name),
            _ => None,
        }
    }
}
