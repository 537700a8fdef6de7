// src/lib.rs

//! pacrepack: rebuild pacman packages from an installed system
//!
//! Recreates installable `.pkg.tar.<ext>` archives for packages that are
//! already installed, using only the local pacman database and the files on
//! disk. Useful when the original package files are gone from the cache.
//!
//! # Architecture
//!
//! - `packages`: local database record reading, descriptor translation,
//!   owned-file resolution through the package manager
//! - `archive`: per-job workspaces and the archive backends
//! - `assembler`: one package end to end, producing an [`Outcome`]
//! - `scheduler`: many packages under a concurrency ceiling

pub mod archive;
pub mod assembler;
pub mod compression;
pub mod config;
mod error;
pub mod packages;
pub mod progress;
pub mod scheduler;

pub use archive::{Archiver, ArchiverKind, WorkspaceRegistry};
pub use assembler::{JobRunner, JobSettings, Outcome, Reassembler};
pub use compression::CompressionFormat;
pub use config::Config;
pub use error::{Error, Result};
pub use packages::{PackageManager, Pacman};
pub use progress::{CliProgress, PlainProgress, ProgressTracker, SilentProgress};
pub use scheduler::{BatchSummary, JobResult, Scheduler};
