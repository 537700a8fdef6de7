// src/archive/mod.rs

//! Archive backends for reassembled packages
//!
//! An [`Archiver`] turns a workspace plus a member list file into one
//! compressed tarball. Two backends exist:
//!
//! - [`TarArchiver`]: in-process, built on the `tar` crate (default)
//! - [`BsdtarArchiver`]: drives the system `bsdtar`
//!
//! Both store each listed member explicitly (no directory recursion), force
//! ownership to root, and keep going past members they cannot read.

mod bsdtar;
mod native;
pub mod workspace;

pub use bsdtar::BsdtarArchiver;
pub use native::TarArchiver;
pub use workspace::{Workspace, WorkspaceRegistry, WORKSPACE_PREFIX};

use crate::compression::CompressionFormat;
use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use std::path::{Path, PathBuf};

/// Inputs for building one archive
#[derive(Clone)]
pub struct ArchiveRequest<'a> {
    /// Package name, for diagnostics
    pub package: &'a str,
    /// Job workspace; relative members resolve here
    pub workspace: &'a Path,
    /// Newline-separated member list
    pub list_file: &'a Path,
    /// Archive file to create
    pub output: &'a Path,
    /// Filesystem root; absolute members resolve below it
    pub root: &'a Path,
    pub compression: CompressionFormat,
    /// At 1 or above, per-member diagnostics are printed as they happen
    pub verbosity: u8,
    /// Where diagnostics are printed, so they stay clear of a progress bar
    pub progress: &'a dyn ProgressTracker,
}

impl ArchiveRequest<'_> {
    /// Print one archiver diagnostic when running verbose
    pub fn diagnostic(&self, line: &str) {
        if self.verbosity >= 1 {
            self.progress.println(line);
        }
    }
}

/// A member left out of the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMember {
    pub path: String,
    pub reason: String,
}

/// What the archiver did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Members left out because they could not be read
    pub skipped: Vec<SkippedMember>,
    /// At least one member was skipped for lack of permission
    pub permission_denied: bool,
}

impl ArchiveReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Record a member left out because reading it failed
    pub fn skip(&mut self, member: &str, error: &std::io::Error) {
        if error.kind() == std::io::ErrorKind::PermissionDenied {
            self.permission_denied = true;
        }
        self.skipped.push(SkippedMember {
            path: member.to_string(),
            reason: error.to_string(),
        });
    }
}

/// Builds a compressed archive from a member list
pub trait Archiver: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Create `request.output`
    ///
    /// Unreadable members are reported, not fatal. An `Err` means no usable
    /// archive was produced.
    fn create(&self, request: &ArchiveRequest<'_>) -> Result<ArchiveReport>;
}

/// Selectable archiver backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiverKind {
    #[default]
    Native,
    Bsdtar,
}

impl ArchiverKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "native" | "tar" => Ok(Self::Native),
            "bsdtar" => Ok(Self::Bsdtar),
            other => Err(Error::Config(format!(
                "unknown archiver '{}' (expected 'native' or 'bsdtar')",
                other
            ))),
        }
    }

    pub fn build(self) -> Box<dyn Archiver> {
        match self {
            Self::Native => Box::new(TarArchiver::new()),
            Self::Bsdtar => Box::new(BsdtarArchiver::new()),
        }
    }
}

/// Where a listed member is read from and what it is called in the archive
///
/// Absolute paths come from below `root` and lose their leading `/`;
/// relative names are generated members inside the workspace.
pub(crate) fn resolve_member(request: &ArchiveRequest<'_>, member: &str) -> (PathBuf, String) {
    let name = member.trim_end_matches('/');
    match name.strip_prefix('/') {
        Some(relative) => (request.root.join(relative), relative.to_string()),
        None => (request.workspace.join(name), name.to_string()),
    }
}
