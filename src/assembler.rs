// src/assembler.rs

//! Single-package reassembly
//!
//! [`Reassembler::reassemble`] runs one job end to end: resolve the installed
//! version, skip if the archive already exists, read the local record,
//! translate the descriptor, resolve the member list, build the archive in a
//! private workspace and move it into the destination directory.
//!
//! Every failure is scoped to the job and comes back as [`Outcome::Failed`].

use crate::archive::{ArchiveRequest, Archiver, WorkspaceRegistry};
use crate::compression::CompressionFormat;
use crate::error::{Error, Result};
use crate::packages::{
    read_record, ArchiveDescriptor, FileManifest, PackageManager, PackageRecord, RawDescriptor,
    DESCRIPTOR_MEMBER,
};
use crate::progress::ProgressTracker;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Name of the member list file inside a workspace
const LIST_FILE: &str = "filelist";

/// Read-only parameters shared by every job of a run
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Directory receiving finished archives
    pub destination: PathBuf,
    /// 0 = quiet, 1+ = archiver diagnostics shown unfiltered
    pub verbosity: u8,
    pub compression: CompressionFormat,
    /// pacman database root (contains `local/`)
    pub dbpath: PathBuf,
    /// Filesystem root the owned paths live under
    pub root: PathBuf,
    /// Parent directory for job workspaces
    pub tmpdir: PathBuf,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("."),
            verbosity: 0,
            compression: CompressionFormat::default(),
            dbpath: PathBuf::from("/var/lib/pacman"),
            root: PathBuf::from("/"),
            tmpdir: std::env::temp_dir(),
        }
    }
}

/// Terminal state of one job
#[derive(Debug)]
pub enum Outcome {
    /// Archive written; `incomplete` when some members were unreadable for lack of permission
    Completed { path: PathBuf, incomplete: bool },
    /// Archive already present; nothing done
    Skipped { path: PathBuf },
    Failed(Error),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Anything the scheduler can run once per package
pub trait JobRunner: Send + Sync {
    fn run(&self, package: &str, progress: &dyn ProgressTracker) -> Outcome;
}

/// Rebuilds package archives from the local database
pub struct Reassembler {
    settings: JobSettings,
    manager: Arc<dyn PackageManager>,
    archiver: Box<dyn Archiver>,
    workspaces: WorkspaceRegistry,
}

impl Reassembler {
    pub fn new(
        settings: JobSettings,
        manager: Arc<dyn PackageManager>,
        archiver: Box<dyn Archiver>,
        workspaces: WorkspaceRegistry,
    ) -> Self {
        Self {
            settings,
            manager,
            archiver,
            workspaces,
        }
    }

    /// Reassemble one package and report the outcome to the operator
    pub fn reassemble(&self, package: &str, progress: &dyn ProgressTracker) -> Outcome {
        progress.set_message(package);

        let outcome = match self.try_reassemble(package, progress) {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed(e),
        };

        match &outcome {
            Outcome::Completed { incomplete, .. } => {
                if *incomplete && self.settings.verbosity == 0 {
                    progress.println(&format!(
                        "==> WARNING: {} is incomplete: permission denied reading some files",
                        package
                    ));
                }
                info!("{}: archive created", package);
            }
            Outcome::Skipped { path } => {
                progress.println(&format!(
                    "==> {} already exists, skipping",
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string())
                ));
            }
            Outcome::Failed(e) => {
                debug!("{}: {}", package, e);
                match e.package() {
                    Some(_) => progress.println(&format!("==> ERROR: {}", e)),
                    None => progress.println(&format!("==> ERROR: {}: {}", package, e)),
                }
            }
        }

        outcome
    }

    fn try_reassemble(&self, package: &str, progress: &dyn ProgressTracker) -> Result<Outcome> {
        let version = self
            .manager
            .installed_version(package)?
            .ok_or_else(|| Error::NotInstalled {
                package: package.to_string(),
            })?;

        let record = PackageRecord::new(&self.settings.dbpath, package, &version);
        let file_name = record.archive_file_name(self.settings.compression);
        let destination = self.settings.destination.join(&file_name);
        if destination.exists() {
            return Ok(Outcome::Skipped { path: destination });
        }

        let local = read_record(&record)?;
        let raw = RawDescriptor::parse(&String::from_utf8_lossy(&local.descriptor))
            .with_backup(&local.backup);
        let descriptor = ArchiveDescriptor::translate(&raw);
        let manifest = FileManifest::resolve(
            self.manager.as_ref(),
            package,
            &self.settings.root,
            &local.artifacts,
        )?;
        debug!("{}-{}: {} members", package, version, manifest.len());

        // Removed on every exit path from here on
        let workspace = self.workspaces.create(&self.settings.tmpdir)?;
        workspace.write_member(DESCRIPTOR_MEMBER, descriptor.render().as_bytes())?;
        for (kind, content) in local.artifacts.present() {
            workspace.write_member(kind.member_name(), content)?;
        }

        let list_file = workspace.path().join(LIST_FILE);
        manifest.write_list(&list_file)?;

        let output = workspace.path().join(&file_name);
        let request = ArchiveRequest {
            package,
            workspace: workspace.path(),
            list_file: &list_file,
            output: &output,
            root: &self.settings.root,
            compression: self.settings.compression,
            verbosity: self.settings.verbosity,
            progress,
        };

        let report = self.archiver.create(&request).map_err(|e| match e {
            Error::AssemblyFailed { .. } => e,
            other => Error::AssemblyFailed {
                package: package.to_string(),
                reason: other.to_string(),
            },
        })?;

        if !output.is_file() {
            return Err(Error::AssemblyFailed {
                package: package.to_string(),
                reason: format!("{} archiver produced no output", self.archiver.name()),
            });
        }

        move_into_place(&output, &destination)?;
        progress.println(&format!("==> Created {}-{}", package, version));

        Ok(Outcome::Completed {
            path: destination,
            incomplete: report.permission_denied,
        })
    }
}

impl JobRunner for Reassembler {
    fn run(&self, package: &str, progress: &dyn ProgressTracker) -> Outcome {
        self.reassemble(package, progress)
    }
}

/// Move `source` to `destination` so the destination never holds a partial file
///
/// Falls back to copy-then-rename inside the destination directory when a
/// plain rename crosses filesystems.
fn move_into_place(source: &Path, destination: &Path) -> Result<()> {
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut staged = NamedTempFile::new_in(dir)?;
    let mut reader = fs::File::open(source)?;
    std::io::copy(&mut reader, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged.persist(destination).map_err(|e| e.error)?;
    Ok(())
}
