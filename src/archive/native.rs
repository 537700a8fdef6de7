// src/archive/native.rs

//! In-process archiver built on the `tar` crate

use super::{resolve_member, ArchiveReport, ArchiveRequest, Archiver};
use crate::compression::create_encoder;
use crate::error::Result;
use crate::packages::FileManifest;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tar::{Builder as TarBuilder, Header, HeaderMode};
use tracing::debug;

/// Native tar writer with pluggable compression
#[derive(Debug, Clone, Copy, Default)]
pub struct TarArchiver;

impl TarArchiver {
    pub fn new() -> Self {
        Self
    }
}

impl Archiver for TarArchiver {
    fn name(&self) -> &'static str {
        "native"
    }

    fn create(&self, request: &ArchiveRequest<'_>) -> Result<ArchiveReport> {
        let members = FileManifest::read_list(request.list_file)?;
        debug!(
            "{}: archiving {} members with {} compression",
            request.package,
            members.len(),
            request.compression
        );

        let file = File::create(request.output)?;
        let encoder = create_encoder(BufWriter::new(file), request.compression)?;
        let mut archive = TarBuilder::new(encoder);
        archive.follow_symlinks(false);

        let mut report = ArchiveReport::default();
        for member in &members {
            let (source, name) = resolve_member(request, member);
            if name.is_empty() {
                continue;
            }

            if let Err(e) = append_member(&mut archive, &source, &name) {
                request.diagnostic(&format!("pacrepack: {}: {}", member, e));
                report.skip(member, &e);
            }
        }

        let encoder = archive.into_inner()?;
        encoder.finish()?.flush()?;

        debug!(
            "{}: wrote {} members, skipped {}",
            request.package,
            members.len() - report.skipped.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

/// Append a single filesystem object, owned by root
///
/// Everything that can fail on an unreadable source (stat, open, readlink)
/// happens before any bytes reach the archive.
fn append_member<W: Write>(archive: &mut TarBuilder<W>, source: &Path, name: &str) -> io::Result<()> {
    let meta = fs::symlink_metadata(source)?;

    let mut header = Header::new_gnu();
    header.set_metadata_in_mode(&meta, HeaderMode::Complete);
    header.set_uid(0);
    header.set_gid(0);
    header.set_username("root")?;
    header.set_groupname("root")?;

    let file_type = meta.file_type();
    if file_type.is_file() {
        let file = File::open(source)?;
        archive.append_data(&mut header, name, file)
    } else if file_type.is_symlink() {
        let target = fs::read_link(source)?;
        header.set_size(0);
        archive.append_link(&mut header, name, target)
    } else {
        // Directories and special files carry no data
        header.set_size(0);
        archive.append_data(&mut header, name, io::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{create_decoder, CompressionFormat};
    use crate::progress::{CallbackProgress, ProgressEvent, ProgressTracker, SilentProgress};
    use std::os::unix::fs::symlink;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        workspace: std::path::PathBuf,
        root: std::path::PathBuf,
        list: std::path::PathBuf,
        output: std::path::PathBuf,
    }

    fn fixture(members: &[&str]) -> Fixture {
        let temp = TempDir::new().unwrap();
        let workspace = temp.path().join("ws");
        let root = temp.path().join("root");
        fs::create_dir_all(&workspace).unwrap();
        fs::create_dir_all(root.join("usr/bin")).unwrap();
        fs::write(workspace.join(".PKGINFO"), "pkgname = gzip\n").unwrap();
        fs::write(root.join("usr/bin/gzip"), b"\x7fELF").unwrap();
        symlink("gzip", root.join("usr/bin/zcat")).unwrap();

        let list = workspace.join("filelist");
        fs::write(&list, members.join("\n")).unwrap();
        let output = workspace.join("gzip-1.10-1.pkg.tar.xz");
        Fixture {
            _temp: temp,
            workspace,
            root,
            list,
            output,
        }
    }

    fn run_with(fx: &Fixture, verbosity: u8, progress: &dyn ProgressTracker) -> ArchiveReport {
        let request = ArchiveRequest {
            package: "gzip",
            workspace: &fx.workspace,
            list_file: &fx.list,
            output: &fx.output,
            root: &fx.root,
            compression: CompressionFormat::Xz,
            verbosity,
            progress,
        };
        TarArchiver::new().create(&request).unwrap()
    }

    fn run(fx: &Fixture) -> ArchiveReport {
        run_with(fx, 0, &SilentProgress::new())
    }

    fn entries(path: &Path) -> Vec<(String, tar::EntryType, u64, u64)> {
        let file = File::open(path).unwrap();
        let decoder = create_decoder(file, CompressionFormat::Xz).unwrap();
        let mut archive = tar::Archive::new(decoder);
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                let header = entry.header();
                (
                    entry.path().unwrap().to_string_lossy().trim_end_matches('/').to_string(),
                    header.entry_type(),
                    header.uid().unwrap(),
                    header.gid().unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_archives_exactly_the_listed_members() {
        let fx = fixture(&[".PKGINFO", "/usr/", "/usr/bin/", "/usr/bin/gzip", "/usr/bin/zcat"]);
        let report = run(&fx);
        assert!(report.is_complete());

        let names: Vec<_> = entries(&fx.output).into_iter().map(|e| e.0).collect();
        assert_eq!(names, vec![".PKGINFO", "usr", "usr/bin", "usr/bin/gzip", "usr/bin/zcat"]);
    }

    #[test]
    fn test_directories_are_not_recursed() {
        let fx = fixture(&[".PKGINFO", "/usr/bin/"]);
        run(&fx);

        let names: Vec<_> = entries(&fx.output).into_iter().map(|e| e.0).collect();
        assert_eq!(names, vec![".PKGINFO", "usr/bin"]);
    }

    #[test]
    fn test_ownership_forced_to_root_and_links_kept() {
        let fx = fixture(&[".PKGINFO", "/usr/bin/gzip", "/usr/bin/zcat"]);
        run(&fx);

        for (name, kind, uid, gid) in entries(&fx.output) {
            assert_eq!((uid, gid), (0, 0), "{} not owned by root", name);
            if name == "usr/bin/zcat" {
                assert_eq!(kind, tar::EntryType::Symlink);
            }
        }
    }

    #[test]
    fn test_missing_member_is_skipped_not_fatal() {
        let fx = fixture(&[".PKGINFO", "/usr/bin/gone", "/usr/bin/gzip"]);
        let report = run(&fx);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, "/usr/bin/gone");
        assert!(!report.permission_denied);
        assert_eq!(entries(&fx.output).len(), 2);
    }

    #[test]
    fn test_verbose_diagnostics_go_through_progress() {
        let fx = fixture(&[".PKGINFO", "/usr/bin/gone", "/usr/bin/gzip"]);
        let lines = Mutex::new(Vec::new());
        let progress = CallbackProgress::new(|event| {
            if let ProgressEvent::Line(line) = event {
                lines.lock().unwrap().push(line);
            }
        });

        run_with(&fx, 1, &progress);

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("pacrepack: /usr/bin/gone: "));
    }

    #[test]
    fn test_quiet_run_prints_nothing() {
        let fx = fixture(&[".PKGINFO", "/usr/bin/gone"]);
        let lines = Mutex::new(Vec::new());
        let progress = CallbackProgress::new(|event| {
            if let ProgressEvent::Line(line) = event {
                lines.lock().unwrap().push(line);
            }
        });

        let report = run_with(&fx, 0, &progress);
        assert_eq!(report.skipped.len(), 1);
        assert!(lines.lock().unwrap().is_empty());
    }
}
