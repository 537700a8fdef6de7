// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use pacrepack::archive::{ArchiveReport, ArchiveRequest, SkippedMember, TarArchiver};
use pacrepack::compression::{self, CompressionFormat};
use pacrepack::{
    Archiver, Error, JobSettings, PackageManager, Reassembler, Result, WorkspaceRegistry,
};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A fake installed system: pacman database, filesystem root, output and
/// workspace directories, all inside one temporary directory.
///
/// Keep the value alive for the duration of the test.
pub struct FakeSystem {
    pub temp: TempDir,
    pub dbpath: PathBuf,
    pub root: PathBuf,
    pub output: PathBuf,
    pub tmpdir: PathBuf,
    pub manager: Arc<FakeManager>,
}

impl FakeSystem {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let dbpath = temp.path().join("db");
        let root = temp.path().join("root");
        let output = temp.path().join("out");
        let tmpdir = temp.path().join("tmp");
        for dir in [&dbpath, &root, &output, &tmpdir] {
            fs::create_dir_all(dir.as_path()).unwrap();
        }
        fs::create_dir_all(dbpath.join("local")).unwrap();

        Self {
            temp,
            dbpath,
            root,
            output,
            tmpdir,
            manager: Arc::new(FakeManager::default()),
        }
    }

    /// Install `name`-`version` with the given owned files
    ///
    /// Paths ending in `/` become directories, everything else a file whose
    /// content is its own path.
    pub fn install(&self, name: &str, version: &str, files: &[&str]) -> PathBuf {
        let record = self.record_path(name, version);
        fs::create_dir_all(&record).unwrap();
        fs::write(record.join("desc"), desc_for(name, version)).unwrap();
        fs::write(record.join("files"), files_for(files)).unwrap();

        for file in files {
            let on_disk = self.root.join(file.trim_start_matches('/'));
            if file.ends_with('/') {
                fs::create_dir_all(&on_disk).unwrap();
            } else {
                if let Some(parent) = on_disk.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(&on_disk, file.as_bytes()).unwrap();
            }
        }

        self.manager.add(name, version, files);
        record
    }

    pub fn record_path(&self, name: &str, version: &str) -> PathBuf {
        self.dbpath.join("local").join(format!("{}-{}", name, version))
    }

    pub fn settings(&self) -> JobSettings {
        JobSettings {
            destination: self.output.clone(),
            verbosity: 0,
            compression: CompressionFormat::Xz,
            dbpath: self.dbpath.clone(),
            root: self.root.clone(),
            tmpdir: self.tmpdir.clone(),
        }
    }

    /// Reassembler over this system with the native archiver
    pub fn reassembler(&self, workspaces: WorkspaceRegistry) -> Reassembler {
        self.reassembler_with(self.settings(), Box::new(TarArchiver::new()), workspaces)
    }

    /// Reassembler over this system with custom settings and archiver
    pub fn reassembler_with(
        &self,
        settings: JobSettings,
        archiver: Box<dyn Archiver>,
        workspaces: WorkspaceRegistry,
    ) -> Reassembler {
        Reassembler::new(settings, self.manager.clone(), archiver, workspaces)
    }

    /// Directories left in the workspace parent
    pub fn leftover_workspaces(&self) -> usize {
        fs::read_dir(&self.tmpdir).unwrap().count()
    }
}

/// Local database `desc` for a typical package
pub fn desc_for(name: &str, version: &str) -> String {
    format!(
        "%NAME%\n{name}\n\n%VERSION%\n{version}\n\n%BASE%\n{name}\n\n\
%DESC%\nTest package {name}\n\n%URL%\nhttps://example.org/{name}\n\n\
%ARCH%\nx86_64\n\n%BUILDDATE%\n1577836800\n\n%INSTALLDATE%\n1580000000\n\n\
%PACKAGER%\nTest Packager <test@example.org>\n\n%SIZE%\n4096\n\n\
%LICENSE%\nGPL3\n\n%VALIDATION%\npgp\n\n%DEPENDS%\nglibc\n\n"
    )
}

/// Local database `files` listing, with a backup entry for anything under /etc
pub fn files_for(files: &[&str]) -> String {
    let mut out = String::from("%FILES%\n");
    for file in files {
        out.push_str(file.trim_start_matches('/'));
        out.push('\n');
    }
    let backup: Vec<_> = files
        .iter()
        .filter(|f| f.starts_with("/etc/") && !f.ends_with('/'))
        .collect();
    if !backup.is_empty() {
        out.push_str("\n%BACKUP%\n");
        for file in backup {
            out.push_str(&format!(
                "{}\td41d8cd98f00b204e9800998ecf8427e\n",
                file.trim_start_matches('/')
            ));
        }
    }
    out
}

/// In-memory package manager
#[derive(Default)]
pub struct FakeManager {
    versions: std::sync::Mutex<HashMap<String, String>>,
    files: std::sync::Mutex<HashMap<String, Vec<String>>>,
    failing: std::sync::Mutex<HashSet<String>>,
    root_prefix: std::sync::Mutex<Option<String>>,
}

impl FakeManager {
    pub fn add(&self, name: &str, version: &str, files: &[&str]) {
        self.versions
            .lock()
            .unwrap()
            .insert(name.to_string(), version.to_string());
        self.files.lock().unwrap().insert(
            name.to_string(),
            files.iter().map(|f| f.to_string()).collect(),
        );
    }

    /// Make the owned-files query for `name` fail
    pub fn fail_files_query(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    /// Report owned paths under `root`, as `pacman --root <root> -Qlq` does
    pub fn report_under_root(&self, root: &Path) {
        *self.root_prefix.lock().unwrap() =
            Some(root.to_string_lossy().trim_end_matches('/').to_string());
    }
}

impl PackageManager for FakeManager {
    fn installed_version(&self, name: &str) -> Result<Option<String>> {
        Ok(self.versions.lock().unwrap().get(name).cloned())
    }

    fn owned_files(&self, name: &str) -> Result<Vec<String>> {
        if self.failing.lock().unwrap().contains(name) {
            return Err(Error::ManagerQueryFailed {
                package: name.to_string(),
                reason: "error: database is locked".to_string(),
            });
        }
        let files = self
            .files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default();
        Ok(match self.root_prefix.lock().unwrap().as_deref() {
            Some(prefix) => files.into_iter().map(|f| format!("{}{}", prefix, f)).collect(),
            None => files,
        })
    }
}

/// Archiver that returns a fixed report instead of reading any member
pub struct FixedReportArchiver {
    /// Report returned from every call
    pub report: ArchiveReport,
    /// Write placeholder bytes to the output; when false nothing is produced
    pub write_output: bool,
}

impl FixedReportArchiver {
    /// An archiver that claims `member` was unreadable for lack of permission
    pub fn permission_denied(member: &str) -> Self {
        Self {
            report: ArchiveReport {
                skipped: vec![SkippedMember {
                    path: member.to_string(),
                    reason: "Permission denied".to_string(),
                }],
                permission_denied: true,
            },
            write_output: true,
        }
    }

    /// An archiver that succeeds without writing the archive
    pub fn no_output() -> Self {
        Self {
            report: ArchiveReport::default(),
            write_output: false,
        }
    }
}

impl Archiver for FixedReportArchiver {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn create(&self, request: &ArchiveRequest<'_>) -> Result<ArchiveReport> {
        if self.write_output {
            fs::write(request.output, b"archive")?;
        }
        Ok(self.report.clone())
    }
}

/// Entry names and contents of an archive
pub fn read_archive(path: &Path, format: CompressionFormat) -> Vec<(String, Vec<u8>)> {
    let data = compression::decompress(&fs::read(path).unwrap(), format).unwrap();
    let mut archive = tar::Archive::new(data.as_slice());
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (name, content)
        })
        .collect()
}

/// Content of the `.PKGINFO` member of an archive
pub fn pkginfo_of(path: &Path, format: CompressionFormat) -> String {
    read_archive(path, format)
        .into_iter()
        .find(|(name, _)| name == ".PKGINFO")
        .map(|(_, content)| String::from_utf8(content).unwrap())
        .unwrap()
}
