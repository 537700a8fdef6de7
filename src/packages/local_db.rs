// src/packages/local_db.rs

//! Reader for pacman's local package database
//!
//! Each installed package has a record directory `<dbpath>/local/<name>-<version>`
//! holding its `desc` descriptor, the `files` ownership listing and, when the
//! package shipped them, `install`, `changelog` and a gzipped `mtree`.

use crate::compression::{self, CompressionFormat};
use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Primary descriptor file inside a record directory
pub const DESC_FILE: &str = "desc";

/// Ownership listing inside a record directory
pub const FILES_FILE: &str = "files";

/// Section marker in `files` that starts the backup-eligible paths
const BACKUP_MARKER: &str = "%BACKUP%";

/// An installed package, located in the local database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub record_path: PathBuf,
}

impl PackageRecord {
    /// Locate the record for `name` at `version` under `dbpath`
    pub fn new(dbpath: &Path, name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            record_path: dbpath.join("local").join(format!("{}-{}", name, version)),
        }
    }

    /// File name of the reassembled archive: `<name>-<version>.pkg.tar<ext>`
    pub fn archive_file_name(&self, format: CompressionFormat) -> String {
        format!("{}-{}.pkg.tar{}", self.name, self.version, format.extension())
    }
}

/// Optional generated members a package may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    InstallScript,
    ChangeLog,
    IntegrityManifest,
}

impl ArtifactKind {
    /// All kinds in archive member order
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::InstallScript,
        ArtifactKind::ChangeLog,
        ArtifactKind::IntegrityManifest,
    ];

    /// File name inside the record directory
    pub fn record_file(&self) -> &'static str {
        match self {
            Self::InstallScript => "install",
            Self::ChangeLog => "changelog",
            Self::IntegrityManifest => "mtree",
        }
    }

    /// Member name inside the reassembled archive
    pub fn member_name(&self) -> &'static str {
        match self {
            Self::InstallScript => ".INSTALL",
            Self::ChangeLog => ".CHANGELOG",
            Self::IntegrityManifest => ".MTREE",
        }
    }
}

/// The optional artifacts actually present for one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    install_script: Option<Vec<u8>>,
    change_log: Option<Vec<u8>>,
    integrity_manifest: Option<Vec<u8>>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: ArtifactKind) -> &mut Option<Vec<u8>> {
        match kind {
            ArtifactKind::InstallScript => &mut self.install_script,
            ArtifactKind::ChangeLog => &mut self.change_log,
            ArtifactKind::IntegrityManifest => &mut self.integrity_manifest,
        }
    }

    /// Record the content of an artifact
    pub fn insert(&mut self, kind: ArtifactKind, content: Vec<u8>) {
        *self.slot(kind) = Some(content);
    }

    /// Content of an artifact, if present
    pub fn get(&self, kind: ArtifactKind) -> Option<&[u8]> {
        match kind {
            ArtifactKind::InstallScript => self.install_script.as_deref(),
            ArtifactKind::ChangeLog => self.change_log.as_deref(),
            ArtifactKind::IntegrityManifest => self.integrity_manifest.as_deref(),
        }
    }

    pub fn contains(&self, kind: ArtifactKind) -> bool {
        self.get(kind).is_some()
    }

    /// Present artifacts in archive member order
    pub fn present(&self) -> impl Iterator<Item = (ArtifactKind, &[u8])> {
        ArtifactKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|content| (kind, content)))
    }
}

/// Everything read from one record directory
#[derive(Debug, Clone)]
pub struct LocalRecord {
    pub record: PackageRecord,
    /// Raw `desc` bytes
    pub descriptor: Vec<u8>,
    /// Backup-eligible paths from the `files` listing, path token only
    pub backup: Vec<String>,
    pub artifacts: ArtifactSet,
}

/// Read the record directory for `record`
///
/// Fails with `RecordNotFound` when the directory or its descriptor is
/// missing. Missing optional artifacts are simply absent from the result.
pub fn read_record(record: &PackageRecord) -> Result<LocalRecord> {
    let not_found = || Error::RecordNotFound {
        name: record.name.clone(),
        version: record.version.clone(),
        path: record.record_path.clone(),
    };

    if !record.record_path.is_dir() {
        return Err(not_found());
    }

    let descriptor = read_optional(&record.record_path.join(DESC_FILE))?.ok_or_else(not_found)?;

    let backup = read_optional(&record.record_path.join(FILES_FILE))?
        .map(|content| parse_backup_section(&String::from_utf8_lossy(&content)))
        .unwrap_or_default();

    let mut artifacts = ArtifactSet::new();
    for kind in ArtifactKind::ALL {
        let path = record.record_path.join(kind.record_file());
        if let Some(content) = read_optional(&path)? {
            let content = match kind {
                ArtifactKind::IntegrityManifest => compression::decompress_auto(&content)?,
                _ => content,
            };
            debug!("{}: found {}", record.name, kind.record_file());
            artifacts.insert(kind, content);
        }
    }

    Ok(LocalRecord {
        record: record.clone(),
        descriptor,
        backup,
        artifacts,
    })
}

/// Read a file, mapping "not found" to `None`
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Extract backup paths from a `files` listing
///
/// Entries follow the `%BACKUP%` marker as `path<TAB>md5sum`; the section
/// ends at the next `%SECTION%` marker or end of file.
pub fn parse_backup_section(content: &str) -> Vec<String> {
    content
        .lines()
        .skip_while(|line| line.trim() != BACKUP_MARKER)
        .skip(1)
        .take_while(|line| !is_section_marker(line))
        .filter_map(|line| line.split('\t').next())
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_section_marker(line: &str) -> bool {
    let line = line.trim();
    line.len() > 2 && line.starts_with('%') && line.ends_with('%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn record_dir(root: &TempDir, name: &str, version: &str) -> PackageRecord {
        let record = PackageRecord::new(root.path(), name, version);
        fs::create_dir_all(&record.record_path).unwrap();
        record
    }

    #[test]
    fn test_record_path_and_archive_name() {
        let record = PackageRecord::new(Path::new("/var/lib/pacman"), "gzip", "1.10-1");
        assert_eq!(
            record.record_path,
            PathBuf::from("/var/lib/pacman/local/gzip-1.10-1")
        );
        assert_eq!(
            record.archive_file_name(CompressionFormat::Xz),
            "gzip-1.10-1.pkg.tar.xz"
        );
        assert_eq!(
            record.archive_file_name(CompressionFormat::None),
            "gzip-1.10-1.pkg.tar"
        );
    }

    #[test]
    fn test_parse_backup_section() {
        let content = "%FILES%\netc/\netc/pacman.conf\n\n%BACKUP%\netc/pacman.conf\t2a6c1a8b\netc/makepkg.conf\tdeadbeef\n";
        assert_eq!(
            parse_backup_section(content),
            vec!["etc/pacman.conf", "etc/makepkg.conf"]
        );
    }

    #[test]
    fn test_parse_backup_section_absent() {
        assert!(parse_backup_section("%FILES%\nusr/\nusr/bin/gzip\n").is_empty());
    }

    #[test]
    fn test_parse_backup_section_stops_at_next_marker() {
        let content = "%BACKUP%\netc/a.conf\tabc\n%OTHER%\nnot-a-backup\n";
        assert_eq!(parse_backup_section(content), vec!["etc/a.conf"]);
    }

    #[test]
    fn test_missing_directory_is_record_not_found() {
        let temp = TempDir::new().unwrap();
        let record = PackageRecord::new(temp.path(), "gzip", "1.10-1");
        assert!(matches!(
            read_record(&record),
            Err(Error::RecordNotFound { name, .. }) if name == "gzip"
        ));
    }

    #[test]
    fn test_missing_descriptor_is_record_not_found() {
        let temp = TempDir::new().unwrap();
        let record = record_dir(&temp, "gzip", "1.10-1");
        assert!(matches!(
            read_record(&record),
            Err(Error::RecordNotFound { .. })
        ));
    }

    #[test]
    fn test_read_record_without_optional_artifacts() {
        let temp = TempDir::new().unwrap();
        let record = record_dir(&temp, "gzip", "1.10-1");
        fs::write(record.record_path.join(DESC_FILE), "%NAME%\ngzip\n").unwrap();

        let local = read_record(&record).unwrap();
        assert_eq!(local.descriptor, b"%NAME%\ngzip\n");
        assert!(local.backup.is_empty());
        assert_eq!(local.artifacts.present().count(), 0);
    }

    #[test]
    fn test_read_record_with_artifacts() {
        let temp = TempDir::new().unwrap();
        let record = record_dir(&temp, "pacman", "6.1.0-3");
        fs::write(record.record_path.join(DESC_FILE), "%NAME%\npacman\n").unwrap();
        fs::write(
            record.record_path.join(FILES_FILE),
            "%FILES%\netc/pacman.conf\n\n%BACKUP%\netc/pacman.conf\tabc\n",
        )
        .unwrap();
        fs::write(record.record_path.join("install"), "post_install() {\n  :\n}\n").unwrap();

        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(b"#mtree\n./etc/pacman.conf type=file\n").unwrap();
        fs::write(record.record_path.join("mtree"), gz.finish().unwrap()).unwrap();

        let local = read_record(&record).unwrap();
        assert_eq!(local.backup, vec!["etc/pacman.conf"]);
        assert!(local.artifacts.contains(ArtifactKind::InstallScript));
        assert!(!local.artifacts.contains(ArtifactKind::ChangeLog));
        assert_eq!(
            local.artifacts.get(ArtifactKind::IntegrityManifest),
            Some(&b"#mtree\n./etc/pacman.conf type=file\n"[..])
        );

        let kinds: Vec<_> = local.artifacts.present().map(|(kind, _)| kind).collect();
        assert_eq!(
            kinds,
            vec![ArtifactKind::InstallScript, ArtifactKind::IntegrityManifest]
        );
    }
}
