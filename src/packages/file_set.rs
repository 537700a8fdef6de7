// src/packages/file_set.rs

//! Member list of a reassembled package

use crate::error::Result;
use crate::packages::local_db::ArtifactSet;
use crate::packages::pacman_query::PackageManager;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Archive member name of the generated descriptor
pub const DESCRIPTOR_MEMBER: &str = ".PKGINFO";

/// Every member of one package archive, without duplicates
///
/// Generated members (`.PKGINFO`, then `.INSTALL`, `.CHANGELOG`, `.MTREE` as
/// present) are relative names resolved inside the job workspace; owned
/// paths are absolute. Generated members are listed first so the descriptor
/// is the first archive entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileManifest {
    members: Vec<String>,
}

impl FileManifest {
    /// Build from owned paths plus the generated members for `artifacts`
    pub fn new(owned: Vec<String>, artifacts: &ArtifactSet) -> Self {
        let generated = std::iter::once(DESCRIPTOR_MEMBER.to_string()).chain(
            artifacts
                .present()
                .map(|(kind, _)| kind.member_name().to_string()),
        );

        let mut seen = HashSet::new();
        let members = generated
            .chain(owned)
            .filter(|member| !member.is_empty() && seen.insert(member.clone()))
            .collect();

        Self { members }
    }

    /// Ask the package manager for `name`'s owned files and add generated members
    ///
    /// pacman reports owned paths under `root` when run with `--root`; they
    /// are turned back into package paths here.
    pub fn resolve(
        manager: &dyn PackageManager,
        name: &str,
        root: &Path,
        artifacts: &ArtifactSet,
    ) -> Result<Self> {
        let owned = manager
            .owned_files(name)?
            .into_iter()
            .map(|path| strip_root(path, root))
            .collect();
        Ok(Self::new(owned, artifacts))
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }

    /// Write the newline-separated list file consumed by the archiver
    pub fn write_list(&self, path: &Path) -> Result<()> {
        let mut content = self.members.join("\n");
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }

    /// Read a list file written by [`FileManifest::write_list`]
    pub fn read_list(path: &Path) -> Result<Vec<String>> {
        Ok(fs::read_to_string(path)?
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Remove a `root` prefix from an owned path, leaving host-root paths alone
fn strip_root(path: String, root: &Path) -> String {
    let root = root.to_string_lossy();
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return path;
    }
    match path.strip_prefix(root) {
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path,
    }
}
